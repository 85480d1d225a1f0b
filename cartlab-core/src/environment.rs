use serde::{Deserialize, Serialize};

/// Scene-wide look parameters selected by a trial condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentParams {
    /// Post-exposure in EV.
    pub exposure: f32,
    /// White-balance temperature shift.
    pub temperature: f32,
}

impl EnvironmentParams {
    pub const NEUTRAL: EnvironmentParams = EnvironmentParams {
        exposure: 0.0,
        temperature: 0.0,
    };
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// The two levels a condition can pick for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub low: f32,
    pub high: f32,
}

/// Maps condition numbers 1..=4 onto a 2x2 design of exposure and
/// temperature levels:
///
/// | condition | exposure | temperature |
/// |-----------|----------|-------------|
/// | 1         | low      | low         |
/// | 2         | low      | high        |
/// | 3         | high     | low         |
/// | 4         | high     | high        |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionTable {
    pub exposure: Levels,
    pub temperature: Levels,
    pub neutral: EnvironmentParams,
}

impl ConditionTable {
    /// Parameters for `condition`, or `None` if it is outside 1..=4.
    #[must_use]
    pub fn params(&self, condition: i32) -> Option<EnvironmentParams> {
        let (exposure_high, temperature_high) = match condition {
            1 => (false, false),
            2 => (false, true),
            3 => (true, false),
            4 => (true, true),
            _ => return None,
        };
        Some(EnvironmentParams {
            exposure: pick(self.exposure, exposure_high),
            temperature: pick(self.temperature, temperature_high),
        })
    }
}

fn pick(levels: Levels, high: bool) -> f32 {
    if high { levels.high } else { levels.low }
}

impl Default for ConditionTable {
    fn default() -> Self {
        Self {
            exposure: Levels { low: -0.5, high: 0.5 },
            temperature: Levels { low: -20.0, high: 20.0 },
            neutral: EnvironmentParams::NEUTRAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_cover_the_design() {
        let table = ConditionTable::default();
        let all: Vec<_> = (1..=4).filter_map(|c| table.params(c)).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], EnvironmentParams { exposure: -0.5, temperature: -20.0 });
        assert_eq!(all[3], EnvironmentParams { exposure: 0.5, temperature: 20.0 });
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unknown_conditions_have_no_params() {
        let table = ConditionTable::default();
        assert!(table.params(0).is_none());
        assert!(table.params(5).is_none());
    }
}
