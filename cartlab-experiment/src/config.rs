use cartlab_core::ConditionTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Values above zero replace the persisted participant ID.
    pub override_participant_id: i32,
    /// Values above zero replace the persisted trial number.
    pub override_trial_number: i32,
    pub conditions: ConditionTable,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            override_participant_id: -1,
            override_trial_number: -1,
            conditions: ConditionTable::default(),
        }
    }
}
