//! Durable key-value settings for resuming a session after a crash.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PrefsError;

pub const PARTICIPANT_ID_KEY: &str = "ParticipantID";
pub const TRIAL_NUMBER_KEY: &str = "TrialNumber";

/// Integer settings that survive process restarts.
///
/// `set_int` must have reached durable storage by the time it returns.
pub trait Preferences {
    fn get_int(&self, key: &str) -> Option<i32>;
    fn set_int(&mut self, key: &str, value: i32) -> Result<(), PrefsError>;

    fn get_int_or(&self, key: &str, default: i32) -> i32 {
        self.get_int(key).unwrap_or(default)
    }
}

/// Settings kept in a JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: PathBuf,
    values: BTreeMap<String, i32>,
}

impl JsonPreferences {
    /// Opens the file at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| PrefsError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PrefsError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PrefsError> {
        let io = |source: std::io::Error| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| PrefsError::Json {
            path: self.path.clone(),
            source,
        })?;
        // Write a sibling file and rename so a crash mid-write keeps the old values.
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(io)?;
        file.write_all(text.as_bytes()).map_err(io)?;
        file.sync_all().map_err(io)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(io)
    }
}

impl Preferences for JsonPreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i32) -> Result<(), PrefsError> {
        self.values.insert(key.to_owned(), value);
        self.flush()?;
        debug!(key, value, path = %self.path.display(), "preference saved");
        Ok(())
    }
}

/// Process-local settings.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, i32>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i32) -> Result<(), PrefsError> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Validates participant and trial text typed by the experimenter and
/// stores both values. Every invalid field is reported.
pub fn store_session_ids<P: Preferences>(
    prefs: &mut P,
    participant: &str,
    trial: &str,
) -> Result<(i32, i32), SessionIdError> {
    let participant_id = participant.trim().parse::<i32>();
    let trial_number = trial.trim().parse::<i32>();
    let (participant_id, trial_number) = match (participant_id, trial_number) {
        (Ok(p), Ok(t)) => (p, t),
        (p, t) => {
            let mut invalid = Vec::new();
            if p.is_err() {
                invalid.push(format!("Invalid Participant: '{participant}'."));
            }
            if t.is_err() {
                invalid.push(format!("Invalid Trial: '{trial}'."));
            }
            return Err(SessionIdError::Invalid(invalid.join(" ")));
        }
    };
    prefs.set_int(PARTICIPANT_ID_KEY, participant_id)?;
    prefs.set_int(TRIAL_NUMBER_KEY, trial_number)?;
    Ok((participant_id, trial_number))
}

#[derive(Debug, thiserror::Error)]
pub enum SessionIdError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Prefs(#[from] PrefsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_preferences_write_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("session.json");

        let mut prefs = JsonPreferences::open(&path).unwrap();
        assert_eq!(prefs.get_int_or(TRIAL_NUMBER_KEY, 1), 1);
        prefs.set_int(TRIAL_NUMBER_KEY, 4).unwrap();

        let reopened = JsonPreferences::open(&path).unwrap();
        assert_eq!(reopened.get_int(TRIAL_NUMBER_KEY), Some(4));
        assert!(!path.with_extension("tmp").exists());
        let on_disk: BTreeMap<String, i32> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get(TRIAL_NUMBER_KEY), Some(&4));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonPreferences::open(&path),
            Err(PrefsError::Json { .. })
        ));
    }

    #[test]
    fn session_ids_are_validated_together() {
        let mut prefs = MemoryPreferences::new();
        let err = store_session_ids(&mut prefs, "abc", "x1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Participant: 'abc'. Invalid Trial: 'x1'."
        );
        assert_eq!(prefs.get_int(PARTICIPANT_ID_KEY), None);

        assert_eq!(store_session_ids(&mut prefs, " 12 ", "3").unwrap(), (12, 3));
        assert_eq!(prefs.get_int(PARTICIPANT_ID_KEY), Some(12));
        assert_eq!(prefs.get_int(TRIAL_NUMBER_KEY), Some(3));
    }
}
