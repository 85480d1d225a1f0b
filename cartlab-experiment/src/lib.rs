pub mod config;
pub mod error;
pub mod inventory;
pub mod log;
pub mod prefs;
pub mod schedule;
pub mod stage;
pub mod state;
pub mod trial;

pub use config::ExperimentConfig;
pub use error::{DataError, LogError, PrefsError};
pub use inventory::Inventory;
pub use log::{CsvTrialLog, MemoryTrialLog, TrialLog};
pub use prefs::{
    JsonPreferences, MemoryPreferences, PARTICIPANT_ID_KEY, Preferences, SessionIdError,
    TRIAL_NUMBER_KEY, store_session_ids,
};
pub use schedule::{LoadReport, Schedule, TrialSchema, load_products, load_trials, read_source};
pub use stage::{Stage, StaticStage};
pub use state::{MISSING_LABEL, SOLD_LABEL, TrialController, TrialState};
pub use trial::TrialRun;
