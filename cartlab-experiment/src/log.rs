use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cartlab_core::TrialLogEntry;
use tracing::{debug, info};

use crate::error::LogError;

/// Destination for one row per ended trial.
pub trait TrialLog {
    fn append(&mut self, entry: &TrialLogEntry) -> Result<(), LogError>;
}

/// Appends rows to a CSV file, writing the header when the file is new.
#[derive(Debug, Clone)]
pub struct CsvTrialLog {
    path: PathBuf,
}

impl CsvTrialLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();
        let io = |source: std::io::Error| LogError::Io {
            path: path.clone(),
            source,
        };
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io)?;
            }
            fs::write(&path, format!("{}\n", TrialLogEntry::HEADER)).map_err(io)?;
            info!(path = %path.display(), "created trial log");
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrialLog for CsvTrialLog {
    fn append(&mut self, entry: &TrialLogEntry) -> Result<(), LogError> {
        let io = |source: std::io::Error| LogError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new().append(true).open(&self.path).map_err(io)?;
        writeln!(file, "{}", entry.csv_row()).map_err(io)?;
        file.sync_data().map_err(io)?;
        debug!(
            participant = entry.participant_id,
            trial = entry.trial_number,
            product = entry.product_purchased,
            shelf = entry.shelf_location,
            "logged trial"
        );
        Ok(())
    }
}

/// Keeps rows in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrialLog {
    pub entries: Vec<TrialLogEntry>,
}

impl TrialLog for MemoryTrialLog {
    fn append(&mut self, entry: &TrialLogEntry) -> Result<(), LogError> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

impl<L: TrialLog + ?Sized> TrialLog for Box<L> {
    fn append(&mut self, entry: &TrialLogEntry) -> Result<(), LogError> {
        (**self).append(entry)
    }
}
