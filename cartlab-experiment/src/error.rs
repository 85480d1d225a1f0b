use std::path::PathBuf;

/// Failures reading experiment data sources.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognised trials header with {0} columns (expected 6 or 8)")]
    UnknownSchema(usize),
}

/// Failures persisting session preferences.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PrefsError {
    #[error("preferences i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preferences file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures writing the trial log.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LogError {
    #[error("trial log i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
