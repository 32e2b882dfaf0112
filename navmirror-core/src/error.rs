use navmirror_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No checkpoint found at {}; run the extract stage first", .path.display())]
    CheckpointMissing { path: PathBuf },

    #[error("Checkpoint {} is malformed: {source}", .path.display())]
    CheckpointFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl CoreError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
