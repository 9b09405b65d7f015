use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database limit reached ({capacity} students)")]
    CapacityExceeded { capacity: usize },

    #[error("Registry not initialized: {} does not exist", path.display())]
    NotInitialized { path: PathBuf },

    #[error("Corrupt record on line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tempfile::PersistError> for RegistryError {
    fn from(e: tempfile::PersistError) -> Self {
        RegistryError::Io(e.error)
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
