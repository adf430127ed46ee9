use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestingError {
    #[error("spec not found for '{spec_name}' at {path:?}")]
    SpecNotFound { spec_name: String, path: PathBuf },
    #[error("invalid spec '{spec_name}': {reason}")]
    SpecInvalid { spec_name: String, reason: String },
    #[error("fixture setup failed: {command}; stderr: {stderr}")]
    SetupFailed { command: String, stderr: String },
}

pub type Result<T> = std::result::Result<T, TestingError>;
