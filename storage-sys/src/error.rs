// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use storage_contracts::StorageError;
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("Invalid configuration {path:?}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("Required tool not found: {0}")]
    ToolNotFound(String),
}

impl From<SysError> for StorageError {
    fn from(error: SysError) -> Self {
        StorageError::external_tool(error.to_string())
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storage_contracts::StorageErrorKind;

    #[test]
    fn missing_tool_crosses_as_external_tool_error() {
        let error: StorageError = SysError::ToolNotFound("pvs".to_string()).into();
        assert_eq!(error.kind, StorageErrorKind::ExternalTool);
        assert!(error.message.contains("pvs"));
    }
}
