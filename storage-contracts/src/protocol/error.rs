// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    /// Malformed or out-of-range argument, rejected before any command runs
    Validation,
    AlreadyExists,
    NotFound,
    /// The PV/VG holds or belongs to something that blocks the transition
    InUse,
    /// The external tool exited with a nonzero status or could not be spawned
    ExternalTool,
    /// Tool output did not match the expected report layout
    Parse,
}

impl StorageErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::InUse => 423,
            Self::Parse => 500,
            Self::ExternalTool => 502,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Validation, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::AlreadyExists, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound, message)
    }

    pub fn in_use(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::InUse, message)
    }

    pub fn external_tool(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::ExternalTool, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Parse, message)
    }

    pub fn is(&self, kind: StorageErrorKind) -> bool {
        self.kind == kind
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_roundtrips() {
        let error = StorageError::already_exists("physical volume /dev/sdb already exists");
        let json = serde_json::to_string(&error).expect("serialize error");
        assert!(json.contains("\"already_exists\""));
        let parsed: StorageError = serde_json::from_str(&json).expect("deserialize error");
        assert_eq!(parsed, error);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let error = StorageError::in_use("/dev/sdb belongs to vg1");
        assert_eq!(error.to_string(), "InUse: /dev/sdb belongs to vg1");
        assert!(error.is(StorageErrorKind::InUse));
        assert_eq!(error.kind.code(), 423);
    }
}
