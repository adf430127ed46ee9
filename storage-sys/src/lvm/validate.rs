// SPDX-License-Identifier: GPL-3.0-only

//! Argument checks performed before any command is issued

use storage_contracts::{StorageError, StorageResult};
use storage_types::{bytes_to_pretty, is_supported_pe_size, resolve_pe_size};

const MAX_VG_NAME_LEN: usize = 127;

/// Resolve `0` to the default extent size and reject unsupported sizes
pub fn validate_pe_size(pe_size: u64) -> StorageResult<u64> {
    let resolved = resolve_pe_size(pe_size);
    if is_supported_pe_size(resolved) {
        Ok(resolved)
    } else {
        Err(StorageError::validation(format!(
            "unsupported physical extent size {}",
            bytes_to_pretty(&resolved, true)
        )))
    }
}

pub fn validate_device_path(device: &str) -> StorageResult<()> {
    if device.is_empty() {
        return Err(StorageError::validation("device path must not be empty"));
    }
    if !device.starts_with('/') {
        return Err(StorageError::validation(format!(
            "device path must be absolute: {device:?}"
        )));
    }
    if device.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(StorageError::validation(format!(
            "device path contains whitespace: {device:?}"
        )));
    }
    Ok(())
}

/// LVM naming rules for volume groups
pub fn validate_vg_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        Err(StorageError::validation(format!(
            "invalid volume group name {name:?}: {reason}"
        )))
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.len() > MAX_VG_NAME_LEN {
        return invalid("longer than 127 characters");
    }
    if name == "." || name == ".." {
        return invalid("reserved name");
    }
    if name.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-')))
    {
        return invalid(&format!("character {bad:?} is not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_contracts::StorageErrorKind;
    use storage_types::DEFAULT_PE_SIZE;

    #[test]
    fn zero_pe_size_resolves_to_default() {
        assert_eq!(validate_pe_size(0).unwrap(), DEFAULT_PE_SIZE);
        assert_eq!(validate_pe_size(32 * 1024 * 1024).unwrap(), 32 * 1024 * 1024);
    }

    #[test]
    fn unsupported_pe_size_is_a_validation_error() {
        let error = validate_pe_size(3 * 1024 * 1024).unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Validation);
    }

    #[test]
    fn vg_names() {
        for good in ["vg0", "data_vg", "vg.backup+1", "a-b", "vg_snapshots", "pvmove0"] {
            assert!(validate_vg_name(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "..", "-vg", "vg 0", "vg/0"] {
            assert!(validate_vg_name(bad).is_err(), "{bad}");
        }
        assert!(validate_vg_name(&"v".repeat(128)).is_err());
    }

    #[test]
    fn device_paths() {
        assert!(validate_device_path("/dev/sdb1").is_ok());
        assert!(validate_device_path("").is_err());
        assert!(validate_device_path("sdb").is_err());
        assert!(validate_device_path("/dev/sd b").is_err());
    }
}
