// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SysError};

pub const CONFIG_ENV: &str = "STORAGE_LVM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/storage-lvm.toml";

/// Settings applied to every LVM tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LvmConfig {
    /// Directory holding the LVM binaries; resolved from `PATH` when unset
    pub tool_dir: Option<PathBuf>,

    /// Passed as `--config=<value>` to every command
    pub global_config: Option<String>,
}

impl LvmConfig {
    /// Load from `$STORAGE_LVM_CONFIG`, then [`DEFAULT_CONFIG_PATH`], else defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(default_path);
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|error| SysError::InvalidConfig {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let config = Self::from_toml_str(&raw).map_err(|reason| SysError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!("Loaded LVM configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(raw).map_err(|error| error.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(dir) = &self.tool_dir
            && !dir.is_absolute()
        {
            return Err(format!("tool_dir must be absolute, got {}", dir.display()));
        }

        if let Some(global) = &self.global_config
            && global.trim().is_empty()
        {
            return Err("global_config must not be empty when set".to_string());
        }

        Ok(())
    }

    /// Path or bare name used to invoke `command`
    pub fn command_path(&self, command: &str) -> String {
        match &self.tool_dir {
            Some(dir) => dir.join(command).to_string_lossy().into_owned(),
            None => command.to_string(),
        }
    }
}
