// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for LVM storage management
//!
//! This crate drives the LVM command-line tools through an injectable
//! [`CommandRunner`](storage_contracts::CommandRunner):
//! - Physical volume lifecycle (`PvManager`)
//! - Volume group lifecycle (`VgManager`)
//! - Report parsing for `pvs` / `vgs`
//! - Tool configuration loaded from TOML
//!
//! These operations require elevated privileges and should only be called
//! from privileged services. Callers serialize access per device and per
//! volume group; the tools take no locks of their own.

pub mod config;
pub mod error;
pub mod lvm;
pub mod runner;

pub use config::LvmConfig;
pub use error::{Result, SysError};
pub use lvm::{LvmTools, PvManager, VgManager, managers, system_managers};
pub use runner::SystemCommandRunner;
