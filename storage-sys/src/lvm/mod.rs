// SPDX-License-Identifier: GPL-3.0-only

//! Physical volume and volume group management on top of the LVM tools

pub mod pv;
pub mod report;
pub mod tools;
pub mod validate;
pub mod vg;

use std::sync::Arc;

use storage_contracts::CommandRunner;

use crate::config::LvmConfig;
use crate::runner::SystemCommandRunner;

pub use pv::PvManager;
pub use tools::{LvmTools, Topology};
pub use vg::VgManager;

/// Build both managers over one runner and configuration
pub fn managers(runner: Arc<dyn CommandRunner>, config: LvmConfig) -> (PvManager, VgManager) {
    let tools = LvmTools::new(runner, config);
    (PvManager::new(tools.clone()), VgManager::new(tools))
}

/// Managers driving the real tool-chain through `std::process`
pub fn system_managers(config: LvmConfig) -> (PvManager, VgManager) {
    managers(Arc::new(SystemCommandRunner), config)
}
