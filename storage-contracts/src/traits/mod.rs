// SPDX-License-Identifier: GPL-3.0-only

pub mod command;
pub mod lvm;

pub use command::{CommandOutput, CommandRunner};
pub use lvm::{PhysicalVolumeOps, VolumeGroupOps};
