// SPDX-License-Identifier: GPL-3.0-only

pub mod protocol;
pub mod traits;

pub use protocol::{StorageError, StorageErrorKind, StorageResult};
pub use traits::{CommandOutput, CommandRunner, PhysicalVolumeOps, VolumeGroupOps};
