// SPDX-License-Identifier: GPL-3.0-only

use storage_types::{PhysicalVolumeInfo, PvState, VolumeGroupInfo};

use crate::StorageResult;

pub trait PhysicalVolumeOps: Send + Sync {
    /// Initialize `device` as an unassigned PV.
    fn create(&self, device: &str) -> StorageResult<()>;

    /// Resize the PV; `size == 0` follows the underlying device's capacity.
    fn resize(&self, device: &str, size: u64) -> StorageResult<()>;

    /// Destroy PV metadata on `device`. Members of a VG are refused.
    fn remove(&self, device: &str) -> StorageResult<()>;

    /// Move allocated extents off `src`, onto `dest` or wherever the VG
    /// allocation policy puts them.
    fn move_extents(&self, src: &str, dest: Option<&str>) -> StorageResult<()>;

    fn scan(&self, device: &str, update_cache: bool) -> StorageResult<()>;

    fn info(&self, device: Option<&str>) -> StorageResult<PhysicalVolumeInfo>;

    fn list(&self) -> StorageResult<Vec<PhysicalVolumeInfo>>;

    fn state(&self, device: &str) -> StorageResult<PvState>;
}

pub trait VolumeGroupOps: Send + Sync {
    /// Create VG `name` from unassigned PVs; `pe_size == 0` uses the default.
    fn create(&self, name: &str, pv_list: &[String], pe_size: u64) -> StorageResult<()>;

    /// Forced removal, logical volumes inside are destroyed.
    fn remove(&self, name: &str) -> StorageResult<()>;

    fn activate(&self, name: &str) -> StorageResult<()>;

    fn deactivate(&self, name: &str) -> StorageResult<()>;

    fn extend(&self, name: &str, device: &str) -> StorageResult<()>;

    fn reduce(&self, name: &str, device: &str) -> StorageResult<()>;

    fn info(&self, name: &str) -> StorageResult<VolumeGroupInfo>;

    fn list(&self) -> StorageResult<Vec<VolumeGroupInfo>>;
}
