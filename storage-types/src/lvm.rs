//! LVM (Logical Volume Manager) types
//!
//! Types for physical volume and volume group management.

use serde::{Deserialize, Serialize};

/// Volume group information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroupInfo {
    /// Volume group name
    pub name: String,

    /// Volume group UUID
    pub uuid: String,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,

    /// Physical extent size in bytes
    pub extent_size: u64,

    /// Total number of physical extents
    pub extent_count: u64,

    /// Number of unallocated physical extents
    pub free_count: u64,

    /// Number of physical volumes
    pub pv_count: u64,

    /// Number of logical volumes
    pub lv_count: u64,
}

impl VolumeGroupInfo {
    /// Get used space in bytes
    pub fn used(&self) -> u64 {
        self.size.saturating_sub(self.free)
    }

    /// Get number of allocated extents
    pub fn used_count(&self) -> u64 {
        self.extent_count.saturating_sub(self.free_count)
    }

    /// Get usage percentage (0-100)
    pub fn usage_percent(&self) -> u32 {
        if self.size == 0 {
            0
        } else {
            ((self.used() as f64 / self.size as f64) * 100.0) as u32
        }
    }

    /// Whether the capacity fields agree with each other
    pub fn is_consistent(&self) -> bool {
        self.free_count <= self.extent_count
            && self.free <= self.size
            && self.extent_count.checked_mul(self.extent_size) == Some(self.size)
    }
}

/// Lifecycle state of a block device from the PV layer's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PvState {
    /// No PV metadata on the device
    Unconfigured,
    /// A PV that is not part of any volume group
    Unassigned,
    /// A PV that belongs to the named volume group
    MemberOfVg(String),
}

/// Physical volume snapshot
///
/// VG-wide fields ride along on every member PV. They are filled from a
/// single [`VolumeGroupInfo`] via [`PhysicalVolumeInfo::project`], so two
/// snapshots of the same group never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalVolumeInfo {
    /// Device path (e.g., "/dev/sda1")
    pub pv_name: String,

    /// Physical volume UUID
    pub pv_uuid: String,

    /// Byte offset of the first physical extent
    pub pe_start: u64,

    /// Volume group name (None if not assigned)
    pub vg_name: Option<String>,

    /// Volume group UUID (None if not assigned)
    pub vg_uuid: Option<String>,

    /// Volume group size in bytes
    pub vg_size: u64,

    /// Volume group free space in bytes
    pub vg_free: u64,

    /// Volume group physical extent size in bytes
    pub vg_extent_size: u64,

    /// Volume group extent count
    pub vg_extent_count: u64,

    /// Volume group free extent count
    pub vg_free_count: u64,

    /// Number of physical volumes in the volume group
    pub vg_pv_count: u64,
}

impl PhysicalVolumeInfo {
    /// Snapshot of a PV that does not belong to a volume group
    pub fn unassigned(pv_name: impl Into<String>, pv_uuid: impl Into<String>, pe_start: u64) -> Self {
        Self {
            pv_name: pv_name.into(),
            pv_uuid: pv_uuid.into(),
            pe_start,
            ..Self::default()
        }
    }

    /// Snapshot of a PV with the VG-wide fields copied from `vg`
    pub fn project(
        pv_name: impl Into<String>,
        pv_uuid: impl Into<String>,
        pe_start: u64,
        vg: Option<&VolumeGroupInfo>,
    ) -> Self {
        let mut info = Self::unassigned(pv_name, pv_uuid, pe_start);
        if let Some(vg) = vg {
            info.vg_name = Some(vg.name.clone());
            info.vg_uuid = Some(vg.uuid.clone());
            info.vg_size = vg.size;
            info.vg_free = vg.free;
            info.vg_extent_size = vg.extent_size;
            info.vg_extent_count = vg.extent_count;
            info.vg_free_count = vg.free_count;
            info.vg_pv_count = vg.pv_count;
        }
        info
    }

    /// Check if this PV is assigned to a VG
    pub fn is_assigned(&self) -> bool {
        self.vg_name.is_some()
    }

    pub fn state(&self) -> PvState {
        match &self.vg_name {
            Some(vg_name) => PvState::MemberOfVg(vg_name.clone()),
            None => PvState::Unassigned,
        }
    }

    /// Get used space of the owning VG in bytes
    pub fn vg_used(&self) -> u64 {
        self.vg_size.saturating_sub(self.vg_free)
    }

    /// Get number of allocated extents in the owning VG
    pub fn vg_used_count(&self) -> u64 {
        self.vg_extent_count.saturating_sub(self.vg_free_count)
    }

    /// Release every owned string and zero all fields
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vg0() -> VolumeGroupInfo {
        VolumeGroupInfo {
            name: "vg0".to_string(),
            uuid: "Vg0Uuid-0000".to_string(),
            size: 100 * 4_194_304,
            free: 25 * 4_194_304,
            extent_size: 4_194_304,
            extent_count: 100,
            free_count: 25,
            pv_count: 2,
            lv_count: 1,
        }
    }

    #[test]
    fn projection_copies_vg_fields() {
        let vg = vg0();
        let pv = PhysicalVolumeInfo::project("/dev/sda2", "PvUuid-0001", 1_048_576, Some(&vg));

        assert!(pv.is_assigned());
        assert_eq!(pv.state(), PvState::MemberOfVg("vg0".to_string()));
        assert_eq!(pv.vg_size, vg.size);
        assert_eq!(pv.vg_extent_count, 100);
        assert_eq!(pv.vg_used_count(), 75);
        assert_eq!(pv.vg_used(), vg.used());
    }

    #[test]
    fn unassigned_snapshot_has_empty_vg_fields() {
        let pv = PhysicalVolumeInfo::project("/dev/sdb", "PvUuid-0002", 1_048_576, None);

        assert_eq!(pv.state(), PvState::Unassigned);
        assert_eq!(pv.vg_uuid, None);
        assert_eq!(pv.vg_size, 0);
        assert_eq!(pv.vg_extent_size, 0);
        assert_eq!(pv.vg_pv_count, 0);
    }

    #[test]
    fn clone_is_independent_of_original() {
        let original = PhysicalVolumeInfo::project("/dev/sda2", "PvUuid-0001", 0, Some(&vg0()));
        let mut copy = original.clone();
        copy.clear();

        assert_eq!(copy, PhysicalVolumeInfo::default());
        assert_eq!(original.vg_name.as_deref(), Some("vg0"));
    }

    #[test]
    fn volume_group_consistency() {
        let mut vg = vg0();
        assert!(vg.is_consistent());
        assert_eq!(vg.usage_percent(), 75);

        vg.free_count = 101;
        assert!(!vg.is_consistent());
    }

    #[test]
    fn snapshot_serializes_with_optional_vg() {
        let pv = PhysicalVolumeInfo::unassigned("/dev/sdc", "PvUuid-0003", 1_048_576);
        let json = serde_json::to_string(&pv).expect("serialize snapshot");
        let parsed: PhysicalVolumeInfo = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(parsed, pv);
    }
}
