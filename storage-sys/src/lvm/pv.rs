// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::{PhysicalVolumeOps, StorageError, StorageResult};
use storage_types::{PhysicalVolumeInfo, PvState, bytes_to_pretty};

use super::report::PvRow;
use super::tools::{LvmTools, Topology};
use super::validate::validate_device_path;

/// Physical volume lifecycle: create, resize, move extents, remove
#[derive(Clone)]
pub struct PvManager {
    tools: LvmTools,
}

impl PvManager {
    pub fn new(tools: LvmTools) -> Self {
        Self { tools }
    }

    fn require_pv<'a>(topology: &'a Topology, device: &str) -> StorageResult<&'a PvRow> {
        topology
            .pv(device)
            .ok_or_else(|| StorageError::not_found(format!("{device} is not a physical volume")))
    }

    /// Smallest size a VG member can shrink to without losing allocated extents
    fn min_member_size(topology: &Topology, device: &str) -> StorageResult<u64> {
        let pv = Self::require_pv(topology, device)?;
        let extent_size = pv
            .vg_name
            .as_deref()
            .and_then(|name| topology.vg(name))
            .map_or(0, |vg| vg.extent_size);
        pv.pe_alloc_count
            .checked_mul(extent_size)
            .and_then(|allocated| allocated.checked_add(pv.pe_start))
            .ok_or_else(|| {
                StorageError::parse(format!(
                    "{device} reports {} allocated extents of {extent_size} bytes, which overflows",
                    pv.pe_alloc_count
                ))
            })
    }
}

impl PhysicalVolumeOps for PvManager {
    fn create(&self, device: &str) -> StorageResult<()> {
        validate_device_path(device)?;

        let pvs = self.tools.physical_volumes()?;
        if let Some(existing) = pvs.iter().find(|pv| pv.pv_name == device) {
            return Err(StorageError::already_exists(match &existing.vg_name {
                Some(vg_name) => format!("{device} is already a physical volume in {vg_name}"),
                None => format!("{device} is already a physical volume"),
            }));
        }

        tracing::info!("Creating physical volume on {}", device);
        self.tools.invoke("pvcreate", vec![device.to_string()])?;
        tracing::info!("Physical volume {} created successfully", device);
        Ok(())
    }

    fn resize(&self, device: &str, size: u64) -> StorageResult<()> {
        validate_device_path(device)?;
        let topology = self.tools.topology()?;
        let pv = Self::require_pv(&topology, device)?;

        let mut args = Vec::new();
        if size != 0 {
            if size <= pv.pe_start {
                return Err(StorageError::validation(format!(
                    "{} leaves no room after the metadata area of {device}",
                    bytes_to_pretty(&size, true)
                )));
            }
            if pv.dev_size > 0 && size > pv.dev_size {
                return Err(StorageError::validation(format!(
                    "{} exceeds the {} capacity of {device}",
                    bytes_to_pretty(&size, true),
                    bytes_to_pretty(&pv.dev_size, false)
                )));
            }
            let min_size = Self::min_member_size(&topology, device)?;
            if size < min_size {
                return Err(StorageError::validation(format!(
                    "{} would drop allocated extents on {device}, need at least {}",
                    bytes_to_pretty(&size, true),
                    bytes_to_pretty(&min_size, true)
                )));
            }
            args.extend([
                "--yes".to_string(),
                "--setphysicalvolumesize".to_string(),
                format!("{size}b"),
            ]);
            tracing::info!("Resizing physical volume {} to {} bytes", device, size);
        } else {
            tracing::info!("Resizing physical volume {} to its device size", device);
        }
        args.push(device.to_string());

        self.tools.invoke("pvresize", args)?;
        tracing::info!("Physical volume {} resized successfully", device);
        Ok(())
    }

    fn remove(&self, device: &str) -> StorageResult<()> {
        validate_device_path(device)?;
        let pvs = self.tools.physical_volumes()?;
        let pv = pvs
            .iter()
            .find(|pv| pv.pv_name == device)
            .ok_or_else(|| StorageError::not_found(format!("{device} is not a physical volume")))?;

        if let Some(vg_name) = &pv.vg_name {
            return Err(StorageError::in_use(format!(
                "{device} is a member of volume group {vg_name}"
            )));
        }

        tracing::info!("Removing physical volume {}", device);
        self.tools
            .invoke("pvremove", vec!["--yes".to_string(), device.to_string()])?;
        tracing::info!("Physical volume {} removed successfully", device);
        Ok(())
    }

    fn move_extents(&self, src: &str, dest: Option<&str>) -> StorageResult<()> {
        validate_device_path(src)?;
        if let Some(dest) = dest {
            validate_device_path(dest)?;
        }

        let topology = self.tools.topology()?;
        let source = Self::require_pv(&topology, src)?;
        let Some(vg_name) = source.vg_name.as_deref() else {
            return Err(StorageError::validation(format!(
                "{src} does not belong to a volume group"
            )));
        };
        if source.pe_alloc_count == 0 {
            return Err(StorageError::validation(format!(
                "{src} has no allocated extents to move"
            )));
        }

        let mut args = vec!["-i".to_string(), "0".to_string(), src.to_string()];
        match dest {
            Some(dest) => {
                let target = Self::require_pv(&topology, dest)?;
                if target.pv_name == source.pv_name {
                    return Err(StorageError::validation(
                        "source and destination are the same physical volume",
                    ));
                }
                if !target.is_member_of(vg_name) {
                    return Err(StorageError::validation(format!(
                        "{dest} is not a member of volume group {vg_name}"
                    )));
                }
                if target.free_extents() < source.pe_alloc_count {
                    return Err(StorageError::validation(format!(
                        "{dest} has {} free extents, {} needed",
                        target.free_extents(),
                        source.pe_alloc_count
                    )));
                }
                args.push(dest.to_string());
            }
            None => {
                let available: u64 = topology
                    .members(vg_name)
                    .filter(|pv| pv.pv_name != source.pv_name)
                    .map(|pv| pv.free_extents())
                    .sum();
                if available < source.pe_alloc_count {
                    return Err(StorageError::validation(format!(
                        "volume group {vg_name} has {available} free extents outside {src}, {} needed",
                        source.pe_alloc_count
                    )));
                }
            }
        }

        tracing::info!(
            "Moving {} extents off {} to {}",
            source.pe_alloc_count,
            src,
            dest.unwrap_or("<allocation policy>")
        );
        self.tools.invoke("pvmove", args)?;
        tracing::info!("Extents moved off {} successfully", src);
        Ok(())
    }

    fn scan(&self, device: &str, update_cache: bool) -> StorageResult<()> {
        validate_device_path(device)?;

        let args = if update_cache {
            vec!["--cache".to_string(), device.to_string()]
        } else {
            Vec::new()
        };
        tracing::debug!("Scanning {} for physical volumes", device);
        let scanned = self.tools.invoke("pvscan", args);

        let pvs = self.tools.physical_volumes()?;
        if !pvs.iter().any(|pv| pv.pv_name == device) {
            if let Err(error) = &scanned {
                tracing::debug!("pvscan of {} failed: {}", device, error.message);
            }
            return Err(StorageError::not_found(format!(
                "no physical volume found on {device}"
            )));
        }

        scanned.map(|_| ())
    }

    fn info(&self, device: Option<&str>) -> StorageResult<PhysicalVolumeInfo> {
        let Some(device) = device else {
            return Err(StorageError::validation(
                "a device is required, use list() to enumerate physical volumes",
            ));
        };
        validate_device_path(device)?;

        let topology = self.tools.topology()?;
        let pv = Self::require_pv(&topology, device)?;
        topology.snapshot(pv)
    }

    fn list(&self) -> StorageResult<Vec<PhysicalVolumeInfo>> {
        let topology = self.tools.topology()?;
        let mut infos = topology
            .pvs
            .iter()
            .map(|pv| topology.snapshot(pv))
            .collect::<StorageResult<Vec<_>>>()?;
        infos.sort_by(|a, b| a.pv_name.cmp(&b.pv_name));
        Ok(infos)
    }

    fn state(&self, device: &str) -> StorageResult<PvState> {
        validate_device_path(device)?;
        let pvs = self.tools.physical_volumes()?;
        Ok(match pvs.iter().find(|pv| pv.pv_name == device) {
            Some(pv) => match &pv.vg_name {
                Some(vg_name) => PvState::MemberOfVg(vg_name.clone()),
                None => PvState::Unassigned,
            },
            None => PvState::Unconfigured,
        })
    }
}
