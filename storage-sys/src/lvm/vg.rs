// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeSet;

use storage_contracts::{StorageError, StorageErrorKind, StorageResult, VolumeGroupOps};
use storage_types::{VolumeGroupInfo, bytes_to_pretty};

use super::tools::{LvmTools, Topology, reports_in_use};
use super::validate::{validate_device_path, validate_pe_size, validate_vg_name};

/// Volume group lifecycle: create, extend, reduce, (de)activate, remove
#[derive(Clone)]
pub struct VgManager {
    tools: LvmTools,
}

impl VgManager {
    pub fn new(tools: LvmTools) -> Self {
        Self { tools }
    }

    fn require_vg<'a>(topology: &'a Topology, name: &str) -> StorageResult<&'a VolumeGroupInfo> {
        topology
            .vg(name)
            .ok_or_else(|| StorageError::not_found(format!("volume group {name} not found")))
    }

    fn require_existing_vg(&self, name: &str) -> StorageResult<VolumeGroupInfo> {
        validate_vg_name(name)?;
        self.tools
            .volume_groups()?
            .into_iter()
            .find(|vg| vg.name == name)
            .ok_or_else(|| StorageError::not_found(format!("volume group {name} not found")))
    }
}

impl VolumeGroupOps for VgManager {
    fn create(&self, name: &str, pv_list: &[String], pe_size: u64) -> StorageResult<()> {
        validate_vg_name(name)?;
        if pv_list.is_empty() {
            return Err(StorageError::validation(
                "at least one physical volume is required",
            ));
        }
        let mut seen = BTreeSet::new();
        for device in pv_list {
            validate_device_path(device)?;
            if !seen.insert(device.as_str()) {
                return Err(StorageError::validation(format!(
                    "{device} is listed more than once"
                )));
            }
        }
        let pe_size = validate_pe_size(pe_size)?;

        let topology = self.tools.topology()?;
        if topology.vg(name).is_some() {
            return Err(StorageError::already_exists(format!(
                "volume group {name} already exists"
            )));
        }
        for device in pv_list {
            let pv = topology.pv(device).ok_or_else(|| {
                StorageError::validation(format!("{device} is not a physical volume"))
            })?;
            if let Some(owner) = &pv.vg_name {
                return Err(StorageError::validation(format!(
                    "{device} already belongs to volume group {owner}"
                )));
            }
            if pv.pv_size.saturating_sub(pv.pe_start) < pe_size {
                return Err(StorageError::validation(format!(
                    "{device} is smaller than one {} extent",
                    bytes_to_pretty(&pe_size, false)
                )));
            }
        }

        tracing::info!(
            "Creating volume group '{}' with extent size {} and devices: {:?}",
            name,
            pe_size,
            pv_list
        );
        let mut args = vec!["-s".to_string(), format!("{pe_size}b"), name.to_string()];
        args.extend(pv_list.iter().cloned());
        self.tools.invoke("vgcreate", args)?;

        tracing::info!("Volume group '{}' created successfully", name);
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        let vg = self.require_existing_vg(name)?;
        if vg.lv_count > 0 {
            tracing::warn!(
                "Removing volume group '{}' destroys {} logical volume(s)",
                name,
                vg.lv_count
            );
        }

        tracing::info!("Deleting volume group '{}'", name);
        self.tools
            .invoke("vgremove", vec!["--force".to_string(), name.to_string()])?;
        tracing::info!("Volume group '{}' deleted successfully", name);
        Ok(())
    }

    fn activate(&self, name: &str) -> StorageResult<()> {
        self.require_existing_vg(name)?;
        tracing::info!("Activating volume group '{}'", name);
        self.tools
            .invoke("vgchange", vec!["-ay".to_string(), name.to_string()])?;
        Ok(())
    }

    fn deactivate(&self, name: &str) -> StorageResult<()> {
        self.require_existing_vg(name)?;
        tracing::info!("Deactivating volume group '{}'", name);
        self.tools
            .invoke("vgchange", vec!["-an".to_string(), name.to_string()])
            .map_err(|error| {
                if error.kind == StorageErrorKind::ExternalTool && reports_in_use(&error.message) {
                    StorageError::in_use(error.message)
                } else {
                    error
                }
            })?;
        Ok(())
    }

    fn extend(&self, name: &str, device: &str) -> StorageResult<()> {
        validate_vg_name(name)?;
        validate_device_path(device)?;

        let topology = self.tools.topology()?;
        let vg = Self::require_vg(&topology, name)?;
        let pv = topology.pv(device).ok_or_else(|| {
            StorageError::validation(format!("{device} is not a physical volume"))
        })?;
        match pv.vg_name.as_deref() {
            Some(owner) if owner == name => {
                return Err(StorageError::validation(format!(
                    "{device} is already a member of volume group {name}"
                )));
            }
            Some(owner) => {
                return Err(StorageError::in_use(format!(
                    "{device} belongs to volume group {owner}"
                )));
            }
            None => {}
        }
        if pv.pv_size.saturating_sub(pv.pe_start) < vg.extent_size {
            return Err(StorageError::validation(format!(
                "{device} is smaller than one {} extent of {name}",
                bytes_to_pretty(&vg.extent_size, false)
            )));
        }

        tracing::info!("Extending volume group '{}' with {}", name, device);
        self.tools
            .invoke("vgextend", vec![name.to_string(), device.to_string()])?;
        tracing::info!("Volume group '{}' extended with {}", name, device);
        Ok(())
    }

    fn reduce(&self, name: &str, device: &str) -> StorageResult<()> {
        validate_vg_name(name)?;
        validate_device_path(device)?;

        let topology = self.tools.topology()?;
        let vg = Self::require_vg(&topology, name)?;
        let pv = topology
            .pv(device)
            .filter(|pv| pv.is_member_of(name))
            .ok_or_else(|| {
                StorageError::validation(format!(
                    "{device} is not a member of volume group {name}"
                ))
            })?;
        if pv.pe_alloc_count > 0 {
            return Err(StorageError::in_use(format!(
                "{device} still holds {} allocated extents",
                pv.pe_alloc_count
            )));
        }
        if vg.pv_count <= 1 {
            return Err(StorageError::validation(format!(
                "{device} is the last physical volume of {name}, remove the volume group instead"
            )));
        }

        tracing::info!(
            "Removing physical volume '{}' from volume group '{}'",
            device,
            name
        );
        self.tools
            .invoke("vgreduce", vec![name.to_string(), device.to_string()])?;
        tracing::info!(
            "Physical volume '{}' removed from volume group '{}'",
            device,
            name
        );
        Ok(())
    }

    fn info(&self, name: &str) -> StorageResult<VolumeGroupInfo> {
        self.require_existing_vg(name)
    }

    fn list(&self) -> StorageResult<Vec<VolumeGroupInfo>> {
        let mut vgs = self.tools.volume_groups()?;
        vgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vgs)
    }
}
