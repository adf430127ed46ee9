use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storage_contracts::CommandRunner;

use crate::errors::{Result, TestingError};
use crate::fake::FakeLvm;

/// Named LVM topology loaded from `resources/lab-specs/<name>.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSpec {
    pub name: String,
    pub devices: Vec<DeviceSpec>,
    #[serde(default)]
    pub volume_groups: Vec<VolumeGroupSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub path: String,
    pub size_bytes: u64,
    /// Initialize PV metadata even when no volume group claims the device
    #[serde(default)]
    pub pv: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeGroupSpec {
    pub name: String,
    #[serde(default)]
    pub pe_size: u64,
    pub pvs: Vec<String>,
    #[serde(default)]
    pub lv_extents: Vec<u64>,
    #[serde(default)]
    pub busy: bool,
}

pub fn workspace_root() -> PathBuf {
    if let Ok(value) = std::env::var("STORAGE_TESTING_WORKSPACE_ROOT") {
        return PathBuf::from(value);
    }

    if let Ok(current_dir) = std::env::current_dir()
        && current_dir.join("resources/lab-specs").exists()
    {
        return current_dir;
    }

    let manifest_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if manifest_root.join("resources/lab-specs").exists() {
        return manifest_root;
    }

    PathBuf::from(".")
}

pub fn specs_root() -> PathBuf {
    workspace_root().join("resources/lab-specs")
}

pub fn spec_path_for_name(spec_name: &str) -> PathBuf {
    specs_root().join(format!("{}.toml", spec_name))
}

pub fn load_by_name(spec_name: &str) -> Result<LabSpec> {
    let path = spec_path_for_name(spec_name);
    if !path.exists() {
        return Err(TestingError::SpecNotFound {
            spec_name: spec_name.to_string(),
            path,
        });
    }

    let raw = fs::read_to_string(&path).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    parse(spec_name, &raw)
}

pub fn parse(spec_name: &str, raw: &str) -> Result<LabSpec> {
    let spec: LabSpec = toml::from_str(raw).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    validate(&spec)?;
    Ok(spec)
}

pub fn validate(spec: &LabSpec) -> Result<()> {
    let invalid = |reason: String| TestingError::SpecInvalid {
        spec_name: spec.name.clone(),
        reason,
    };

    if spec.name.is_empty() {
        return Err(TestingError::SpecInvalid {
            spec_name: "<unknown>".to_string(),
            reason: "name must not be empty".to_string(),
        });
    }

    if spec.devices.is_empty() {
        return Err(invalid("devices must not be empty".to_string()));
    }

    for vg in &spec.volume_groups {
        if vg.pvs.is_empty() {
            return Err(invalid(format!("volume group '{}' has no pvs", vg.name)));
        }
        if let Some(missing) = vg
            .pvs
            .iter()
            .find(|pv| !spec.devices.iter().any(|device| &device.path == *pv))
        {
            return Err(invalid(format!(
                "volume group '{}' references unknown device '{missing}'",
                vg.name
            )));
        }
    }

    Ok(())
}

/// Build a [`FakeLvm`] holding the topology described by `spec`
///
/// Setup goes through the same commands the managers use; the ledger is
/// cleared afterwards so tests only see their own invocations.
pub fn build(spec: &LabSpec) -> Result<FakeLvm> {
    let fake = FakeLvm::new();
    for device in &spec.devices {
        fake.add_device(&device.path, device.size_bytes);
    }

    let mut initialized: Vec<&str> = spec
        .devices
        .iter()
        .filter(|device| device.pv)
        .map(|device| device.path.as_str())
        .collect();
    for vg in &spec.volume_groups {
        initialized.extend(vg.pvs.iter().map(String::as_str));
    }
    initialized.sort_unstable();
    initialized.dedup();

    for device in initialized {
        setup(&fake, "pvcreate", vec![device.to_string()])?;
    }

    for vg in &spec.volume_groups {
        let mut args = Vec::new();
        if vg.pe_size != 0 {
            args.extend(["-s".to_string(), format!("{}b", vg.pe_size)]);
        }
        args.push(vg.name.clone());
        args.extend(vg.pvs.iter().cloned());
        setup(&fake, "vgcreate", args)?;

        for extents in &vg.lv_extents {
            fake.add_logical_volume(&vg.name, *extents)
                .map_err(|stderr| TestingError::SetupFailed {
                    command: format!("lvcreate -l {extents} {}", vg.name),
                    stderr,
                })?;
        }
        fake.set_busy(&vg.name, vg.busy);
    }

    fake.ledger().clear();
    Ok(fake)
}

pub fn load_fake(spec_name: &str) -> Result<FakeLvm> {
    build(&load_by_name(spec_name)?)
}

fn setup(fake: &FakeLvm, command: &str, args: Vec<String>) -> Result<()> {
    let rendered = crate::cmd::render(command, &args);
    let output = fake
        .run(command, &args)
        .map_err(|error| TestingError::SetupFailed {
            command: rendered.clone(),
            stderr: error.to_string(),
        })?;

    if !output.is_success() {
        return Err(TestingError::SetupFailed {
            command: rendered,
            stderr: output.stderr,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spec_name_without_extension() {
        let spec = load_by_name("2disk").unwrap();
        assert_eq!(spec.name, "2disk");
    }

    #[test]
    fn missing_spec_reports_path() {
        let error = load_by_name("no-such-lab").unwrap_err();
        assert!(matches!(error, TestingError::SpecNotFound { .. }));
    }

    #[test]
    fn rejects_unknown_pv_reference() {
        let raw = r#"
            name = "broken"
            devices = [{ path = "/dev/sdb", size_bytes = 1073741824 }]
            volume_groups = [{ name = "vg0", pvs = ["/dev/sdc"] }]
        "#;
        let error = parse("broken", raw).unwrap_err();
        assert!(error.to_string().contains("/dev/sdc"));
    }

    #[test]
    fn build_leaves_an_empty_ledger() {
        let fake = load_fake("3disk").unwrap();
        assert!(fake.has_volume_group("vg0"));
        assert!(fake.ledger().entries().is_empty());
    }
}
