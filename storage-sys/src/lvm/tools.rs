// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;
use std::sync::Arc;

use storage_contracts::{CommandOutput, CommandRunner, StorageError, StorageResult};
use storage_types::{PhysicalVolumeInfo, VolumeGroupInfo};

use super::report::{self, PV_COLUMNS, PvRow, VG_COLUMNS};
use crate::config::LvmConfig;
use crate::error::SysError;

const REPORT_TOOLS: [&str; 2] = ["pvs", "vgs"];

/// Runner plus configuration shared by the PV and VG managers
#[derive(Clone)]
pub struct LvmTools {
    runner: Arc<dyn CommandRunner>,
    config: LvmConfig,
}

impl LvmTools {
    pub fn new(runner: Arc<dyn CommandRunner>, config: LvmConfig) -> Self {
        Self { runner, config }
    }

    fn missing_tool(&self) -> Option<&'static str> {
        REPORT_TOOLS.iter().copied().find(|tool| match &self.config.tool_dir {
            Some(_) => !Path::new(&self.config.command_path(tool)).exists(),
            None => which::which(tool).is_err(),
        })
    }

    /// Check if the report tools are installed
    pub fn tools_available(&self) -> bool {
        let available = self.missing_tool().is_none();
        if !available {
            tracing::warn!("LVM tools not found - LVM operations will fail");
        }
        available
    }

    pub fn ensure_tools_available(&self) -> crate::Result<()> {
        match self.missing_tool() {
            Some(tool) => Err(SysError::ToolNotFound(self.config.command_path(tool))),
            None => Ok(()),
        }
    }

    /// Build the full argument list, global config first
    pub fn args_for(&self, args: Vec<String>) -> Vec<String> {
        match &self.config.global_config {
            Some(global) => std::iter::once(format!("--config={global}"))
                .chain(args)
                .collect(),
            None => args,
        }
    }

    /// Run `command`, turning a nonzero exit into an `ExternalTool` error
    pub fn invoke(&self, command: &str, args: Vec<String>) -> StorageResult<CommandOutput> {
        let program = self.config.command_path(command);
        let args = self.args_for(args);
        tracing::debug!("Running {} {}", program, args.join(" "));

        let output = self.runner.run(&program, &args)?;
        if !output.is_success() {
            let diagnostic = output.diagnostic();
            tracing::error!("{command} failed: {diagnostic}");
            return Err(StorageError::external_tool(format!(
                "{command} failed (exit {}): {diagnostic}",
                output.exit_code
            )));
        }

        Ok(output)
    }

    pub fn physical_volumes(&self) -> StorageResult<Vec<PvRow>> {
        let output = self.invoke("pvs", report::report_args(&PV_COLUMNS))?;
        let rows = report::parse_pvs(&output.stdout)?;
        tracing::debug!("Found {} physical volumes", rows.len());
        Ok(rows)
    }

    pub fn volume_groups(&self) -> StorageResult<Vec<VolumeGroupInfo>> {
        let output = self.invoke("vgs", report::report_args(&VG_COLUMNS))?;
        let vgs = report::parse_vgs(&output.stdout)?;
        tracing::debug!("Found {} volume groups", vgs.len());
        Ok(vgs)
    }

    /// PVs and VGs queried back to back
    pub fn topology(&self) -> StorageResult<Topology> {
        Ok(Topology {
            pvs: self.physical_volumes()?,
            vgs: self.volume_groups()?,
        })
    }
}

/// Point-in-time view of every PV and VG
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub pvs: Vec<PvRow>,
    pub vgs: Vec<VolumeGroupInfo>,
}

impl Topology {
    pub fn pv(&self, device: &str) -> Option<&PvRow> {
        self.pvs.iter().find(|pv| pv.pv_name == device)
    }

    pub fn vg(&self, name: &str) -> Option<&VolumeGroupInfo> {
        self.vgs.iter().find(|vg| vg.name == name)
    }

    pub fn members<'a>(&'a self, vg_name: &'a str) -> impl Iterator<Item = &'a PvRow> + 'a {
        self.pvs.iter().filter(move |pv| pv.is_member_of(vg_name))
    }

    /// PV snapshot with VG fields projected from the owning group
    pub fn snapshot(&self, pv: &PvRow) -> StorageResult<PhysicalVolumeInfo> {
        let vg = match pv.vg_name.as_deref() {
            Some(name) => Some(self.vg(name).ok_or_else(|| {
                StorageError::parse(format!(
                    "{} belongs to volume group {name} which vgs does not report",
                    pv.pv_name
                ))
            })?),
            None => None,
        };

        Ok(PhysicalVolumeInfo::project(
            pv.pv_name.clone(),
            pv.pv_uuid.clone(),
            pv.pe_start,
            vg,
        ))
    }
}

/// Whether a tool diagnostic says a logical volume is still open
pub fn reports_in_use(diagnostic: &str) -> bool {
    let lower = diagnostic.to_ascii_lowercase();
    lower.contains("in use") || lower.contains("open logical volume")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use storage_contracts::StorageErrorKind;

    struct Scripted {
        output: CommandOutput,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl CommandRunner for Scripted {
        fn run(&self, command: &str, args: &[String]) -> StorageResult<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), args.to_vec()));
            Ok(self.output.clone())
        }
    }

    fn tools(output: CommandOutput, config: LvmConfig) -> (Arc<Scripted>, LvmTools) {
        let runner = Arc::new(Scripted {
            output,
            calls: Mutex::new(Vec::new()),
        });
        (runner.clone(), LvmTools::new(runner, config))
    }

    #[test]
    fn prefixes_tool_dir_and_global_config() {
        let config = LvmConfig {
            tool_dir: Some("/usr/sbin".into()),
            global_config: Some("global { use_lvmetad = 0 }".to_string()),
        };
        let (runner, tools) = tools(CommandOutput::success(""), config);

        tools.invoke("pvscan", vec![]).unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, "/usr/sbin/pvscan");
        assert_eq!(calls[0].1, vec!["--config=global { use_lvmetad = 0 }".to_string()]);
    }

    #[test]
    fn missing_tool_dir_is_reported() {
        let config = LvmConfig {
            tool_dir: Some("/nonexistent/lvm/sbin".into()),
            global_config: None,
        };
        let (_, tools) = tools(CommandOutput::success(""), config);

        assert!(!tools.tools_available());
        let error = tools.ensure_tools_available().unwrap_err();
        assert!(matches!(error, SysError::ToolNotFound(ref path) if path == "/nonexistent/lvm/sbin/pvs"));
    }

    #[test]
    fn nonzero_exit_carries_diagnostic() {
        let (_, tools) = tools(
            CommandOutput::failure(5, "  Volume group \"vg9\" not found\n"),
            LvmConfig::default(),
        );

        let error = tools.invoke("vgchange", vec!["-ay".into(), "vg9".into()]).unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::ExternalTool);
        assert!(error.message.contains("exit 5"));
        assert!(error.message.contains("Volume group \"vg9\" not found"));
    }

    #[test]
    fn garbage_report_is_a_parse_error() {
        let (_, tools) = tools(CommandOutput::success("  not\ta\treport\n"), LvmConfig::default());
        assert_eq!(tools.volume_groups().unwrap_err().kind, StorageErrorKind::Parse);
    }

    #[test]
    fn member_without_reported_vg_is_a_parse_error() {
        let topology = Topology {
            pvs: report::parse_pvs("/dev/sda\tu\t1048576\t1\t1\t1\t0\tghost\tg\n").unwrap(),
            vgs: Vec::new(),
        };
        let error = topology.snapshot(&topology.pvs[0]).unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Parse);
    }

    #[test]
    fn recognises_in_use_diagnostics() {
        assert!(reports_in_use("  Logical volume vg0/root in use."));
        assert!(reports_in_use(
            "Can't deactivate volume group \"vg0\" with 1 open logical volume(s)"
        ));
        assert!(!reports_in_use("Volume group \"vg0\" not found"));
    }
}
