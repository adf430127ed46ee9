// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use storage_contracts::{PhysicalVolumeOps, VolumeGroupOps};
use storage_sys::{LvmConfig, LvmTools, SystemCommandRunner, system_managers};
use storage_types::{
    PhysicalVolumeInfo, VolumeGroupInfo, bytes_to_pretty, extent, pretty_to_bytes,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "storage-lvm")]
#[command(about = "Manage LVM physical volumes and volume groups")]
struct Args {
    /// TOML configuration file (overrides $STORAGE_LVM_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Physical volume operations
    #[command(subcommand)]
    Pv(PvCommand),
    /// Volume group operations
    #[command(subcommand)]
    Vg(VgCommand),
    /// Extent size arithmetic, no tools are invoked
    #[command(subcommand)]
    Extent(ExtentCommand),
}

#[derive(Debug, Subcommand)]
enum PvCommand {
    Create { device: String },
    /// Resize to SIZE (e.g. "10 GB"), or to the device size when omitted
    Resize { device: String, size: Option<String> },
    Remove { device: String },
    /// Move allocated extents off SRC, to DEST when given
    Move { src: String, dest: Option<String> },
    Scan {
        device: String,
        #[arg(long)]
        cache: bool,
    },
    Info { device: String },
    List,
    State { device: String },
}

#[derive(Debug, Subcommand)]
enum VgCommand {
    Create {
        name: String,
        #[arg(required = true)]
        pvs: Vec<String>,
        /// Physical extent size (e.g. "4 MB"); LVM default when omitted
        #[arg(long)]
        pe_size: Option<String>,
    },
    Remove { name: String },
    Activate { name: String },
    Deactivate { name: String },
    Extend { name: String, device: String },
    Reduce { name: String, device: String },
    Info { name: String },
    List,
}

#[derive(Debug, Subcommand)]
enum ExtentCommand {
    /// Round SIZE to a multiple of the extent size
    Round {
        size: String,
        #[arg(long)]
        pe_size: Option<String>,
        #[arg(long)]
        down: bool,
    },
    /// Metadata padding and usable data size of a thin pool
    ThinPool {
        size: String,
        #[arg(long)]
        pe_size: Option<String>,
    },
    /// List supported extent sizes
    Sizes,
}

#[derive(Debug, Serialize)]
struct ThinPoolReport {
    size: u64,
    padding: u64,
    usable: u64,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storage_sys=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Extent(command) => run_extent(command, args.json),
        Command::Pv(command) => {
            let config = load_config(args.config.as_ref())?;
            run_pv(config, command, args.json)
        }
        Command::Vg(command) => {
            let config = load_config(args.config.as_ref())?;
            run_vg(config, command, args.json)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<LvmConfig> {
    let config = match path {
        Some(path) => LvmConfig::load_from(path)?,
        None => LvmConfig::load()?,
    };
    LvmTools::new(Arc::new(SystemCommandRunner), config.clone()).ensure_tools_available()?;
    Ok(config)
}

fn parse_size(raw: &str) -> Result<u64> {
    pretty_to_bytes(raw).with_context(|| format!("invalid size '{raw}'"))
}

fn parse_pe_size(raw: Option<&String>) -> Result<u64> {
    raw.map_or(Ok(0), |raw| parse_size(raw))
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn describe_pv(pv: &PhysicalVolumeInfo) -> String {
    match &pv.vg_name {
        Some(vg_name) => format!(
            "{}\t{}\tvg={}\tfree={}/{} extents",
            pv.pv_name, pv.pv_uuid, vg_name, pv.vg_free_count, pv.vg_extent_count
        ),
        None => format!("{}\t{}\tunassigned", pv.pv_name, pv.pv_uuid),
    }
}

fn describe_vg(vg: &VolumeGroupInfo) -> String {
    format!(
        "{}\t{}\tsize={}\tfree={}\tpvs={}\tlvs={}\tused={}%",
        vg.name,
        vg.uuid,
        bytes_to_pretty(&vg.size, false),
        bytes_to_pretty(&vg.free, false),
        vg.pv_count,
        vg.lv_count,
        vg.usage_percent()
    )
}

fn run_pv(config: LvmConfig, command: PvCommand, json: bool) -> Result<()> {
    let (pvs, _) = system_managers(config);

    match command {
        PvCommand::Create { device } => pvs.create(&device)?,
        PvCommand::Resize { device, size } => {
            let size = size.as_deref().map_or(Ok(0), parse_size)?;
            pvs.resize(&device, size)?;
        }
        PvCommand::Remove { device } => pvs.remove(&device)?,
        PvCommand::Move { src, dest } => pvs.move_extents(&src, dest.as_deref())?,
        PvCommand::Scan { device, cache } => pvs.scan(&device, cache)?,
        PvCommand::Info { device } => {
            let info = pvs.info(Some(&device))?;
            emit(json, &info, describe_pv)?;
        }
        PvCommand::List => {
            let list = pvs.list()?;
            emit(json, &list, |list| {
                list.iter().map(describe_pv).collect::<Vec<_>>().join("\n")
            })?;
        }
        PvCommand::State { device } => {
            let state = pvs.state(&device)?;
            emit(json, &state, |state| format!("{state:?}"))?;
        }
    }
    Ok(())
}

fn run_vg(config: LvmConfig, command: VgCommand, json: bool) -> Result<()> {
    let (_, vgs) = system_managers(config);

    match command {
        VgCommand::Create { name, pvs, pe_size } => {
            vgs.create(&name, &pvs, parse_pe_size(pe_size.as_ref())?)?;
        }
        VgCommand::Remove { name } => vgs.remove(&name)?,
        VgCommand::Activate { name } => vgs.activate(&name)?,
        VgCommand::Deactivate { name } => vgs.deactivate(&name)?,
        VgCommand::Extend { name, device } => vgs.extend(&name, &device)?,
        VgCommand::Reduce { name, device } => vgs.reduce(&name, &device)?,
        VgCommand::Info { name } => {
            let info = vgs.info(&name)?;
            emit(json, &info, describe_vg)?;
        }
        VgCommand::List => {
            let list = vgs.list()?;
            emit(json, &list, |list| {
                list.iter().map(describe_vg).collect::<Vec<_>>().join("\n")
            })?;
        }
    }
    Ok(())
}

fn run_extent(command: ExtentCommand, json: bool) -> Result<()> {
    match command {
        ExtentCommand::Round {
            size,
            pe_size,
            down,
        } => {
            let size = parse_size(&size)?;
            let pe_size = extent::resolve_pe_size(parse_pe_size(pe_size.as_ref())?);
            let rounded = extent::round_size_to_pe(size, pe_size, !down);
            emit(json, &rounded, |rounded| bytes_to_pretty(rounded, true))
        }
        ExtentCommand::ThinPool { size, pe_size } => {
            let size = parse_size(&size)?;
            let pe_size = extent::resolve_pe_size(parse_pe_size(pe_size.as_ref())?);
            let report = ThinPoolReport {
                size,
                padding: extent::thin_pool_padding(size, pe_size, true),
                usable: extent::thin_pool_usable_size(size, pe_size),
            };
            emit(json, &report, |report| {
                format!(
                    "padding={}\nusable={}",
                    bytes_to_pretty(&report.padding, true),
                    bytes_to_pretty(&report.usable, true)
                )
            })
        }
        ExtentCommand::Sizes => {
            let sizes = extent::supported_pe_sizes();
            emit(json, &sizes, |sizes| {
                sizes
                    .iter()
                    .map(|size| bytes_to_pretty(size, false))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
    }
}
