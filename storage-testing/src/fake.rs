//! In-memory stand-in for the LVM tool-chain
//!
//! `FakeLvm` answers the same `pvs`/`vgs` report requests and mutating
//! commands the managers issue, keeps PV/VG state in memory and records
//! every invocation in a [`Ledger`]. It never touches a block device.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use storage_contracts::{CommandOutput, CommandRunner, StorageResult};
use storage_types::extent::MIB;

use crate::cmd::{ParsedArgs, command_name};
use crate::ledger::{Invocation, Ledger};

/// Offset of the first extent on every fake PV
pub const FAKE_PE_START: u64 = MIB;

const EXIT_FAILED: i32 = 5;
const EXIT_INVALID: i32 = 3;

#[derive(Debug, Clone)]
struct FakePv {
    uuid: String,
    pv_size: u64,
    pe_count: u64,
    pe_alloc_count: u64,
    vg: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeVg {
    uuid: String,
    extent_size: u64,
    lv_count: u64,
    active: bool,
    busy: bool,
}

#[derive(Debug, Default)]
struct State {
    devices: BTreeMap<String, u64>,
    pvs: BTreeMap<String, FakePv>,
    vgs: BTreeMap<String, FakeVg>,
    failures: VecDeque<(String, CommandOutput)>,
    report_overrides: BTreeMap<String, String>,
}

type Outcome = Result<String, CommandOutput>;

fn fail(message: impl Into<String>) -> Outcome {
    Err(CommandOutput::failure(EXIT_FAILED, format!("  {}\n", message.into())))
}

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_bytes(value: &str) -> Option<u64> {
    value
        .strip_suffix(['b', 'B'])
        .unwrap_or(value)
        .parse()
        .ok()
}

impl State {
    fn members(&self, vg: &str) -> impl Iterator<Item = (&String, &FakePv)> {
        self.pvs
            .iter()
            .filter(move |(_, pv)| pv.vg.as_deref() == Some(vg))
    }

    fn vg_totals(&self, vg: &str) -> (u64, u64, u64) {
        self.members(vg).fold((0, 0, 0), |(count, free, pvs), (_, pv)| {
            (
                count + pv.pe_count,
                free + pv.pe_count - pv.pe_alloc_count,
                pvs + 1,
            )
        })
    }

    fn extents_for(pv_size: u64, extent_size: u64) -> u64 {
        pv_size.saturating_sub(FAKE_PE_START) / extent_size
    }

    fn report(&self, command: &str, args: &ParsedArgs) -> Outcome {
        if let Some(stdout) = self.report_overrides.get(command) {
            return Ok(stdout.clone());
        }

        let columns: Vec<&str> = args.value("-o").unwrap_or_default().split(',').collect();
        let separator = args.value("--separator").unwrap_or(" ");
        let rows: Vec<Vec<String>> = match command {
            "pvs" => self
                .pvs
                .iter()
                .map(|(name, pv)| {
                    columns
                        .iter()
                        .map(|column| self.pv_column(name, pv, column))
                        .collect::<Result<_, _>>()
                })
                .collect::<Result<_, _>>()?,
            _ => self
                .vgs
                .iter()
                .map(|(name, vg)| {
                    columns
                        .iter()
                        .map(|column| self.vg_column(name, vg, column))
                        .collect::<Result<_, _>>()
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(rows
            .into_iter()
            .map(|row| format!("  {}\n", row.join(separator)))
            .collect())
    }

    fn pv_column(&self, name: &str, pv: &FakePv, column: &str) -> Result<String, CommandOutput> {
        let vg = pv.vg.as_deref().and_then(|vg| self.vgs.get(vg));
        Ok(match column {
            "pv_name" => name.to_string(),
            "pv_uuid" => pv.uuid.clone(),
            "pe_start" => FAKE_PE_START.to_string(),
            "dev_size" => self.devices.get(name).copied().unwrap_or(0).to_string(),
            "pv_size" => pv.pv_size.to_string(),
            "pv_pe_count" => pv.pe_count.to_string(),
            "pv_pe_alloc_count" => pv.pe_alloc_count.to_string(),
            "vg_name" => pv.vg.clone().unwrap_or_default(),
            "vg_uuid" => vg.map(|vg| vg.uuid.clone()).unwrap_or_default(),
            other => return Err(unknown_field(other)),
        })
    }

    fn vg_column(&self, name: &str, vg: &FakeVg, column: &str) -> Result<String, CommandOutput> {
        let (extent_count, free_count, pv_count) = self.vg_totals(name);
        Ok(match column {
            "vg_name" => name.to_string(),
            "vg_uuid" => vg.uuid.clone(),
            "vg_size" => (extent_count * vg.extent_size).to_string(),
            "vg_free" => (free_count * vg.extent_size).to_string(),
            "vg_extent_size" => vg.extent_size.to_string(),
            "vg_extent_count" => extent_count.to_string(),
            "vg_free_count" => free_count.to_string(),
            "pv_count" => pv_count.to_string(),
            "lv_count" => vg.lv_count.to_string(),
            other => return Err(unknown_field(other)),
        })
    }

    fn pvcreate(&mut self, args: &ParsedArgs) -> Outcome {
        for device in &args.operands {
            let Some(size) = self.devices.get(device).copied() else {
                return fail(format!("No device found for {device}."));
            };
            if self.pvs.contains_key(device) {
                return fail(format!("Physical volume '{device}' is already initialized."));
            }
            self.pvs.insert(
                device.clone(),
                FakePv {
                    uuid: uuid(),
                    pv_size: size,
                    pe_count: 0,
                    pe_alloc_count: 0,
                    vg: None,
                },
            );
        }
        Ok(String::new())
    }

    fn pvresize(&mut self, args: &ParsedArgs) -> Outcome {
        let Some(device) = args.operands.last() else {
            return fail("Please supply physical volume(s)");
        };
        let Some(device_size) = self.devices.get(device).copied() else {
            return fail(format!("Failed to find physical volume \"{device}\"."));
        };
        let new_size = match args.value("--setphysicalvolumesize") {
            Some(value) => match parse_bytes(value) {
                Some(size) => size,
                None => return fail(format!("Invalid argument for --setphysicalvolumesize: {value}")),
            },
            None => device_size,
        };

        let extent_size = self
            .pvs
            .get(device)
            .and_then(|pv| pv.vg.as_deref())
            .and_then(|vg| self.vgs.get(vg))
            .map(|vg| vg.extent_size);

        let Some(pv) = self.pvs.get_mut(device) else {
            return fail(format!("Failed to find physical volume \"{device}\"."));
        };
        if let Some(extent_size) = extent_size {
            let pe_count = Self::extents_for(new_size, extent_size);
            if pe_count < pv.pe_alloc_count {
                return fail(format!(
                    "{device}: cannot resize to {pe_count} extents as later ones are allocated."
                ));
            }
            pv.pe_count = pe_count;
        }
        pv.pv_size = new_size;
        Ok(format!("  Physical volume \"{device}\" changed\n"))
    }

    fn pvremove(&mut self, args: &ParsedArgs) -> Outcome {
        for device in &args.operands {
            match self.pvs.get(device).map(|pv| pv.vg.clone()) {
                None => return fail(format!("No PV found on device {device}.")),
                Some(Some(vg)) => {
                    return fail(format!(
                        "PV {device} is used by VG {vg} so please use vgreduce first."
                    ));
                }
                Some(None) => {
                    self.pvs.remove(device);
                }
            }
        }
        Ok(String::new())
    }

    fn pvmove(&mut self, args: &ParsedArgs) -> Outcome {
        let Some(src) = args.operands.first().cloned() else {
            return fail("Please enter a physical volume path.");
        };
        let Some(source) = self.pvs.get(&src).cloned() else {
            return fail(format!("Failed to find physical volume \"{src}\"."));
        };
        let Some(vg) = source.vg.clone() else {
            return fail(format!("Physical volume {src} not in a volume group."));
        };
        if source.pe_alloc_count == 0 {
            return fail(format!("No data to move for {vg}."));
        }

        let mut remaining = source.pe_alloc_count;
        let targets: Vec<String> = match args.operands.get(1) {
            Some(dest) => vec![dest.clone()],
            None => self
                .members(&vg)
                .filter(|(name, _)| **name != src)
                .map(|(name, _)| name.clone())
                .collect(),
        };
        let available: u64 = targets
            .iter()
            .filter_map(|name| self.pvs.get(name))
            .filter(|pv| pv.vg.as_deref() == Some(vg.as_str()))
            .map(|pv| pv.pe_count - pv.pe_alloc_count)
            .sum();
        if available < remaining {
            return fail(format!(
                "Insufficient free space: {remaining} extents needed, but only {available} available"
            ));
        }

        for name in targets {
            let Some(target) = self.pvs.get_mut(&name) else {
                continue;
            };
            let taken = remaining.min(target.pe_count - target.pe_alloc_count);
            target.pe_alloc_count += taken;
            remaining -= taken;
        }
        if let Some(source) = self.pvs.get_mut(&src) {
            source.pe_alloc_count = 0;
        }
        Ok(format!("  {src}: Moved: 100.00%\n"))
    }

    fn vgcreate(&mut self, args: &ParsedArgs) -> Outcome {
        let extent_size = match args.value("-s") {
            Some(value) => match parse_bytes(value) {
                Some(size) if size > 0 => size,
                _ => return fail(format!("Invalid argument for --physicalextentsize: {value}")),
            },
            None => 4 * MIB,
        };
        let Some((name, devices)) = args.operands.split_first() else {
            return fail("Please provide volume group name and physical volumes");
        };
        if devices.is_empty() {
            return fail("Please enter physical volume name(s)");
        }
        if self.vgs.contains_key(name) {
            return fail(format!("A volume group called {name} already exists."));
        }
        for device in devices {
            match self.pvs.get(device) {
                None => return fail(format!("Device {device} not found.")),
                Some(FakePv { vg: Some(owner), .. }) => {
                    return fail(format!(
                        "Physical volume '{device}' is already in volume group '{owner}'"
                    ));
                }
                Some(_) => {}
            }
        }

        for device in devices {
            if let Some(pv) = self.pvs.get_mut(device) {
                pv.vg = Some(name.clone());
                pv.pe_count = Self::extents_for(pv.pv_size, extent_size);
                pv.pe_alloc_count = 0;
            }
        }
        self.vgs.insert(
            name.clone(),
            FakeVg {
                uuid: uuid(),
                extent_size,
                lv_count: 0,
                active: false,
                busy: false,
            },
        );
        Ok(format!("  Volume group \"{name}\" successfully created\n"))
    }

    fn vgremove(&mut self, args: &ParsedArgs) -> Outcome {
        let force = args.has("--force") || args.has("-f");
        for name in &args.operands {
            let Some(vg) = self.vgs.get(name) else {
                return fail(format!("Volume group \"{name}\" not found"));
            };
            if vg.lv_count > 0 && !force {
                return fail(format!(
                    "Volume group \"{name}\" still contains {} logical volume(s)",
                    vg.lv_count
                ));
            }
            self.vgs.remove(name);
            for pv in self.pvs.values_mut() {
                if pv.vg.as_deref() == Some(name.as_str()) {
                    pv.vg = None;
                    pv.pe_count = 0;
                    pv.pe_alloc_count = 0;
                }
            }
        }
        Ok(String::new())
    }

    fn vgchange(&mut self, args: &ParsedArgs) -> Outcome {
        let activate = if args.has("-ay") {
            true
        } else if args.has("-an") {
            false
        } else {
            return fail("Need one or more command options.");
        };

        for name in &args.operands {
            let Some(vg) = self.vgs.get_mut(name) else {
                return fail(format!("Volume group \"{name}\" not found"));
            };
            if !activate && vg.busy {
                return fail(format!(
                    "Logical volume {name}/lvol0 in use.\n  Can't deactivate volume group \"{name}\" with 1 open logical volume(s)"
                ));
            }
            vg.active = activate;
        }
        Ok(String::new())
    }

    fn vgextend(&mut self, args: &ParsedArgs) -> Outcome {
        let Some((name, devices)) = args.operands.split_first() else {
            return fail("Please enter volume group name and physical volume(s)");
        };
        let Some(extent_size) = self.vgs.get(name).map(|vg| vg.extent_size) else {
            return fail(format!("Volume group \"{name}\" not found"));
        };
        for device in devices {
            match self.pvs.get(device) {
                None => return fail(format!("Device {device} not found.")),
                Some(FakePv { vg: Some(owner), .. }) => {
                    return fail(format!(
                        "Physical volume '{device}' is already in volume group '{owner}'"
                    ));
                }
                Some(_) => {}
            }
        }
        for device in devices {
            if let Some(pv) = self.pvs.get_mut(device) {
                pv.vg = Some(name.clone());
                pv.pe_count = Self::extents_for(pv.pv_size, extent_size);
                pv.pe_alloc_count = 0;
            }
        }
        Ok(format!("  Volume group \"{name}\" successfully extended\n"))
    }

    fn vgreduce(&mut self, args: &ParsedArgs) -> Outcome {
        let Some((name, devices)) = args.operands.split_first() else {
            return fail("Please enter volume group name and physical volume(s)");
        };
        if !self.vgs.contains_key(name) {
            return fail(format!("Volume group \"{name}\" not found"));
        }
        for device in devices {
            let Some(pv) = self.pvs.get_mut(device) else {
                return fail(format!("Device {device} not found."));
            };
            if pv.vg.as_deref() != Some(name.as_str()) {
                return fail(format!("Physical Volume \"{device}\" not found in Volume Group \"{name}\"."));
            }
            if pv.pe_alloc_count > 0 {
                return fail(format!("Physical volume \"{device}\" still in use"));
            }
            pv.vg = None;
            pv.pe_count = 0;
        }
        Ok(format!("  Removed \"{}\" from volume group \"{name}\"\n", devices.join("\", \"")))
    }

    fn allocate(&mut self, vg: &str, mut extents: u64) -> Result<(), String> {
        let (_, free, _) = self.vg_totals(vg);
        if free < extents {
            return Err(format!("volume group {vg} has {free} free extents, {extents} requested"));
        }
        for pv in self.pvs.values_mut() {
            if pv.vg.as_deref() != Some(vg) {
                continue;
            }
            let taken = extents.min(pv.pe_count - pv.pe_alloc_count);
            pv.pe_alloc_count += taken;
            extents -= taken;
        }
        Ok(())
    }
}

fn unknown_field(column: &str) -> CommandOutput {
    CommandOutput::failure(EXIT_INVALID, format!("  Unrecognised field: {column}\n"))
}

/// In-memory LVM tool-chain implementing [`CommandRunner`]
#[derive(Debug, Default)]
pub struct FakeLvm {
    state: Mutex<State>,
    ledger: Ledger,
}

impl FakeLvm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw block device of `size` bytes
    pub fn with_device(self, path: &str, size: u64) -> Self {
        self.add_device(path, size);
        self
    }

    pub fn add_device(&self, path: &str, size: u64) {
        self.lock().devices.insert(path.to_string(), size);
    }

    /// Grow or shrink the backing device without touching PV metadata
    pub fn set_device_size(&self, path: &str, size: u64) {
        self.lock().devices.insert(path.to_string(), size);
    }

    /// Allocate `extents` for a new logical volume in `vg`, spread over its PVs
    pub fn add_logical_volume(&self, vg: &str, extents: u64) -> Result<(), String> {
        let mut state = self.lock();
        if !state.vgs.contains_key(vg) {
            return Err(format!("volume group {vg} not found"));
        }
        state.allocate(vg, extents)?;
        if let Some(group) = state.vgs.get_mut(vg) {
            group.lv_count += 1;
        }
        Ok(())
    }

    /// Simulate a mounted logical volume that blocks deactivation
    pub fn set_busy(&self, vg: &str, busy: bool) {
        if let Some(group) = self.lock().vgs.get_mut(vg) {
            group.busy = busy;
        }
    }

    pub fn is_active(&self, vg: &str) -> Option<bool> {
        self.lock().vgs.get(vg).map(|group| group.active)
    }

    pub fn has_volume_group(&self, vg: &str) -> bool {
        self.lock().vgs.contains_key(vg)
    }

    /// Make the next invocation of `command` exit with `exit_code`
    pub fn fail_next(&self, command: &str, exit_code: i32, stderr: &str) {
        self.lock().failures.push_back((
            command.to_string(),
            CommandOutput::failure(exit_code, stderr),
        ));
    }

    /// Answer every `command` report with `stdout` verbatim
    pub fn override_report(&self, command: &str, stdout: &str) {
        self.lock()
            .report_overrides
            .insert(command.to_string(), stdout.to_string());
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn execute(&self, command: &str, args: &ParsedArgs) -> Outcome {
        let mut state = self.lock();
        if let Some(index) = state.failures.iter().position(|(name, _)| name == command)
            && let Some((_, output)) = state.failures.remove(index)
        {
            return Err(output);
        }

        match command {
            "pvs" | "vgs" => state.report(command, args),
            "pvscan" => Ok(format!("  Total: {} [PVs]\n", state.pvs.len())),
            "pvcreate" => state.pvcreate(args),
            "pvresize" => state.pvresize(args),
            "pvremove" => state.pvremove(args),
            "pvmove" => state.pvmove(args),
            "vgcreate" => state.vgcreate(args),
            "vgremove" => state.vgremove(args),
            "vgchange" => state.vgchange(args),
            "vgextend" => state.vgextend(args),
            "vgreduce" => state.vgreduce(args),
            other => Err(CommandOutput::failure(
                EXIT_INVALID,
                format!("  {other}: command not found\n"),
            )),
        }
    }
}

impl CommandRunner for FakeLvm {
    fn run(&self, command: &str, args: &[String]) -> StorageResult<CommandOutput> {
        self.ledger.record(Invocation {
            program: command.to_string(),
            args: args.to_vec(),
        });

        let parsed = ParsedArgs::parse(args);
        Ok(match self.execute(command_name(command), &parsed) {
            Ok(stdout) => CommandOutput::success(stdout),
            Err(output) => output,
        })
    }
}
