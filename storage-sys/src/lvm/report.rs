// SPDX-License-Identifier: GPL-3.0-only

//! Report-mode arguments and parsers for `pvs` / `vgs`

use storage_contracts::{StorageError, StorageResult};
use storage_types::VolumeGroupInfo;

pub const PV_COLUMNS: [&str; 9] = [
    "pv_name",
    "pv_uuid",
    "pe_start",
    "dev_size",
    "pv_size",
    "pv_pe_count",
    "pv_pe_alloc_count",
    "vg_name",
    "vg_uuid",
];

/// Trailing `vg_name,vg_uuid` are empty for orphan PVs and may be cut off.
const PV_REQUIRED_COLUMNS: usize = 7;

pub const VG_COLUMNS: [&str; 9] = [
    "vg_name",
    "vg_uuid",
    "vg_size",
    "vg_free",
    "vg_extent_size",
    "vg_extent_count",
    "vg_free_count",
    "pv_count",
    "lv_count",
];

pub const SEPARATOR: &str = "\t";

/// One `pvs` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvRow {
    pub pv_name: String,
    pub pv_uuid: String,
    pub pe_start: u64,
    pub dev_size: u64,
    pub pv_size: u64,
    pub pe_count: u64,
    pub pe_alloc_count: u64,
    pub vg_name: Option<String>,
    pub vg_uuid: Option<String>,
}

impl PvRow {
    pub fn free_extents(&self) -> u64 {
        self.pe_count.saturating_sub(self.pe_alloc_count)
    }

    pub fn is_member_of(&self, vg_name: &str) -> bool {
        self.vg_name.as_deref() == Some(vg_name)
    }
}

/// Arguments for a report of `columns` in bytes, tab separated, no headings
pub fn report_args(columns: &[&str]) -> Vec<String> {
    vec![
        "--noheadings".to_string(),
        "--units".to_string(),
        "b".to_string(),
        "--nosuffix".to_string(),
        "-o".to_string(),
        columns.join(","),
        "--separator".to_string(),
        SEPARATOR.to_string(),
    ]
}

fn parse_tabbed_line(line: &str) -> Vec<String> {
    line.split('\t')
        .map(|part| part.trim().to_string())
        .collect()
}

/// Split a report row, padding missing optional trailing columns.
fn columns(line: &str, expected: usize, required: usize) -> StorageResult<Vec<String>> {
    let mut cols = parse_tabbed_line(line);
    if cols.len() < required || cols.len() > expected {
        return Err(StorageError::parse(format!(
            "expected {expected} report columns, got {}: {line:?}",
            cols.len()
        )));
    }
    cols.resize(expected, String::new());
    Ok(cols)
}

fn number(value: &str, column: &str, line: &str) -> StorageResult<u64> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| {
        StorageError::parse(format!("column {column} is not a byte count: {value:?} in {line:?}"))
    })
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn report_lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .lines()
        .map(|line| line.trim_start_matches(' '))
        .filter(|line| !line.trim().is_empty())
}

pub fn parse_pvs(output: &str) -> StorageResult<Vec<PvRow>> {
    report_lines(output)
        .map(|line| {
            let cols = columns(line, PV_COLUMNS.len(), PV_REQUIRED_COLUMNS)?;
            if cols[0].is_empty() {
                return Err(StorageError::parse(format!("row without pv_name: {line:?}")));
            }

            let row = PvRow {
                pv_name: cols[0].clone(),
                pv_uuid: cols[1].clone(),
                pe_start: number(&cols[2], PV_COLUMNS[2], line)?,
                dev_size: number(&cols[3], PV_COLUMNS[3], line)?,
                pv_size: number(&cols[4], PV_COLUMNS[4], line)?,
                pe_count: number(&cols[5], PV_COLUMNS[5], line)?,
                pe_alloc_count: number(&cols[6], PV_COLUMNS[6], line)?,
                vg_name: optional(&cols[7]),
                vg_uuid: optional(&cols[8]),
            };

            if row.pe_alloc_count > row.pe_count {
                return Err(StorageError::parse(format!(
                    "{} reports more allocated than total extents",
                    row.pv_name
                )));
            }
            Ok(row)
        })
        .collect()
}

pub fn parse_vgs(output: &str) -> StorageResult<Vec<VolumeGroupInfo>> {
    report_lines(output)
        .map(|line| {
            let cols = columns(line, VG_COLUMNS.len(), VG_COLUMNS.len())?;
            if cols[0].is_empty() {
                return Err(StorageError::parse(format!("row without vg_name: {line:?}")));
            }

            let vg = VolumeGroupInfo {
                name: cols[0].clone(),
                uuid: cols[1].clone(),
                size: number(&cols[2], VG_COLUMNS[2], line)?,
                free: number(&cols[3], VG_COLUMNS[3], line)?,
                extent_size: number(&cols[4], VG_COLUMNS[4], line)?,
                extent_count: number(&cols[5], VG_COLUMNS[5], line)?,
                free_count: number(&cols[6], VG_COLUMNS[6], line)?,
                pv_count: number(&cols[7], VG_COLUMNS[7], line)?,
                lv_count: number(&cols[8], VG_COLUMNS[8], line)?,
            };

            if vg.free_count > vg.extent_count || vg.free > vg.size {
                return Err(StorageError::parse(format!(
                    "volume group {} reports more free than total capacity",
                    vg.name
                )));
            }
            Ok(vg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_contracts::StorageErrorKind;

    #[test]
    fn parses_member_and_orphan_pvs() {
        let output = "  /dev/sda2\tAbc-1\t1048576\t10737418240\t10737418240\t2559\t2000\tvg0\tVg-1\n  /dev/sdb\tDef-2\t1048576\t5368709120\t5368709120\t0\t0\t\t\n";
        let rows = parse_pvs(output).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vg_name.as_deref(), Some("vg0"));
        assert_eq!(rows[0].free_extents(), 559);
        assert_eq!(rows[1].vg_name, None);
        assert_eq!(rows[1].vg_uuid, None);
        assert_eq!(rows[1].pv_size, 5_368_709_120);
    }

    #[test]
    fn pads_truncated_orphan_rows() {
        let rows = parse_pvs("  /dev/sdb\tDef-2\t1048576\t1024\t1024\t0\t0\n").unwrap();
        assert_eq!(rows[0].vg_name, None);
    }

    #[test]
    fn parses_vgs() {
        let vgs = parse_vgs("  vg0\tVg-1\t8388608\t4194304\t4194304\t2\t1\t1\t0\n\n").unwrap();
        assert_eq!(vgs.len(), 1);
        assert_eq!(vgs[0].name, "vg0");
        assert_eq!(vgs[0].extent_size, 4_194_304);
        assert!(vgs[0].is_consistent());
    }

    #[test]
    fn malformed_rows_are_parse_errors() {
        let error = parse_vgs("  vg0\tVg-1\tlots\t0\t4194304\t0\t0\t1\t0\n").unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Parse);

        let error = parse_pvs("  /dev/sdb\tonly-two\n").unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Parse);

        let error = parse_vgs("  vg0\tVg-1\t8\t4\t4\t2\t3\t1\t0\n").unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Parse);
    }

    #[test]
    fn empty_report_has_no_rows() {
        assert!(parse_pvs("").unwrap().is_empty());
        assert!(parse_vgs("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn report_args_request_bytes() {
        let args = report_args(&VG_COLUMNS);
        assert_eq!(args[5], VG_COLUMNS.join(","));
        assert!(args.contains(&"--nosuffix".to_string()));
    }
}
