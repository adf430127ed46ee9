// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for LVM storage management
//!
//! This crate defines the single source of truth for physical volume and
//! volume group types, plus the extent arithmetic every sizing decision
//! goes through. These models are used throughout the stack:
//!
//! - **storage-contracts**: Service and collaborator contracts over these types
//! - **storage-sys**: Parses tool reports into these types
//! - **storage-testing**: The fake tool-chain reports state in these shapes
//!
//! ## Architecture
//!
//! - `VolumeGroupInfo` → first-class volume group entity
//! - `PhysicalVolumeInfo` → PV snapshot, VG fields projected from its group
//! - `extent` → pure PE size rules, rounding and thin pool sizing

pub mod common;
pub mod extent;
pub mod lvm;

pub use common::{bytes_to_pretty, pretty_to_bytes};
pub use extent::{
    DEFAULT_PE_SIZE, MAX_LV_SIZE, MAX_PE_SIZE, MIN_PE_SIZE, SUPPORTED_PE_SIZES,
    is_supported_pe_size, is_valid_thin_pool_chunk_size, is_valid_thin_pool_metadata_size,
    lv_physical_size, max_lv_size, resolve_pe_size, round_size_to_pe, supported_pe_sizes,
    thin_pool_padding, thin_pool_usable_size,
};
pub use lvm::{PhysicalVolumeInfo, PvState, VolumeGroupInfo};
