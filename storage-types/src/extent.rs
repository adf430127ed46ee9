// SPDX-License-Identifier: GPL-3.0-only

//! Physical extent arithmetic
//!
//! Pure size/rounding/validation helpers shared by every operation that
//! carves a volume group into extents. Nothing in here performs I/O, so all
//! of it is safe to call from any thread.

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const EIB: u64 = 1024 * 1024 * 1024 * GIB;

/// Smallest physical extent size accepted by `vgcreate -s`
pub const MIN_PE_SIZE: u64 = KIB;

/// Largest physical extent size accepted by `vgcreate -s`
pub const MAX_PE_SIZE: u64 = 16 * GIB;

/// Extent size used when the caller passes `0`
pub const DEFAULT_PE_SIZE: u64 = 4 * MIB;

/// Highest number of extents a single logical volume can address
pub const MAX_EXTENT_COUNT: u64 = 1 << 29;

/// Addressing ceiling for a logical volume (8 EiB)
pub const MAX_LV_SIZE: u64 = MAX_EXTENT_COUNT * MAX_PE_SIZE;

pub const MIN_THPOOL_MD_SIZE: u64 = 2 * MIB;
pub const MAX_THPOOL_MD_SIZE: u64 = 16 * GIB;

pub const MIN_THPOOL_CHUNK_SIZE: u64 = 64 * KIB;
pub const MAX_THPOOL_CHUNK_SIZE: u64 = GIB;

/// Metadata share for a pool whose size does not include the padding yet.
const THPOOL_MD_DIVISOR_NEW: u64 = 5;
/// Metadata share for a pool whose size already includes the padding.
const THPOOL_MD_DIVISOR_EXISTS: u64 = 6;

/// Every power of two from [`MIN_PE_SIZE`] to [`MAX_PE_SIZE`], ascending.
pub const SUPPORTED_PE_SIZES: [u64; 25] = [
    KIB,
    2 * KIB,
    4 * KIB,
    8 * KIB,
    16 * KIB,
    32 * KIB,
    64 * KIB,
    128 * KIB,
    256 * KIB,
    512 * KIB,
    MIB,
    2 * MIB,
    4 * MIB,
    8 * MIB,
    16 * MIB,
    32 * MIB,
    64 * MIB,
    128 * MIB,
    256 * MIB,
    512 * MIB,
    GIB,
    2 * GIB,
    4 * GIB,
    8 * GIB,
    16 * GIB,
];

/// Whether `size` is one of the supported physical extent sizes
pub fn is_supported_pe_size(size: u64) -> bool {
    SUPPORTED_PE_SIZES.binary_search(&size).is_ok()
}

/// Supported physical extent sizes, ascending
pub fn supported_pe_sizes() -> &'static [u64] {
    &SUPPORTED_PE_SIZES
}

/// Maximum logical volume size in bytes
pub fn max_lv_size() -> u64 {
    MAX_LV_SIZE
}

/// Map the "use the default" marker (`0`) to [`DEFAULT_PE_SIZE`]
pub fn resolve_pe_size(pe_size: u64) -> u64 {
    if pe_size == 0 {
        DEFAULT_PE_SIZE
    } else {
        pe_size
    }
}

/// Round `size` to a multiple of `pe_size` (or the default when `0`).
///
/// Rounding up that would overflow `u64` falls back to rounding down.
pub fn round_size_to_pe(size: u64, pe_size: u64, round_up: bool) -> u64 {
    let pe_size = resolve_pe_size(pe_size);
    let delta = size % pe_size;
    if delta == 0 {
        return size;
    }

    if round_up && let Some(rounded) = size.checked_add(pe_size - delta) {
        return rounded;
    }

    size - delta
}

/// Bytes taken on the physical volumes by a logical volume of `lv_size`.
///
/// Mirroring and striping overhead is not accounted for.
pub fn lv_physical_size(lv_size: u64, pe_size: u64) -> u64 {
    round_size_to_pe(lv_size, pe_size, true)
}

/// Padding reserved for thin pool metadata.
///
/// With `included` the padding is carved out of `size` and never exceeds
/// it; otherwise it is extra space needed on top of `size`.
pub fn thin_pool_padding(size: u64, pe_size: u64, included: bool) -> u64 {
    let pe_size = resolve_pe_size(pe_size);
    let divisor = if included {
        THPOOL_MD_DIVISOR_EXISTS
    } else {
        THPOOL_MD_DIVISOR_NEW
    };

    let raw_md_size = size.div_ceil(divisor);
    let padding = round_size_to_pe(raw_md_size, pe_size, true)
        .min(round_size_to_pe(MAX_THPOOL_MD_SIZE, pe_size, true));

    if included {
        padding.min(round_size_to_pe(size, pe_size, false))
    } else {
        padding
    }
}

/// Data capacity left in a pool of `size` once its metadata is carved out
pub fn thin_pool_usable_size(size: u64, pe_size: u64) -> u64 {
    size - thin_pool_padding(size, pe_size, true)
}

pub fn is_valid_thin_pool_metadata_size(size: u64) -> bool {
    (MIN_THPOOL_MD_SIZE..=MAX_THPOOL_MD_SIZE).contains(&size)
}

/// Discard support needs a power-of-two chunk size; otherwise any multiple
/// of 64 KiB in range is accepted.
pub fn is_valid_thin_pool_chunk_size(size: u64, require_discard: bool) -> bool {
    if !(MIN_THPOOL_CHUNK_SIZE..=MAX_THPOOL_CHUNK_SIZE).contains(&size) {
        return false;
    }

    if require_discard {
        size.is_power_of_two()
    } else {
        size % MIN_THPOOL_CHUNK_SIZE == 0
    }
}
