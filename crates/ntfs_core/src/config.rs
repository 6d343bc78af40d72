//! Tunable constants for the scan/reconstruct pipeline.
//!
//! Grounded on `constants.py` (`sector_size`, `max_sectors`) plus the
//! geometry-inference support threshold named in spec.md §4.5 Step E.

/// Sector size in bytes. Hard-coded per spec.md §6 ("Sector size is 512
/// bytes (hard-coded)").
pub const SECTOR_SIZE: u64 = 512;

/// Size, in sectors, of a FILE record (MFT entry): 2 * 512 = 1024 bytes.
pub const FILE_RECORD_SECTORS: u64 = 2;

/// Size, in sectors, of an INDX record: 8 * 512 = 4096 bytes.
pub const INDX_RECORD_SECTORS: u64 = 8;

/// Caps any single content read to bound memory use (spec.md §5).
pub const DEFAULT_MAX_SECTORS: u64 = 1024;

/// Minimum support threshold used to seed Step E's approximate matcher.
pub const DEFAULT_MIN_SUPPORT: u32 = 2;

/// Early-exit thresholds for Step E (spec.md §4.5): once a candidate's
/// match quality crosses these, stop trying further `sec_per_clus` values.
pub const GEOMETRY_EARLY_EXIT_PERCENTAGE: f64 = 0.25;
pub const GEOMETRY_EARLY_EXIT_SUPPORT: u32 = 256;

/// Runtime configuration for a scan/reconstruction pass.
///
/// Grounded on `ValidationConfig`'s builder-style config shape in the
/// example pack (`recovery/validator.rs`).
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Cap, in sectors, on any single read issued while restoring content
    /// or re-reading attribute-list/INDX fragments.
    pub max_sectors: u64,
    /// Minimum Baeza-Yates-Perleberg support passed into the first geometry
    /// inference attempt for a partition.
    pub min_support: u32,
    /// Whether independent partitions may be finalized (Steps E-G) in
    /// parallel via `rayon`. Spec.md §5 explicitly allows, but does not
    /// require, this.
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_sectors: DEFAULT_MAX_SECTORS,
            min_support: DEFAULT_MIN_SUPPORT,
            parallel: true,
        }
    }
}
