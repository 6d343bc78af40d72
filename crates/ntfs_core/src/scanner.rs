//! Sector classifier and scanner state machine (spec.md §4.2, §4.7).
//!
//! Grounded on `ntfs.py::NTFSScanner.feed`/`DiskScanner`. The scanner never
//! touches the image itself while collecting — it only classifies whatever
//! sector the caller hands it — so `feed` takes the sector bytes directly.
//! Reconstruction (which does need the image, to re-read attributes and
//! follow runlists) happens in [`crate::reconstruct`], invoked from
//! [`Scanner::get_partitions`].

use std::collections::{HashMap, HashSet};

use crate::error::{NtfsError, Result};
use crate::ntfs::parse_boot_sector;
use crate::partition::Partition;
use crate::traits::BlockSource;
use crate::ScanConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerState {
    Collecting,
    Finalized,
}

/// Classifies a single sector and accumulates the positions of interest.
///
/// This is a one-way state machine: once [`Scanner::get_partitions`] has
/// run, further calls to [`Scanner::feed`] return
/// [`NtfsError::AlreadyFinalized`] instead of silently doing nothing.
#[derive(Debug)]
pub struct Scanner {
    state: ScannerState,
    found_file: HashSet<u64>,
    found_indx: HashSet<u64>,
    found_boot: Vec<u64>,
    found_spc: Vec<u8>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            state: ScannerState::Collecting,
            found_file: HashSet::new(),
            found_indx: HashSet::new(),
            found_boot: Vec::new(),
            found_spc: Vec::new(),
        }
    }

    /// Classifies one sector at the given sector index.
    ///
    /// Grounded on `ntfs.py::NTFSScanner.feed`: a boot sector is recognized
    /// by its `0x55 0xAA` trailer plus an `"NTFS"` OEM tag in the first 8
    /// bytes; a FILE record by a `FILE`/`BAAD` signature; an INDX record by
    /// an `INDX` signature. Returns a human-readable label for logging, or
    /// `None` if the sector didn't match anything.
    pub fn feed(&mut self, index: u64, sector: &[u8]) -> Result<Option<&'static str>> {
        if self.state == ScannerState::Finalized {
            return Err(NtfsError::AlreadyFinalized);
        }

        if sector.len() >= 2 && &sector[sector.len() - 2..] == [0x55, 0xAA] {
            let head = &sector[..sector.len().min(8)];
            if head.windows(4).any(|w| w == b"NTFS") {
                self.found_boot.push(index);
                if let Some(boot) = parse_boot_sector(sector) {
                    if !self.found_spc.contains(&boot.sectors_per_cluster) {
                        self.found_spc.push(boot.sectors_per_cluster);
                    }
                }
                return Ok(Some("NTFS boot sector"));
            }
        }

        if sector.starts_with(b"FILE") || sector.starts_with(b"BAAD") {
            self.found_file.insert(index);
            return Ok(Some("NTFS file record"));
        }

        if sector.starts_with(b"INDX") {
            self.found_indx.insert(index);
            return Ok(Some("NTFS index record"));
        }

        Ok(None)
    }

    /// Finalizes collection and runs the full partition reconstruction
    /// pipeline (spec.md §4.5 Steps A-G).
    pub fn get_partitions(
        &mut self,
        image: &mut dyn BlockSource,
        config: &ScanConfig,
    ) -> HashMap<u64, Partition> {
        let partitions = crate::reconstruct::reconstruct(
            &self.found_file,
            &self.found_indx,
            &self.found_boot,
            &self.found_spc,
            image,
            config,
        );
        self.state = ScannerState::Finalized;
        partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_record() {
        let mut scanner = Scanner::new();
        let mut sector = vec![0u8; 512];
        sector[..4].copy_from_slice(b"FILE");
        assert_eq!(scanner.feed(10, &sector).unwrap(), Some("NTFS file record"));
    }

    #[test]
    fn classifies_indx_record() {
        let mut scanner = Scanner::new();
        let mut sector = vec![0u8; 512];
        sector[..4].copy_from_slice(b"INDX");
        assert_eq!(scanner.feed(10, &sector).unwrap(), Some("NTFS index record"));
    }

    #[test]
    fn classifies_boot_sector() {
        let mut scanner = Scanner::new();
        let mut sector = vec![0u8; 512];
        sector[3..8].copy_from_slice(b"NTFS ");
        let len = sector.len();
        sector[len - 2] = 0x55;
        sector[len - 1] = 0xAA;
        assert_eq!(scanner.feed(0, &sector).unwrap(), Some("NTFS boot sector"));
    }

    #[test]
    fn unrecognized_sector_yields_none() {
        let mut scanner = Scanner::new();
        let sector = vec![0u8; 512];
        assert_eq!(scanner.feed(0, &sector).unwrap(), None);
    }

    #[test]
    fn feed_after_finalize_errors() {
        let mut scanner = Scanner::new();
        struct EmptySource;
        impl BlockSource for EmptySource {
            fn read_chunk(&mut self, _offset: u64, buffer: &mut [u8]) -> Result<usize> {
                buffer.fill(0);
                Ok(buffer.len())
            }
            fn size(&self) -> u64 {
                0
            }
        }
        let mut source = EmptySource;
        scanner.get_partitions(&mut source, &ScanConfig::default());
        let sector = vec![0u8; 512];
        assert!(matches!(
            scanner.feed(0, &sector),
            Err(NtfsError::AlreadyFinalized)
        ));
    }
}
