//! NTFS boot sector parsing.
//!
//! Grounded on `ntfs_fmt.py::boot_sector_fmt`.

use crate::decode::{be_int_signed, le_uint};

/// A parsed (and validated) NTFS boot sector.
#[derive(Debug, Clone)]
pub struct BootSector {
    pub oem_name: String,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub sectors: u64,
    pub mft_addr: u64,
    pub mftmirr_addr: u64,
    /// Raw MFT entry size byte: if positive, the size in clusters; if
    /// negative, `2^|n|` bytes.
    pub mft_entry_size_raw: i8,
    pub idx_size_raw: i8,
}

/// Parses a 512-byte boot sector candidate, validating the OEM signature
/// `"NTFS"` and the `0x55 0xAA` boot signature. Returns `None` if either
/// check fails.
pub fn parse_boot_sector(data: &[u8]) -> Option<BootSector> {
    if data.len() < 512 {
        return None;
    }
    let oem_name_bytes = &data[3..11];
    let oem_name = String::from_utf8_lossy(oem_name_bytes).into_owned();
    if !oem_name.starts_with("NTFS") {
        return None;
    }
    if data[510] != 0x55 || data[511] != 0xAA {
        return None;
    }

    let bytes_per_sector = le_uint(data, 11, 12)? as u16;
    let sectors_per_cluster = le_uint(data, 13, 13)? as u8;
    let sectors = le_uint(data, 40, 47)?;
    let mft_addr = le_uint(data, 48, 55)?;
    let mftmirr_addr = le_uint(data, 56, 63)?;
    let mft_entry_size_raw = be_int_signed(data, 64, 64)? as i8;
    let idx_size_raw = be_int_signed(data, 68, 68)? as i8;

    Some(BootSector {
        oem_name,
        bytes_per_sector,
        sectors_per_cluster,
        sectors,
        mft_addr,
        mftmirr_addr,
        mft_entry_size_raw,
        idx_size_raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boot_sector() -> Vec<u8> {
        let mut data = vec![0u8; 512];
        data[3..11].copy_from_slice(b"NTFS    ");
        data[11..13].copy_from_slice(&512u16.to_le_bytes());
        data[13] = 8;
        data[40..48].copy_from_slice(&1_000_000u64.to_le_bytes());
        data[48..56].copy_from_slice(&4u64.to_le_bytes());
        data[56..64].copy_from_slice(&500_000u64.to_le_bytes());
        data[64] = 0xF6; // -10 -> 2^10 = 1024 bytes per FILE record
        data[68] = 0x01;
        data[510] = 0x55;
        data[511] = 0xAA;
        data
    }

    #[test]
    fn parses_valid_boot_sector() {
        let data = sample_boot_sector();
        let boot = parse_boot_sector(&data).unwrap();
        assert_eq!(boot.sectors_per_cluster, 8);
        assert_eq!(boot.mft_addr, 4);
        assert_eq!(boot.mftmirr_addr, 500_000);
    }

    #[test]
    fn rejects_bad_oem_name() {
        let mut data = sample_boot_sector();
        data[3..11].copy_from_slice(b"FAT32   ");
        assert!(parse_boot_sector(&data).is_none());
    }

    #[test]
    fn rejects_missing_boot_signature() {
        let mut data = sample_boot_sector();
        data[511] = 0x00;
        assert!(parse_boot_sector(&data).is_none());
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(parse_boot_sector(&[0u8; 10]).is_none());
    }
}
