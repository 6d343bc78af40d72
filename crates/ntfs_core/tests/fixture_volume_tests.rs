//! End-to-end coverage over a minimal, hand-built NTFS volume held entirely
//! in memory: no `mkfs.ntfs` image is available in this environment, so the
//! fixture pokes the exact byte offsets pinned in `ntfs::fmt`/`ntfs::record`
//! to synthesize a boot sector and one FILE record (base name, an Alternate
//! Data Stream, and an empty `$MFTMirr` region), then drives it through
//! [`Scanner`]/[`reconstruct`]/[`restore`] the same way `ntfs_cli` does.
//!
//! Grounded on the teacher's own top-level `tests/integration_tests.rs`
//! style: synthetic byte buffers built inline, plain `#[test]` functions.

use ntfs_core::{restore, BlockSource, FileIndex, Result, ScanConfig, Scanner};

const SECTOR: usize = 512;
const IMAGE_SECTORS: u64 = 64;

/// An in-memory `BlockSource` over a flat byte buffer.
struct MemImage(Vec<u8>);

impl BlockSource for MemImage {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        let offset = offset as usize;
        if offset >= self.0.len() {
            return Ok(0);
        }
        let available = &self.0[offset..];
        let n = available.len().min(buffer.len());
        buffer[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.0.len() as u64
    }
}

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect()
}

/// Writes an 8-sectors-per-cluster boot sector at the start of `image`, with
/// `$MFT` one cluster in and `$MFTMirr` four clusters in.
fn write_boot_sector(image: &mut [u8]) {
    let boot = &mut image[0..SECTOR];
    boot[3..11].copy_from_slice(b"NTFS    ");
    put_u16(boot, 11, 512); // bytes_per_sector
    boot[13] = 8; // sectors_per_cluster
    put_u64(boot, 40, IMAGE_SECTORS); // sectors
    put_u64(boot, 48, 1); // mft_addr (clusters)
    put_u64(boot, 56, 4); // mftmirr_addr (clusters)
    boot[510] = 0x55;
    boot[511] = 0xAA;
}

/// Builds one FILE record (MFT entry 6, parented at the root, record 5):
/// a `$FILE_NAME` naming it `hello.txt`, a resident primary `$DATA` stream
/// holding `hello world`, and a resident named `$DATA:secret` Alternate
/// Data Stream holding `topsecret!`.
fn build_file_record() -> Vec<u8> {
    let mut rec = vec![0u8; 1024];
    rec[0..4].copy_from_slice(b"FILE");
    put_u16(&mut rec, 4, 48); // off_fixup
    put_u16(&mut rec, 6, 3); // n_entries
    put_u16(&mut rec, 16, 1); // seq_val
    put_u16(&mut rec, 18, 1); // link_count
    put_u16(&mut rec, 20, 56); // off_first
    put_u16(&mut rec, 22, 0x0001); // flags: in use, not a directory
    put_u32(&mut rec, 24, 251); // size_used
    put_u32(&mut rec, 28, 1024); // size_alloc
    put_u32(&mut rec, 44, 6); // record_n

    // $FILE_NAME, resident, at offset 56.
    let a = 56usize;
    put_u32(&mut rec, a, 0x30);
    put_u32(&mut rec, a + 4, 108); // attribute length
    put_u32(&mut rec, a + 16, 84); // content_size
    put_u16(&mut rec, a + 20, 24); // content_off
    let c = a + 24;
    rec[c] = 5; // parent_entry (6 bytes LE), low byte = 5 (root)
    put_u64(&mut rec, c + 40, 11); // allocated_size
    put_u64(&mut rec, c + 48, 11); // real_size
    rec[c + 64] = 9; // name_length
    rec[c + 65] = 1; // namespace: Win32
    let name = utf16le("hello.txt");
    rec[c + 66..c + 66 + name.len()].copy_from_slice(&name);

    // $DATA, primary stream, resident, right after $FILE_NAME.
    let b = a + 108;
    put_u32(&mut rec, b, 0x80);
    put_u32(&mut rec, b + 4, 35);
    put_u32(&mut rec, b + 16, 11); // content_size
    put_u16(&mut rec, b + 20, 24); // content_off
    let cb = b + 24;
    rec[cb..cb + 11].copy_from_slice(b"hello world");

    // $DATA:secret, named ADS, resident, right after the primary stream.
    let d = b + 35;
    put_u32(&mut rec, d, 0x80);
    put_u32(&mut rec, d + 4, 44);
    rec[d + 9] = 6; // name_length
    put_u16(&mut rec, d + 10, 22); // name_off
    put_u32(&mut rec, d + 16, 10); // content_size
    put_u16(&mut rec, d + 20, 34); // content_off
    let stream_name = utf16le("secret");
    rec[d + 22..d + 22 + stream_name.len()].copy_from_slice(&stream_name);
    rec[d + 34..d + 44].copy_from_slice(b"topsecret!");

    // End-of-attributes marker: type 0xFFFFFFFF, length 0.
    let end = d + 44;
    put_u32(&mut rec, end, 0xFFFF_FFFF);
    put_u32(&mut rec, end + 4, 0);

    rec
}

/// A 64-sector image with a boot sector at sector 0 and the `hello.txt`
/// FILE record at sector 20 (record 6, so `20 - 6*2 == 8 == mft_pos`).
fn build_image() -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SECTORS as usize * SECTOR];
    write_boot_sector(&mut image);
    let record = build_file_record();
    let record_offset = 20 * SECTOR;
    image[record_offset..record_offset + record.len()].copy_from_slice(&record);
    image
}

fn scan(image: Vec<u8>) -> (MemImage, std::collections::HashMap<u64, ntfs_core::Partition>) {
    let mut image = MemImage(image);
    let mut scanner = Scanner::new();
    for sector in 0..IMAGE_SECTORS {
        let start = sector as usize * SECTOR;
        scanner.feed(sector, &image.0[start..start + SECTOR]).unwrap();
    }
    let config = ScanConfig::default();
    let partitions = scanner.get_partitions(&mut image, &config);
    (image, partitions)
}

#[test]
fn reconstructs_intact_volume_with_named_file_and_ads() {
    let (mut image, mut partitions) = scan(build_image());

    assert_eq!(partitions.len(), 1, "expected exactly one rebuilt partition");
    let part = partitions.remove(&0).expect("boot sector pins the partition at offset 0");
    assert!(part.recoverable);
    assert_eq!(part.sec_per_clus, Some(8));
    assert_eq!(part.offset, Some(0));

    assert_eq!(part.full_path(&FileIndex::Record(6)), "Root/hello.txt");
    assert_eq!(
        part.full_path(&FileIndex::Ads(6, "secret".to_string())),
        "Root/hello.txt:secret"
    );

    let config = ScanConfig::default();
    let primary = part.get(&FileIndex::Record(6)).unwrap();
    let mut out = Vec::new();
    let wrote = restore::restore_content(primary, &part, &mut image, &config, &mut out).unwrap();
    assert!(wrote);
    assert_eq!(out.as_slice(), b"hello world");

    let ads = part.get(&FileIndex::Ads(6, "secret".to_string())).unwrap();
    let mut ads_out = Vec::new();
    let wrote = restore::restore_content(ads, &part, &mut image, &config, &mut ads_out).unwrap();
    assert!(wrote);
    assert_eq!(ads_out.as_slice(), b"topsecret!");

    let hits = restore::locate(&part, "hello");
    assert!(hits.iter().any(|(idx, _)| *idx == FileIndex::Record(6)));
}

#[test]
fn partition_survives_boot_sector_loss_as_unrecoverable_but_restorable() {
    let mut image_bytes = build_image();
    // Wipe the boot sector: no OEM tag, no 0x55/0xAA trailer.
    image_bytes[0..SECTOR].fill(0);

    let (mut image, mut partitions) = scan(image_bytes);

    assert_eq!(partitions.len(), 1, "the FILE record alone still yields one bucket");
    let part = partitions.remove(&8).expect("geometry-less partitions fall back to mft_start as their key");
    assert!(!part.recoverable, "no boot sector and no directory geometry to infer from");
    assert_eq!(part.sec_per_clus, None);

    assert_eq!(part.full_path(&FileIndex::Record(6)), "Root/hello.txt");

    // Content restoration for a resident stream needs only the record's own
    // on-disk position, not partition geometry, so it still succeeds.
    let config = ScanConfig::default();
    let primary = part.get(&FileIndex::Record(6)).unwrap();
    let mut out = Vec::new();
    let wrote = restore::restore_content(primary, &part, &mut image, &config, &mut out).unwrap();
    assert!(wrote);
    assert_eq!(out.as_slice(), b"hello world");
}
