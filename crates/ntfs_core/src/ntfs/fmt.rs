//! NTFS on-disk format constants and small pure conversions.
//!
//! Byte offsets below are pinned from `ntfs_fmt.py` (see `SPEC_FULL.md` §4.3
//! "(PINNED, from `ntfs_fmt.py`)").

use chrono::{DateTime, TimeZone, Utc};

/// Size in sectors of a FILE record (MFT entry).
pub const FILE_RECORD_SECTORS: u64 = 2;
/// Size in sectors of an INDX record.
pub const INDX_RECORD_SECTORS: u64 = 8;

pub const ATTR_STANDARD_INFORMATION: u32 = 0x10;
pub const ATTR_ATTRIBUTE_LIST: u32 = 0x20;
pub const ATTR_FILE_NAME: u32 = 0x30;
pub const ATTR_SECURITY_DESCRIPTOR: u32 = 0x50;
pub const ATTR_VOLUME_NAME: u32 = 0x60;
pub const ATTR_VOLUME_INFORMATION: u32 = 0x70;
pub const ATTR_DATA: u32 = 0x80;
pub const ATTR_INDEX_ROOT: u32 = 0x90;
pub const ATTR_INDEX_ALLOCATION: u32 = 0xA0;
pub const ATTR_BITMAP: u32 = 0xB0;

/// Name for every attribute type code this parser understands.
pub fn attribute_name(code: u32) -> Option<&'static str> {
    Some(match code {
        ATTR_STANDARD_INFORMATION => "$STANDARD_INFORMATION",
        ATTR_ATTRIBUTE_LIST => "$ATTRIBUTE_LIST",
        ATTR_FILE_NAME => "$FILE_NAME",
        ATTR_SECURITY_DESCRIPTOR => "$SECURITY_DESCRIPTOR",
        ATTR_VOLUME_NAME => "$VOLUME_NAME",
        ATTR_VOLUME_INFORMATION => "$VOLUME_INFORMATION",
        ATTR_DATA => "$DATA",
        ATTR_INDEX_ROOT => "$INDEX_ROOT",
        ATTR_INDEX_ALLOCATION => "$INDEX_ALLOCATION",
        ATTR_BITMAP => "$BITMAP",
        _ => return None,
    })
}

/// Attribute types that may legally repeat within a single FILE record
/// (spec.md's `multiple_attributes` set).
pub fn allows_multiple(name: &str) -> bool {
    matches!(
        name,
        "$FILE_NAME" | "$DATA" | "$INDEX_ROOT" | "$INDEX_ALLOCATION" | "$BITMAP"
    )
}

/// Converts a raw little-endian 100ns-tick Windows filetime into a UTC
/// timestamp, returning `None` if it falls outside the representable
/// range. Grounded on `ntfs_fmt.py::windows_time`.
pub fn windows_time(raw_ticks: u64) -> Option<DateTime<Utc>> {
    // Windows epoch (1601-01-01) to Unix epoch (1970-01-01) in seconds.
    const EPOCH_DIFF_SECONDS: i64 = 11_644_473_600;
    let ticks = raw_ticks as i64;
    let unix_seconds = ticks / 10_000_000 - EPOCH_DIFF_SECONDS;
    let remainder_ticks = ticks % 10_000_000;
    let nanos = (remainder_ticks * 100).clamp(0, 999_999_999) as u32;
    match Utc.timestamp_opt(unix_seconds, nanos) {
        chrono::LocalResult::Single(dt) => Some(dt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_name_resolves_known_codes() {
        assert_eq!(attribute_name(0x30), Some("$FILE_NAME"));
        assert_eq!(attribute_name(0x80), Some("$DATA"));
        assert_eq!(attribute_name(0xFF), None);
    }

    #[test]
    fn allows_multiple_matches_spec_set() {
        assert!(allows_multiple("$DATA"));
        assert!(allows_multiple("$BITMAP"));
        assert!(!allows_multiple("$STANDARD_INFORMATION"));
    }

    #[test]
    fn windows_time_decodes_known_epoch() {
        // 1601-01-01 00:00:00 UTC in raw ticks is 0.
        let epoch = windows_time(0).unwrap();
        assert_eq!(epoch.timestamp(), -11_644_473_600);
    }

    #[test]
    fn windows_time_decodes_recent_date() {
        // 2021-01-01 00:00:00 UTC
        let unix_seconds: i64 = 1_609_459_200;
        let ticks = ((unix_seconds + 11_644_473_600) as u64) * 10_000_000;
        let dt = windows_time(ticks).unwrap();
        assert_eq!(dt.timestamp(), unix_seconds);
    }
}
