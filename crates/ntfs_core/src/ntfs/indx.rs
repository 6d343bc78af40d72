//! Standalone INDX record parsing (directory index allocation units).
//!
//! Grounded on `ntfs.py::parse_indx_record`. An INDX record is a full
//! `INDX_RECORD_SECTORS`-sector unit (distinct from a `$INDEX_ROOT`
//! attribute's small inline index, see `ntfs::record::parse_index_root`).

use super::record::{parse_file_name_content, FileNameAttr};
use super::runlist;
use crate::decode::le_uint;

/// One directory entry found inside a standalone INDX record.
#[derive(Debug, Clone)]
pub struct IndxDirEntry {
    pub record_n: u64,
    pub entry_length: u32,
    pub content_length: u32,
    pub flags: u32,
    pub file_info: FileNameAttr,
}

/// A parsed INDX record.
#[derive(Debug, Clone)]
pub struct IndxRecord {
    pub off_fixup: u16,
    pub n_entries: u16,
    pub off_start_list: u32,
    pub off_end_list: u32,
    pub off_end_buffer: u32,
    pub flags: u32,
    pub entries: Vec<IndxDirEntry>,
    pub valid: bool,
}

/// Applies fixups and parses an INDX record's directory entries.
///
/// Acceptance of each candidate entry requires all four checks the original
/// uses to reject false positives in slack space: a decodable, non-empty
/// name; a namespace code in `0..=3`; `real_size <= allocated_size`; and not
/// simultaneously `flags == 0` and `parent_seq > 1024` (a combination real
/// entries never exhibit). The scan stops entirely — not just this entry —
/// the first time a candidate fails any of them.
pub fn parse_indx_record(entry: &[u8]) -> IndxRecord {
    let off_fixup = le_uint(entry, 4, 5).unwrap_or(0) as u16;
    let n_entries = le_uint(entry, 6, 7).unwrap_or(0) as u16;

    let mut entry = entry.to_vec();
    super::record::apply_fixup(&mut entry, off_fixup as usize, n_entries);

    let header_base = 24usize;
    let off_start_list =
        le_uint(&entry[header_base..], 0, 3).unwrap_or(0) as u32 + header_base as u32;
    let off_end_list =
        le_uint(&entry[header_base..], 4, 7).unwrap_or(0) as u32 + header_base as u32;
    let off_end_buffer =
        le_uint(&entry[header_base..], 8, 11).unwrap_or(0) as u32 + header_base as u32;
    let flags = le_uint(&entry[header_base..], 12, 15).unwrap_or(0) as u32;

    let mut offset = off_start_list as usize;
    let mut entries = Vec::new();
    while (offset as u32) < off_end_list && offset < entry.len() {
        let rest = &entry[offset..];
        let Some(entry_length) = le_uint(rest, 8, 9) else {
            break;
        };
        let entry_length = entry_length as u32;
        let content_length = le_uint(rest, 10, 11).unwrap_or(0) as u32;
        let flags_entry = le_uint(rest, 12, 15).unwrap_or(0) as u32;
        let record_n = le_uint(rest, 0, 3).unwrap_or(0);

        if content_length != 0 {
            let file_info = rest.get(16..).and_then(parse_file_name_content);
            let accepted = match &file_info {
                Some(info) => {
                    let name_ok = info.name.as_deref().is_some_and(|n| !n.is_empty());
                    let namespace_ok = info.namespace <= 3;
                    let size_ok = info.real_size <= info.allocated_size;
                    let features_ok = !(info.flags == 0 && info.parent_seq > 1024);
                    name_ok && namespace_ok && size_ok && features_ok
                }
                None => false,
            };
            if !accepted {
                break;
            }
            entries.push(IndxDirEntry {
                record_n,
                entry_length,
                content_length,
                flags: flags_entry,
                file_info: file_info.unwrap(),
            });
        }

        if entry_length == 0 {
            break;
        }
        offset += entry_length as usize;
    }

    let valid = !entries.is_empty();
    IndxRecord {
        off_fixup,
        n_entries,
        off_start_list,
        off_end_list,
        off_end_buffer,
        flags,
        entries,
        valid,
    }
}

/// Re-exported for callers that only need the runlist decoder alongside
/// INDX parsing (e.g. `$INDEX_ALLOCATION` position resolution).
pub use runlist::{decode_runlist, RunlistEntry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_indx_record_on_empty_buffer_is_invalid() {
        let entry = vec![0u8; 4096];
        let record = parse_indx_record(&entry);
        assert!(!record.valid);
        assert!(record.entries.is_empty());
    }
}
