//! FILE record (MFT entry) parsing: fixups, attribute iteration, best-name
//! rule.
//!
//! Grounded on `ntfs.py::parse_mft_attr`/`_apply_fixup_values`/
//! `_attributes_reader`/`parse_file_record`/`best_name` and the byte tables
//! in `ntfs_fmt.py` (`entry_fmt`, `attr_header_fmt`, `attr_resident_fmt`,
//! `attr_nonresident_fmt`, `attr_types_fmt`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::fmt::{self, windows_time};
use super::runlist::{decode_runlist, RunlistEntry};
use crate::config::SECTOR_SIZE;
use crate::decode::{field_slice, le_uint, utf16_name};

/// A decoded `$STANDARD_INFORMATION` attribute body.
#[derive(Debug, Clone, Default)]
pub struct StandardInformation {
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub mft_modification_time: Option<DateTime<Utc>>,
    pub access_time: Option<DateTime<Utc>>,
    pub flags: u32,
}

/// A decoded `$FILE_NAME` attribute body.
#[derive(Debug, Clone)]
pub struct FileNameAttr {
    pub parent_entry: u64,
    pub parent_seq: u16,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub mft_modification_time: Option<DateTime<Utc>>,
    pub access_time: Option<DateTime<Utc>>,
    pub allocated_size: u64,
    pub real_size: u64,
    pub flags: u32,
    pub name_length: u8,
    pub namespace: u8,
    pub name: Option<String>,
}

/// Parses a `$FILE_NAME` attribute's content (shared by the `$FILE_NAME`
/// attribute itself, `$INDEX_ROOT` entries and standalone INDX entries).
pub fn parse_file_name_content(content: &[u8]) -> Option<FileNameAttr> {
    let parent_entry = le_uint(content, 0, 5)?;
    let parent_seq = le_uint(content, 6, 7)? as u16;
    let creation_time = le_uint(content, 8, 15).and_then(windows_time);
    let modification_time = le_uint(content, 16, 23).and_then(windows_time);
    let mft_modification_time = le_uint(content, 24, 31).and_then(windows_time);
    let access_time = le_uint(content, 32, 39).and_then(windows_time);
    let allocated_size = le_uint(content, 40, 47)?;
    let real_size = le_uint(content, 48, 55)?;
    let flags = le_uint(content, 56, 59)? as u32;
    let name_length = le_uint(content, 64, 64)? as u8;
    let namespace = le_uint(content, 65, 65)? as u8;
    let name = utf16_name(content, 66, name_length as usize * 2 + 65);
    Some(FileNameAttr {
        parent_entry,
        parent_seq,
        creation_time,
        modification_time,
        mft_modification_time,
        access_time,
        allocated_size,
        real_size,
        flags,
        name_length,
        namespace,
        name,
    })
}

/// One entry of a directory index (either `$INDEX_ROOT`'s inline entries or
/// a standalone INDX record's entries).
#[derive(Debug, Clone)]
pub struct IndexDirEntry {
    pub record_n: u64,
    pub entry_length: u32,
    pub content_length: u32,
    pub flags: u32,
    pub file_name: Option<FileNameAttr>,
}

/// A decoded `$INDEX_ROOT` attribute body.
#[derive(Debug, Clone)]
pub struct IndexRoot {
    pub attr_type: u32,
    pub sorting_rule: u32,
    pub record_bytes: u32,
    pub record_clusters: u8,
    pub records: Vec<IndexDirEntry>,
}

/// One entry of a `$ATTRIBUTE_LIST` attribute.
#[derive(Debug, Clone)]
pub struct AttributeListEntry {
    pub attr_type: u32,
    pub length: u32,
    pub name_length: u8,
    pub name_off: u8,
    pub start_vcn: u64,
    pub file_ref: Option<u64>,
    pub id: u8,
}

/// Parses the entries of a `$INDEX_ROOT` attribute's inline index
/// (`ntfs_fmt.py::index_entries`). Used for the small number of entries
/// that fit directly in the MFT record, as opposed to an `$INDEX_ALLOCATION`
/// that spills into separate INDX records.
pub fn index_entries(dump: &[u8]) -> Vec<IndexDirEntry> {
    let mut offset = 0usize;
    let mut entries = Vec::new();
    while offset < dump.len() {
        let rest = &dump[offset..];
        let Some(entry_length) = le_uint(rest, 8, 9) else {
            break;
        };
        let entry_length = entry_length as u32;
        let content_length = le_uint(rest, 10, 11).unwrap_or(0) as u32;
        let flags = le_uint(rest, 12, 15).unwrap_or(0) as u32;
        let record_n = le_uint(rest, 0, 3).unwrap_or(0);

        let file_name = field_slice(rest, 16, 15 + content_length as usize)
            .and_then(parse_file_name_content);
        let valid_length = entry_length > 0;
        let has_name = file_name
            .as_ref()
            .and_then(|f| f.name.as_ref())
            .is_some_and(|n| !n.is_empty());

        if !(valid_length && has_name) {
            break;
        }
        if content_length != 0 {
            entries.push(IndexDirEntry {
                record_n,
                entry_length,
                content_length,
                flags,
                file_name,
            });
        }
        offset += entry_length as usize;
        if flags & 0x2 != 0 {
            break;
        }
    }
    entries
}

/// Parses a `$INDEX_ROOT` attribute's content.
pub fn parse_index_root(content: &[u8]) -> Option<IndexRoot> {
    let attr_type = le_uint(content, 0, 3)? as u32;
    let sorting_rule = le_uint(content, 4, 7)? as u32;
    let record_bytes = le_uint(content, 8, 11)? as u32;
    let record_clusters = le_uint(content, 12, 12)? as u8;
    let inner = field_slice(content, 16, 16 + record_bytes as usize).unwrap_or(&[]);
    let records = index_entries(inner);
    Some(IndexRoot {
        attr_type,
        sorting_rule,
        record_bytes,
        record_clusters,
        records,
    })
}

/// Parses a `$ATTRIBUTE_LIST` attribute's content (`ntfs_fmt.py::attribute_list_parser`).
pub fn parse_attribute_list(mut dump: &[u8]) -> Vec<AttributeListEntry> {
    let mut content = Vec::new();
    while !dump.is_empty() {
        let Some(length) = le_uint(dump, 4, 5) else {
            break;
        };
        if length == 0 {
            break;
        }
        let attr_type = le_uint(dump, 0, 3).unwrap_or(0) as u32;
        let name_length = le_uint(dump, 6, 6).unwrap_or(0) as u8;
        let name_off = le_uint(dump, 7, 7).unwrap_or(0) as u8;
        let start_vcn = le_uint(dump, 8, 15).unwrap_or(0);
        let file_ref = le_uint(dump, 16, 19);
        let id = le_uint(dump, 24, 24).unwrap_or(0) as u8;
        content.push(AttributeListEntry {
            attr_type,
            length: length as u32,
            name_length,
            name_off,
            start_vcn,
            file_ref,
            id,
        });
        if length as usize >= dump.len() {
            break;
        }
        dump = &dump[length as usize..];
    }
    content
}

/// Typed content of the small set of attributes this parser understands.
#[derive(Debug, Clone)]
pub enum AttrContent {
    StandardInformation(StandardInformation),
    FileName(FileNameAttr),
    IndexRoot(IndexRoot),
    AttributeList(Vec<AttributeListEntry>),
}

/// Resident vs. non-resident attribute body.
#[derive(Debug, Clone)]
pub enum AttributeBody {
    Resident {
        content_off: u16,
        content_size: u32,
    },
    NonResident {
        start_vcn: u64,
        end_vcn: u64,
        allocated_size: u64,
        real_size: u64,
        initialized_size: u64,
        runlist: Vec<RunlistEntry>,
    },
}

/// One parsed MFT attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub attr_type: u32,
    pub type_name: Option<&'static str>,
    pub length: u32,
    pub non_resident: bool,
    /// The attribute's own name (an Alternate Data Stream name for `$DATA`;
    /// empty for most other attribute types).
    pub own_name: String,
    pub flags: u16,
    pub id: u16,
    pub dump_offset: usize,
    pub body: AttributeBody,
    pub content: Option<AttrContent>,
}

fn parse_attr_content(type_name: &str, content: &[u8]) -> Option<AttrContent> {
    match type_name {
        "$STANDARD_INFORMATION" => Some(AttrContent::StandardInformation(StandardInformation {
            creation_time: le_uint(content, 0, 7).and_then(windows_time),
            modification_time: le_uint(content, 8, 15).and_then(windows_time),
            mft_modification_time: le_uint(content, 16, 23).and_then(windows_time),
            access_time: le_uint(content, 24, 31).and_then(windows_time),
            flags: le_uint(content, 32, 35)? as u32,
        })),
        "$FILE_NAME" => parse_file_name_content(content).map(AttrContent::FileName),
        "$INDEX_ROOT" => parse_index_root(content).map(AttrContent::IndexRoot),
        "$ATTRIBUTE_LIST" => Some(AttrContent::AttributeList(parse_attribute_list(content))),
        _ => None,
    }
}

/// Parses a single MFT attribute starting at the head of `attr`.
///
/// Returns `None` when the attribute header itself is unreadable (the
/// attribute is broken and the caller must stop scanning further
/// attributes in this record), mirroring the `TypeError` the Python
/// original raises in the same situation.
pub fn parse_attribute(attr: &[u8], dump_offset: usize) -> Option<Attribute> {
    let attr_type = le_uint(attr, 0, 3)? as u32;
    let length = le_uint(attr, 4, 7)? as u32;
    let non_resident = le_uint(attr, 8, 8)? != 0;
    let name_length = le_uint(attr, 9, 9).unwrap_or(0) as u8;
    let name_off = le_uint(attr, 10, 11).unwrap_or(0) as u16;
    let flags = le_uint(attr, 12, 13).unwrap_or(0) as u16;
    let id = le_uint(attr, 14, 15).unwrap_or(0) as u16;
    let own_name = if name_length > 0 {
        utf16_name(
            attr,
            name_off as usize,
            name_off as usize + name_length as usize * 2 - 1,
        )
        .unwrap_or_default()
    } else {
        String::new()
    };

    let body = if non_resident {
        let start_vcn = le_uint(attr, 16, 23)?;
        let end_vcn = le_uint(attr, 24, 31)?;
        let runlist_offset = le_uint(attr, 32, 33)? as usize;
        let allocated_size = le_uint(attr, 40, 47)?;
        let real_size = le_uint(attr, 48, 55)?;
        let initialized_size = le_uint(attr, 56, 63)?;
        let runlist_bytes = field_slice(attr, runlist_offset, allocated_size as usize).unwrap_or(&[]);
        AttributeBody::NonResident {
            start_vcn,
            end_vcn,
            allocated_size,
            real_size,
            initialized_size,
            runlist: decode_runlist(runlist_bytes),
        }
    } else {
        let content_size = le_uint(attr, 16, 19)? as u32;
        let content_off = le_uint(attr, 20, 21)? as u16;
        AttributeBody::Resident {
            content_off,
            content_size,
        }
    };

    let type_name = fmt::attribute_name(attr_type);
    let content = match (&body, type_name) {
        (AttributeBody::Resident { content_off, content_size }, Some(name)) => {
            field_slice(attr, *content_off as usize, *content_off as usize + *content_size as usize - 1)
                .or_else(|| field_slice(attr, *content_off as usize, attr.len().saturating_sub(1)))
                .and_then(|c| parse_attr_content(name, c))
        }
        _ => None,
    };

    Some(Attribute {
        attr_type,
        type_name,
        length,
        non_resident,
        own_name,
        flags,
        id,
        dump_offset,
        body,
        content,
    })
}

/// A single attribute slot: most attribute types may appear at most once per
/// record, but five types (spec.md's `allows_multiple` set) may repeat.
#[derive(Debug, Clone)]
pub enum AttrSlot {
    Single(Attribute),
    Multiple(Vec<Attribute>),
}

impl AttrSlot {
    pub fn as_slice(&self) -> &[Attribute] {
        match self {
            AttrSlot::Single(a) => std::slice::from_ref(a),
            AttrSlot::Multiple(v) => v.as_slice(),
        }
    }
}

/// Walks the attribute list of a FILE record, bucketing by attribute name.
///
/// Grounded on `ntfs.py::_attributes_reader`. Stops (without error) at the
/// first broken attribute, an attribute of length zero, or the 16-byte tail
/// that can no longer hold an attribute header.
pub fn read_attributes(entry: &[u8], mut offset: usize) -> HashMap<String, AttrSlot> {
    let mut attributes: HashMap<String, AttrSlot> = HashMap::new();
    while offset + 16 < entry.len() {
        let Some(attr) = parse_attribute(&entry[offset..], offset) else {
            return attributes;
        };
        if attr.length == 0 {
            break;
        }
        offset += attr.length as usize;
        let Some(name) = attr.type_name else {
            continue;
        };
        let multiple = fmt::allows_multiple(name);
        match attributes.get_mut(name) {
            None => {
                attributes.insert(
                    name.to_string(),
                    if multiple {
                        AttrSlot::Multiple(vec![attr])
                    } else {
                        AttrSlot::Single(attr)
                    },
                );
            }
            Some(AttrSlot::Multiple(v)) if multiple => v.push(attr),
            Some(_) => {
                tracing::error!(attribute = name, "cannot handle multiple attribute");
                break;
            }
        }
    }
    attributes
}

/// Applies the fixup array to a FILE or INDX record in place.
///
/// Grounded on `ntfs.py::_apply_fixup_values`: the last two bytes of every
/// sector are a fixup placeholder that must be restored from the fixup
/// array stored at `off_fixup`, detecting (but not correcting) torn writes.
pub fn apply_fixup(entry: &mut [u8], off_fixup: usize, n_entries: u16) {
    for i in 1..n_entries as usize {
        let pos = SECTOR_SIZE as usize * i;
        if pos > entry.len() || pos < 2 {
            break;
        }
        let src_lo = off_fixup + 2 * i;
        let src_hi = off_fixup + 2 * (i + 1);
        if src_hi > entry.len() {
            break;
        }
        entry[pos - 2] = entry[src_lo];
        entry[pos - 1] = entry[src_lo + 1];
    }
}

/// A parsed FILE record (MFT entry) header plus its attributes.
#[derive(Debug, Clone)]
pub struct FileRecordHeader {
    pub off_fixup: u16,
    pub n_entries: u16,
    pub lsn: u64,
    pub seq_val: u16,
    pub link_count: u16,
    pub off_first: u16,
    pub flags: u16,
    pub size_used: u32,
    pub size_alloc: u32,
    pub base_record: u32,
    /// Present only for NTFS >= 3.1 (spec.md §9 Open Question #1, pinned:
    /// records without it are dropped from Step A clustering).
    pub record_n: Option<u64>,
    pub valid: bool,
    pub attributes: HashMap<String, AttrSlot>,
}

impl FileRecordHeader {
    pub fn attr(&self, name: &str) -> &[Attribute] {
        self.attributes
            .get(name)
            .map(AttrSlot::as_slice)
            .unwrap_or(&[])
    }
}

/// Parses the contents of a FILE record (MFT entry).
///
/// Grounded on `ntfs.py::parse_file_record`.
pub fn parse_file_record(entry: &[u8], sector_size: u64, file_record_sectors: u64) -> FileRecordHeader {
    let off_fixup = le_uint(entry, 4, 5).unwrap_or(0) as u16;
    let n_entries = le_uint(entry, 6, 7).unwrap_or(0) as u16;
    let lsn = le_uint(entry, 8, 15).unwrap_or(0);
    let seq_val = le_uint(entry, 16, 17).unwrap_or(0) as u16;
    let link_count = le_uint(entry, 18, 19).unwrap_or(0) as u16;
    let off_first = le_uint(entry, 20, 21).unwrap_or(0) as u16;
    let flags = le_uint(entry, 22, 23).unwrap_or(0) as u16;
    let size_used = le_uint(entry, 24, 27).unwrap_or(0) as u32;
    let size_alloc = le_uint(entry, 28, 31).unwrap_or(0) as u32;
    let base_record = le_uint(entry, 32, 35).unwrap_or(0) as u32;
    let record_n = le_uint(entry, 44, 47);

    if size_alloc as u64 > entry.len() as u64 || (entry.len() as u64) < file_record_sectors * sector_size {
        return FileRecordHeader {
            off_fixup,
            n_entries,
            lsn,
            seq_val,
            link_count,
            off_first,
            flags,
            size_used,
            size_alloc,
            base_record,
            record_n,
            valid: false,
            attributes: HashMap::new(),
        };
    }

    // Old versions of NTFS don't carry a MFT record number.
    let record_n = if off_fixup < 48 { None } else { record_n };

    let mut entry = entry.to_vec();
    apply_fixup(&mut entry, off_fixup as usize, n_entries);
    let attributes = read_attributes(&entry, off_first as usize);

    FileRecordHeader {
        off_fixup,
        n_entries,
        lsn,
        seq_val,
        link_count,
        off_first,
        flags,
        size_used,
        size_alloc,
        base_record,
        record_n,
        valid: true,
        attributes,
    }
}

/// Picks the best file name among a `$FILE_NAME` attribute's entries.
///
/// Grounded on `ntfs.py::best_name`: prefers the Win32 namespace entry
/// unless the highest-sorting one is in the POSIX namespace (code 3), in
/// which case that one wins instead.
pub fn best_name(mut entries: Vec<(u8, String)>) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    entries.sort();
    let name = if entries.last().map(|(ns, _)| *ns) == Some(3) {
        entries.last().unwrap().1.clone()
    } else {
        entries.first().unwrap().1.clone()
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_name_prefers_posix_namespace_when_highest() {
        let entries = vec![(1u8, "WIN32NAME".to_string()), (3, "posixname".to_string())];
        assert_eq!(best_name(entries), Some("posixname".to_string()));
    }

    #[test]
    fn best_name_falls_back_to_first_when_highest_is_not_posix() {
        let entries = vec![(0u8, "DOS83".to_string()), (1, "Win32Name".to_string())];
        assert_eq!(best_name(entries), Some("DOS83".to_string()));
    }

    #[test]
    fn best_name_empty_input_yields_none() {
        assert_eq!(best_name(vec![]), None);
    }

    #[test]
    fn best_name_empty_string_yields_none() {
        assert_eq!(best_name(vec![(3u8, String::new())]), None);
    }

    #[test]
    fn parse_file_record_rejects_undersized_entry() {
        let entry = vec![0u8; 100];
        let header = parse_file_record(&entry, 512, 2);
        assert!(!header.valid);
    }

    #[test]
    fn parse_file_record_drops_record_n_pre_3_1() {
        let mut entry = vec![0u8; 1024];
        entry[0..4].copy_from_slice(b"FILE");
        entry[4..6].copy_from_slice(&30u16.to_le_bytes()); // off_fixup < 48
        entry[6..8].copy_from_slice(&1u16.to_le_bytes());
        entry[28..32].copy_from_slice(&0u32.to_le_bytes()); // size_alloc
        let header = parse_file_record(&entry, 512, 2);
        assert!(header.valid);
        assert_eq!(header.record_n, None);
    }

    #[test]
    fn index_entries_stops_on_unnamed_entry() {
        let dump = vec![0u8; 32];
        assert!(index_entries(&dump).is_empty());
    }

    #[test]
    fn attribute_list_parser_stops_on_zero_length() {
        let dump = vec![0u8; 32];
        assert!(parse_attribute_list(&dump).is_empty());
    }
}
