//! Filesystem-independent file/node representation.
//!
//! Grounded on `core_types.py::File`. A `File` is RecuperaBit's "node": one
//! entry of the rebuilt directory tree, carrying just enough to restore
//! content and reconstruct a path — not a full NTFS attribute dump.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

/// Identity of a file or alternate data stream within a partition.
///
/// RecuperaBit keys its file dict by either a plain MFT record number or a
/// `"<record>:<stream>"` string for an ADS — a Python dict-key trick for
/// what is really a sum type. `Record` uses `i64` rather than `u64` so that
/// the root directory's and the `LostFiles` synthetic directory's indices
/// (`5` and `-1`, ordinary small integers in the original) fit the same
/// variant instead of needing special-cased fields elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileIndex {
    Record(i64),
    Ads(i64, String),
}

/// The reserved index of the synthetic `LostFiles` directory.
pub const LOST_FILES_RECORD: i64 = -1;

impl fmt::Display for FileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileIndex::Record(n) => write!(f, "{n}"),
            FileIndex::Ads(n, stream) => write!(f, "{n}:{stream}"),
        }
    }
}

/// Modification, access and creation timestamps, in that fixed order.
pub type Mac = (Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// One node of the rebuilt directory tree.
#[derive(Debug, Clone)]
pub struct File {
    pub index: FileIndex,
    pub name: String,
    pub size: Option<u64>,
    pub is_directory: bool,
    pub is_deleted: bool,
    pub is_ghost: bool,
    pub parent: Option<FileIndex>,
    pub mac: Mac,
    pub children: HashSet<FileIndex>,
    pub children_names: HashSet<String>,
    pub offset: Option<u64>,
    /// Alternate Data Stream name, empty for the file's primary content.
    pub ads: String,
}

impl File {
    pub fn new(index: FileIndex, name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            index,
            name: name.into(),
            size,
            is_directory: false,
            is_deleted: false,
            is_ghost: false,
            parent: None,
            mac: (None, None, None),
            children: HashSet::new(),
            children_names: HashSet::new(),
            offset: None,
            ads: String::new(),
        }
    }

    pub fn directory(index: FileIndex, name: impl Into<String>, size: Option<u64>) -> Self {
        let mut f = Self::new(index, name, size);
        f.is_directory = true;
        f
    }

    pub fn ghost_directory(index: FileIndex, name: impl Into<String>) -> Self {
        let mut f = Self::directory(index, name, Some(0));
        f.is_ghost = true;
        f
    }

    pub fn set_parent(&mut self, parent: Option<FileIndex>) {
        self.parent = parent;
    }

    pub fn set_mac(&mut self, mac: Mac) {
        self.mac = mac;
    }

    /// Adds `child` to this directory's children, renaming it on a name
    /// collision the way `core_types.py::File.add_child` does: append
    /// `_NNN` until the name is unique, logging the rename.
    pub fn add_child(&mut self, child_index: FileIndex, child_name: &mut String) {
        if self.children.contains(&child_index) {
            return;
        }
        let original_name = child_name.clone();
        let mut i = 0u32;
        while self.children_names.contains(child_name.as_str()) {
            *child_name = format!("{original_name}_{i:03}");
            i += 1;
        }
        if *child_name != original_name {
            tracing::warn!(
                index = %child_index,
                original_name,
                renamed_to = %child_name,
                "renamed file to avoid name collision"
            );
        }
        self.children_names.insert(child_name.clone());
        self.children.insert(child_index);
    }
}

/// The pieces needed to materialize a tree node, already extracted from
/// whichever NTFS structure produced them (a full MFT record, or just a
/// bare `$FILE_NAME` pulled out of an INDX entry).
pub struct FileMaterial<'a> {
    pub record_n: i64,
    /// `(namespace, name)` pairs drawn from every `$FILE_NAME` attribute.
    pub names: Vec<(u8, String)>,
    pub size: Option<u64>,
    /// Raw directory bit from the record's flags (ADS-ness is applied by
    /// `File::assemble`, matching `ntfs.py::NTFSFile.__init__`'s
    /// `not len(ads)` guard).
    pub is_directory: bool,
    pub is_deleted: bool,
    pub parent_entry: Option<i64>,
    pub mac: Mac,
    pub ads: &'a str,
}

impl File {
    /// Builds a `File` node the way `ntfs.py::NTFSFile.__init__` does:
    /// picks the best name via [`crate::ntfs::best_name`], falls back to
    /// `File_<index>` when no name decoded, and — matching the original
    /// precisely — only records parent/offset/mac when a name was found.
    pub fn assemble(material: FileMaterial, offset: Option<u64>, is_ghost: bool) -> File {
        let ads_suffix = if material.ads.is_empty() {
            String::new()
        } else {
            format!(":{}", material.ads)
        };
        let index = if material.ads.is_empty() {
            FileIndex::Record(material.record_n)
        } else {
            FileIndex::Ads(material.record_n, material.ads.to_string())
        };

        let named: Vec<(u8, String)> = material
            .names
            .into_iter()
            .map(|(ns, n)| (ns, format!("{n}{ads_suffix}")))
            .collect();
        let best = crate::ntfs::best_name(named);
        let has_name = best.is_some();
        let name = best.unwrap_or_else(|| format!("File_{index}"));

        let mut file = File::new(index, name, material.size);
        file.is_directory = material.is_directory && material.ads.is_empty();
        file.is_deleted = material.is_deleted;
        file.is_ghost = is_ghost;
        if has_name {
            file.parent = material.parent_entry.map(FileIndex::Record);
            file.offset = offset;
            file.mac = material.mac;
        }
        file.ads = material.ads.to_string();
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_index_display_formats_record() {
        assert_eq!(FileIndex::Record(42).to_string(), "42");
    }

    #[test]
    fn file_index_display_formats_ads() {
        assert_eq!(
            FileIndex::Ads(8, "$Bad".to_string()).to_string(),
            "8:$Bad"
        );
    }

    #[test]
    fn add_child_renames_on_collision() {
        let mut dir = File::directory(FileIndex::Record(5), "Root", Some(0));
        let mut name_a = "file.txt".to_string();
        dir.add_child(FileIndex::Record(10), &mut name_a);
        assert_eq!(name_a, "file.txt");

        let mut name_b = "file.txt".to_string();
        dir.add_child(FileIndex::Record(11), &mut name_b);
        assert_eq!(name_b, "file.txt_000");
    }

    #[test]
    fn add_child_is_idempotent_for_same_index() {
        let mut dir = File::directory(FileIndex::Record(5), "Root", Some(0));
        let mut name = "file.txt".to_string();
        dir.add_child(FileIndex::Record(10), &mut name);
        let mut name_again = "file.txt".to_string();
        dir.add_child(FileIndex::Record(10), &mut name_again);
        assert_eq!(dir.children.len(), 1);
    }

    #[test]
    fn assemble_falls_back_to_synthetic_name_without_names() {
        let material = FileMaterial {
            record_n: 42,
            names: vec![],
            size: None,
            is_directory: false,
            is_deleted: false,
            parent_entry: Some(5),
            mac: (None, None, None),
            ads: "",
        };
        let file = File::assemble(material, None, false);
        assert_eq!(file.name, "File_42");
        // No name decoded: parent/offset/mac are left unset, matching the original.
        assert_eq!(file.parent, None);
    }

    #[test]
    fn assemble_sets_parent_only_when_named() {
        let material = FileMaterial {
            record_n: 42,
            names: vec![(1, "readme.txt".to_string())],
            size: Some(100),
            is_directory: false,
            is_deleted: false,
            parent_entry: Some(5),
            mac: (None, None, None),
            ads: "",
        };
        let file = File::assemble(material, Some(123), false);
        assert_eq!(file.name, "readme.txt");
        assert_eq!(file.parent, Some(FileIndex::Record(5)));
        assert_eq!(file.offset, Some(123));
    }

    #[test]
    fn assemble_ads_directory_flag_is_suppressed() {
        let material = FileMaterial {
            record_n: 42,
            names: vec![(1, "dir".to_string())],
            size: Some(0),
            is_directory: true,
            is_deleted: false,
            parent_entry: Some(5),
            mac: (None, None, None),
            ads: "$Stream",
        };
        let file = File::assemble(material, None, false);
        assert!(!file.is_directory);
        assert_eq!(file.index, FileIndex::Ads(42, "$Stream".to_string()));
    }
}
