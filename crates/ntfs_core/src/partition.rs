//! Partition: the rebuilt view of one NTFS volume found on the disk image.
//!
//! Grounded on `core_types.py::Partition` merged with `ntfs.py::NTFSPartition`
//! — this crate only ever reconstructs NTFS volumes, so the original's
//! filesystem-generic base class and its NTFS subclass collapse into one
//! concrete type.

use std::collections::HashMap;

use crate::file::{File, FileIndex, LOST_FILES_RECORD};

/// A reconstructed NTFS partition: its directory tree, geometry and
/// recovery status.
#[derive(Debug, Clone)]
pub struct Partition {
    pub fs_type: &'static str,
    /// MFT record number of the root directory (always `5` for NTFS).
    pub root_id: i64,
    pub size: Option<u64>,
    pub offset: Option<u64>,
    pub root: Option<FileIndex>,
    lost: File,
    pub files: HashMap<FileIndex, File>,
    pub recoverable: bool,
    pub sec_per_clus: Option<u8>,
    pub mft_pos: Option<u64>,
    pub mftmirr_pos: Option<u64>,
}

impl Partition {
    pub fn new(mft_pos: Option<u64>) -> Self {
        Self {
            fs_type: "NTFS",
            root_id: 5,
            size: None,
            offset: None,
            root: None,
            lost: File::ghost_directory(FileIndex::Record(LOST_FILES_RECORD), "LostFiles"),
            files: HashMap::new(),
            recoverable: false,
            sec_per_clus: None,
            mft_pos,
            mftmirr_pos: None,
        }
    }

    pub fn add_file(&mut self, node: File) {
        self.files.insert(node.index.clone(), node);
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = Some(size);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub fn set_recoverable(&mut self, recoverable: bool) {
        self.recoverable = recoverable;
    }

    /// Looks up a file by index, transparently resolving the `LostFiles`
    /// sentinel to the partition's synthetic lost-and-found directory.
    pub fn get(&self, index: &FileIndex) -> Option<&File> {
        if *index == FileIndex::Record(LOST_FILES_RECORD) {
            return Some(&self.lost);
        }
        self.files.get(index)
    }

    fn get_mut(&mut self, index: &FileIndex) -> Option<&mut File> {
        if *index == FileIndex::Record(LOST_FILES_RECORD) {
            return Some(&mut self.lost);
        }
        self.files.get_mut(index)
    }

    /// Returns the full path of `index` by walking parent pointers to the
    /// root. Grounded on `core_types.py::File.full_path`.
    pub fn full_path(&self, index: &FileIndex) -> String {
        match self.get(index) {
            None => String::new(),
            Some(node) => match &node.parent {
                Some(parent) => format!("{}/{}", self.full_path(parent), node.name),
                None => node.name.clone(),
            },
        }
    }

    fn attach(&mut self, parent: &FileIndex, child: FileIndex) {
        let mut name = match self.get(&child) {
            Some(f) => f.name.clone(),
            None => return,
        };
        let attached = match self.get_mut(parent) {
            Some(parent_node) => {
                parent_node.add_child(child.clone(), &mut name);
                true
            }
            None => false,
        };
        if attached {
            if let Some(child_node) = self.get_mut(&child) {
                child_node.name = name;
            }
        }
    }

    /// Rebuilds the directory tree from the flat `files` map: resolves
    /// every file's parent pointer, synthesizing ghost directories for
    /// missing parents and falling back to `LostFiles` when a file has no
    /// resolvable parent at all.
    ///
    /// Grounded on `core_types.py::Partition.rebuild`. The root's name is
    /// unconditionally reset to `"Root"` on every call, even when record 5
    /// is a genuine (non-ghost) directory.
    pub fn rebuild(&mut self) {
        let root_id = FileIndex::Record(self.root_id);
        let lost_id = FileIndex::Record(LOST_FILES_RECORD);

        if !self.files.contains_key(&root_id) {
            self.files.insert(
                root_id.clone(),
                File::ghost_directory(root_id.clone(), "Root"),
            );
        }

        let identifiers: Vec<FileIndex> = self.files.keys().cloned().collect();
        for identifier in identifiers {
            if identifier == root_id {
                if let Some(node) = self.files.get_mut(&identifier) {
                    node.name = "Root".to_string();
                    node.parent = None;
                }
                self.root = Some(identifier.clone());
                continue;
            }

            let parent_id = self
                .files
                .get(&identifier)
                .and_then(|n| n.parent.clone());

            match parent_id {
                Some(pid) if self.files.contains_key(&pid) => {
                    self.attach(&pid, identifier);
                }
                Some(pid) => {
                    let ghost_name = format!("Dir_{pid}");
                    let mut ghost = File::ghost_directory(pid.clone(), ghost_name);
                    ghost.parent = Some(lost_id.clone());
                    self.files.insert(pid.clone(), ghost);
                    self.attach(&lost_id, pid.clone());
                    self.attach(&pid, identifier);
                }
                None => {
                    if let Some(node) = self.files.get_mut(&identifier) {
                        node.parent = Some(lost_id.clone());
                    }
                    self.attach(&lost_id, identifier);
                }
            }
        }
    }
}

/// Merges `piece`'s files into `part`, keeping `part`'s entry whenever it
/// already holds a real (non-ghost) file at that index.
///
/// Grounded on `utils.py::merge`.
pub fn merge(part: &mut Partition, piece: Partition) {
    for (index, file) in piece.files {
        let should_overwrite = match part.files.get(&index) {
            None => true,
            Some(existing) => existing.is_ghost,
        };
        if should_overwrite {
            part.files.insert(index, file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_synthesizes_ghost_root_when_missing() {
        let mut part = Partition::new(Some(0));
        let mut child = File::new(FileIndex::Record(10), "readme.txt", Some(5));
        child.parent = Some(FileIndex::Record(5));
        part.add_file(child);
        part.rebuild();

        let root = part.get(&FileIndex::Record(5)).unwrap();
        assert_eq!(root.name, "Root");
        assert!(root.is_ghost);
        assert!(root.children.contains(&FileIndex::Record(10)));
    }

    #[test]
    fn rebuild_keeps_root_name_even_when_real() {
        let mut part = Partition::new(Some(0));
        part.add_file(File::directory(FileIndex::Record(5), "weird_name", Some(0)));
        part.rebuild();
        assert_eq!(part.get(&FileIndex::Record(5)).unwrap().name, "Root");
    }

    #[test]
    fn rebuild_sends_orphan_to_lost_files() {
        let mut part = Partition::new(Some(0));
        let orphan = File::new(FileIndex::Record(20), "orphan.txt", Some(1));
        part.add_file(orphan);
        part.rebuild();
        let lost = part.get(&FileIndex::Record(LOST_FILES_RECORD)).unwrap();
        assert!(lost.children.contains(&FileIndex::Record(20)));
    }

    #[test]
    fn rebuild_synthesizes_missing_intermediate_directory() {
        let mut part = Partition::new(Some(0));
        let mut child = File::new(FileIndex::Record(30), "deep.txt", Some(1));
        child.parent = Some(FileIndex::Record(99));
        part.add_file(child);
        part.rebuild();

        let ghost_parent = part.get(&FileIndex::Record(99)).unwrap();
        assert!(ghost_parent.is_ghost);
        assert!(ghost_parent.children.contains(&FileIndex::Record(30)));
        let lost = part.get(&FileIndex::Record(LOST_FILES_RECORD)).unwrap();
        assert!(lost.children.contains(&FileIndex::Record(99)));
    }

    #[test]
    fn merge_keeps_non_ghost_entries() {
        let mut part = Partition::new(Some(0));
        part.add_file(File::ghost_directory(FileIndex::Record(7), "ghost"));
        let mut piece = Partition::new(Some(0));
        piece.add_file(File::new(FileIndex::Record(7), "real.txt", Some(10)));
        merge(&mut part, piece);
        assert_eq!(part.files[&FileIndex::Record(7)].name, "real.txt");
    }

    #[test]
    fn merge_does_not_overwrite_existing_real_entries() {
        let mut part = Partition::new(Some(0));
        part.add_file(File::new(FileIndex::Record(7), "original.txt", Some(10)));
        let mut piece = Partition::new(Some(0));
        piece.add_file(File::new(FileIndex::Record(7), "other.txt", Some(10)));
        merge(&mut part, piece);
        assert_eq!(part.files[&FileIndex::Record(7)].name, "original.txt");
    }
}
