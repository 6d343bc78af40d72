//! Content restoration, the recoverability-pruning rule and path search.
//!
//! Grounded on `ntfs.py::NTFSFile.get_content`/`content_iterator`/`ignore`
//! and `utils.py::locate`/`recursive_restore`.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{ScanConfig, SECTOR_SIZE};
use crate::file::{File, FileIndex};
use crate::ntfs::fmt::FILE_RECORD_SECTORS;
use crate::ntfs::record::{parse_file_record, AttributeBody};
use crate::partition::Partition;
use crate::traits::{read_sectors, BlockSource};

const FLAG_COMPRESSED: u16 = 0x0001;
const FLAG_ENCRYPTED: u16 = 0x4000;

/// Writes `file`'s content to `out`, returning `Ok(true)` if any content was
/// written, `Ok(false)` if the file genuinely has none to restore (an empty
/// file, a directory, or a ghost).
///
/// Grounded on `ntfs.py::NTFSFile.get_content`. Compressed `$DATA` is
/// refused outright (RecuperaBit never implemented LZNT1 decompression
/// either); encrypted `$DATA` is attempted anyway, with a warning, since
/// the ciphertext bytes are still useful to an analyst.
pub fn restore_content<W: Write>(
    file: &File,
    part: &Partition,
    image: &mut dyn BlockSource,
    config: &ScanConfig,
    out: &mut W,
) -> io::Result<bool> {
    if file.is_ghost {
        tracing::error!(file = %file.name, "cannot restore ghost file, no backing MFT record");
        return Ok(false);
    }
    let Some(offset) = file.offset else {
        return Ok(false);
    };

    let raw = read_sectors(image, offset, FILE_RECORD_SECTORS, SECTOR_SIZE);
    let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
    if !header.valid {
        tracing::error!(file = %file.name, "invalid MFT entry, cannot restore content");
        return Ok(false);
    }

    let datas: Vec<_> = header
        .attr("$DATA")
        .iter()
        .filter(|a| a.own_name == file.ads)
        .collect();
    if datas.is_empty() {
        if !file.is_directory {
            tracing::error!(file = %file.name, "no $DATA attribute to restore");
        }
        return Ok(false);
    }

    for data in &datas {
        if data.flags & FLAG_COMPRESSED != 0 {
            tracing::error!(file = %file.name, "cannot restore compressed $DATA attribute");
            return Ok(false);
        }
        if data.flags & FLAG_ENCRYPTED != 0 {
            tracing::warn!(file = %file.name, "restoring encrypted $DATA attribute as-is");
        }
    }

    if datas.len() == 1 && !datas[0].non_resident {
        let data = datas[0];
        if let AttributeBody::Resident {
            content_off,
            content_size,
        } = data.body
        {
            let start = data.dump_offset + content_off as usize;
            let end = start + content_size as usize;
            let slice = raw.get(start..end.min(raw.len())).unwrap_or(&[]);
            out.write_all(slice)?;
            return Ok(true);
        }
        return Ok(false);
    }

    let Some(sec_per_clus) = part.sec_per_clus else {
        tracing::error!(file = %file.name, "cannot restore non-resident $DATA, unknown sec_per_clus");
        return Ok(false);
    };
    let partition_offset = part.offset.unwrap_or(0);

    let mut non_resident: Vec<_> = datas.iter().filter(|d| d.non_resident).collect();
    non_resident.sort_by_key(|d| match d.body {
        AttributeBody::NonResident { start_vcn, .. } => start_vcn,
        _ => 0,
    });
    if non_resident.len() != datas.len() {
        tracing::warn!(file = %file.name, "found leftover resident $DATA attribute(s)");
    }

    let mut vcn = 0u64;
    for data in non_resident {
        let AttributeBody::NonResident {
            start_vcn,
            real_size,
            runlist,
            ..
        } = &data.body
        else {
            continue;
        };

        if *start_vcn > vcn {
            let diff = *start_vcn - vcn;
            tracing::warn!(file = %file.name, clusters = diff, "missing part, filling with zeros");
            write_zeros(out, diff * sec_per_clus as u64 * SECTOR_SIZE)?;
            vcn = *start_vcn;
        }

        let mut remaining = *real_size;
        let mut clusters_pos: i64 = 0;
        for run in runlist {
            let run_bytes = (run.length * sec_per_clus as u64 * SECTOR_SIZE).min(remaining);
            remaining -= run_bytes;

            match run.offset_delta {
                None => write_zeros(out, run_bytes)?,
                Some(delta) => {
                    clusters_pos += delta;
                    let real_pos = clusters_pos as u64 * sec_per_clus as u64 + partition_offset;
                    write_cluster_run(out, image, real_pos, run_bytes, config)?;
                }
            }
        }
    }

    Ok(true)
}

fn write_zeros<W: Write>(out: &mut W, mut amount: u64) -> io::Result<()> {
    const CHUNK: u64 = 64 * 1024;
    let zeros = vec![0u8; CHUNK as usize];
    while amount > 0 {
        let n = amount.min(CHUNK);
        out.write_all(&zeros[..n as usize])?;
        amount -= n;
    }
    Ok(())
}

fn write_cluster_run<W: Write>(
    out: &mut W,
    image: &mut dyn BlockSource,
    sector_pos: u64,
    mut amount: u64,
    config: &ScanConfig,
) -> io::Result<()> {
    let cap_bytes = config.max_sectors * SECTOR_SIZE;
    let mut pos = sector_pos;
    while amount > 0 {
        let take = amount.min(cap_bytes);
        let sectors = take.div_ceil(SECTOR_SIZE);
        let buf = read_sectors(image, pos, sectors, SECTOR_SIZE);
        out.write_all(&buf[..take as usize])?;
        amount -= take;
        pos += sectors;
    }
    Ok(())
}

/// Determines which files a restore pass should skip entirely.
///
/// Grounded on `ntfs.py::NTFSFile.ignore`: the pseudo-file that carries
/// cluster-level bad-sector markers, and the `$UsnJrnl:$J` alternate
/// stream, which is typically enormous and of little forensic value on
/// its own.
pub fn ignore(file: &File) -> bool {
    match &file.index {
        FileIndex::Ads(8, stream) if stream == "$Bad" => true,
        _ => file.parent == Some(FileIndex::Record(11)) && file.ads == "$J",
    }
}

/// Returns every file whose full path contains `text` (case-insensitive),
/// walking `LostFiles` then the real root.
///
/// Grounded on `utils.py::locate`/`_sub_locate`.
pub fn locate(part: &Partition, text: &str) -> Vec<(FileIndex, String)> {
    let needle = text.to_lowercase();
    let mut results = Vec::new();
    if let Some(root) = part.get(&FileIndex::Record(crate::file::LOST_FILES_RECORD)) {
        sub_locate(&needle, root, part, &mut results);
    }
    if let Some(root_index) = &part.root {
        if let Some(root) = part.get(root_index) {
            sub_locate(&needle, root, part, &mut results);
        }
    }
    results
}

fn sub_locate(needle: &str, directory: &File, part: &Partition, out: &mut Vec<(FileIndex, String)>) {
    let mut children: Vec<&FileIndex> = directory.children.iter().collect();
    children.sort_by(|a, b| {
        let na = part.get(a).map(|f| f.name.as_str()).unwrap_or_default();
        let nb = part.get(b).map(|f| f.name.as_str()).unwrap_or_default();
        na.cmp(nb)
    });
    for child_index in children {
        let Some(child) = part.get(child_index) else {
            continue;
        };
        let path = part.full_path(child_index);
        if path.to_lowercase().contains(needle) {
            out.push((child_index.clone(), path.clone()));
        }
        if !child.children.is_empty() || child.is_directory {
            sub_locate(needle, child, part, out);
        }
    }
}

/// Restores a subtree rooted at `start` to `outputdir`, writing content and
/// best-effort restoring modification/access times.
///
/// Grounded on `utils.py::recursive_restore`: an explicit stack rather than
/// real recursion, so a pathologically deep or cyclic tree can't blow the
/// call stack.
pub fn restore_tree(
    start: &FileIndex,
    part: &Partition,
    image: &mut dyn BlockSource,
    config: &ScanConfig,
    outputdir: &Path,
) -> io::Result<()> {
    let mut stack: VecDeque<FileIndex> = VecDeque::new();
    stack.push_back(start.clone());

    while let Some(index) = stack.pop_back() {
        let Some(node) = part.get(&index) else {
            continue;
        };
        tracing::info!(index = %node.index, name = %node.name, "restoring");

        let parent_path = node
            .parent
            .as_ref()
            .map(|p| part.full_path(p))
            .unwrap_or_default();
        let restore_path: PathBuf = outputdir.join(parent_path).join(&node.name);

        let is_directory = node.is_directory || !node.children.is_empty();

        if let Some(parent_dir) = restore_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent_dir) {
                tracing::error!(path = %restore_path.display(), error = %e, "failed to create parent directory");
                continue;
            }
        }

        if is_directory {
            if let Err(e) = std::fs::create_dir_all(&restore_path) {
                tracing::error!(path = %restore_path.display(), error = %e, "failed to create directory");
                continue;
            }
        }

        let mut buffer: Vec<u8> = Vec::new();
        let has_content = match restore_content(node, part, image, config, &mut buffer) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(path = %restore_path.display(), error = %e, "error restoring content");
                false
            }
        };

        let final_path = if is_directory && has_content {
            tracing::warn!(path = %restore_path.display(), "directory has data content");
            let mut renamed = restore_path.clone().into_os_string();
            renamed.push("_recuperabit_content");
            PathBuf::from(renamed)
        } else {
            restore_path.clone()
        };

        if has_content {
            match std::fs::File::create(&final_path).and_then(|mut f| f.write_all(&buffer)) {
                Ok(()) => {}
                Err(e) => tracing::error!(path = %final_path.display(), error = %e, "failed to write file"),
            }
        } else if !is_directory {
            if let Err(e) = std::fs::File::create(&final_path) {
                tracing::error!(path = %final_path.display(), error = %e, "failed to create empty file");
            }
        }

        if let (Some(mtime), Some(atime)) = (node.mac.0, node.mac.1) {
            let mtime = filetime::FileTime::from_unix_time(mtime.timestamp(), 0);
            let atime = filetime::FileTime::from_unix_time(atime.timestamp(), 0);
            if let Err(e) = filetime::set_file_times(&final_path, atime, mtime) {
                tracing::error!(path = %final_path.display(), error = %e, "failed to set file times");
            }
        }

        if is_directory {
            for child_index in &node.children {
                let Some(child) = part.get(child_index) else {
                    continue;
                };
                if ignore(child) {
                    tracing::info!(name = %child.name, "skipping ignored file");
                } else {
                    stack.push_back(child_index.clone());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_marks_bad_ads_stream() {
        let file = File::new(FileIndex::Ads(8, "$Bad".to_string()), "$Bad", None);
        assert!(ignore(&file));
    }

    #[test]
    fn ignore_marks_usn_journal_data_stream() {
        let mut file = File::new(FileIndex::Ads(11, "$J".to_string()), "$J", None);
        file.parent = Some(FileIndex::Record(11));
        file.ads = "$J".to_string();
        assert!(ignore(&file));
    }

    #[test]
    fn ignore_leaves_ordinary_files_alone() {
        let file = File::new(FileIndex::Record(50), "readme.txt", Some(10));
        assert!(!ignore(&file));
    }

    #[test]
    fn locate_finds_case_insensitive_substring() {
        let mut part = Partition::new(Some(0));
        let mut root = File::directory(FileIndex::Record(5), "Root", Some(0));
        root.children.insert(FileIndex::Record(10));
        part.add_file(root);
        let mut child = File::new(FileIndex::Record(10), "ReadMe.TXT", Some(5));
        child.parent = Some(FileIndex::Record(5));
        part.add_file(child);
        part.root = Some(FileIndex::Record(5));

        let hits = locate(&part, "readme");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, FileIndex::Record(10));
    }
}
