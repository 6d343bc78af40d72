//! Partition reconstruction pipeline (spec.md §4.5, Steps A-G).
//!
//! Grounded on `ntfs.py::NTFSScanner.get_partitions` and its helpers
//! (`add_indx_entries`, `add_from_indx_root`, `most_likely_sec_per_clus`,
//! `find_boundary`, `add_from_indx_allocation`, `add_from_attribute_list`,
//! `add_from_mft_mirror`, `finalize_reconstruction`). Unlike the scanner's
//! `feed`-time classification, this pass does need the image itself — to
//! re-read FILE/INDX records by position and to follow runlists — so it
//! takes a `BlockSource` rather than acting on pre-collected bytes.
//!
//! This is deliberately a single free function rather than persistent
//! `Scanner` state: `get_partitions` only makes sense to run once per scan
//! (it is what finalizes the scanner), so there is no benefit to keeping
//! `parsed_file_review`/`parsed_indx`/`indx_list` around after it returns.

use std::collections::{HashMap, HashSet};

use crate::config::{
    ScanConfig, GEOMETRY_EARLY_EXIT_PERCENTAGE, GEOMETRY_EARLY_EXIT_SUPPORT, SECTOR_SIZE,
};
use crate::file::{File, FileIndex, FileMaterial};
use crate::matching::approximate_matching;
use crate::ntfs::fmt::{FILE_RECORD_SECTORS, INDX_RECORD_SECTORS};
use crate::ntfs::record::{AttrContent, AttributeBody, Attribute, FileNameAttr, FileRecordHeader};
use crate::ntfs::{parse_boot_sector, parse_file_record, parse_indx_record};
use crate::partition::{merge, Partition};
use crate::sparse::SparseList;
use crate::traits::{read_sectors, BlockSource};

/// Candidate sectors-per-cluster values tried during geometry inference
/// (Step D/E), covering every value NTFS actually allows.
const CANDIDATE_SEC_PER_CLUS: &[u8] = &[1, 2, 4, 8, 16, 32, 64, 128];

/// Raw material extracted from one FILE record, kept around only for the
/// partitions whose record also carries a `$ATTRIBUTE_LIST` or
/// `$INDEX_ALLOCATION` attribute — these need a second pass once the
/// partition's geometry/mft position is known (Step F).
struct PendingRecord {
    position: u64,
    header: FileRecordHeader,
}

/// A successfully parsed INDX record, keyed by position in the map that
/// holds it.
struct IndxHit {
    record: crate::ntfs::IndxRecord,
}

fn file_attr_flags_is_directory(flags: u16) -> bool {
    flags & 0x0002 != 0
}

fn file_attr_flags_is_deleted(flags: u16) -> bool {
    flags & 0x0001 == 0
}

fn data_size(attr: &Attribute) -> u64 {
    match &attr.body {
        AttributeBody::Resident { content_size, .. } => *content_size as u64,
        AttributeBody::NonResident { real_size, .. } => *real_size,
    }
}

/// Builds the pieces `File::assemble` needs from a fully parsed FILE record.
///
/// Grounded on `ntfs.py::NTFSFile.__init__`: names come from every
/// `$FILE_NAME` attribute, but parent/MAC times are read only from the
/// first one (extra `$FILE_NAME`s are hardlinks, which this reconstructor
/// does not attempt to disambiguate).
fn file_material_from_record<'a>(
    header: &FileRecordHeader,
    record_n: i64,
    ads: &'a str,
) -> FileMaterial<'a> {
    let file_names: Vec<&FileNameAttr> = header
        .attr("$FILE_NAME")
        .iter()
        .filter_map(|a| match &a.content {
            Some(AttrContent::FileName(fa)) => Some(fa),
            _ => None,
        })
        .collect();

    let names: Vec<(u8, String)> = file_names
        .iter()
        .filter_map(|fa| fa.name.clone().map(|n| (fa.namespace, n)))
        .collect();

    let first = file_names.first();
    let parent_entry = first.map(|fa| fa.parent_entry as i64);
    let mac = first
        .map(|fa| (fa.modification_time, fa.access_time, fa.creation_time))
        .unwrap_or((None, None, None));

    let size = header
        .attr("$DATA")
        .iter()
        .find(|a| a.own_name == ads)
        .map(data_size);

    FileMaterial {
        record_n,
        names,
        size,
        is_directory: file_attr_flags_is_directory(header.flags),
        is_deleted: file_attr_flags_is_deleted(header.flags),
        parent_entry,
        mac,
        ads,
    }
}

/// Builds a ghost `File` from a bare `$FILE_NAME`, as found inline in an
/// `$INDEX_ROOT` or in a standalone INDX record — there is no FILE record
/// backing it (yet), only what the parent directory's index recorded about
/// it. Grounded on `ntfs.py::add_indx_entries`.
fn ghost_file_from_filename(record_n: u64, fa: &FileNameAttr) -> File {
    const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x1000_0000;
    let material = FileMaterial {
        record_n: record_n as i64,
        names: fa
            .name
            .clone()
            .map(|n| vec![(fa.namespace, n)])
            .unwrap_or_default(),
        size: Some(fa.real_size),
        is_directory: fa.flags & FILE_ATTRIBUTE_DIRECTORY != 0,
        is_deleted: false,
        parent_entry: Some(fa.parent_entry as i64),
        mac: (fa.modification_time, fa.access_time, fa.creation_time),
        ads: "",
    };
    File::assemble(material, None, true)
}

/// Runs the full Steps A-G reconstruction pipeline over every sector
/// position the scanner classified while collecting.
pub fn reconstruct(
    found_file: &HashSet<u64>,
    found_indx: &HashSet<u64>,
    found_boot: &[u64],
    found_spc: &[u8],
    image: &mut dyn BlockSource,
    config: &ScanConfig,
) -> HashMap<u64, Partition> {
    // Step E's candidate set is the fixed power-of-two list unioned with
    // whatever `sectors_per_cluster` values boot sectors elsewhere on the
    // image actually reported.
    let mut candidate_sec_per_clus: Vec<u8> = CANDIDATE_SEC_PER_CLUS.to_vec();
    for &spc in found_spc {
        if !candidate_sec_per_clus.contains(&spc) {
            candidate_sec_per_clus.push(spc);
        }
    }
    // --- Step A: parse every FILE record, bucket by its inferred MFT start.
    //
    // `offset` here is the position of record #0 of whichever MFT this
    // record belongs to, derived from the record's own number — the same
    // trick `ntfs.py` uses to cluster MFT entries before any partition
    // geometry is known.
    let mut partitioned_files: HashMap<u64, HashMap<FileIndex, File>> = HashMap::new();
    let mut pending: HashMap<u64, Vec<PendingRecord>> = HashMap::new();

    let mut file_positions: Vec<u64> = found_file.iter().copied().collect();
    file_positions.sort_unstable();

    for position in file_positions {
        let raw = read_sectors(image, position, FILE_RECORD_SECTORS, SECTOR_SIZE);
        let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
        if !header.valid {
            continue;
        }
        let Some(record_n) = header.record_n else {
            continue;
        };
        let mft_start = position.saturating_sub(record_n * FILE_RECORD_SECTORS);
        let bucket = partitioned_files.entry(mft_start).or_default();

        let primary = File::assemble(
            file_material_from_record(&header, record_n as i64, ""),
            Some(position),
            false,
        );
        bucket.insert(primary.index.clone(), primary);

        for data_attr in header.attr("$DATA") {
            if data_attr.own_name.is_empty() {
                continue;
            }
            let ads = File::assemble(
                file_material_from_record(&header, record_n as i64, &data_attr.own_name),
                Some(position),
                false,
            );
            bucket.entry(ads.index.clone()).or_insert(ads);
        }

        for attr in header.attr("$INDEX_ROOT") {
            if let Some(AttrContent::IndexRoot(root)) = &attr.content {
                for entry in &root.records {
                    if let Some(fa) = &entry.file_name {
                        let ghost = ghost_file_from_filename(entry.record_n, fa);
                        bucket.entry(ghost.index.clone()).or_insert(ghost);
                    }
                }
            }
        }

        if !header.attr("$ATTRIBUTE_LIST").is_empty() || !header.attr("$INDEX_ALLOCATION").is_empty()
        {
            pending.entry(mft_start).or_default().push(PendingRecord {
                position,
                header,
            });
        }
    }

    // --- Step A2: parse every INDX record, inferring the owning directory
    // as the most common parent among its entries.
    let mut parsed_indx: HashMap<u64, IndxHit> = HashMap::new();
    let mut indx_list_data: Vec<(u64, u64)> = Vec::new();

    let mut indx_positions: Vec<u64> = found_indx.iter().copied().collect();
    indx_positions.sort_unstable();

    for position in indx_positions {
        let raw = read_sectors(image, position, INDX_RECORD_SECTORS, SECTOR_SIZE);
        let record = parse_indx_record(&raw);
        if !record.valid {
            continue;
        }
        let mut counts: HashMap<u64, u32> = HashMap::new();
        for entry in &record.entries {
            *counts.entry(entry.file_info.parent_entry).or_insert(0) += 1;
        }
        if let Some((&parent, _)) = counts.iter().max_by_key(|(_, &c)| c) {
            indx_list_data.push((position, parent));
        }
        parsed_indx.insert(position, IndxHit { record });
    }
    let indx_list: SparseList<u64> = SparseList::with_default(indx_list_data, 0);

    // --- Step B: pin partitions whose boot sector we found directly.
    let mut partitions: HashMap<u64, Partition> = HashMap::new();
    let mut claimed_mft_starts: HashSet<u64> = HashSet::new();

    for &boot_pos in found_boot {
        let raw = read_sectors(image, boot_pos, 1, SECTOR_SIZE);
        let Some(boot) = parse_boot_sector(&raw) else {
            continue;
        };
        let mft_pos = boot_pos + boot.mft_addr * boot.sectors_per_cluster as u64;
        let Some(&mft_start) = partitioned_files
            .keys()
            .find(|&&key| key >= mft_pos && key - mft_pos < boot.sectors)
        else {
            continue;
        };

        let mut part = Partition::new(Some(mft_pos));
        part.set_offset(boot_pos);
        part.set_size(boot.sectors * SECTOR_SIZE);
        part.set_recoverable(true);
        part.sec_per_clus = Some(boot.sectors_per_cluster);
        part.mftmirr_pos = Some(boot_pos + boot.mftmirr_addr * boot.sectors_per_cluster as u64);

        if let Some(bucket) = partitioned_files.remove(&mft_start) {
            for file in bucket.into_values() {
                part.add_file(file);
            }
        }
        claimed_mft_starts.insert(mft_start);
        partitions.insert(boot_pos, part);
    }

    // --- Step C: repair via $MFTMirr, then drop bogus partitions.
    for part in partitions.values_mut() {
        if part.mftmirr_pos.is_none() {
            if let Some(mirror_pos) = infer_mftmirr_pos(part, image) {
                part.mftmirr_pos = Some(mirror_pos);
            }
        }
        if let Some(mirror_pos) = part.mftmirr_pos {
            add_from_mft_mirror(part, mirror_pos, image);
        }
    }
    partitions.retain(|_, part| {
        !(part.files.len() == 4
            && part
                .files
                .keys()
                .filter_map(|idx| match idx {
                    FileIndex::Record(n) => Some(*n),
                    _ => None,
                })
                .max()
                .is_some_and(|max| max < 4))
    });

    // --- Step D/E: for every MFT cluster that no boot sector claimed, try
    // to infer the partition's offset/sec_per_clus from the INDX layout.
    let mut remaining: Vec<u64> = partitioned_files.keys().copied().collect();
    remaining.sort_unstable();
    for mft_start in remaining {
        let Some(bucket) = partitioned_files.remove(&mft_start) else {
            continue;
        };
        if let Some((offset, sec_per_clus)) = find_boundary(
            &bucket,
            &pending,
            mft_start,
            &indx_list,
            config,
            &candidate_sec_per_clus,
        ) {
            let mut part = Partition::new(Some(mft_start));
            part.set_offset(offset);
            part.set_recoverable(true);
            part.sec_per_clus = Some(sec_per_clus);
            for file in bucket.into_values() {
                part.add_file(file);
            }
            partitions.insert(offset, part);
        } else {
            // No geometry could be inferred: keep the files recoverable but
            // mark the partition as not fully trustworthy, matching
            // spec.md's "recoverable: false" fallback.
            let mut part = Partition::new(Some(mft_start));
            part.set_offset(mft_start);
            part.set_recoverable(false);
            for file in bucket.into_values() {
                part.add_file(file);
            }
            partitions.insert(mft_start, part);
        }
    }

    // --- Step F: finalize each partition (attribute-list ADS integration,
    // INDX-allocation ghost discovery), then rebuild its tree.
    //
    // `pending` is keyed by MFT cluster start (Step A), but the partition
    // map itself is keyed by disk offset for every recoverable partition
    // (`boot_pos` in Step B, inferred `offset` in Step D/E) — only the
    // non-recoverable fallback uses `mft_start` as its map key too. Look the
    // record list up by `part.mft_pos`, not the map key.
    for part in partitions.values_mut() {
        let Some(mft_pos) = part.mft_pos else { continue };
        if let Some(records) = pending.get(&mft_pos) {
            add_from_attribute_list(part, records, image);
            add_from_indx_allocation(part, records, &parsed_indx);
        }
    }

    // --- Step G: stitch back fragmented $MFTs.
    merge_fragmented_mft(&mut partitions, image, config);

    for part in partitions.values_mut() {
        part.rebuild();
    }

    partitions
}

/// Infers `$MFTMirr`'s position from record #1's own `$DATA` runlist when
/// no boot sector supplied it directly.
fn infer_mftmirr_pos(part: &Partition, image: &mut dyn BlockSource) -> Option<u64> {
    let mft_pos = part.mft_pos?;
    let sec_per_clus = part.sec_per_clus.unwrap_or(8) as u64;
    let position = mft_pos + FILE_RECORD_SECTORS; // record #1
    let raw = read_sectors(image, position, FILE_RECORD_SECTORS, SECTOR_SIZE);
    let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
    if !header.valid {
        return None;
    }
    let data = header.attr("$DATA").iter().find(|a| a.own_name.is_empty())?;
    match &data.body {
        AttributeBody::NonResident { runlist, .. } => {
            let first = runlist.first()?;
            let delta = first.offset_delta?;
            let offset = part.offset.unwrap_or(0) as i64 + delta * sec_per_clus as i64;
            Some(offset.max(0) as u64)
        }
        _ => None,
    }
}

/// Re-reads and merges records 0-3 from `$MFTMirr`, repairing whatever the
/// primary MFT copy was missing for those reserved entries.
fn add_from_mft_mirror(part: &mut Partition, mirror_pos: u64, image: &mut dyn BlockSource) {
    for record_n in 0u64..4 {
        let position = mirror_pos + record_n * FILE_RECORD_SECTORS;
        let raw = read_sectors(image, position, FILE_RECORD_SECTORS, SECTOR_SIZE);
        let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
        if !header.valid {
            continue;
        }
        let material = file_material_from_record(&header, record_n as i64, "");
        let file = File::assemble(material, Some(position), false);
        let should_overwrite = match part.files.get(&file.index) {
            None => true,
            Some(existing) => existing.is_ghost,
        };
        if should_overwrite {
            part.add_file(file);
        }
    }
}

/// Builds the pattern of (cluster-relative sector position -> owning
/// record number) from every pending record's `$INDEX_ALLOCATION` runlist,
/// tries each candidate `sec_per_clus`, and matches it against the global
/// `indx_list` to locate this MFT's partition on disk.
///
/// Grounded on `ntfs.py::most_likely_sec_per_clus`/`find_boundary`.
fn find_boundary(
    bucket: &HashMap<FileIndex, File>,
    pending: &HashMap<u64, Vec<PendingRecord>>,
    mft_start: u64,
    indx_list: &SparseList<u64>,
    config: &ScanConfig,
    candidates: &[u8],
) -> Option<(u64, u8)> {
    let records = pending.get(&mft_start)?;
    let mut directory_runlists: Vec<(i64, Vec<crate::ntfs::RunlistEntry>)> = Vec::new();
    for pending_record in records {
        let Some(record_n) = pending_record.header.record_n else {
            continue;
        };
        if !bucket.contains_key(&FileIndex::Record(record_n as i64)) {
            continue;
        }
        for attr in pending_record.header.attr("$INDEX_ALLOCATION") {
            if let AttributeBody::NonResident { runlist, .. } = &attr.body {
                directory_runlists.push((record_n as i64, runlist.clone()));
            }
        }
    }
    if directory_runlists.is_empty() || indx_list.is_empty() {
        return None;
    }

    // Each candidate `sec_per_clus` is evaluated independently against the
    // read-only `indx_list` (no image access), so this fan-out is safe to
    // run with a `rayon` pool when the caller opts in (spec.md §5: "Steps
    // E-G can be executed ... in parallel with no shared state other than
    // the shared image handle" — this inner loop touches no image at all).
    // The sequential path keeps both the early-exit short-circuit and the
    // rising `min_support` high-water mark from
    // `ntfs.py::most_likely_sec_per_clus`; the parallel path can't share
    // that mutable state across candidates without serializing the fan-out
    // it exists to avoid, so it seeds every candidate from
    // `config.min_support` alone. Early-exit never changes which candidate
    // wins, only how many are computed, so the two paths still agree.
    let best = if config.parallel {
        use rayon::prelude::*;
        candidates
            .par_iter()
            .filter_map(|&spc| {
                evaluate_sec_per_clus(
                    &directory_runlists,
                    mft_start,
                    indx_list,
                    config,
                    spc,
                    config.min_support,
                )
            })
            .map(|(candidates, _k, _pct)| candidates)
            .reduce(Vec::new, |mut a, mut b| {
                a.append(&mut b);
                a
            })
            .into_iter()
            .min_by(|a, b| (a.0, a.1).partial_cmp(&(b.0, b.1)).unwrap())
    } else {
        let mut best: Option<(f64, u8, u64)> = None;
        let mut min_support = config.min_support;
        for &sec_per_clus in candidates {
            let Some((candidates, k, pct)) = evaluate_sec_per_clus(
                &directory_runlists,
                mft_start,
                indx_list,
                config,
                sec_per_clus,
                min_support,
            ) else {
                continue;
            };
            min_support = min_support.max(k);
            for candidate in candidates {
                let is_better = match &best {
                    None => true,
                    Some(b) => (candidate.0, candidate.1) < (b.0, b.1),
                };
                if is_better {
                    best = Some(candidate);
                }
            }
            if pct > GEOMETRY_EARLY_EXIT_PERCENTAGE && k > GEOMETRY_EARLY_EXIT_SUPPORT {
                break;
            }
        }
        best
    };

    best.map(|(_, spc, offset)| (offset, spc))
}

/// Builds the (cluster-relative position -> owning record) pattern for one
/// candidate `sec_per_clus` and matches it against `indx_list`. Returns the
/// set of `(pct, sec_per_clus, offset)` candidates this value produced,
/// plus the raw `(k, pct)` the caller needs for the early-exit check.
fn evaluate_sec_per_clus(
    directory_runlists: &[(i64, Vec<crate::ntfs::RunlistEntry>)],
    mft_start: u64,
    indx_list: &SparseList<u64>,
    config: &ScanConfig,
    sec_per_clus: u8,
    min_support: u32,
) -> Option<(Vec<(f64, u8, u64)>, u32, f64)> {
    // One key per run, at its starting cluster — not one per INDX-sized
    // slot within it. `base_pattern[clusters_pos] = record_n`.
    let mut pattern_data: Vec<(u64, u64)> = Vec::new();
    for (record_n, runlist) in directory_runlists {
        let mut cluster_cursor: i64 = 0;
        for run in runlist {
            let Some(delta) = run.offset_delta else {
                cluster_cursor += run.length as i64;
                continue;
            };
            cluster_cursor += delta;
            let run_start_sector = cluster_cursor * sec_per_clus as i64;
            if run_start_sector >= 0 {
                pattern_data.push((run_start_sector as u64, *record_n as u64));
            }
        }
    }
    if pattern_data.is_empty() {
        return None;
    }
    let delta = pattern_data.iter().map(|(k, _)| *k).min().unwrap_or(0);
    // Keep the pattern window bounded: runs whose normalized key would fall
    // past `max_sectors` are dropped rather than letting one outlier run
    // balloon the sparse pattern's `msize`.
    let width = config.max_sectors;
    let normalized: Vec<(u64, u64)> = pattern_data
        .iter()
        .filter(|(k, _)| k - delta <= width)
        .map(|(k, v)| (k - delta, *v))
        .collect();
    if (normalized.len() as u32) < min_support {
        return None;
    }
    let pattern = SparseList::with_default(normalized, 0);

    let stop = mft_start as i64 + delta as i64;
    let (offsets, k, pct) = approximate_matching(indx_list, &pattern, stop, min_support)?;

    let candidates = offsets
        .into_iter()
        .filter_map(|candidate_offset| {
            let resolved = candidate_offset - delta as i64;
            (resolved >= 0).then_some((pct, sec_per_clus, resolved as u64))
        })
        .collect();
    Some((candidates, k, pct))
}

/// Integrates `$ATTRIBUTE_LIST`: for every entry pointing at a different
/// MFT record, re-reads that record to pull in attributes (typically extra
/// `$DATA` ADSes) the base record's inline attribute list didn't carry.
fn add_from_attribute_list(part: &mut Partition, records: &[PendingRecord], image: &mut dyn BlockSource) {
    let Some(mft_pos) = part.mft_pos else { return };
    for pending_record in records {
        let Some(record_n) = pending_record.header.record_n else {
            continue;
        };
        for attr in pending_record.header.attr("$ATTRIBUTE_LIST") {
            let entries = match &attr.content {
                Some(AttrContent::AttributeList(entries)) => entries.clone(),
                _ => {
                    if let AttributeBody::NonResident { .. } = &attr.body {
                        Vec::new()
                    } else {
                        continue;
                    }
                }
            };
            for entry in entries {
                let Some(file_ref) = entry.file_ref else {
                    continue;
                };
                if file_ref as i64 == record_n {
                    continue;
                }
                let position = mft_pos + file_ref * FILE_RECORD_SECTORS;
                let raw = read_sectors(image, position, FILE_RECORD_SECTORS, SECTOR_SIZE);
                let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
                if !header.valid {
                    continue;
                }
                for data_attr in header.attr("$DATA") {
                    let material =
                        file_material_from_record(&pending_record.header, record_n, &data_attr.own_name);
                    let file = File::assemble(material, Some(pending_record.position), false);
                    let should_overwrite = match part.files.get(&file.index) {
                        None => true,
                        Some(existing) => existing.is_ghost,
                    };
                    if should_overwrite {
                        part.add_file(file);
                    }
                }
            }
        }
    }
}

/// Integrates `$INDEX_ALLOCATION`: any INDX record already parsed at a
/// position this runlist accounts for is now attributable to a concrete
/// directory, so its entries become ghost children of that directory.
fn add_from_indx_allocation(
    part: &mut Partition,
    records: &[PendingRecord],
    parsed_indx: &HashMap<u64, IndxHit>,
) {
    let Some(offset) = part.offset.or(part.mft_pos) else {
        return;
    };
    let sec_per_clus = part.sec_per_clus.unwrap_or(8) as u64;
    for pending_record in records {
        let Some(record_n) = pending_record.header.record_n else {
            continue;
        };
        for attr in pending_record.header.attr("$INDEX_ALLOCATION") {
            let AttributeBody::NonResident { runlist, .. } = &attr.body else {
                continue;
            };
            let mut cluster_cursor: i64 = 0;
            for run in runlist {
                let Some(delta) = run.offset_delta else {
                    cluster_cursor += run.length as i64;
                    continue;
                };
                cluster_cursor += delta;
                let run_start_sector = offset as i64 + cluster_cursor * sec_per_clus as i64;
                let run_sectors = run.length * sec_per_clus;
                let mut slot = 0u64;
                while slot < run_sectors {
                    let sector_pos = (run_start_sector as u64).saturating_add(slot);
                    if let Some(hit) = parsed_indx.get(&sector_pos) {
                        for entry in &hit.record.entries {
                            let ghost =
                                ghost_file_from_filename(entry.record_n, &entry.file_info);
                            part.files.entry(ghost.index.clone()).or_insert(ghost);
                        }
                    }
                    slot += INDX_RECORD_SECTORS;
                }
            }
        }
    }
}

/// Walks `$MFT`'s own (record #0) `$DATA` runlist: every run past the first
/// is a fragment of the MFT living at some other cluster. If an
/// unrecoverable partition bucket sits exactly where that fragment implies
/// and doesn't conflict with any non-ghost file already known, it is merged
/// in and dropped from the candidate pool; otherwise the merge is refused
/// and logged (spec.md §9 Open Question #3).
fn merge_fragmented_mft(
    partitions: &mut HashMap<u64, Partition>,
    image: &mut dyn BlockSource,
    _config: &ScanConfig,
) {
    let candidate_keys: Vec<u64> = partitions.keys().copied().collect();
    for key in candidate_keys {
        let Some(part) = partitions.get(&key) else {
            continue;
        };
        let Some(mft_pos) = part.mft_pos else { continue };
        let sec_per_clus = part.sec_per_clus.unwrap_or(8) as u64;

        let raw = read_sectors(image, mft_pos, FILE_RECORD_SECTORS, SECTOR_SIZE);
        let header = parse_file_record(&raw, SECTOR_SIZE, FILE_RECORD_SECTORS);
        if !header.valid {
            continue;
        }
        let Some(data) = header.attr("$DATA").iter().find(|a| a.own_name.is_empty()) else {
            continue;
        };
        let AttributeBody::NonResident { runlist, .. } = &data.body else {
            continue;
        };
        if runlist.len() < 2 {
            continue;
        }

        let mut cluster_cursor: i64 = 0;
        for run in &runlist[1..] {
            let Some(delta) = run.offset_delta else {
                cluster_cursor += run.length as i64;
                continue;
            };
            cluster_cursor += delta;
            let real_pos = mft_pos as i64 + cluster_cursor * sec_per_clus as i64;
            if real_pos < 0 {
                continue;
            }
            let fragment_key = (real_pos as u64).saturating_sub(run.length * sec_per_clus);

            let Some(fragment) = partitions.get(&fragment_key) else {
                continue;
            };
            let conflict = fragment.files.keys().any(|idx| {
                !fragment.files[idx].is_ghost && part.files.contains_key(idx)
            });
            if conflict {
                tracing::warn!(
                    mft = mft_pos,
                    fragment = fragment_key,
                    "refusing to merge conflicting MFT fragment"
                );
                continue;
            }

            let fragment = partitions.remove(&fragment_key).unwrap();
            if let Some(part) = partitions.get_mut(&key) {
                merge(part, fragment);
            }
        }
    }
}
