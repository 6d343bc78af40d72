//! Sparse approximate string matching (Baeza-Yates-Perleberg filter).
//!
//! Grounded on `logic.py::preprocess_pattern`/`approximate_matching`. Used
//! by the partition reconstructor (spec.md §4.5 Step E) to infer a
//! partition's byte offset and sectors-per-cluster when no boot sector
//! pins it, by aligning an observed `$INDEX_ALLOCATION` runlist pattern
//! against the global set of discovered INDX positions.
//!
//! Monomorphized to `u64` symbols (NTFS record numbers) rather than kept
//! generic: every call site in this crate matches record numbers against
//! record numbers, so a type parameter would only add ceremony without a
//! second instantiation to justify it.

use crate::sparse::SparseList;
use std::collections::{HashMap, HashSet};

/// Preprocesses a pattern for approximate matching: for every distinct
/// symbol in the pattern, the list of `(pattern_len - k - 1)` offsets at
/// which it occurs.
///
/// Consecutive occurrences of the same symbol are coalesced unless the
/// symbol's numeric value happens to equal the previously recorded offset
/// — reproduced exactly from the original dedup check, which compares the
/// symbol to the last stored offset rather than to the previous symbol.
pub fn preprocess_pattern(pattern: &SparseList<u64>) -> HashMap<u64, Vec<i64>> {
    let mut result: HashMap<u64, Vec<i64>> = HashMap::new();
    let length = pattern.len() as i64;
    for (k, &name) in pattern.iter() {
        let off = length - k as i64 - 1;
        match result.get_mut(&name) {
            None => {
                result.insert(name, vec![off]);
            }
            Some(v) => {
                let last = *v.last().expect("non-empty offset list");
                if name as i64 != last {
                    v.push(off);
                }
            }
        }
    }
    result
}

/// Result of a successful match: the candidate starting offsets, the
/// achieved support (`k`), and the support expressed as a fraction of the
/// pattern's distinct key count.
pub type MatchResult = (HashSet<i64>, u32, f64);

/// Finds the best alignment(s) of `pattern` within `records`.
///
/// `k_min` is both the minimum acceptable support and, across the scan, a
/// monotonically rising high-water mark — mutated as better candidates are
/// found, exactly as the source's `k` parameter is used (spec.md §9's open
/// question: "the author intends it as a monotonically rising high-water
/// mark per call", pinned as written). The scan stops once `i` exceeds
/// `stop + pattern.len() - 1`.
///
/// Returns `None` if either sequence is empty or no alignment reaches
/// `k_min` support.
pub fn approximate_matching(
    records: &SparseList<u64>,
    pattern: &SparseList<u64>,
    stop: i64,
    k_min: u32,
) -> Option<MatchResult> {
    let msize = pattern.len();
    if records.is_empty() || msize == 0 {
        return None;
    }

    let lookup = preprocess_pattern(pattern);
    let mut count: SparseList<u32> = SparseList::with_default([], 0);
    let mut match_offsets: HashSet<i64> = HashSet::new();
    let mut k = k_min;
    let mut j: u64 = 0;

    for i in records.keys() {
        if i as i64 > stop + msize as i64 - 1 {
            break;
        }

        count.wipe_interval(j % msize, i % msize);
        j = i;

        let symbol = records.get(i);
        if let Some(offsets) = lookup.get(&symbol) {
            let offset_set: HashSet<i64> = offsets.iter().copied().collect();
            for off in offset_set {
                let pos = (i as i64 + off).rem_euclid(msize as i64) as u64;
                let score = count.get(pos) + 1;
                count.set(pos, score);
                if score == k {
                    match_offsets.insert(i as i64 + off - msize as i64 + 1);
                } else if score > k {
                    k = score;
                    match_offsets.clear();
                    match_offsets.insert(i as i64 + off - msize as i64 + 1);
                }
            }
        }
    }

    if match_offsets.is_empty() {
        return None;
    }

    let support_fraction = k as f64 / pattern.num_keys() as f64;
    tracing::debug!(
        offsets = ?match_offsets,
        weight = k,
        percent = support_fraction * 100.0,
        "approximate match found"
    );
    Some((match_offsets, k, support_fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_pattern_is_found_at_offset() {
        // text: 10 20 30 40 50 60 at positions 0..6
        // pattern: 30 40 50 embedded at position 2
        let records = SparseList::new([
            (0u64, 10u64),
            (1, 20),
            (2, 30),
            (3, 40),
            (4, 50),
            (5, 60),
        ]);
        let pattern = SparseList::new([(0u64, 30u64), (1, 40), (2, 50)]);
        let (offsets, k, pct) = approximate_matching(&records, &pattern, 10, 1).unwrap();
        assert!(offsets.contains(&2));
        assert_eq!(k, 3);
        assert_eq!(pct, 1.0);
    }

    #[test]
    fn empty_pattern_or_text_yields_none() {
        let empty: SparseList<u64> = SparseList::new([]);
        let pattern = SparseList::new([(0u64, 1u64)]);
        assert!(approximate_matching(&empty, &pattern, 10, 1).is_none());
        assert!(approximate_matching(&pattern, &empty, 10, 1).is_none());
    }

    #[test]
    fn no_match_below_k_min_returns_none() {
        let records = SparseList::new([(0u64, 1u64), (1, 2), (2, 3)]);
        let pattern = SparseList::new([(0u64, 99u64)]);
        assert!(approximate_matching(&records, &pattern, 10, 1).is_none());
    }

    #[test]
    fn preprocess_pattern_records_offsets_per_symbol() {
        let pattern = SparseList::new([(0u64, 5u64), (1, 6), (2, 5)]);
        let lookup = preprocess_pattern(&pattern);
        // length = 3; offsets = length - k - 1
        assert_eq!(lookup.get(&6), Some(&vec![1i64]));
        assert!(lookup.get(&5).is_some());
    }
}
