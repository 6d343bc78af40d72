//! `SparseList<V>` — a mapping from non-negative integer position to value,
//! with a `default`.
//!
//! Grounded on `logic.py::SparseList`. The key space can span billions of
//! sector indices (spec.md §9, "Resist the temptation to model it as a
//! dense sequence"), so this is a sorted key vector backed by a hash map,
//! not a `Vec<Option<V>>`.
//!
//! Invariants (spec.md §3): `keys` is sorted; `elements[k] != default` for
//! every `k` in `keys`; `len() == last_key + 1` (or `0` if empty).

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct SparseList<V> {
    keys: Vec<u64>,
    elements: HashMap<u64, V>,
    default: V,
}

impl<V: Clone + PartialEq> SparseList<V> {
    /// Builds a `SparseList` from an explicit set of positions, with the
    /// given default for unset positions.
    pub fn with_default(data: impl IntoIterator<Item = (u64, V)>, default: V) -> Self {
        let elements: HashMap<u64, V> = data.into_iter().collect();
        let mut keys: Vec<u64> = elements.keys().copied().collect();
        keys.sort_unstable();
        Self {
            keys,
            elements,
            default,
        }
    }

    /// Number of possible positions: `last_key + 1`, or `0` if empty.
    pub fn len(&self) -> u64 {
        self.keys.last().map_or(0, |k| k + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Gets the value at `index`, or the default if unset.
    pub fn get(&self, index: u64) -> V {
        self.elements.get(&index).cloned().unwrap_or_else(|| self.default.clone())
    }

    /// Sets `index` to `item`. Setting a value equal to the default removes
    /// the key (keeping the sparse invariant).
    pub fn set(&mut self, index: u64, item: V) {
        if item == self.default {
            if self.elements.remove(&index).is_some() {
                if let Ok(pos) = self.keys.binary_search(&index) {
                    self.keys.remove(pos);
                }
            }
        } else {
            if !self.elements.contains_key(&index) {
                let pos = self.keys.binary_search(&index).unwrap_or_else(|p| p);
                self.keys.insert(pos, index);
            }
            self.elements.insert(index, item);
        }
    }

    /// Whether `value` appears anywhere among the set elements.
    pub fn contains_value(&self, value: &V) -> bool {
        self.elements.values().any(|v| v == value)
    }

    /// Iterates populated keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().copied()
    }

    /// Iterates populated keys in descending order.
    pub fn keys_rev(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().rev().copied()
    }

    /// Iterates populated values, in ascending-key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.keys.iter().map(move |k| &self.elements[k])
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Iterates `(key, value)` pairs in ascending-key order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.keys.iter().map(move |&k| (k, &self.elements[k]))
    }

    /// Deletes all keys in the half-open interval `[bottom, top)`. If
    /// `bottom > top`, deletes keys *outside* `[top, bottom)` instead
    /// (wraparound semantics used by the approximate matcher's cyclic
    /// `count` buffer).
    pub fn wipe_interval(&mut self, bottom: u64, top: u64) {
        if bottom > top {
            self.keys.retain(|&k| {
                let keep = top <= k && k < bottom;
                if !keep {
                    self.elements.remove(&k);
                }
                keep
            });
        } else {
            self.keys.retain(|&k| {
                let drop = bottom <= k && k < top;
                if drop {
                    self.elements.remove(&k);
                }
                !drop
            });
        }
    }
}

impl<V: Clone + PartialEq + Default> SparseList<V> {
    pub fn new(data: impl IntoIterator<Item = (u64, V)>) -> Self {
        Self::with_default(data, V::default())
    }
}

impl<V: Clone + PartialEq + Eq + Hash> SparseList<V> {
    /// Same as `contains_value` but via a hash lookup, used when V is
    /// hashable (the approximate matcher's symbol type).
    pub fn contains_value_hashed(&self, value: &V) -> bool {
        self.elements.values().any(|v| v == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_has_zero_len() {
        let l: SparseList<i32> = SparseList::new([]);
        assert_eq!(l.len(), 0);
        assert!(l.is_empty());
    }

    #[test]
    fn len_is_last_key_plus_one() {
        let l = SparseList::new([(3u64, 1i32), (7, 2), (1, 9)]);
        assert_eq!(l.len(), 8);
        assert_eq!(l.keys().collect::<Vec<_>>(), vec![1, 3, 7]);
    }

    #[test]
    fn get_returns_default_for_unset() {
        let l = SparseList::new([(3u64, 5i32)]);
        assert_eq!(l.get(3), 5);
        assert_eq!(l.get(4), 0);
    }

    #[test]
    fn set_default_value_removes_key() {
        let mut l = SparseList::new([(3u64, 5i32)]);
        l.set(3, 0);
        assert!(l.is_empty());
        assert_eq!(l.get(3), 0);
    }

    #[test]
    fn set_preserves_sorted_keys() {
        let mut l: SparseList<i32> = SparseList::new([]);
        l.set(5, 1);
        l.set(1, 1);
        l.set(3, 1);
        assert_eq!(l.keys().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn wipe_interval_normal_range() {
        let mut l = SparseList::new([(1u64, 1i32), (2, 1), (3, 1), (4, 1)]);
        l.wipe_interval(2, 4);
        assert_eq!(l.keys().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn wipe_interval_wraparound_range() {
        // bottom > top: deletes everything outside [top, bottom)
        let mut l = SparseList::new([(0u64, 1i32), (1, 1), (2, 1), (3, 1), (4, 1)]);
        l.wipe_interval(4, 1);
        // keeps [1, 4)
        assert_eq!(l.keys().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn values_iterates_in_key_order() {
        let l = SparseList::new([(5u64, "e"), (1, "a"), (3, "c")]);
        assert_eq!(l.values().copied().collect::<Vec<_>>(), vec!["a", "c", "e"]);
    }

    #[test]
    fn contains_value_matches_any_element() {
        let l = SparseList::new([(1u64, 7i32), (2, 9)]);
        assert!(l.contains_value(&9));
        assert!(!l.contains_value(&42));
    }

    proptest::proptest! {
        // get(k) always reflects the most recent set(k, _), and len() tracks
        // the highest key ever populated (spec.md §3's sparse invariants).
        #[test]
        fn get_after_set_round_trips(
            ops in proptest::collection::vec((0u64..200, -100i32..100), 0..200)
        ) {
            let mut model: std::collections::HashMap<u64, i32> = std::collections::HashMap::new();
            let mut list: SparseList<i32> = SparseList::new([]);
            for (key, value) in ops {
                model.insert(key, value);
                list.set(key, value);
                proptest::prop_assert_eq!(list.get(key), value);
            }
            for (&key, &value) in &model {
                proptest::prop_assert_eq!(list.get(key), value);
            }
            let max_populated_key = model
                .iter()
                .filter(|&(_, &value)| value != 0)
                .map(|(&key, _)| key)
                .max();
            proptest::prop_assert_eq!(list.len(), max_populated_key.map_or(0, |k| k + 1));
        }
    }
}
