//! Sorted endpoint index: a sorted sequence of endpoints with binary search
//! and bulk update (§4.2).

use crate::endpoint::Endpoint;
use crate::interval::Interval;

/// An endpoint tagged with the key of the cue it belongs to, so the index can
/// be mapped back to cue membership during lookups.
#[derive(Debug, Clone)]
pub struct IndexedEndpoint<K> {
    pub endpoint: Endpoint,
    pub owner: K,
}

impl<K> IndexedEndpoint<K> {
    pub fn new(endpoint: Endpoint, owner: K) -> Self {
        Self { endpoint, owner }
    }
}

impl<K: PartialEq> PartialEq for IndexedEndpoint<K> {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint && self.owner == other.owner
    }
}

/// Batches at or below this combined size are mutated by locating and
/// splicing each change individually; larger batches are rebuilt via
/// flag/concat/sort/dedup (§4.2).
const SPLICE_THRESHOLD: usize = 100;

/// A sorted, duplicate-free sequence of [`IndexedEndpoint`]s.
#[derive(Debug, Clone)]
pub struct EndpointIndex<K> {
    entries: Vec<IndexedEndpoint<K>>,
}

impl<K> Default for EndpointIndex<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Clone + PartialEq> EndpointIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Raw binary search. Returns the index if `endpoint` is present, or the
    /// bitwise complement of the insertion point otherwise — callers
    /// disambiguate `0` via [`EndpointIndex::is_found`], per the documented
    /// convention (§4.2).
    pub fn index_of(&self, endpoint: &Endpoint) -> i64 {
        match self.entries.binary_search_by(|e| e.endpoint.cmp(endpoint)) {
            Ok(i) => i as i64,
            Err(i) => !(i as i64),
        }
    }

    pub const fn is_found(index: i64) -> bool {
        index >= 0
    }

    fn insertion_point(index: i64) -> usize {
        if index >= 0 {
            index as usize
        } else {
            !index as usize
        }
    }

    /// Index of the greatest entry strictly less than `x`, if any.
    pub fn lt_index(&self, x: &Endpoint) -> Option<usize> {
        let point = Self::insertion_point(self.index_of(x));
        if point == 0 {
            None
        } else {
            Some(point - 1)
        }
    }

    /// Index of the greatest entry less than or equal to `x`, if any.
    pub fn le_index(&self, x: &Endpoint) -> Option<usize> {
        let idx = self.index_of(x);
        if Self::is_found(idx) {
            Some(idx as usize)
        } else {
            self.lt_index(x)
        }
    }

    /// Index of the least entry strictly greater than `x`, if any.
    pub fn gt_index(&self, x: &Endpoint) -> Option<usize> {
        let idx = self.index_of(x);
        let start = if Self::is_found(idx) {
            idx as usize + 1
        } else {
            Self::insertion_point(idx)
        };
        (start < self.entries.len()).then_some(start)
    }

    /// Index of the least entry greater than or equal to `x`, if any.
    pub fn ge_index(&self, x: &Endpoint) -> Option<usize> {
        let idx = self.index_of(x);
        if Self::is_found(idx) {
            Some(idx as usize)
        } else {
            self.gt_index(x)
        }
    }

    pub fn min(&self) -> Option<&Endpoint> {
        self.entries.first().map(|e| &e.endpoint)
    }

    pub fn max(&self) -> Option<&Endpoint> {
        self.entries.last().map(|e| &e.endpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedEndpoint<K>> {
        self.entries.iter()
    }

    /// Endpoints whose value is contained in `interval`, respecting its
    /// inclusivity.
    pub fn lookup<'a>(&'a self, interval: &'a Interval) -> impl Iterator<Item = &'a IndexedEndpoint<K>> {
        self.entries.iter().filter(move |e| interval.covers(e.endpoint.value))
    }

    /// Bulk mutation: removes `to_remove`, then inserts `to_insert`,
    /// preserving sort order. Idempotent — duplicate insertions and absent
    /// removals are silently ignored, so the post-state is always the set
    /// difference `(prev ∪ to_insert) \ to_remove` (§4.2).
    pub fn update(&mut self, to_remove: &[IndexedEndpoint<K>], to_insert: Vec<IndexedEndpoint<K>>) {
        if to_remove.len() + to_insert.len() <= SPLICE_THRESHOLD {
            for victim in to_remove {
                if let Some(pos) = self.entries.iter().position(|e| e == victim) {
                    self.entries.remove(pos);
                }
            }
            for entry in to_insert {
                if self.entries.iter().any(|e| *e == entry) {
                    continue;
                }
                let pos = Self::insertion_point(self.index_of(&entry.endpoint));
                self.entries.insert(pos, entry);
            }
        } else {
            self.entries.retain(|e| !to_remove.iter().any(|victim| victim == e));
            for entry in to_insert {
                if !self.entries.iter().any(|e| *e == entry) {
                    self.entries.push(entry);
                }
            }
            self.entries.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        }
    }
}
