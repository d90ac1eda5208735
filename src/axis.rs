//! Interval index over cues: batched updates with consolidated change events
//! (§4.3).

use std::collections::{BTreeMap, BTreeSet};

use crate::callback::{EventEmitter, Handle};
use crate::error::AxisError;
use crate::index::{EndpointIndex, IndexedEndpoint};
use crate::interval::Interval;

/// A keyed interval with an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue<K, D> {
    pub key: K,
    pub interval: Interval,
    pub data: D,
}

/// A single batched mutation (§4.3). `Put` both inserts a new cue and
/// replaces an existing one under the same key.
#[derive(Debug, Clone)]
pub enum BatchItem<K, D> {
    Put { key: K, interval: Interval, data: D },
    Remove(K),
}

impl<K, D> BatchItem<K, D> {
    fn key(&self) -> &K {
        match self {
            BatchItem::Put { key, .. } => key,
            BatchItem::Remove(key) => key,
        }
    }
}

/// The net effect of a batch on one key: `old` and `new` are both `None` only
/// transiently (such a record is never emitted — see [`EventRecord::is_noop`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<K, D> {
    pub key: K,
    pub old: Option<Cue<K, D>>,
    pub new: Option<Cue<K, D>>,
}

impl<K, D: PartialEq> EventRecord<K, D> {
    pub fn is_insert(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_noop(&self) -> bool {
        match (&self.old, &self.new) {
            (None, None) => true,
            (Some(old), Some(new)) => old.interval == new.interval && old.data == new.data,
            _ => false,
        }
    }
}

/// Events produced by one [`Axis::update`] call, keyed by the cue key they
/// affect. A key with no net effect never appears here.
pub type EventMap<K, D> = BTreeMap<K, EventRecord<K, D>>;

/// The interval index proper: a `BTreeMap` of live cues plus a parallel
/// [`EndpointIndex`] for range queries (§4.3).
pub struct Axis<K, D> {
    cues: BTreeMap<K, Cue<K, D>>,
    index: EndpointIndex<K>,
    emitter: EventEmitter<EventMap<K, D>>,
}

impl<K: Ord + Clone, D: Clone> Default for Axis<K, D> {
    fn default() -> Self {
        Self {
            cues: BTreeMap::new(),
            index: EndpointIndex::new(),
            emitter: EventEmitter::new(),
        }
    }
}

impl<K: Ord + Clone, D: Clone + PartialEq> Axis<K, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Cue<K, D>> {
        self.cues.get(key)
    }

    pub fn add_callback<F>(&mut self, callback: F) -> Handle
    where
        F: Fn(&EventMap<K, D>) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    pub fn remove_callback(&mut self, handle: Handle) -> bool {
        self.emitter.unsubscribe(handle)
    }

    /// Every live cue overlapping `query`, in key order.
    pub fn lookup(&self, query: &Interval) -> Vec<Cue<K, D>> {
        self.cues
            .values()
            .filter(|cue| cue.interval.relation(query).overlaps())
            .cloned()
            .collect()
    }

    /// Applies `batch` atomically against validation (all intervals are
    /// checked up front; a single invalid interval fails the whole batch with
    /// no mutation applied), then folds explicit removes/puts — including a
    /// Remove and Put of the same key within one batch — into a single
    /// consolidated [`EventMap`] per touched key (§4.3).
    pub fn update(&mut self, batch: Vec<BatchItem<K, D>>) -> Result<EventMap<K, D>, AxisError> {
        for item in &batch {
            if let BatchItem::Put { interval, .. } = item {
                interval.validate()?;
            }
        }

        let touched: BTreeSet<K> = batch.iter().map(|item| item.key().clone()).collect();
        let snapshot: BTreeMap<K, Option<Cue<K, D>>> =
            touched.iter().map(|k| (k.clone(), self.cues.get(k).cloned())).collect();

        let mut index_remove = Vec::new();
        let mut index_insert = Vec::new();

        // §4.3: deletions are applied before insertions within a batch,
        // regardless of the order they appear in `batch` itself — a
        // Remove and Put of the same key combine into a replacement, not
        // whichever happened to be listed last.
        let (removes, puts): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|item| matches!(item, BatchItem::Remove(_)));

        for item in removes {
            if let BatchItem::Remove(key) = item {
                if let Some(cue) = self.cues.remove(&key) {
                    index_remove.push(IndexedEndpoint::new(cue.interval.low_endpoint(), key.clone()));
                    index_remove.push(IndexedEndpoint::new(cue.interval.high_endpoint(), key));
                }
            }
        }
        for item in puts {
            if let BatchItem::Put { key, interval, data } = item {
                if let Some(old) = self.cues.remove(&key) {
                    index_remove.push(IndexedEndpoint::new(old.interval.low_endpoint(), key.clone()));
                    index_remove.push(IndexedEndpoint::new(old.interval.high_endpoint(), key.clone()));
                }
                index_insert.push(IndexedEndpoint::new(interval.low_endpoint(), key.clone()));
                index_insert.push(IndexedEndpoint::new(interval.high_endpoint(), key.clone()));
                self.cues.insert(key.clone(), Cue { key, interval, data });
            }
        }

        self.index.update(&index_remove, index_insert);

        let mut events = EventMap::new();
        for key in touched {
            let old = snapshot.get(&key).cloned().flatten();
            let new = self.cues.get(&key).cloned();
            let record = EventRecord { key: key.clone(), old, new };
            if !record.is_noop() {
                events.insert(key, record);
            }
        }

        self.emitter.emit(&events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &str, low: f64, high: f64, data: i32) -> BatchItem<String, i32> {
        BatchItem::Put {
            key: key.to_string(),
            interval: Interval::closed(low, high),
            data,
        }
    }

    #[test]
    fn insert_produces_insert_event() {
        let mut axis: Axis<String, i32> = Axis::new();
        let events = axis.update(vec![put("a", 0.0, 5.0, 1)]).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events["a"].is_insert());
    }

    #[test]
    fn remove_produces_delete_event() {
        let mut axis: Axis<String, i32> = Axis::new();
        axis.update(vec![put("a", 0.0, 5.0, 1)]).unwrap();
        let events = axis.update(vec![BatchItem::Remove("a".to_string())]).unwrap();
        assert!(events["a"].is_delete());
        assert_eq!(axis.len(), 0);
    }

    #[test]
    fn replace_with_identical_values_is_noop() {
        let mut axis: Axis<String, i32> = Axis::new();
        axis.update(vec![put("a", 0.0, 5.0, 1)]).unwrap();
        let events = axis
            .update(vec![BatchItem::Remove("a".to_string()), put("a", 0.0, 5.0, 1)])
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn replace_in_same_batch_yields_single_change_event() {
        let mut axis: Axis<String, i32> = Axis::new();
        axis.update(vec![put("a", 0.0, 5.0, 1)]).unwrap();
        let events = axis
            .update(vec![BatchItem::Remove("a".to_string()), put("a", 10.0, 20.0, 2)])
            .unwrap();
        assert_eq!(events.len(), 1);
        let record = &events["a"];
        assert!(!record.is_insert());
        assert!(!record.is_delete());
        assert!(!record.is_noop());
        assert_eq!(record.old.as_ref().unwrap().data, 1);
        assert_eq!(record.new.as_ref().unwrap().data, 2);
    }

    #[test]
    fn removing_absent_key_yields_no_event() {
        let mut axis: Axis<String, i32> = Axis::new();
        let events = axis.update(vec![BatchItem::Remove("ghost".to_string())]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn invalid_interval_fails_whole_batch() {
        let mut axis: Axis<String, i32> = Axis::new();
        let result = axis.update(vec![
            put("ok", 0.0, 1.0, 1),
            BatchItem::Put {
                key: "a".to_string(),
                interval: crate::interval::Interval {
                    low: 10.0,
                    high: 0.0,
                    low_include: true,
                    high_include: true,
                },
                data: 1,
            },
        ]);
        assert!(result.is_err());
        assert_eq!(axis.len(), 0);
    }

    #[test]
    fn lookup_filters_by_overlap() {
        let mut axis: Axis<String, i32> = Axis::new();
        axis.update(vec![put("a", 0.0, 5.0, 1), put("b", 10.0, 15.0, 2)]).unwrap();
        let found = axis.lookup(&Interval::point(3.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "a");
    }

    #[test]
    fn put_before_remove_in_batch_order_still_replaces() {
        // §4.3: deletions process before insertions regardless of the
        // order items are listed in the batch, so a Put followed by a
        // Remove of the same key still nets out as a replacement.
        let mut axis: Axis<String, i32> = Axis::new();
        axis.update(vec![put("a", 0.0, 5.0, 1)]).unwrap();
        let events = axis
            .update(vec![put("a", 10.0, 20.0, 2), BatchItem::Remove("a".to_string())])
            .unwrap();
        assert!(axis.get(&"a".to_string()).is_some());
        let record = &events["a"];
        assert!(!record.is_delete());
        assert_eq!(record.new.as_ref().unwrap().data, 2);
    }
}
