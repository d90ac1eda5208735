//! Reconciliation state machine: turns axis events, timing changes, and
//! scheduler firings into a coherent enter/change/exit stream over an active
//! set (§4.6).

use std::collections::BTreeMap;

use crate::axis::{Axis, Cue, EventMap};
use crate::error::SequencerError;
use crate::interval::Interval;
use crate::motion::{motion_delta, MotionVector, MoveDelta, PosDelta};
use crate::scheduler::{Direction, Scheduler, SchedulerState, DEFAULT_LOOKAHEAD};

/// A change to the active set: `old == None` is an enter, `new == None` is an
/// exit, both `Some` with different payload/interval is a change-in-place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord<K, D> {
    pub key: K,
    pub old: Option<Cue<K, D>>,
    pub new: Option<Cue<K, D>>,
}

impl<K, D> ChangeRecord<K, D> {
    pub fn is_enter(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_exit(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_change(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }
}

/// Whether the sequencer has been anchored to a timing source yet (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unready,
    Ready,
}

/// Drives an [`Axis`] and a [`Scheduler`] to maintain a coherent active set
/// as position changes — by discrete jump, by axis mutation, or by motion
/// crossing a cue boundary (§4.6).
pub struct Sequencer<K, D> {
    ready: ReadyState,
    active: BTreeMap<K, Cue<K, D>>,
    vector: Option<MotionVector>,
    scheduler: Scheduler<K, D>,
}

impl<K: Ord + Clone, D: Clone + PartialEq> Sequencer<K, D> {
    pub fn new() -> Self {
        Self::with_lookahead(DEFAULT_LOOKAHEAD)
    }

    pub fn with_lookahead(lookahead: f64) -> Self {
        Self {
            ready: ReadyState::Unready,
            active: BTreeMap::new(),
            vector: None,
            scheduler: Scheduler::new(lookahead),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready == ReadyState::Ready
    }

    pub fn has(&self, key: &K) -> bool {
        self.active.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&Cue<K, D>> {
        self.active.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.active.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Cue<K, D>> {
        self.active.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &Cue<K, D>)> {
        self.active.iter()
    }

    pub fn size(&self) -> usize {
        self.active.len()
    }

    fn require_ready(&self) -> Result<(), SequencerError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SequencerError::Unready)
        }
    }

    /// Latches `Unready -> Ready` exactly once, seeding the active set at
    /// `vector`'s position and arming the scheduler. A second call is a
    /// no-op returning no records (§4.6 Readiness).
    pub fn mark_ready(&mut self, axis: &Axis<K, D>, vector: MotionVector, now: f64) -> Vec<ChangeRecord<K, D>> {
        if self.is_ready() {
            return Vec::new();
        }
        self.ready = ReadyState::Ready;
        self.vector = Some(vector);

        let point = Interval::point(vector.position_at(now));
        let mut records = Vec::new();
        for cue in axis.lookup(&point) {
            records.push(ChangeRecord {
                key: cue.key.clone(),
                old: None,
                new: Some(cue.clone()),
            });
            self.active.insert(cue.key.clone(), cue);
        }

        self.scheduler.set_vector(&vector, now, axis);
        records
    }

    /// Reconciles an [`EventMap`] produced by [`Axis::update`] against the
    /// active set, reporting only records with observable effect (§4.6 Axis
    /// events).
    pub fn on_axis_event(&mut self, axis: &Axis<K, D>, events: &EventMap<K, D>, now: f64) -> Result<Vec<ChangeRecord<K, D>>, SequencerError> {
        self.require_ready()?;
        let vector = self.vector.expect("ready implies a vector");
        let position = vector.position_at(now);

        let mut records = Vec::new();
        for (key, event) in events {
            let was_active = self.active.contains_key(key);
            let should_be_active = event.new.as_ref().is_some_and(|cue| cue.interval.covers(position));

            match (was_active, should_be_active) {
                (false, true) => {
                    let cue = event.new.clone().expect("should_be_active implies new is Some");
                    records.push(ChangeRecord {
                        key: key.clone(),
                        old: None,
                        new: Some(cue.clone()),
                    });
                    self.active.insert(key.clone(), cue);
                }
                (true, false) => {
                    let old = self.active.remove(key);
                    records.push(ChangeRecord { key: key.clone(), old, new: None });
                }
                (true, true) => {
                    let new = event.new.clone().expect("should_be_active implies new is Some");
                    let old = self.active.insert(key.clone(), new.clone());
                    if old.as_ref() != Some(&new) {
                        records.push(ChangeRecord {
                            key: key.clone(),
                            old,
                            new: Some(new),
                        });
                    }
                }
                (false, false) => {}
            }
        }

        self.scheduler.set_vector(&vector, now, axis);
        Ok(records)
    }

    /// Applies a new motion vector, optionally treating it as the initial
    /// anchor (re-seeding the active set rather than diffing against the
    /// previous one), and re-arms the scheduler unconditionally (§4.6 Timing
    /// changes).
    pub fn on_timing_change(
        &mut self,
        axis: &Axis<K, D>,
        new_vector: MotionVector,
        init: bool,
        now: f64,
    ) -> Result<Vec<ChangeRecord<K, D>>, SequencerError> {
        self.require_ready()?;
        let old_vector = self.vector.expect("ready implies a vector");

        let records = if init {
            self.reseed_active_set(axis, &new_vector, now)
        } else {
            let delta = motion_delta(&old_vector, &new_vector);
            if delta.pos == PosDelta::Change || delta.movement == MoveDelta::Stop {
                self.reseed_active_set(axis, &new_vector, now)
            } else {
                Vec::new()
            }
        };

        self.vector = Some(new_vector);
        self.scheduler.set_vector(&new_vector, now, axis);
        Ok(records)
    }

    fn reseed_active_set(&mut self, axis: &Axis<K, D>, vector: &MotionVector, now: f64) -> Vec<ChangeRecord<K, D>> {
        let point = Interval::point(vector.position_at(now));
        let should_be_active: BTreeMap<K, Cue<K, D>> = axis
            .lookup(&point)
            .into_iter()
            .map(|cue| (cue.key.clone(), cue))
            .collect();

        let mut records = Vec::new();
        for key in self.active.keys().cloned().collect::<Vec<_>>() {
            if !should_be_active.contains_key(&key) {
                let old = self.active.remove(&key);
                records.push(ChangeRecord { key, old, new: None });
            }
        }
        for (key, cue) in should_be_active {
            if !self.active.contains_key(&key) {
                records.push(ChangeRecord {
                    key: key.clone(),
                    old: None,
                    new: Some(cue.clone()),
                });
                self.active.insert(key, cue);
            }
        }
        records
    }

    /// Drains due scheduler predictions and folds each crossing into an
    /// enter or exit, pairing a singular endpoint's simultaneous enter+exit
    /// into both records (§4.6 Scheduler events). Once the fired batch
    /// drains the prefetch window empty, re-arms the scheduler against
    /// `axis` so continuous motion keeps producing crossings beyond one
    /// lookahead (§4.5).
    pub fn poll_scheduler(&mut self, axis: &Axis<K, D>, now: f64) -> Result<Vec<ChangeRecord<K, D>>, SequencerError> {
        self.require_ready()?;
        let vector = self.vector.expect("ready implies a vector");
        let fired = self.scheduler.fire_due(now);

        let mut records = Vec::new();
        for item in fired {
            let key = item.cue.key.clone();
            let entering = match item.direction {
                Direction::Forward => !item.endpoint.right || item.endpoint.singular,
                Direction::Backward => item.endpoint.right || item.endpoint.singular,
            };

            if item.endpoint.singular {
                if self.active.contains_key(&key) {
                    let old = self.active.remove(&key);
                    records.push(ChangeRecord { key: key.clone(), old, new: None });
                } else {
                    records.push(ChangeRecord {
                        key: key.clone(),
                        old: None,
                        new: Some(item.cue.clone()),
                    });
                    self.active.insert(key.clone(), item.cue.clone());
                    let old = self.active.remove(&key);
                    records.push(ChangeRecord { key, old, new: None });
                }
                continue;
            }

            if entering {
                if !self.active.contains_key(&key) {
                    records.push(ChangeRecord {
                        key: key.clone(),
                        old: None,
                        new: Some(item.cue.clone()),
                    });
                    self.active.insert(key, item.cue);
                }
            } else if self.active.contains_key(&key) {
                let old = self.active.remove(&key);
                records.push(ChangeRecord { key, old, new: None });
            }
        }

        if self.scheduler.state() == SchedulerState::Idle {
            self.scheduler.set_vector(&vector, now, axis);
        }

        Ok(records)
    }
}

impl<K: Ord + Clone, D: Clone + PartialEq> Default for Sequencer<K, D> {
    fn default() -> Self {
        Self::new()
    }
}
