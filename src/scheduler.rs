//! Windowed-prefetch scheduler: predicts which endpoints the motion vector
//! will cross within a lookahead window and fires them when due (§4.5).

use crate::axis::{Axis, Cue};
use crate::callback::{EventEmitter, Handle};
use crate::endpoint::Endpoint;
use crate::interval::Interval;
use crate::motion::{calculate_delta, MotionVector};

/// Which way the motion vector is crossing an endpoint when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_velocity_sign(velocity: f64) -> Self {
        if velocity < 0.0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub const fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// One predicted endpoint crossing, ready to be reconciled by the sequencer.
#[derive(Debug, Clone)]
pub struct EndpointItem<K, D> {
    pub endpoint: Endpoint,
    pub cue: Cue<K, D>,
    pub direction: Direction,
}

/// The scheduler's lifecycle: no prediction in flight, a non-empty queue
/// waiting for its next `fire_due`, or actively draining due entries (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Firing,
}

#[derive(Debug, Clone)]
struct QueueEntry<K, D> {
    due_time: f64,
    item: EndpointItem<K, D>,
}

/// Default prefetch window, in axis units of time, when none is given to
/// [`Scheduler::new`].
pub const DEFAULT_LOOKAHEAD: f64 = 5.0;

/// A single externally-polled timer: [`Scheduler::set_vector`] re-arms the
/// prediction window (cancelling anything previously queued), and the host
/// calls [`Scheduler::fire_due`] to drain whatever has become due. There is
/// no internal thread or async task (§5).
pub struct Scheduler<K, D> {
    lookahead: f64,
    window: Option<(f64, f64)>,
    queue: Vec<QueueEntry<K, D>>,
    state: SchedulerState,
    emitter: EventEmitter<Vec<EndpointItem<K, D>>>,
}

impl<K: Ord + Clone, D: Clone + PartialEq> Scheduler<K, D> {
    pub fn new(lookahead: f64) -> Self {
        Self {
            lookahead,
            window: None,
            queue: Vec::new(),
            state: SchedulerState::Idle,
            emitter: EventEmitter::new(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn window(&self) -> Option<(f64, f64)> {
        self.window
    }

    pub fn add_callback<F>(&mut self, callback: F) -> Handle
    where
        F: Fn(&Vec<EndpointItem<K, D>>) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    pub fn remove_callback(&mut self, handle: Handle) -> bool {
        self.emitter.unsubscribe(handle)
    }

    /// Re-arms the prediction window around `vector` as of `now`, cancelling
    /// anything previously queued. Queries `axis` for cues whose interval
    /// touches the `[now, now + lookahead]` position sweep and solves each
    /// touching endpoint's crossing time (§4.5).
    pub fn set_vector(&mut self, vector: &MotionVector, now: f64, axis: &Axis<K, D>) {
        self.queue.clear();
        self.window = None;
        self.state = SchedulerState::Idle;

        let pos_now = vector.position_at(now);
        let pos_end = vector.position_at(now + self.lookahead);
        let (mut low, mut high) = if pos_now <= pos_end { (pos_now, pos_end) } else { (pos_end, pos_now) };

        // §4.5 windows over positions *reachable* within the lookahead, not
        // just the two endpoint samples: if acceleration reverses the sign
        // of velocity inside the window, the parabola's vertex lies beyond
        // [pos_now, pos_end] and must be folded in too.
        let v_now = vector.velocity_at(now);
        let v_end = vector.velocity_at(now + self.lookahead);
        if vector.acceleration != 0.0 && v_now * v_end < 0.0 {
            let vertex_time = now - v_now / vector.acceleration;
            let vertex_pos = vector.position_at(vertex_time);
            low = low.min(vertex_pos);
            high = high.max(vertex_pos);
        }

        self.window = Some((low, high));

        let sweep = match Interval::new(low, high, true, true) {
            Ok(iv) => iv,
            Err(_) => return,
        };

        for cue in axis.lookup(&sweep) {
            // Both ends of a point interval coincide (§3) — enqueue the
            // crossing once, not once per nominal endpoint.
            let endpoints = if cue.interval.is_singular() {
                vec![cue.interval.low_endpoint()]
            } else {
                vec![cue.interval.low_endpoint(), cue.interval.high_endpoint()]
            };
            for endpoint in endpoints {
                let Some((dt, _)) = calculate_delta(vector, &[endpoint.value]) else {
                    continue;
                };
                // `dt` is relative to `vector.timestamp`, not to `now` — the
                // two differ once `set_vector` is re-called to refill an
                // emptied window without a fresh motion vector (the caller's
                // `now` advances while the vector's own anchor does not).
                let due_time = vector.timestamp + dt;
                if due_time < now || due_time > now + self.lookahead {
                    continue;
                }
                let direction = Direction::from_velocity_sign(vector.velocity_at(due_time));
                self.queue.push(QueueEntry {
                    due_time,
                    item: EndpointItem {
                        endpoint,
                        cue: cue.clone(),
                        direction,
                    },
                });
            }
        }

        self.queue
            .sort_by(|a, b| a.due_time.total_cmp(&b.due_time).then(a.item.endpoint.cmp(&b.item.endpoint)));

        if !self.queue.is_empty() {
            self.state = SchedulerState::Armed;
        }
    }

    pub fn next_due(&self) -> Option<f64> {
        self.queue.first().map(|e| e.due_time)
    }

    /// Drains every queued entry whose `due_time <= now`, in due order, and
    /// notifies subscribers with the fired batch.
    pub fn fire_due(&mut self, now: f64) -> Vec<EndpointItem<K, D>> {
        let split = self.queue.partition_point(|e| e.due_time <= now);
        if split == 0 {
            return Vec::new();
        }

        self.state = SchedulerState::Firing;
        let fired: Vec<EndpointItem<K, D>> = self.queue.drain(..split).map(|e| e.item).collect();
        self.state = if self.queue.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Armed
        };

        self.emitter.emit(&fired);
        fired
    }
}
