//! Error types (§7).

use thiserror::Error;

/// *Invalid-interval* — raised by [`Interval::new`](crate::interval::Interval::new)
/// and by [`Axis::update`](crate::axis::Axis::update).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntervalError {
    #[error("interval low ({low}) must be <= high ({high})")]
    LowGreaterThanHigh { low: f64, high: f64 },
    #[error("empty interval at {value} is not allowed (low==high requires both endpoints inclusive)")]
    EmptyInterval { value: f64 },
    #[error("endpoint value {0} is not finite")]
    NonFinite(f64),
}

/// *Invalid-motion-vector* — raised by the motion model on non-finite
/// components.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("motion vector component `{field}` is not finite: {value}")]
pub struct MotionError {
    pub field: &'static str,
    pub value: f64,
}

/// Errors surfaced by [`Axis::update`](crate::axis::Axis::update).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AxisError {
    #[error(transparent)]
    Interval(#[from] IntervalError),
}

/// Errors surfaced by the [`Sequencer`](crate::sequencer::Sequencer).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SequencerError {
    /// *Unready-operation* — a mutating operation was attempted before the
    /// timing source became ready.
    #[error("operation attempted before the timing source became ready")]
    Unready,
    #[error(transparent)]
    Axis(#[from] AxisError),
    #[error(transparent)]
    Motion(#[from] MotionError),
}
