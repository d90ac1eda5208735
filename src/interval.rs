//! Interval representation built on the endpoint algebra (§3, §4.1).

use crate::endpoint::{endpoint_covers, Endpoint, Relation};
use crate::error::IntervalError;
use std::cmp::Ordering;
use std::fmt::Display;

/// `[low, high]` on a real-valued axis, with independent inclusivity on each
/// side. A *singular* interval has `low == high`, and is, by construction,
/// inclusive on both sides — an empty interval (`low == high` with an
/// exclusive endpoint) is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub low: f64,
    pub high: f64,
    pub low_include: bool,
    pub high_include: bool,
}

impl Interval {
    /// Validated constructor. See [`Interval::validate`] for the rejected cases.
    pub fn new(low: f64, high: f64, low_include: bool, high_include: bool) -> Result<Self, IntervalError> {
        let interval = Self {
            low,
            high,
            low_include,
            high_include,
        };
        interval.validate()?;
        Ok(interval)
    }

    /// `[low, high]`, both endpoints inclusive.
    pub const fn closed(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            low_include: true,
            high_include: true,
        }
    }

    /// A single point, inclusive — both ends coincide.
    pub const fn point(value: f64) -> Self {
        Self::closed(value, value)
    }

    pub fn validate(&self) -> Result<(), IntervalError> {
        if !self.low.is_finite() {
            return Err(IntervalError::NonFinite(self.low));
        }
        if !self.high.is_finite() {
            return Err(IntervalError::NonFinite(self.high));
        }
        if self.low > self.high {
            return Err(IntervalError::LowGreaterThanHigh {
                low: self.low,
                high: self.high,
            });
        }
        if self.low == self.high && !(self.low_include && self.high_include) {
            return Err(IntervalError::EmptyInterval { value: self.low });
        }
        Ok(())
    }

    pub const fn is_singular(&self) -> bool {
        self.low == self.high
    }

    /// This interval's lower endpoint, folding in singular-point semantics.
    pub const fn low_endpoint(&self) -> Endpoint {
        if self.is_singular() {
            Endpoint::point(self.low)
        } else {
            Endpoint::low(self.low, self.low_include)
        }
    }

    /// This interval's upper endpoint, folding in singular-point semantics.
    pub const fn high_endpoint(&self) -> Endpoint {
        if self.is_singular() {
            Endpoint::point(self.high)
        } else {
            Endpoint::high(self.high, self.high_include)
        }
    }

    /// Whether `value` lies inside this interval, respecting inclusivity.
    pub fn covers(&self, value: f64) -> bool {
        endpoint_covers(&self.low_endpoint(), value) && endpoint_covers(&self.high_endpoint(), value)
    }

    /// Symbolic relation of `self` to `other` (§4.1): one of
    /// `{OUTSIDE_LEFT, OVERLAP_LEFT, COVERED, EQUAL, COVERS, OVERLAP_RIGHT,
    /// OUTSIDE_RIGHT}`.
    pub fn relation(&self, other: &Interval) -> Relation {
        let (a_low, a_high) = (self.low_endpoint(), self.high_endpoint());
        let (b_low, b_high) = (other.low_endpoint(), other.high_endpoint());

        if a_high < b_low {
            return Relation::OutsideLeft;
        }
        if a_low > b_high {
            return Relation::OutsideRight;
        }

        let low_cmp = a_low.cmp(&b_low);
        let high_cmp = a_high.cmp(&b_high);

        if low_cmp == Ordering::Equal && high_cmp == Ordering::Equal {
            Relation::Equal
        } else if low_cmp != Ordering::Less && high_cmp != Ordering::Greater {
            Relation::Covered
        } else if low_cmp != Ordering::Greater && high_cmp != Ordering::Less {
            Relation::Covers
        } else if low_cmp == Ordering::Less {
            Relation::OverlapLeft
        } else {
            Relation::OverlapRight
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.low_include { "[" } else { "(" },
            self.low,
            self.high,
            if self.high_include { "]" } else { ")" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_low_greater_than_high() {
        assert!(matches!(
            Interval::new(10.0, 0.0, true, true),
            Err(IntervalError::LowGreaterThanHigh { .. })
        ));
    }

    #[test]
    fn rejects_empty_interval() {
        assert!(matches!(
            Interval::new(5.0, 5.0, true, false),
            Err(IntervalError::EmptyInterval { .. })
        ));
    }

    #[test]
    fn accepts_singular_point() {
        let iv = Interval::new(5.0, 5.0, true, true).unwrap();
        assert!(iv.is_singular());
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(
            Interval::new(f64::NAN, 5.0, true, true),
            Err(IntervalError::NonFinite(_))
        ));
    }

    #[test]
    fn covers_half_open() {
        let iv = Interval::new(0.0, 10.0, true, false).unwrap();
        assert!(iv.covers(0.0));
        assert!(iv.covers(9.999));
        assert!(!iv.covers(10.0));
    }

    #[test]
    fn abutting_half_open_intervals_outside() {
        let a = Interval::new(0.0, 5.0, true, false).unwrap();
        let b = Interval::new(5.0, 10.0, true, false).unwrap();
        assert_eq!(a.relation(&b), Relation::OutsideLeft);
        assert_eq!(b.relation(&a), Relation::OutsideRight);
    }

    #[test]
    fn touching_closed_intervals_overlap_at_point() {
        let a = Interval::closed(0.0, 5.0);
        let b = Interval::closed(5.0, 10.0);
        assert_eq!(a.relation(&b), Relation::OverlapLeft);
    }

    #[test]
    fn equal_intervals() {
        let a = Interval::closed(0.0, 10.0);
        let b = Interval::closed(0.0, 10.0);
        assert_eq!(a.relation(&b), Relation::Equal);
    }

    #[test]
    fn covered_and_covers_are_symmetric_inverses() {
        let inner = Interval::closed(3.0, 7.0);
        let outer = Interval::closed(0.0, 10.0);
        assert_eq!(inner.relation(&outer), Relation::Covered);
        assert_eq!(outer.relation(&inner), Relation::Covers);
    }

    #[test]
    fn overlap_left_and_right() {
        let a = Interval::closed(0.0, 6.0);
        let b = Interval::closed(4.0, 10.0);
        assert_eq!(a.relation(&b), Relation::OverlapLeft);
        assert_eq!(b.relation(&a), Relation::OverlapRight);
    }

    #[test]
    fn singular_point_relation_to_covering_interval() {
        let point = Interval::point(5.0);
        let span = Interval::closed(0.0, 10.0);
        assert_eq!(point.relation(&span), Relation::Covered);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn round_trips_through_json_when_serde_enabled() {
        let iv = Interval::new(1.5, 9.5, true, false).unwrap();
        let json = serde_json::to_string(&iv).unwrap();
        let back: Interval = serde_json::from_str(&json).unwrap();
        assert_eq!(iv, back);
    }
}
