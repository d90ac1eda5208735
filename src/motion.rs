//! Kinematic motion model: vector evaluation and endpoint-crossing solves (§4.4).

use crate::error::MotionError;

/// `{position, velocity, acceleration, timestamp}`. Evaluating at wall-clock
/// `t` yields position `p + v·Δ + ½·a·Δ²` with `Δ = t − timestamp`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionVector {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub timestamp: f64,
}

impl MotionVector {
    pub fn new(position: f64, velocity: f64, acceleration: f64, timestamp: f64) -> Result<Self, MotionError> {
        let vector = Self {
            position,
            velocity,
            acceleration,
            timestamp,
        };
        vector.validate()?;
        Ok(vector)
    }

    fn validate(&self) -> Result<(), MotionError> {
        for (field, value) in [
            ("position", self.position),
            ("velocity", self.velocity),
            ("acceleration", self.acceleration),
            ("timestamp", self.timestamp),
        ] {
            if !value.is_finite() {
                return Err(MotionError { field, value });
            }
        }
        Ok(())
    }

    /// A cue is moving iff velocity or acceleration is nonzero.
    pub const fn is_moving(&self) -> bool {
        self.velocity != 0.0 || self.acceleration != 0.0
    }

    pub fn position_at(&self, t: f64) -> f64 {
        let d = t - self.timestamp;
        self.position + self.velocity * d + 0.5 * self.acceleration * d * d
    }

    pub fn velocity_at(&self, t: f64) -> f64 {
        let d = t - self.timestamp;
        self.velocity + self.acceleration * d
    }

    /// Returns a vector re-anchored at `t`, preserving acceleration
    /// (`calculateVector`, §4.4).
    pub fn calculate_vector(&self, t: f64) -> MotionVector {
        MotionVector {
            position: self.position_at(t),
            velocity: self.velocity_at(t),
            acceleration: self.acceleration,
            timestamp: t,
        }
    }
}

/// Smallest positive root `d` of `p + v·d + ½·a·d² == target`, if one exists.
fn solve_positive_root(position: f64, velocity: f64, acceleration: f64, target: f64) -> Option<f64> {
    let c = position - target;
    let a = 0.5 * acceleration;
    let b = velocity;

    if a == 0.0 {
        if b == 0.0 {
            return (c == 0.0).then_some(0.0);
        }
        let d = -c / b;
        return (d >= 0.0).then_some(d);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let r1 = (-b - sqrt_d) / (2.0 * a);
    let r2 = (-b + sqrt_d) / (2.0 * a);
    let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };

    if lo >= 0.0 {
        Some(lo)
    } else if hi >= 0.0 {
        Some(hi)
    } else {
        None
    }
}

/// `calculateDelta(V, P) → (dt, p*)` (§4.4): the smallest positive `dt` at
/// which evaluating `vector` crosses one of `targets`, and that target's
/// index. Ties break by lowest target index. Returns `None` (`dt = ∞`) when
/// stationary or when no target is ever reached.
pub fn calculate_delta(vector: &MotionVector, targets: &[f64]) -> Option<(f64, usize)> {
    if !vector.is_moving() {
        return None;
    }
    targets
        .iter()
        .enumerate()
        .filter_map(|(i, &target)| {
            solve_positive_root(vector.position, vector.velocity, vector.acceleration, target).map(|dt| (dt, i))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
}

/// Position discontinuity at the shared timestamp (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosDelta {
    Noop,
    Change,
}

/// Transition in the moving/stationary state (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDelta {
    Noop,
    Start,
    Stop,
    Change,
}

/// Classifies a vector transition along two independent axes (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionDelta {
    pub pos: PosDelta,
    pub movement: MoveDelta,
}

pub fn motion_delta(old: &MotionVector, new: &MotionVector) -> MotionDelta {
    let pos = if old.position_at(new.timestamp) == new.position {
        PosDelta::Noop
    } else {
        PosDelta::Change
    };

    let was_moving = old.is_moving();
    let is_moving = new.is_moving();
    let movement = match (was_moving, is_moving) {
        (false, false) => MoveDelta::Noop,
        (false, true) => MoveDelta::Start,
        (true, false) => MoveDelta::Stop,
        (true, true) => {
            if old.velocity == new.velocity && old.acceleration == new.acceleration {
                MoveDelta::Noop
            } else {
                MoveDelta::Change
            }
        }
    };

    MotionDelta { pos, movement }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_component() {
        assert!(MotionVector::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn stationary_vector_is_not_moving() {
        let v = MotionVector::new(0.0, 0.0, 0.0, 0.0).unwrap();
        assert!(!v.is_moving());
    }

    #[test]
    fn position_at_constant_velocity() {
        let v = MotionVector::new(0.0, 2.0, 0.0, 0.0).unwrap();
        assert_eq!(v.position_at(5.0), 10.0);
    }

    #[test]
    fn position_at_with_acceleration() {
        let v = MotionVector::new(0.0, 0.0, 2.0, 0.0).unwrap();
        assert_eq!(v.position_at(3.0), 9.0); // 0.5 * 2 * 9
    }

    #[test]
    fn calculate_vector_reanchors() {
        let v = MotionVector::new(0.0, 1.0, 0.0, 0.0).unwrap();
        let re = v.calculate_vector(10.0);
        assert_eq!(re.timestamp, 10.0);
        assert_eq!(re.position, 10.0);
        assert_eq!(re.velocity, 1.0);
    }

    #[test]
    fn calculate_delta_constant_velocity_picks_nearest() {
        let v = MotionVector::new(0.0, 1.0, 0.0, 0.0).unwrap();
        let (dt, idx) = calculate_delta(&v, &[20.0, 5.0]).unwrap();
        assert_eq!(dt, 5.0);
        assert_eq!(idx, 1);
    }

    #[test]
    fn calculate_delta_stationary_is_none() {
        let v = MotionVector::new(5.0, 0.0, 0.0, 0.0).unwrap();
        assert!(calculate_delta(&v, &[10.0]).is_none());
    }

    #[test]
    fn calculate_delta_never_reaches_target_is_none() {
        // Moving away from the target with no acceleration to turn around.
        let v = MotionVector::new(0.0, -1.0, 0.0, 0.0).unwrap();
        assert!(calculate_delta(&v, &[10.0]).is_none());
    }

    #[test]
    fn calculate_delta_with_acceleration() {
        // p(t) = 0.5 * 2 * t^2 = t^2, crosses 9 at t=3
        let v = MotionVector::new(0.0, 0.0, 2.0, 0.0).unwrap();
        let (dt, _) = calculate_delta(&v, &[9.0]).unwrap();
        assert!((dt - 3.0).abs() < 1e-9);
    }

    #[test]
    fn motion_delta_noop() {
        let v = MotionVector::new(0.0, 1.0, 0.0, 0.0).unwrap();
        let delta = motion_delta(&v, &v);
        assert_eq!(delta.pos, PosDelta::Noop);
        assert_eq!(delta.movement, MoveDelta::Noop);
    }

    #[test]
    fn motion_delta_detects_start_and_stop() {
        let stationary = MotionVector::new(5.0, 0.0, 0.0, 0.0).unwrap();
        let moving = MotionVector::new(5.0, 1.0, 0.0, 0.0).unwrap();
        assert_eq!(motion_delta(&stationary, &moving).movement, MoveDelta::Start);
        assert_eq!(motion_delta(&moving, &stationary).movement, MoveDelta::Stop);
    }

    #[test]
    fn motion_delta_position_jump() {
        let old = MotionVector::new(0.0, 1.0, 0.0, 0.0).unwrap();
        let new = MotionVector::new(25.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(motion_delta(&old, &new).pos, PosDelta::Change);
    }
}
