//! Detection of the "robot is moving" segment of a trajectory.
//!
//! Speed is the Euclidean norm of the joint-space finite difference divided
//! by the sample period. The motion window spans the first to the last
//! sample pair whose speed exceeds a threshold, padded by a slack count.

use crate::{JointTrajectory, Real};
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("need at least 2 samples to compute joint speeds, got {0}")]
    TooFewSamples(usize),
    #[error("threshold must be non-negative, got {0}")]
    InvalidThreshold(Real),
    #[error("joint speed never exceeds {threshold} rad/s (peak {peak_speed} rad/s)")]
    MotionNotFound { threshold: Real, peak_speed: Real },
}

/// Inclusive sample range in which the robot moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionWindow {
    /// First sample of the padded window.
    pub start: usize,
    /// Last sample of the padded window (inclusive).
    pub end: usize,
    /// First speed index above threshold.
    pub first_crossing: usize,
    /// Last speed index above threshold.
    pub last_crossing: usize,
    pub peak_speed: Real,
}

impl MotionWindow {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Times and filtered angles inside the window.
    pub fn slice(&self, traj: &JointTrajectory) -> JointTrajectory {
        traj.slice(self.range())
    }
}

/// Joint-space speed between consecutive samples (`N - 1` values).
pub fn joint_speeds(angles: &DMatrix<Real>, dt: Real) -> Vec<Real> {
    let n = angles.nrows();
    (1..n)
        .map(|i| (angles.row(i) - angles.row(i - 1)).norm() / dt)
        .collect()
}

/// Locate the moving segment of a (filtered) trajectory.
///
/// Returns `[first - slack, last + slack]` clipped to the trajectory bounds,
/// where `first`/`last` are the first and last speed indices strictly above
/// `threshold`. Fails with [`MotionError::MotionNotFound`] when the speed
/// never crosses the threshold.
pub fn detect_motion_window(
    traj: &JointTrajectory,
    threshold: Real,
    slack: usize,
) -> Result<MotionWindow, MotionError> {
    if traj.len() < 2 {
        return Err(MotionError::TooFewSamples(traj.len()));
    }
    if threshold.is_nan() || threshold < 0.0 {
        return Err(MotionError::InvalidThreshold(threshold));
    }

    let speeds = joint_speeds(traj.angles(), traj.dt());
    let peak_speed = speeds.iter().copied().fold(0.0, Real::max);

    let first = speeds.iter().position(|&v| v > threshold);
    let last = speeds.iter().rposition(|&v| v > threshold);
    let (Some(first), Some(last)) = (first, last) else {
        return Err(MotionError::MotionNotFound {
            threshold,
            peak_speed,
        });
    };

    let window = MotionWindow {
        start: first.saturating_sub(slack),
        end: last.saturating_add(slack).min(traj.len() - 1),
        first_crossing: first,
        last_crossing: last,
        peak_speed,
    };
    debug!(
        "motion window samples {}..={} ({:.3}..{:.3} s), peak speed {:.3} rad/s",
        window.start,
        window.end,
        traj.times()[window.start],
        traj.times()[window.end],
        peak_speed
    );
    Ok(window)
}
