//! Racket frame and ball contact point.
//!
//! The racket frame is the flange frame turned by -90 degrees about its own
//! x axis. In the racket frame, column 1 of the rotation is the slide axis
//! (along the handle) and column 2 the face normal. The ball sits a fixed
//! offset along both.

use crate::{ForwardKinematics, Iso3, JointTrajectory, KinematicsError, Pt3, Quat, Real};
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Offsets of the ball centre from the flange origin, in metres.
///
/// Rough hand measurements; recheck them whenever the racket is remounted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RacketOffsets {
    /// Along the racket slide axis.
    pub slide: Real,
    /// Along the racket normal axis.
    pub normal: Real,
}

impl Default for RacketOffsets {
    fn default() -> Self {
        Self {
            slide: 0.14,
            normal: -0.05,
        }
    }
}

impl RacketOffsets {
    /// Offset expressed in the racket frame (x, slide, normal).
    pub fn local(&self) -> Vector3<Real> {
        Vector3::new(0.0, self.slide, self.normal)
    }
}

/// Racket orientation from the flange orientation.
pub fn racket_orientation(flange: &Quat) -> Quat {
    flange * Quat::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
}

/// Racket position and orientation in the robot base frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RacketPose {
    pub position: Pt3,
    pub orientation: Quat,
}

impl RacketPose {
    pub fn from_flange(flange: &Iso3) -> Self {
        Self {
            position: Pt3::from(flange.translation.vector),
            orientation: racket_orientation(&flange.rotation),
        }
    }

    /// Estimated ball centre: `p + slide * R[:, 1] + normal * R[:, 2]`.
    pub fn ball_position(&self, offsets: &RacketOffsets) -> Pt3 {
        self.position + self.orientation * offsets.local()
    }
}

/// One reconstructed sample of the moving window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RacketSample {
    pub time: Real,
    pub racket: RacketPose,
    pub ball: Pt3,
}

/// Run forward kinematics over every sample and place the ball.
pub fn reconstruct_ball_path<K: ForwardKinematics + ?Sized>(
    kinematics: &K,
    window: &JointTrajectory,
    offsets: &RacketOffsets,
) -> Result<Vec<RacketSample>, KinematicsError> {
    let samples = window
        .times()
        .iter()
        .enumerate()
        .map(|(i, &time)| -> Result<RacketSample, KinematicsError> {
            let flange = kinematics.end_effector(&window.sample(i))?;
            let racket = RacketPose::from_flange(&flange);
            Ok(RacketSample {
                time,
                racket,
                ball: racket.ball_position(offsets),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!("reconstructed {} racket samples", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{synthetic, BarrettWam};

    #[test]
    fn correction_turns_about_local_x() {
        let flange = Quat::identity();
        let r = racket_orientation(&flange).to_rotation_matrix();
        // Racket y is flange -z, racket z is flange y.
        assert!((r.matrix().column(1) - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        assert!((r.matrix().column(2) - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn offset_is_exact_in_racket_frame() {
        let wam = BarrettWam::default();
        let offsets = RacketOffsets::default();
        let flange = wam
            .end_effector(&[0.2, 0.9, -0.3, 1.4, 0.5, -0.6, 1.1])
            .unwrap();
        let racket = RacketPose::from_flange(&flange);
        let ball = racket.ball_position(&offsets);

        let local = racket.orientation.inverse() * (ball - racket.position);
        assert!((local - offsets.local()).norm() < 1e-12, "{local:?}");
        assert_eq!(offsets.local(), Vector3::new(0.0, 0.14, -0.05));
    }

    #[test]
    fn reconstruction_is_deterministic() {
        let values = synthetic::swing_values(500, 0.002, 0.2, 0.8, 0.6);
        let traj = JointTrajectory::from_flat(&values, 7, 0.002).unwrap();
        let wam = BarrettWam::default();
        let offsets = RacketOffsets::default();

        let a = reconstruct_ball_path(&wam, &traj, &offsets).unwrap();
        let b = reconstruct_ball_path(&wam, &traj, &offsets).unwrap();
        assert_eq!(a.len(), 500);
        assert_eq!(a, b);
        for (sa, sb) in a.iter().zip(&b) {
            assert_eq!(sa.ball.coords.as_slice(), sb.ball.coords.as_slice());
        }
    }

    #[test]
    fn wrong_dof_propagates() {
        let traj = JointTrajectory::from_flat(&[0.0; 12], 6, 0.002).unwrap();
        let err = reconstruct_ball_path(&BarrettWam::default(), &traj, &RacketOffsets::default())
            .unwrap_err();
        assert!(matches!(err, KinematicsError::DofMismatch { .. }));
    }
}
