//! Forward kinematics of the 7-DOF Barrett WAM.
//!
//! The chain uses standard Denavit-Hartenberg parameters,
//! `T_i = Rz(theta_i) * Tz(d_i) * Tx(a_i) * Rx(alpha_i)`, on top of a base
//! frame raised by the shoulder height. Link lengths are those of the
//! table-tennis arm:
//!
//! ```text
//! joint | a      | alpha | d
//! ------|--------|-------|----------------
//!   1   | 0      | -pi/2 | 0
//!   2   | 0      | +pi/2 | 0
//!   3   | YEB    | -pi/2 | ZHR + ZEB
//!   4   | YWR    | +pi/2 | 0
//!   5   | 0      | -pi/2 | ZWFE + ZWR
//!   6   | 0      | +pi/2 | 0
//!   7   | 0      | 0     | flange
//! ```

use crate::{Iso3, Real};
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KinematicsError {
    #[error("expected {expected} joint angles, got {got}")]
    DofMismatch { expected: usize, got: usize },
    #[error("joint {joint} angle is not finite ({value})")]
    NonFinite { joint: usize, value: Real },
}

/// Maps joint angles to per-link poses in the robot base frame.
pub trait ForwardKinematics {
    /// Number of joints the chain expects.
    fn dof(&self) -> usize;

    /// Pose of every link frame, base to tip.
    fn link_frames(&self, q: &[Real]) -> Result<Vec<Iso3>, KinematicsError>;

    /// Pose of the last link frame.
    fn end_effector(&self, q: &[Real]) -> Result<Iso3, KinematicsError> {
        let frames = self.link_frames(q)?;
        frames
            .last()
            .copied()
            .ok_or(KinematicsError::DofMismatch {
                expected: self.dof(),
                got: q.len(),
            })
    }
}

/// Link dimensions of the arm in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WamGeometry {
    /// Height of the shoulder axes above the base.
    pub zsfe: Real,
    /// Upper arm length up to the elbow offset.
    pub zhr: Real,
    pub yeb: Real,
    pub zeb: Real,
    pub ywr: Real,
    pub zwr: Real,
    /// Forearm length up to the wrist offset.
    pub zwfe: Real,
    /// Wrist centre to tool flange.
    pub flange: Real,
}

impl Default for WamGeometry {
    fn default() -> Self {
        Self {
            zsfe: 0.346,
            zhr: 0.505,
            yeb: 0.045,
            zeb: 0.045,
            ywr: -0.045,
            zwr: 0.045,
            zwfe: 0.255,
            flange: 0.06,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DhLink {
    a: Real,
    alpha: Real,
    d: Real,
}

impl DhLink {
    const fn new(a: Real, alpha: Real, d: Real) -> Self {
        Self { a, alpha, d }
    }

    fn transform(&self, theta: Real) -> Iso3 {
        let (s, c) = theta.sin_cos();
        let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.alpha);
        Iso3::from_parts(Translation3::new(self.a * c, self.a * s, self.d), rot)
    }
}

/// Barrett WAM with the racket mounted on the flange.
#[derive(Debug, Clone)]
pub struct BarrettWam {
    base: Iso3,
    links: [DhLink; 7],
}

impl BarrettWam {
    pub const DOF: usize = 7;

    pub fn new(geometry: WamGeometry) -> Self {
        let g = geometry;
        let links = [
            DhLink::new(0.0, -FRAC_PI_2, 0.0),
            DhLink::new(0.0, FRAC_PI_2, 0.0),
            DhLink::new(g.yeb, -FRAC_PI_2, g.zhr + g.zeb),
            DhLink::new(g.ywr, FRAC_PI_2, 0.0),
            DhLink::new(0.0, -FRAC_PI_2, g.zwfe + g.zwr),
            DhLink::new(0.0, FRAC_PI_2, 0.0),
            DhLink::new(0.0, 0.0, g.flange),
        ];
        Self {
            base: Iso3::translation(0.0, 0.0, g.zsfe),
            links,
        }
    }
}

impl Default for BarrettWam {
    fn default() -> Self {
        Self::new(WamGeometry::default())
    }
}

impl ForwardKinematics for BarrettWam {
    fn dof(&self) -> usize {
        Self::DOF
    }

    fn link_frames(&self, q: &[Real]) -> Result<Vec<Iso3>, KinematicsError> {
        if q.len() != Self::DOF {
            return Err(KinematicsError::DofMismatch {
                expected: Self::DOF,
                got: q.len(),
            });
        }
        if let Some((joint, &value)) = q.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(KinematicsError::NonFinite { joint, value });
        }

        let mut pose = self.base;
        let frames = self
            .links
            .iter()
            .zip(q)
            .map(|(link, &theta)| {
                pose *= link.transform(theta);
                pose
            })
            .collect();
        Ok(frames)
    }
}
