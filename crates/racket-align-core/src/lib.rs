//! Core numerics for the racket/camera alignment check.
//!
//! This crate provides the building blocks the alignment pipeline chains
//! together:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, and friends),
//! - joint trajectory loading, reshaping and time windowing,
//! - a zero-phase second-order Butterworth low-pass filter,
//! - motion-window detection from joint-space speed,
//! - Barrett WAM forward kinematics and the racket/ball geometry,
//! - a deterministic, model-agnostic RANSAC engine.
//!
//! Data flow (conceptually):
//! `file -> JointTrajectory -> window -> filtfilt -> MotionWindow -> FK -> ball path`
//!
//! # Example
//!
//! ```
//! use racket_align_core::{detect_motion_window, filter_trajectory, Butterworth2, JointTrajectory};
//!
//! // Seven joints at rest, then joint 0 sweeps for a while.
//! let mut values = Vec::new();
//! for i in 0..400 {
//!     let q0 = if i < 150 { 0.0 } else if i < 250 { (i - 150) as f64 * 0.01 } else { 1.0 };
//!     values.extend_from_slice(&[q0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
//! }
//! let traj = JointTrajectory::from_flat(&values, 7, 0.002).unwrap();
//! let filtered = filter_trajectory(&traj, &Butterworth2::lowpass(0.1).unwrap(), 50).unwrap();
//! let window = detect_motion_window(&filtered, 0.1, 1).unwrap();
//! assert!(window.start < 150 && window.end > 250);
//! ```

/// Zero-phase Butterworth filtering.
mod filter;
/// Robot forward kinematics.
mod kinematics;
/// Linear algebra type aliases and helpers.
mod math;
/// Motion-window detection.
mod motion;
/// Racket orientation and ball offset geometry.
mod racket;
/// Generic RANSAC engine and traits.
mod ransac;
/// Deterministic synthetic joint data.
///
/// Small builders for joint recordings with known motion segments. Used in
/// workspace tests and handy for checking a configuration before pointing it
/// at real data.
pub mod synthetic;
/// Joint trajectory loading and windowing.
mod trajectory;

pub use filter::*;
pub use kinematics::*;
pub use math::*;
pub use motion::*;
pub use racket::*;
pub use ransac::*;
pub use trajectory::*;
