//! End-to-end racket/camera alignment check.
//!
//! The pipeline is a single linear pass:
//!
//! 1. load the joint recording, cut it to the analysis window and low-pass
//!    filter every joint ([`prepare_trajectory`]),
//! 2. find the segment in which the arm moves ([`find_motion`]),
//! 3. run forward kinematics and place the ball on the racket for every
//!    moving sample,
//! 4. detect the ball in the camera frames and pair each detection with the
//!    3D position interpolated at the frame's time ([`correlate`]),
//! 5. optionally persist the pairs and fit one projection matrix per camera.
//!
//! Collaborators are injected: the kinematic chain through
//! [`ForwardKinematics`](racket_align_core::ForwardKinematics) and the image
//! side through [`BallDetector`].

mod config;
mod correlate;
mod detection;
mod pipeline;

pub use config::*;
pub use correlate::*;
pub use detection::*;
pub use pipeline::*;
