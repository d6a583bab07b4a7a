//! Linear camera-matrix estimation for the racket/camera alignment check.
//!
//! Given 3D ball positions predicted from robot kinematics and the pixel
//! positions where a camera saw the ball, these solvers estimate the 3x4
//! projection matrix that maps robot-base coordinates to that camera's image.
//!
//! - [`dlt_camera_matrix`]: normalized DLT on all correspondences,
//! - [`fit_camera_matrix`]: RANSAC around the DLT with reprojection residuals,
//! - [`reprojection_stats`]: mean / RMS / max pixel error of a matrix.

mod camera_matrix;
mod fit;
pub mod math;

pub use camera_matrix::*;
pub use fit::*;

#[cfg(test)]
mod test_support;
