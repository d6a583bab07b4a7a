//! Hartley normalization and SVD reshaping helpers.
//!
//! Centering points and scaling them to a fixed mean distance before building
//! a DLT system keeps its singular values in a sane range. See Hartley &
//! Zisserman, "Multiple View Geometry in Computer Vision", Algorithm 4.2.

use nalgebra::{DMatrix, Matrix3x4};
use racket_align_core::{Mat3, Mat4, Pt2, Pt3, Real};

/// Normalize 2D points to zero mean and mean distance `√2`.
///
/// Returns the normalized points and `T` with `p_norm = T * p_h`, or `None`
/// if the input is empty or all points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let centroid = points.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points.iter().map(|p| (p.coords - centroid).norm()).sum::<Real>() / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let s = (2.0_f64).sqrt() / mean_dist;
    #[rustfmt::skip]
    let t = Mat3::new(
        s, 0.0, -s * centroid.x,
        0.0, s, -s * centroid.y,
        0.0, 0.0, 1.0,
    );
    let normalized = points
        .iter()
        .map(|p| Pt2::from((p.coords - centroid) * s))
        .collect();
    Some((normalized, t))
}

/// Normalize 3D points to zero mean and mean distance `√3`.
///
/// The 3D analog of [`normalize_points_2d`]; `T` is 4x4.
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Mat4)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let centroid = points.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points.iter().map(|p| (p.coords - centroid).norm()).sum::<Real>() / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let s = (3.0_f64).sqrt() / mean_dist;
    #[rustfmt::skip]
    let t = Mat4::new(
        s, 0.0, 0.0, -s * centroid.x,
        0.0, s, 0.0, -s * centroid.y,
        0.0, 0.0, s, -s * centroid.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let normalized = points
        .iter()
        .map(|p| Pt3::from((p.coords - centroid) * s))
        .collect();
    Some((normalized, t))
}

/// Reshape row `row_idx` of a 12-column `V^T` into a 3x4 matrix, row by row.
///
/// # Panics
///
/// Panics if `v_t` does not have exactly 12 columns.
pub fn mat34_from_svd_row(v_t: &DMatrix<Real>, row_idx: usize) -> Matrix3x4<Real> {
    assert_eq!(v_t.ncols(), 12, "expected 12 columns for a 3x4 matrix");
    Matrix3x4::from_fn(|r, c| v_t[(row_idx, 4 * r + c)])
}
