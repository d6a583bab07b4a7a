//! 3x4 projection matrix from 3D/2D correspondences.

use crate::math::{mat34_from_svd_row, normalize_points_2d, normalize_points_3d};
use anyhow::Result;
use nalgebra::{DMatrix, Matrix3x4, Vector4};
use racket_align_core::{from_homogeneous, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Camera projection matrix `P`, defined up to scale.
pub type Mat34 = Matrix3x4<Real>;

/// Project a base-frame point; `None` when it lands on the plane at infinity.
pub fn project_point(p: &Mat34, point: &Pt3) -> Option<Pt2> {
    let x = p * Vector4::new(point.x, point.y, point.z, 1.0);
    if x.z.abs() <= Real::EPSILON {
        return None;
    }
    Some(from_homogeneous(&x))
}

/// Estimate `P` with the normalized DLT on all correspondences.
///
/// Needs at least 6 pairs. The result is scaled to unit Frobenius norm.
pub fn dlt_camera_matrix(world: &[Pt3], image: &[Pt2]) -> Result<Mat34> {
    let n = world.len();
    anyhow::ensure!(n >= 6, "need at least 6 point correspondences, got {}", n);
    anyhow::ensure!(
        n == image.len(),
        "mismatched number of world points ({}) and image points ({})",
        n,
        image.len()
    );

    let (world_n, t_w) = normalize_points_3d(world)
        .ok_or_else(|| anyhow::anyhow!("degenerate 3d point configuration"))?;
    let (image_n, t_i) = normalize_points_2d(image)
        .ok_or_else(|| anyhow::anyhow!("degenerate image point configuration"))?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 12);
    for (i, (pw, pi)) in world_n.iter().zip(&image_n).enumerate() {
        let xh = [pw.x, pw.y, pw.z, 1.0];
        for (k, &v) in xh.iter().enumerate() {
            a[(2 * i, k)] = v;
            a[(2 * i, 8 + k)] = -pi.x * v;
            a[(2 * i + 1, 4 + k)] = v;
            a[(2 * i + 1, 8 + k)] = -pi.y * v;
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| anyhow::anyhow!("svd failed in camera matrix DLT"))?;
    // Smallest singular value sits in the last row of V^T for tall systems;
    // pick it explicitly in case the SVD does not sort.
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .fold((0, Real::INFINITY), |best, (i, &s)| if s < best.1 { (i, s) } else { best });
    let p_norm = mat34_from_svd_row(&v_t, min_idx);

    let t_i_inv = t_i
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("image normalization is not invertible"))?;
    let p = t_i_inv * p_norm * t_w;
    Ok(p / p.norm())
}

/// Optical centre of `P` in base coordinates, `C = -M^{-1} p4`.
pub fn camera_center(p: &Mat34) -> Option<Pt3> {
    let m = p.fixed_view::<3, 3>(0, 0).into_owned();
    let m_inv = m.try_inverse()?;
    Some(Pt3::from(-(m_inv * p.column(3))))
}

/// Pixel reprojection error summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionStats {
    pub mean: Real,
    pub rms: Real,
    pub max: Real,
    pub count: usize,
}

/// Reprojection error of `p` over all correspondences that project.
pub fn reprojection_stats(p: &Mat34, world: &[Pt3], image: &[Pt2]) -> Result<ReprojectionStats> {
    anyhow::ensure!(
        world.len() == image.len(),
        "mismatched number of world points ({}) and image points ({})",
        world.len(),
        image.len()
    );
    let errors: Vec<Real> = world
        .iter()
        .zip(image)
        .filter_map(|(pw, uv)| project_point(p, pw).map(|proj| (proj - *uv).norm()))
        .collect();
    if errors.is_empty() {
        anyhow::bail!("no valid projections for error computation");
    }
    let count = errors.len();
    let n = count as Real;
    Ok(ReprojectionStats {
        mean: errors.iter().sum::<Real>() / n,
        rms: (errors.iter().map(|e| e * e).sum::<Real>() / n).sqrt(),
        max: errors.iter().copied().fold(0.0, Real::max),
        count,
    })
}
