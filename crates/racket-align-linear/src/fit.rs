//! Robust camera-matrix fit over noisy ball detections.
//!
//! Ball detections contain misses (reflections, the robot's own markers,
//! a ball on the floor) so the DLT runs inside RANSAC with the pixel
//! reprojection error as residual.

use crate::{dlt_camera_matrix, project_point, reprojection_stats, Mat34, ReprojectionStats};
use anyhow::Result;
use log::{debug, info};
use racket_align_core::{ransac, Estimator, Pt2, Pt3, RansacOptions};
use serde::{Deserialize, Serialize};

/// A predicted 3D ball position paired with its detected pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallObservation {
    pub world: Pt3,
    pub image: Pt2,
}

/// RANSAC estimator for the 3x4 projection matrix.
#[derive(Debug, Clone, Copy)]
pub struct CameraMatrixEstimator;

impl CameraMatrixEstimator {
    fn solve(data: &[BallObservation], indices: &[usize]) -> Option<Mat34> {
        let world: Vec<Pt3> = indices.iter().map(|&i| data[i].world).collect();
        let image: Vec<Pt2> = indices.iter().map(|&i| data[i].image).collect();
        dlt_camera_matrix(&world, &image).ok()
    }
}

impl Estimator for CameraMatrixEstimator {
    type Datum = BallObservation;
    type Model = Mat34;

    const MIN_SAMPLES: usize = 6;

    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model> {
        Self::solve(data, sample)
    }

    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
        project_point(model, &datum.world)
            .map(|uv| (uv - datum.image).norm())
            .unwrap_or(f64::INFINITY)
    }

    fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        Self::solve(data, inliers)
    }
}

/// Result of [`fit_camera_matrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraMatrixFit {
    pub p: Mat34,
    pub inliers: Vec<usize>,
    /// Reprojection error over the inliers.
    pub inlier_stats: ReprojectionStats,
    /// Reprojection error over every observation.
    pub all_stats: ReprojectionStats,
}

/// Robustly estimate one camera's projection matrix.
pub fn fit_camera_matrix(
    observations: &[BallObservation],
    opts: &RansacOptions,
) -> Result<CameraMatrixFit> {
    anyhow::ensure!(
        observations.len() >= CameraMatrixEstimator::MIN_SAMPLES,
        "need at least {} ball observations, got {}",
        CameraMatrixEstimator::MIN_SAMPLES,
        observations.len()
    );

    let res = ransac::<CameraMatrixEstimator>(observations, opts);
    let Some(p) = res.model else {
        anyhow::bail!(
            "no camera matrix reached {} inliers within {:.2} px",
            opts.min_inliers,
            opts.thresh
        );
    };
    debug!("camera matrix consensus after {} iterations", res.iters);

    let world: Vec<Pt3> = observations.iter().map(|o| o.world).collect();
    let image: Vec<Pt2> = observations.iter().map(|o| o.image).collect();
    let inlier_world: Vec<Pt3> = res.inliers.iter().map(|&i| world[i]).collect();
    let inlier_image: Vec<Pt2> = res.inliers.iter().map(|&i| image[i]).collect();

    let inlier_stats = reprojection_stats(&p, &inlier_world, &inlier_image)?;
    let all_stats = reprojection_stats(&p, &world, &image)?;
    info!(
        "camera matrix: {} / {} inliers, inlier rms {:.3} px",
        res.inliers.len(),
        observations.len(),
        inlier_stats.rms
    );

    Ok(CameraMatrixFit {
        p,
        inliers: res.inliers,
        inlier_stats,
        all_stats,
    })
}
