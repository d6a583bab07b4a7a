use crate::{
    correlate, save_correspondences, AlignConfig, BallCorrespondence, BallDetector,
    BallLocations,
};
use anyhow::{Context, Result};
use log::{info, warn};
use racket_align_core::{
    detect_motion_window, filter_trajectory, reconstruct_ball_path, Butterworth2, Estimator,
    ForwardKinematics, JointTrajectory, MotionWindow, Pt3, RacketSample, Real,
};
use racket_align_linear::{
    camera_center, fit_camera_matrix, BallObservation, CameraMatrixEstimator, CameraMatrixFit,
};
use serde::Serialize;
use std::path::PathBuf;

/// The joint recording at each preprocessing stage.
#[derive(Debug, Clone)]
pub struct PreparedTrajectory {
    pub loaded: JointTrajectory,
    pub windowed: JointTrajectory,
    pub filtered: JointTrajectory,
}

/// Load, window and low-pass filter the configured joint recording.
pub fn prepare_trajectory(config: &AlignConfig) -> Result<PreparedTrajectory> {
    let loaded = JointTrajectory::load(&config.input_path, config.dof, config.dt)
        .context("failed to load joint recording")?;
    info!(
        "loaded {} samples x {} joints from {}",
        loaded.len(),
        loaded.dof(),
        config.input_path.display()
    );

    let windowed = loaded
        .window(&config.time_window)
        .context("failed to cut the analysis window")?;
    let butter = Butterworth2::lowpass(config.filter.cutoff)?;
    let filtered = filter_trajectory(&windowed, &butter, config.filter.padlen)
        .context("failed to filter joint angles")?;
    info!(
        "filtered {} samples in [{}, {}] s",
        filtered.len(),
        config.time_window.start,
        config.time_window.end
    );

    Ok(PreparedTrajectory {
        loaded,
        windowed,
        filtered,
    })
}

/// Detect the moving segment and cut it out of `filtered`.
pub fn find_motion(
    config: &AlignConfig,
    filtered: &JointTrajectory,
) -> Result<(MotionWindow, JointTrajectory)> {
    let window = detect_motion_window(filtered, config.velocity_threshold, config.slack)
        .context("failed to find the moving segment")?;
    let moving = window.slice(filtered);
    info!(
        "robot moves over samples {}..={} ({:.3}..{:.3} s)",
        window.start,
        window.end,
        moving.times()[0],
        moving.times()[moving.len() - 1]
    );
    Ok((window, moving))
}

/// Projection fit for one camera, or the reason it was not attempted.
#[derive(Debug, Clone, Serialize)]
pub struct CameraReport {
    pub camera: usize,
    pub detections: usize,
    pub observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<CameraMatrixFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Pt3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// Summary of one alignment run.
#[derive(Debug, Clone, Serialize)]
pub struct AlignReport {
    pub loaded_samples: usize,
    pub filtered_samples: usize,
    pub motion: MotionWindow,
    /// Start and end of the motion window in seconds.
    pub motion_time: [Real; 2],
    /// Length of the reconstructed ball path in metres.
    pub ball_path_length: Real,
    pub correspondences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub cameras: Vec<CameraReport>,
}

fn path_length(samples: &[RacketSample]) -> Real {
    samples
        .windows(2)
        .map(|w| (w[1].ball - w[0].ball).norm())
        .sum()
}

fn fit_camera(
    config: &AlignConfig,
    camera: usize,
    detections: usize,
    pairs: &[BallCorrespondence],
) -> CameraReport {
    let observations: Vec<BallObservation> = pairs
        .iter()
        .filter(|c| c.camera == camera)
        .map(|c| BallObservation {
            world: c.world,
            image: c.image,
        })
        .collect();
    let mut report = CameraReport {
        camera,
        detections,
        observations: observations.len(),
        fit: None,
        center: None,
        skipped: None,
    };

    if !config.projection.enabled {
        return report;
    }
    if observations.len() < CameraMatrixEstimator::MIN_SAMPLES {
        let reason = format!(
            "{} observations, need {}",
            observations.len(),
            CameraMatrixEstimator::MIN_SAMPLES
        );
        warn!("camera {camera}: skipping projection fit ({reason})");
        report.skipped = Some(reason);
        return report;
    }

    match fit_camera_matrix(&observations, &config.projection.ransac) {
        Ok(fit) => {
            report.center = camera_center(&fit.p);
            if let Some(c) = report.center {
                info!("camera {camera}: centre at ({:.3}, {:.3}, {:.3}) m", c.x, c.y, c.z);
            }
            report.fit = Some(fit);
        }
        Err(err) => {
            warn!("camera {camera}: projection fit failed: {err:#}");
            report.skipped = Some(format!("{err:#}"));
        }
    }
    report
}

/// Run the whole check: trajectory, motion window, racket path, detections,
/// correspondence artifact and per-camera projection fits.
pub fn run_alignment<K, D>(config: &AlignConfig, kinematics: &K, detector: &D) -> Result<AlignReport>
where
    K: ForwardKinematics + ?Sized,
    D: BallDetector + ?Sized,
{
    config.validate()?;

    let prepared = prepare_trajectory(config)?;
    let (motion, moving) = find_motion(config, &prepared.filtered)?;

    let samples = reconstruct_ball_path(kinematics, &moving, &config.racket_offsets())
        .context("forward kinematics failed")?;
    let ball_path_length = path_length(&samples);
    let t0 = moving.times()[0];
    let t1 = moving.times()[moving.len() - 1];
    info!(
        "ball path: {} samples, {:.3} m travelled",
        samples.len(),
        ball_path_length
    );

    let detections = detector
        .detect(config.frame_range, &config.camera_ids)
        .context("ball detection failed")?;
    info!(
        "{} ball detections in frames {} over {} cameras",
        detections.len(),
        config.frame_range,
        config.camera_ids.len()
    );

    let pairs = correlate(&samples, &detections, &config.moving_frames);
    info!("{} detections paired with ball positions", pairs.len());

    if let Some(path) = &config.output_path {
        let locations = BallLocations {
            moving_frames: config.moving_frames,
            time_span: [t0, t1],
            correspondences: pairs.clone(),
        };
        save_correspondences(path, &locations)?;
        info!("wrote {}", path.display());
    }

    let cameras = config
        .camera_ids
        .iter()
        .map(|&cam| fit_camera(config, cam, detections.count_for_camera(cam), &pairs))
        .collect();

    Ok(AlignReport {
        loaded_samples: prepared.loaded.len(),
        filtered_samples: prepared.filtered.len(),
        motion,
        motion_time: [t0, t1],
        ball_path_length,
        correspondences: pairs.len(),
        output_path: config.output_path.clone(),
        cameras,
    })
}
