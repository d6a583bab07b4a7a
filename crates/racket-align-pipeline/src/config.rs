//! Run configuration.
//!
//! Every constant the check depends on lives here. The defaults reproduce
//! the settings of the 29.7.18 capture session.

use crate::{ColorBox, FrameLayout, FrameRange};
use anyhow::{ensure, Context, Result};
use racket_align_core::{FilterOptions, RacketOffsets, RansacOptions, Real, TimeWindow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Camera-matrix fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Fit a 3x4 matrix per camera from the correlated detections.
    pub enabled: bool,
    pub ransac: RansacOptions,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ransac: RansacOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Flat joint recording.
    pub input_path: PathBuf,
    /// Joints per recorded row.
    pub dof: usize,
    /// Control period of the recording in seconds.
    pub dt: Real,
    /// Part of the recording to analyse.
    pub time_window: TimeWindow,
    pub filter: FilterOptions,
    /// Joint-space speed (rad/s) above which the arm counts as moving.
    pub velocity_threshold: Real,
    /// Samples of padding on each side of the motion window.
    pub slack: usize,
    pub racket_slide_offset: Real,
    pub racket_normal_offset: Real,
    /// Frames handed to the ball detector.
    pub frame_range: FrameRange,
    pub camera_ids: Vec<usize>,
    /// Frames during which the arm moves; mapped linearly onto the motion
    /// window's time span.
    pub moving_frames: FrameRange,
    pub frame_layout: FrameLayout,
    pub detector: ColorBox,
    /// Where to write the correlated ball locations; `None` skips the file.
    pub output_path: Option<PathBuf>,
    pub projection: ProjectionConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/29.7.18/joints_black.txt"),
            dof: 7,
            dt: 0.002,
            time_window: TimeWindow::default(),
            filter: FilterOptions::default(),
            velocity_threshold: 0.1,
            slack: 1,
            racket_slide_offset: 0.14,
            racket_normal_offset: -0.05,
            frame_range: FrameRange::new(1000, 1100),
            camera_ids: vec![0, 1],
            moving_frames: FrameRange::new(750, 7380),
            frame_layout: FrameLayout::default(),
            detector: ColorBox::default(),
            output_path: Some(PathBuf::from("ball_locs.json")),
            projection: ProjectionConfig::default(),
        }
    }
}

impl AlignConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn racket_offsets(&self) -> RacketOffsets {
        RacketOffsets {
            slide: self.racket_slide_offset,
            normal: self.racket_normal_offset,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.dof > 0, "dof must be positive");
        ensure!(
            self.dt > 0.0 && self.dt.is_finite(),
            "dt must be positive, got {}",
            self.dt
        );
        self.time_window.validate()?;
        ensure!(
            self.filter.cutoff > 0.0 && self.filter.cutoff < 1.0,
            "filter cutoff must lie in (0, 1), got {}",
            self.filter.cutoff
        );
        let window_samples = (self.time_window.end - self.time_window.start) / self.dt;
        ensure!(
            (self.filter.padlen as Real) < window_samples.floor() + 1.0,
            "filter padlen {} needs more samples than the {}..{} s window holds",
            self.filter.padlen,
            self.time_window.start,
            self.time_window.end
        );
        ensure!(
            self.velocity_threshold >= 0.0,
            "velocity threshold must be non-negative, got {}",
            self.velocity_threshold
        );
        ensure!(!self.camera_ids.is_empty(), "no camera ids configured");
        ensure!(
            !self.frame_range.is_empty(),
            "frame range {} is empty",
            self.frame_range
        );
        ensure!(
            !self.moving_frames.is_empty(),
            "moving frame range {} is empty",
            self.moving_frames
        );
        Ok(())
    }
}
