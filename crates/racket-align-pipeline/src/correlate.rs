//! Pairing of 2D ball detections with 3D ball positions.
//!
//! The cameras are not triggered by the robot, so frame times are recovered
//! by stretching the moving frame range uniformly over the time span of the
//! detected motion window.

use crate::{BallDetections, FrameRange};
use anyhow::{Context, Result};
use log::debug;
use racket_align_core::{lerp, Pt2, Pt3, RacketSample, Real};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Time of `frame`, or `None` if it lies outside `moving`.
pub fn frame_time(frame: usize, moving: &FrameRange, t_start: Real, t_end: Real) -> Option<Real> {
    if !moving.contains(frame) {
        return None;
    }
    let s = (frame - moving.start) as Real / moving.len() as Real;
    Some(lerp(t_start, t_end, s))
}

/// Piecewise-linear interpolation of a sampled 3D path.
///
/// `times` must be ascending. Queries outside the sample span return the
/// nearest end point.
pub fn interp_position(times: &[Real], points: &[Pt3], t: Real) -> Option<Pt3> {
    if times.is_empty() || times.len() != points.len() || t.is_nan() {
        return None;
    }
    let last = times.len() - 1;
    if t <= times[0] {
        return Some(points[0]);
    }
    if t >= times[last] {
        return Some(points[last]);
    }
    // times[hi - 1] <= t < times[hi]
    let hi = times.partition_point(|&ti| ti <= t);
    let lo = hi - 1;
    let span = times[hi] - times[lo];
    if span <= 0.0 {
        return Some(points[lo]);
    }
    let s = (t - times[lo]) / span;
    Some(points[lo] + (points[hi] - points[lo]) * s)
}

/// One detection with its interpolated 3D ball position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallCorrespondence {
    pub camera: usize,
    pub frame: usize,
    pub time: Real,
    pub image: Pt2,
    pub world: Pt3,
}

/// Interpolate the ball path at every detection inside `moving`.
pub fn correlate(
    samples: &[RacketSample],
    detections: &BallDetections,
    moving: &FrameRange,
) -> Vec<BallCorrespondence> {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Vec::new();
    };
    let times: Vec<Real> = samples.iter().map(|s| s.time).collect();
    let balls: Vec<Pt3> = samples.iter().map(|s| s.ball).collect();

    let mut out = Vec::with_capacity(detections.len());
    let mut outside = 0usize;
    for (frame, camera, image) in detections.iter() {
        let Some(time) = frame_time(frame, moving, first.time, last.time) else {
            outside += 1;
            continue;
        };
        if let Some(world) = interp_position(&times, &balls, time) {
            out.push(BallCorrespondence {
                camera,
                frame,
                time,
                image,
                world,
            });
        }
    }
    if outside > 0 {
        debug!("{outside} detections outside moving frames {moving}");
    }
    out
}

/// Persisted artifact of one alignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallLocations {
    pub moving_frames: FrameRange,
    /// Motion window span the frames were mapped onto, in seconds.
    pub time_span: [Real; 2],
    pub correspondences: Vec<BallCorrespondence>,
}

impl BallLocations {
    pub fn for_camera(&self, camera: usize) -> impl Iterator<Item = &BallCorrespondence> + '_ {
        self.correspondences
            .iter()
            .filter(move |c| c.camera == camera)
    }
}

pub fn save_correspondences(path: &Path, locations: &BallLocations) -> Result<()> {
    let json = serde_json::to_string_pretty(locations)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_correspondences(path: &Path) -> Result<BallLocations> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use racket_align_core::{Quat, RacketPose};

    fn sample(time: Real, ball: Pt3) -> RacketSample {
        RacketSample {
            time,
            racket: RacketPose {
                position: ball,
                orientation: Quat::identity(),
            },
            ball,
        }
    }

    #[test]
    fn frame_time_is_uniform_over_span() {
        let moving = FrameRange::new(750, 7380);
        assert_eq!(frame_time(750, &moving, 30.0, 40.0), Some(30.0));
        let mid = frame_time(750 + 3315, &moving, 30.0, 40.0).unwrap();
        assert!((mid - 35.0).abs() < 1e-12);
        assert_eq!(frame_time(749, &moving, 30.0, 40.0), None);
        assert_eq!(frame_time(7380, &moving, 30.0, 40.0), None);
    }

    #[test]
    fn interpolation_is_linear_and_clamped() {
        let times = [0.0, 1.0, 3.0];
        let pts = [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 2.0, 0.0),
            Pt3::new(3.0, 2.0, -4.0),
        ];
        assert_eq!(interp_position(&times, &pts, 0.5), Some(Pt3::new(0.5, 1.0, 0.0)));
        assert_eq!(interp_position(&times, &pts, 2.0), Some(Pt3::new(2.0, 2.0, -2.0)));
        assert_eq!(interp_position(&times, &pts, 1.0), Some(pts[1]));
        assert_eq!(interp_position(&times, &pts, -5.0), Some(pts[0]));
        assert_eq!(interp_position(&times, &pts, 9.0), Some(pts[2]));
        assert_eq!(interp_position(&[], &[], 0.0), None);
    }

    #[test]
    fn correlate_skips_frames_outside_moving_range() {
        let samples: Vec<_> = (0..=10)
            .map(|i| sample(i as Real, Pt3::new(i as Real, 0.0, 1.0)))
            .collect();
        let mut det = BallDetections::new();
        det.insert(4, 0, Pt2::new(10.0, 20.0));
        det.insert(100, 0, Pt2::new(11.0, 21.0));
        det.insert(105, 1, Pt2::new(12.0, 22.0));
        det.insert(120, 1, Pt2::new(13.0, 23.0));

        let pairs = correlate(&samples, &det, &FrameRange::new(100, 120));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].frame, 100);
        assert_eq!(pairs[0].world, Pt3::new(0.0, 0.0, 1.0));
        assert_eq!(pairs[1].camera, 1);
        assert!((pairs[1].time - 2.5).abs() < 1e-12);
        assert!((pairs[1].world.x - 2.5).abs() < 1e-12);
        assert_eq!(pairs[1].image, Pt2::new(12.0, 22.0));
    }

    #[test]
    fn artifact_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/ball_locs.json");
        let locs = BallLocations {
            moving_frames: FrameRange::new(750, 7380),
            time_span: [30.5, 39.5],
            correspondences: vec![BallCorrespondence {
                camera: 1,
                frame: 1000,
                time: 30.9,
                image: Pt2::new(321.5, 200.25),
                world: Pt3::new(0.4, 0.6, 1.1),
            }],
        };
        save_correspondences(&path, &locs).unwrap();
        let back = load_correspondences(&path).unwrap();
        assert_eq!(back, locs);
        assert_eq!(back.for_camera(0).count(), 0);
    }
}
