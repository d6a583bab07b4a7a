//! Ball detection in captured camera frames.
//!
//! The pipeline only needs image-space ball centres per frame and camera;
//! how they are found is up to the [`BallDetector`] it is given.
//! [`ColorBlobDetector`] is the stock implementation: it reads one image per
//! (camera, frame) and takes the centroid of the pixels inside an RGB box.

use image::RgbImage;
use log::{debug, warn};
use racket_align_core::{Pt2, Real};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to load frame {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame range {0} is empty")]
    EmptyRange(FrameRange),
    #[error("no cameras requested")]
    NoCameras,
}

/// Half-open range of frame indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.start && frame < self.end
    }

    pub fn iter(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Detected ball centres, frame -> camera -> pixel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallDetections {
    frames: BTreeMap<usize, BTreeMap<usize, Pt2>>,
}

impl BallDetections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame: usize, camera: usize, center: Pt2) {
        self.frames.entry(frame).or_default().insert(camera, center);
    }

    pub fn get(&self, frame: usize, camera: usize) -> Option<Pt2> {
        self.frames.get(&frame)?.get(&camera).copied()
    }

    /// Total number of detections over all frames and cameras.
    pub fn len(&self) -> usize {
        self.frames.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(frame, camera, centre)` in frame order, then camera order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Pt2)> + '_ {
        self.frames.iter().flat_map(|(&frame, cams)| {
            cams.iter().map(move |(&camera, &center)| (frame, camera, center))
        })
    }

    pub fn count_for_camera(&self, camera: usize) -> usize {
        self.frames
            .values()
            .filter(|cams| cams.contains_key(&camera))
            .count()
    }
}

/// Produces ball centres for a frame range and a set of cameras.
pub trait BallDetector {
    fn detect(
        &self,
        frames: FrameRange,
        cameras: &[usize],
    ) -> Result<BallDetections, DetectionError>;
}

/// Where the frames of a capture session live on disk.
///
/// `pattern` is relative to `root` and may contain `{cam}` and `{frame}`;
/// the frame number is zero-padded to `frame_digits`. The image format
/// follows the file extension; PNG and JPEG frames can be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub root: PathBuf,
    pub pattern: String,
    pub frame_digits: usize,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("movies/robot/ping/black"),
            pattern: "cam{cam}/{frame}.png".to_string(),
            frame_digits: 6,
        }
    }
}

impl FrameLayout {
    pub fn frame_path(&self, camera: usize, frame: usize) -> PathBuf {
        let frame = format!("{:0width$}", frame, width = self.frame_digits);
        let name = self
            .pattern
            .replace("{cam}", &camera.to_string())
            .replace("{frame}", &frame);
        self.root.join(name)
    }
}

/// Inclusive RGB box a ball pixel must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBox {
    pub min: [u8; 3],
    pub max: [u8; 3],
    /// Fewer matching pixels than this means no ball.
    pub min_area: usize,
}

impl Default for ColorBox {
    fn default() -> Self {
        // Orange table-tennis ball.
        Self {
            min: [180, 60, 0],
            max: [255, 200, 90],
            min_area: 4,
        }
    }
}

impl ColorBox {
    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|c| rgb[c] >= self.min[c] && rgb[c] <= self.max[c])
    }
}

/// Centroid of the pixels inside `color`, if there are enough of them.
pub fn locate_ball(image: &RgbImage, color: &ColorBox) -> Option<Pt2> {
    let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
    for (x, y, px) in image.enumerate_pixels() {
        if color.contains(px.0) {
            sx += x as Real;
            sy += y as Real;
            count += 1;
        }
    }
    if count == 0 || count < color.min_area {
        return None;
    }
    Some(Pt2::new(sx / count as Real, sy / count as Real))
}

/// Colour-threshold detector over frames laid out by a [`FrameLayout`].
#[derive(Debug, Clone)]
pub struct ColorBlobDetector {
    pub layout: FrameLayout,
    pub color: ColorBox,
}

impl ColorBlobDetector {
    pub fn new(layout: FrameLayout, color: ColorBox) -> Self {
        Self { layout, color }
    }

    fn load(&self, path: &Path) -> Result<RgbImage, DetectionError> {
        let img = image::open(path).map_err(|source| DetectionError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(img.to_rgb8())
    }
}

impl BallDetector for ColorBlobDetector {
    fn detect(
        &self,
        frames: FrameRange,
        cameras: &[usize],
    ) -> Result<BallDetections, DetectionError> {
        if frames.is_empty() {
            return Err(DetectionError::EmptyRange(frames));
        }
        if cameras.is_empty() {
            return Err(DetectionError::NoCameras);
        }

        let mut detections = BallDetections::new();
        for &camera in cameras {
            let mut misses = 0usize;
            for frame in frames.iter() {
                let img = self.load(&self.layout.frame_path(camera, frame))?;
                match locate_ball(&img, &self.color) {
                    Some(center) => detections.insert(frame, camera, center),
                    None => misses += 1,
                }
            }
            if misses == frames.len() {
                warn!("camera {camera}: no ball found in frames {frames}");
            } else {
                debug!("camera {camera}: ball missing in {misses} of {} frames", frames.len());
            }
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame_with_ball(cx: u32, cy: u32, r: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(64, 48, Rgb([30, 90, 40]));
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                img.put_pixel(x, y, Rgb([240, 130, 20]));
            }
        }
        img
    }

    #[test]
    fn frame_path_substitutes_placeholders() {
        let layout = FrameLayout {
            root: PathBuf::from("/data/session"),
            pattern: "cam{cam}/img_{frame}.png".into(),
            frame_digits: 5,
        };
        assert_eq!(
            layout.frame_path(1, 42),
            PathBuf::from("/data/session/cam1/img_00042.png")
        );
    }

    #[test]
    fn centroid_of_square_blob() {
        let img = frame_with_ball(20, 30, 2);
        let c = locate_ball(&img, &ColorBox::default()).unwrap();
        assert_eq!(c, Pt2::new(20.0, 30.0));
    }

    #[test]
    fn small_blob_is_ignored() {
        let mut img = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        img.put_pixel(3, 3, Rgb([240, 130, 20]));
        assert!(locate_ball(&img, &ColorBox::default()).is_none());
    }

    #[test]
    fn detector_reads_frames_per_camera() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout {
            root: dir.path().to_path_buf(),
            pattern: "cam{cam}/{frame}.png".into(),
            frame_digits: 4,
        };
        for camera in 0..2u32 {
            std::fs::create_dir_all(dir.path().join(format!("cam{camera}"))).unwrap();
            for frame in 10..13u32 {
                let img = if frame == 11 && camera == 1 {
                    RgbImage::from_pixel(64, 48, Rgb([0, 0, 0]))
                } else {
                    frame_with_ball(10 + 5 * frame - 50, 10 + 10 * camera, 3)
                };
                img.save(layout.frame_path(camera as usize, frame as usize))
                    .unwrap();
            }
        }

        let detector = ColorBlobDetector::new(layout, ColorBox::default());
        let found = detector.detect(FrameRange::new(10, 13), &[0, 1]).unwrap();

        assert_eq!(found.len(), 5);
        assert_eq!(found.get(12, 0), Some(Pt2::new(20.0, 10.0)));
        assert_eq!(found.get(12, 1), Some(Pt2::new(20.0, 20.0)));
        assert_eq!(found.get(11, 1), None);
        assert_eq!(found.count_for_camera(1), 2);
    }

    #[test]
    fn jpeg_frames_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout {
            root: dir.path().to_path_buf(),
            pattern: "cam{cam}_{frame}.jpg".into(),
            frame_digits: 3,
        };
        frame_with_ball(32, 24, 4)
            .save(layout.frame_path(0, 7))
            .unwrap();

        let detector = ColorBlobDetector::new(layout, ColorBox::default());
        let found = detector.detect(FrameRange::new(7, 8), &[0]).unwrap();
        let c = found.get(7, 0).unwrap();
        assert!((c - Pt2::new(32.0, 24.0)).norm() < 1.0, "{c}");
    }

    #[test]
    fn missing_frame_is_an_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout {
            root: dir.path().to_path_buf(),
            ..FrameLayout::default()
        };
        let detector = ColorBlobDetector::new(layout, ColorBox::default());
        let err = detector.detect(FrameRange::new(0, 1), &[0]).unwrap_err();
        assert!(matches!(err, DetectionError::Image { .. }));
        assert!(err.to_string().contains("000000.png"));
    }

    #[test]
    fn detections_iterate_in_frame_order() {
        let mut d = BallDetections::new();
        d.insert(5, 1, Pt2::new(1.0, 1.0));
        d.insert(3, 0, Pt2::new(2.0, 2.0));
        d.insert(5, 0, Pt2::new(3.0, 3.0));
        let order: Vec<(usize, usize)> = d.iter().map(|(f, c, _)| (f, c)).collect();
        assert_eq!(order, vec![(3, 0), (5, 0), (5, 1)]);
    }
}
