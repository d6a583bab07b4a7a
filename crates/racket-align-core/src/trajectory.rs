//! Joint-angle recordings.
//!
//! A recording is a flat text file of whitespace-separated numbers holding a
//! row-major `N x dof` matrix: one row per control tick, one column per
//! joint. There is no header and no timestamp column; sample `i` was taken at
//! `dt * (i + 1)` seconds.

use crate::Real;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("failed to read joint file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("value {index} ({token:?}) is not a number")]
    Parse { index: usize, token: String },
    #[error("degrees of freedom must be positive")]
    ZeroDof,
    #[error("{len} values cannot be reshaped into rows of {dof} joints")]
    ShapeMismatch { len: usize, dof: usize },
    #[error("sample period must be positive and finite, got {0}")]
    InvalidPeriod(Real),
    #[error("{times} timestamps for {rows} joint rows")]
    LengthMismatch { times: usize, rows: usize },
    #[error("time window start {start} s is after end {end} s")]
    InvalidWindow { start: Real, end: Real },
    #[error("no samples inside [{start}, {end}] s (recording spans {first}..{last} s)")]
    EmptyWindow {
        start: Real,
        end: Real,
        first: Real,
        last: Real,
    },
}

/// Closed time interval `[start, end]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Real,
    pub end: Real,
}

impl TimeWindow {
    pub fn new(start: Real, end: Real) -> Result<Self, TrajectoryError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Rejects windows with `start > end` (and NaN bounds).
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.start <= self.end {
            Ok(())
        } else {
            Err(TrajectoryError::InvalidWindow {
                start: self.start,
                end: self.end,
            })
        }
    }

    pub fn contains(&self, t: Real) -> bool {
        t >= self.start && t <= self.end
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: 20.0,
            end: 60.0,
        }
    }
}

/// Parse whitespace-separated numbers.
pub fn parse_joint_values(text: &str) -> Result<Vec<Real>, TrajectoryError> {
    text.split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            token.parse::<Real>().map_err(|_| TrajectoryError::Parse {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Read a flat joint file into a vector of numbers.
pub fn load_joint_file(path: &Path) -> Result<Vec<Real>, TrajectoryError> {
    let text = std::fs::read_to_string(path).map_err(|source| TrajectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_joint_values(&text)
}

/// Uniformly sampled joint-angle trajectory.
///
/// `angles` has one row per sample and one column per joint; `times` holds
/// the matching timestamps in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    times: Vec<Real>,
    angles: DMatrix<Real>,
    dt: Real,
}

impl JointTrajectory {
    pub fn new(times: Vec<Real>, angles: DMatrix<Real>, dt: Real) -> Result<Self, TrajectoryError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(TrajectoryError::InvalidPeriod(dt));
        }
        if times.len() != angles.nrows() {
            return Err(TrajectoryError::LengthMismatch {
                times: times.len(),
                rows: angles.nrows(),
            });
        }
        Ok(Self { times, angles, dt })
    }

    /// Reshape a row-major flat sequence into `N x dof` samples.
    ///
    /// Timestamps start at `dt` and advance by `dt` per row.
    pub fn from_flat(values: &[Real], dof: usize, dt: Real) -> Result<Self, TrajectoryError> {
        if dof == 0 {
            return Err(TrajectoryError::ZeroDof);
        }
        if values.len() % dof != 0 {
            return Err(TrajectoryError::ShapeMismatch {
                len: values.len(),
                dof,
            });
        }
        let n = values.len() / dof;
        let angles = DMatrix::from_row_slice(n, dof, values);
        let times = (1..=n).map(|k| dt * k as Real).collect();
        Self::new(times, angles, dt)
    }

    /// Load and reshape a joint file.
    pub fn load(path: &Path, dof: usize, dt: Real) -> Result<Self, TrajectoryError> {
        let values = load_joint_file(path)?;
        let traj = Self::from_flat(&values, dof, dt)?;
        debug!(
            "loaded {} samples x {} joints from {}",
            traj.len(),
            dof,
            path.display()
        );
        Ok(traj)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn dof(&self) -> usize {
        self.angles.ncols()
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn angles(&self) -> &DMatrix<Real> {
        &self.angles
    }

    /// Joint vector of sample `i`.
    pub fn sample(&self, i: usize) -> Vec<Real> {
        self.angles.row(i).iter().copied().collect()
    }

    /// All samples of joint `j`.
    pub fn joint(&self, j: usize) -> Vec<Real> {
        self.angles.column(j).iter().copied().collect()
    }

    /// Flatten back to the row-major file order.
    pub fn to_flat(&self) -> Vec<Real> {
        self.angles.transpose().as_slice().to_vec()
    }

    /// Same timestamps with different joint values, e.g. a filtered copy.
    pub fn with_angles(&self, angles: DMatrix<Real>) -> Result<Self, TrajectoryError> {
        Self::new(self.times.clone(), angles, self.dt)
    }

    /// Keep only the samples whose timestamp lies inside `window`.
    pub fn window(&self, window: &TimeWindow) -> Result<Self, TrajectoryError> {
        window.validate()?;
        let keep: Vec<usize> = self
            .times
            .iter()
            .enumerate()
            .filter(|(_, t)| window.contains(**t))
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Err(TrajectoryError::EmptyWindow {
                start: window.start,
                end: window.end,
                first: self.times.first().copied().unwrap_or(0.0),
                last: self.times.last().copied().unwrap_or(0.0),
            });
        }
        let times = keep.iter().map(|&i| self.times[i]).collect();
        let angles = self.angles.select_rows(keep.iter());
        Self::new(times, angles, self.dt)
    }

    /// Contiguous sub-trajectory over an inclusive index range.
    ///
    /// # Panics
    ///
    /// Panics if the range reaches past the last sample.
    pub fn slice(&self, range: RangeInclusive<usize>) -> Self {
        let (start, end) = range.into_inner();
        let rows = end + 1 - start;
        Self {
            times: self.times[start..=end].to_vec(),
            angles: self.angles.rows(start, rows).into_owned(),
            dt: self.dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reshape_is_row_major_and_round_trips() {
        let text = "0.1 0.2 0.3 0.4 0.5 0.6 0.7\n1.1 1.2 1.3 1.4 1.5 1.6 -1.7\n";
        let values = parse_joint_values(text).unwrap();
        let traj = JointTrajectory::from_flat(&values, 7, 0.002).unwrap();

        assert_eq!(traj.len(), 2);
        assert_eq!(traj.dof(), 7);
        assert_eq!(traj.sample(1)[6], -1.7);
        assert_eq!(traj.joint(0), vec![0.1, 1.1]);
        assert_eq!(traj.to_flat(), values);
    }

    #[test]
    fn file_round_trip_reproduces_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let values: Vec<Real> = (0..70).map(|i| (i as Real * 0.37).sin()).collect();
        let text = values
            .iter()
            .map(|v| format!("{v:e}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(file, "{text}").unwrap();

        let traj = JointTrajectory::load(file.path(), 7, 0.002).unwrap();
        assert_eq!(traj.len(), 10);
        assert_eq!(traj.to_flat(), values);
    }

    #[test]
    fn indivisible_length_is_shape_error() {
        let values = vec![0.0; 15];
        let err = JointTrajectory::from_flat(&values, 7, 0.002).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::ShapeMismatch { len: 15, dof: 7 }
        ));
    }

    #[test]
    fn garbage_token_is_reported() {
        let err = parse_joint_values("1.0 2.0 nope 4.0").unwrap_err();
        assert!(matches!(err, TrajectoryError::Parse { index: 2, .. }));
    }

    #[test]
    fn timestamps_start_at_dt() {
        let traj = JointTrajectory::from_flat(&[0.0; 21], 7, 0.5).unwrap();
        assert_eq!(traj.times(), &[0.5, 1.0, 1.5]);
    }

    #[test]
    fn window_keeps_closed_interval() {
        let traj = JointTrajectory::from_flat(&vec![0.0; 7 * 10], 7, 1.0).unwrap();
        let cut = traj.window(&TimeWindow::new(3.0, 6.0).unwrap()).unwrap();
        assert_eq!(cut.times(), &[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(cut.angles().nrows(), 4);
    }

    #[test]
    fn window_outside_recording_fails() {
        let traj = JointTrajectory::from_flat(&vec![0.0; 7 * 10], 7, 1.0).unwrap();
        let err = traj
            .window(&TimeWindow {
                start: 20.0,
                end: 60.0,
            })
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::EmptyWindow { .. }));
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(matches!(
            TimeWindow::new(5.0, 1.0),
            Err(TrajectoryError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn slice_is_inclusive() {
        let values: Vec<Real> = (0..7 * 6).map(|i| i as Real).collect();
        let traj = JointTrajectory::from_flat(&values, 7, 1.0).unwrap();
        let part = traj.slice(2..=4);
        assert_eq!(part.times(), &[3.0, 4.0, 5.0]);
        assert_eq!(part.sample(0)[0], 14.0);
    }
}
