//! Zero-phase low-pass filtering of joint channels.
//!
//! The filter is a second-order digital Butterworth section designed with the
//! bilinear transform, cutoff expressed as a fraction of the Nyquist
//! frequency. [`filtfilt`] runs it forward and backward so the output has no
//! phase delay; the signal is padded with an odd (point-symmetric) extension
//! and the filter state starts at steady state to keep the ends quiet.

use crate::{JointTrajectory, Real, TrajectoryError};
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("cutoff must lie strictly between 0 and 1 (fraction of Nyquist), got {0}")]
    InvalidCutoff(Real),
    #[error("signal of length {len} is too short for padding of {padlen} samples")]
    SignalTooShort { len: usize, padlen: usize },
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

/// Low-pass filter settings for the joint channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Cutoff as a fraction of the Nyquist frequency.
    pub cutoff: Real,
    /// Samples of odd extension added on each side before filtering.
    pub padlen: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            cutoff: 0.1,
            padlen: 50,
        }
    }
}

/// Second-order IIR section `b / a` with `a[0] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Butterworth2 {
    pub b: [Real; 3],
    pub a: [Real; 3],
}

impl Butterworth2 {
    /// Second-order Butterworth low-pass, cutoff normalised to Nyquist.
    pub fn lowpass(cutoff: Real) -> Result<Self, FilterError> {
        if !(cutoff > 0.0 && cutoff < 1.0) {
            return Err(FilterError::InvalidCutoff(cutoff));
        }
        // Prewarped analog cutoff.
        let k = (PI * cutoff / 2.0).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
        let b0 = k2 * norm;
        Ok(Self {
            b: [b0, 2.0 * b0, b0],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - SQRT_2 * k + k2) * norm],
        })
    }

    pub fn dc_gain(&self) -> Real {
        self.b.iter().sum::<Real>() / self.a.iter().sum::<Real>()
    }

    /// Filter state for a unit step that has been applied forever.
    ///
    /// Scale by the first input sample to start the filter without a
    /// transient.
    pub fn steady_state(&self) -> [Real; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    /// Direct-form II transposed filtering with initial state `zi`.
    pub fn lfilter(&self, x: &[Real], zi: [Real; 2]) -> Vec<Real> {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let [mut z0, mut z1] = zi;
        x.iter()
            .map(|&xn| {
                let yn = b0 * xn + z0;
                z0 = b1 * xn - a1 * yn + z1;
                z1 = b2 * xn - a2 * yn;
                yn
            })
            .collect()
    }
}

/// Odd extension: `2 x[0] - x[padlen..=1]`, `x`, `2 x[n-1] - x[n-2..=n-1-padlen]`.
fn odd_extend(x: &[Real], padlen: usize) -> Vec<Real> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

/// Forward-backward (zero-phase) filtering of one channel.
///
/// The signal must be strictly longer than `padlen`.
pub fn filtfilt(filter: &Butterworth2, x: &[Real], padlen: usize) -> Result<Vec<Real>, FilterError> {
    if x.len() <= padlen || x.is_empty() {
        return Err(FilterError::SignalTooShort {
            len: x.len(),
            padlen,
        });
    }
    let ext = odd_extend(x, padlen);
    let zi = filter.steady_state();

    let forward = filter.lfilter(&ext, [zi[0] * ext[0], zi[1] * ext[0]]);

    let mut reversed: Vec<Real> = forward.into_iter().rev().collect();
    let y0 = reversed[0];
    reversed = filter.lfilter(&reversed, [zi[0] * y0, zi[1] * y0]);
    reversed.reverse();

    Ok(reversed[padlen..padlen + x.len()].to_vec())
}

/// Filter every joint column independently.
pub fn filter_trajectory(
    traj: &JointTrajectory,
    filter: &Butterworth2,
    padlen: usize,
) -> Result<JointTrajectory, FilterError> {
    let n = traj.len();
    let mut filtered = DMatrix::<Real>::zeros(n, traj.dof());
    for j in 0..traj.dof() {
        let channel = filtfilt(filter, &traj.joint(j), padlen)?;
        filtered.set_column(j, &nalgebra::DVector::from_vec(channel));
    }
    debug!(
        "filtered {} joints over {} samples (b = {:?}, a = {:?})",
        traj.dof(),
        n,
        filter.b,
        filter.a
    );
    Ok(traj.with_angles(filtered)?)
}
