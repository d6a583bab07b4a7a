use crate::{JointTrajectory, Real, TrajectoryError};
use std::f64::consts::PI;

/// Joint offsets of the synthetic rest pose; keeps the arm away from the
/// fully stretched singular configuration.
pub const REST_POSE: [Real; 7] = [0.0, 0.5, 0.0, 1.5, 0.0, -0.3, 0.0];

/// Flat 7-joint recording: rest pose, joint 0 advancing by `step` per sample
/// from sample `start` up to sample `end`, then holding.
pub fn ramp_values(n: usize, start: usize, end: usize, step: Real) -> Vec<Real> {
    let mut values = Vec::with_capacity(n * 7);
    for i in 0..n {
        let advance = i.clamp(start, end.max(start)) - start;
        let mut q = REST_POSE;
        q[0] += step * advance as Real;
        values.extend_from_slice(&q);
    }
    values
}

/// [`ramp_values`] reshaped with sample period `dt`.
pub fn ramp_trajectory(
    n: usize,
    dt: Real,
    start: usize,
    end: usize,
    step: Real,
) -> Result<JointTrajectory, TrajectoryError> {
    JointTrajectory::from_flat(&ramp_values(n, start, end, step), 7, dt)
}

/// Flat 7-joint recording of a smooth out-and-back swing.
///
/// All joints rest at [`REST_POSE`] except inside `[t_start, t_end]` seconds,
/// where joints 0, 1 and 3 follow a raised-cosine excursion of `amplitude`
/// radians. Timestamps follow the recording convention `t_i = dt * (i + 1)`.
pub fn swing_values(n: usize, dt: Real, t_start: Real, t_end: Real, amplitude: Real) -> Vec<Real> {
    let weights = [1.0, 0.5, 0.0, -0.8, 0.0, 0.0, 0.0];
    let mut values = Vec::with_capacity(n * 7);
    for i in 0..n {
        let t = dt * (i + 1) as Real;
        let phase = if t > t_start && t < t_end {
            let s = (t - t_start) / (t_end - t_start);
            0.5 * (1.0 - (2.0 * PI * s).cos())
        } else {
            0.0
        };
        for (rest, w) in REST_POSE.iter().zip(weights.iter()) {
            values.push(rest + w * amplitude * phase);
        }
    }
    values
}

/// Render values in the flat joint-file format, one 7-joint row per line.
pub fn to_joint_text(values: &[Real]) -> String {
    values
        .chunks(7)
        .map(|row| {
            row.iter()
                .map(|v| format!("{v:e}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
