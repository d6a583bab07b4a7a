//! Model-agnostic RANSAC.
//!
//! Implement [`Estimator`] for a model and call [`ransac`] with the data and
//! [`RansacOptions`]. Sampling is seeded, so a run is reproducible. Failure
//! to reach consensus is not an error: the returned [`RansacResult`] simply
//! has `model == None`.

use log::debug;
use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RansacOptions {
    pub max_iters: usize,
    /// Inlier residual threshold, in the estimator's residual units.
    pub thresh: f64,
    /// Minimum consensus size for a model to be accepted.
    pub min_inliers: usize,
    /// Probability of drawing at least one all-inlier sample; drives early
    /// termination.
    pub confidence: f64,
    pub seed: u64,
    /// Re-estimate from the full inlier set of every accepted hypothesis.
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            thresh: 3.0,
            min_inliers: 8,
            confidence: 0.99,
            seed: 1_234_567,
            refit_on_inliers: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<usize>,
    /// RMS residual over `inliers`.
    pub inlier_rms: f64,
    pub iters: usize,
}

impl<M> RansacResult<M> {
    pub fn success(&self) -> bool {
        self.model.is_some()
    }
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

/// Minimal-sample model fitting for [`ransac`].
pub trait Estimator {
    type Datum;
    type Model;

    const MIN_SAMPLES: usize;

    /// Fit from a minimal sample; `None` when the sample is unusable.
    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum, comparable to `thresh`.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    fn is_degenerate(_data: &[Self::Datum], _sample: &[usize]) -> bool {
        false
    }

    /// Least-squares fit on an inlier set. Defaults to no refit.
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

struct Consensus {
    inliers: Vec<usize>,
    rms: f64,
}

impl Consensus {
    fn score<E: Estimator>(model: &E::Model, data: &[E::Datum], thresh: f64) -> Self {
        let mut inliers = Vec::new();
        let mut ss = 0.0;
        for (i, datum) in data.iter().enumerate() {
            let r = E::residual(model, datum);
            if r <= thresh {
                inliers.push(i);
                ss += r * r;
            }
        }
        let rms = if inliers.is_empty() {
            f64::INFINITY
        } else {
            (ss / inliers.len() as f64).sqrt()
        };
        Self { inliers, rms }
    }

    fn beats<M>(&self, best: &RansacResult<M>) -> bool {
        best.model.is_none()
            || self.inliers.len() > best.inliers.len()
            || (self.inliers.len() == best.inliers.len() && self.rms < best.inlier_rms)
    }
}

/// Iterations needed to hit `confidence` at the given inlier ratio, never
/// below `done` and never above `max_iters`.
fn adaptive_iterations(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    done: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }
    let miss = (1.0 - inlier_ratio.powi(sample_size as i32)).max(1e-12).ln();
    if miss >= 0.0 {
        return max_iters;
    }
    let needed = ((1.0 - confidence).ln() / miss).ceil() as usize;
    needed.clamp(done, max_iters)
}

/// Run RANSAC for estimator `E`.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut best = RansacResult::default();
    if data.len() < E::MIN_SAMPLES {
        return best;
    }

    let indices: Vec<usize> = (0..data.len()).collect();
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut budget = opts.max_iters;
    let mut iter = 0;

    while iter < budget {
        iter += 1;
        let sample: Vec<usize> = indices
            .choose_multiple(&mut rng, E::MIN_SAMPLES)
            .copied()
            .collect();
        if E::is_degenerate(data, &sample) {
            continue;
        }
        let Some(mut model) = E::fit(data, &sample) else {
            continue;
        };

        let mut consensus = Consensus::score::<E>(&model, data, opts.thresh);
        if consensus.inliers.len() < opts.min_inliers {
            continue;
        }
        if opts.refit_on_inliers {
            if let Some(refit) = E::refit(data, &consensus.inliers) {
                model = refit;
                consensus = Consensus::score::<E>(&model, data, opts.thresh);
            }
        }

        if consensus.beats(&best) {
            let ratio = consensus.inliers.len() as f64 / data.len() as f64;
            best = RansacResult {
                model: Some(model),
                inliers: consensus.inliers,
                inlier_rms: consensus.rms,
                iters: iter,
            };
            budget = adaptive_iterations(opts.confidence, ratio, E::MIN_SAMPLES, iter, opts.max_iters);
        }
    }

    debug!(
        "ransac: {} iterations, {} / {} inliers, rms {:.4}",
        iter,
        best.inliers.len(),
        data.len(),
        best.inlier_rms
    );
    best
}
