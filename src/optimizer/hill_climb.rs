//! Local hill-climb refinement of a secondary position.
//!
//! Starting at a seed, the eight neighbors (along x, along y and along both diagonals) at the current step size are
//! evaluated. The neighbor with the smallest RMS spot size is taken if it improves on the best RMS spot size so far.
//! Otherwise the step size is halved. The best hit count is tracked for reporting only, unless
//! [`HillClimbConfig::min_hit_fraction`] restricts the neighbors to those keeping enough rays on the sensor.
use std::f64::consts::FRAC_1_SQRT_2;

use log::{info, warn};
use nalgebra::{vector, Point2, Vector2};
use serde::{Deserialize, Serialize};

use super::{Deadline, OptimizationResult, PositionObjective, PositionStats};
use crate::{
    error::{CassegrainError, CsgResult},
    utils::usize_to_f64,
};

const DIRECTIONS: [Vector2<f64>; 8] = [
    vector![1.0, 0.0],
    vector![-1.0, 0.0],
    vector![0.0, 1.0],
    vector![0.0, -1.0],
    vector![FRAC_1_SQRT_2, FRAC_1_SQRT_2],
    vector![-FRAC_1_SQRT_2, FRAC_1_SQRT_2],
    vector![FRAC_1_SQRT_2, -FRAC_1_SQRT_2],
    vector![-FRAC_1_SQRT_2, -FRAC_1_SQRT_2],
];

/// Parameters of a hill-climb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbConfig {
    /// initial step size in mm
    pub initial_step: f64,
    /// the climb stops as soon as the step size drops below this value
    pub min_step: f64,
    /// maximum number of iterations
    pub max_iterations: usize,
    /// minimum fraction of the ray bundle hitting the sensor for a neighbor to be considered (0.0 considers all)
    pub min_hit_fraction: f64,
}
impl Default for HillClimbConfig {
    fn default() -> Self {
        Self {
            initial_step: 0.5,
            min_step: 1e-3,
            max_iterations: 10_000,
            min_hit_fraction: 0.0,
        }
    }
}
impl HillClimbConfig {
    /// Check the hill-climb parameters.
    ///
    /// # Errors
    ///
    /// This function returns an error if one of the step sizes is not positive and finite or if the hit fraction
    /// is outside `[0, 1]`.
    pub fn validate(&self) -> CsgResult<()> {
        if !self.initial_step.is_normal() || self.initial_step.is_sign_negative() {
            return Err(CassegrainError::Optimizer(
                "initial step must be > 0.0 and finite".into(),
            ));
        }
        if !self.min_step.is_normal() || self.min_step.is_sign_negative() {
            return Err(CassegrainError::Optimizer(
                "minimum step must be > 0.0 and finite".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_hit_fraction) {
            return Err(CassegrainError::Optimizer(
                "minimum hit fraction must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn climb(
    objective: &impl PositionObjective,
    seed: Point2<f64>,
    config: &HillClimbConfig,
    deadline: Deadline,
) -> CsgResult<OptimizationResult> {
    config.validate()?;
    if !seed.x.is_finite() || !seed.y.is_finite() {
        return Err(CassegrainError::Optimizer("seed position must be finite".into()));
    }
    let seed_stats = objective.evaluate(seed);
    let mut evaluations = 1;
    // a neighbor never needs more hits than the seed already has
    let hit_threshold = (config.min_hit_fraction * usize_to_f64(objective.bundle_size()))
        .min(usize_to_f64(seed_stats.hits));
    let mut position = seed;
    let mut best_rms = seed_stats.rms_spot_size;
    let mut peak_hits = seed_stats.hits;
    let mut step = config.initial_step;
    let mut iterations = 0;
    let mut truncated = false;
    while step >= config.min_step && iterations < config.max_iterations {
        if deadline.expired() {
            warn!("hill-climb stopped by deadline after {iterations} iterations");
            truncated = true;
            break;
        }
        iterations += 1;
        let mut candidate: Option<(Point2<f64>, PositionStats)> = None;
        for direction in &DIRECTIONS {
            let neighbor = position + direction * step;
            let stats = objective.evaluate(neighbor);
            evaluations += 1;
            peak_hits = peak_hits.max(stats.hits);
            if usize_to_f64(stats.hits) < hit_threshold {
                continue;
            }
            if candidate.map_or(true, |(_, best)| stats.rms_spot_size < best.rms_spot_size) {
                candidate = Some((neighbor, stats));
            }
        }
        match candidate {
            Some((neighbor, stats)) if stats.rms_spot_size < best_rms => {
                position = neighbor;
                best_rms = stats.rms_spot_size;
            }
            _ => step *= 0.5,
        }
    }
    let final_stats = objective.evaluate(position);
    evaluations += 1;
    info!(
        "hill-climb: {iterations} iterations, best position ({:.4}, {:.4}) with {} hits, rms {:.4} mm",
        position.x, position.y, final_stats.hits, final_stats.rms_spot_size
    );
    Ok(OptimizationResult {
        peak_hits: peak_hits.max(final_stats.hits),
        evaluations,
        truncated,
        ..OptimizationResult::from_stats(position, &final_stats)
    })
}
