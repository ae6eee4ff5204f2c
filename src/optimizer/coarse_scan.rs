//! Coarse grid scan over secondary positions.
//!
//! Every position of a rectangular grid is evaluated. The winner is the position with the smallest RMS spot size
//! among all positions collecting at least a given fraction of the ray bundle on the sensor. If no position
//! qualifies, the (first) position with the most sensor hits wins.
use itertools::iproduct;
use log::{debug, info, warn};
use nalgebra::{point, Point2};
use serde::{Deserialize, Serialize};

use super::{Deadline, OptimizationResult, PositionObjective, PositionStats};
use crate::{
    error::{CassegrainError, CsgResult},
    utils::{sample_count, usize_to_f64},
};

/// Samples with `|y|` below this value contribute to the scan trace.
const TRACE_Y_TOLERANCE: f64 = 0.01;
/// Upper limit of grid positions of a single scan.
pub const MAX_SCAN_POSITIONS: usize = 1_000_000;

/// Parameters of a coarse grid scan. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseScanConfig {
    /// lower bound of x positions
    pub x_min: f64,
    /// upper bound of x positions
    pub x_max: f64,
    /// step between x positions
    pub x_step: f64,
    /// lower bound of y positions
    pub y_min: f64,
    /// upper bound of y positions
    pub y_max: f64,
    /// step between y positions
    pub y_step: f64,
    /// minimum fraction of the ray bundle hitting the sensor for a position to compete on RMS spot size
    pub min_hit_fraction: f64,
}
impl Default for CoarseScanConfig {
    fn default() -> Self {
        Self {
            x_min: 50.0,
            x_max: 450.0,
            x_step: 2.0,
            y_min: 0.0,
            y_max: 0.0,
            y_step: 1.0,
            min_hit_fraction: 0.5,
        }
    }
}
impl CoarseScanConfig {
    /// Create a one-dimensional scan along x with y fixed at 0.
    #[must_use]
    pub fn along_x(x_min: f64, x_max: f64, x_step: f64) -> Self {
        Self {
            x_min,
            x_max,
            x_step,
            ..Self::default()
        }
    }
    /// Check the scan parameters.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - a bound is not finite or a lower bound exceeds its upper bound
    ///  - a step is not positive and finite
    ///  - the grid has more than [`MAX_SCAN_POSITIONS`] positions
    ///  - the hit fraction is outside `[0, 1]`
    pub fn validate(&self) -> CsgResult<()> {
        for (min, max, step, axis) in [
            (self.x_min, self.x_max, self.x_step, "x"),
            (self.y_min, self.y_max, self.y_step, "y"),
        ] {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(CassegrainError::Optimizer(format!(
                    "{axis} scan range must be finite with min <= max"
                )));
            }
            if !step.is_normal() || step.is_sign_negative() {
                return Err(CassegrainError::Optimizer(format!(
                    "{axis} scan step must be > 0.0 and finite"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_hit_fraction) {
            return Err(CassegrainError::Optimizer(
                "minimum hit fraction must be within [0, 1]".into(),
            ));
        }
        self.grid_shape().map(|_| ())
    }
    /// Returns the number of grid positions of this scan.
    ///
    /// # Errors
    ///
    /// This function returns an error if the grid has more than [`MAX_SCAN_POSITIONS`] positions.
    pub fn nr_of_positions(&self) -> CsgResult<usize> {
        self.grid_shape().map(|(nr_of_x, nr_of_y)| nr_of_x * nr_of_y)
    }
    fn grid_shape(&self) -> CsgResult<(usize, usize)> {
        let too_large = || {
            CassegrainError::Optimizer(format!(
                "scan grid exceeds {MAX_SCAN_POSITIONS} positions"
            ))
        };
        let nr_of_x = sample_count(self.x_min, self.x_max, self.x_step).ok_or_else(too_large)?;
        let nr_of_y = sample_count(self.y_min, self.y_max, self.y_step).ok_or_else(too_large)?;
        match nr_of_x.checked_mul(nr_of_y) {
            Some(n) if n <= MAX_SCAN_POSITIONS => Ok((nr_of_x, nr_of_y)),
            _ => Err(too_large()),
        }
    }
}

pub(crate) fn scan(
    objective: &impl PositionObjective,
    config: &CoarseScanConfig,
    deadline: Deadline,
) -> CsgResult<OptimizationResult> {
    config.validate()?;
    let (nr_of_x, nr_of_y) = config.grid_shape()?;
    let hit_threshold = config.min_hit_fraction * usize_to_f64(objective.bundle_size());
    let mut most_hits: Option<(Point2<f64>, PositionStats)> = None;
    let mut best_rms: Option<(Point2<f64>, PositionStats)> = None;
    let mut scan_trace = Vec::new();
    let mut evaluations = 0;
    let mut truncated = false;
    for (i_x, i_y) in iproduct!(0..nr_of_x, 0..nr_of_y) {
        if deadline.expired() {
            warn!("coarse scan stopped by deadline after {evaluations} evaluations");
            truncated = true;
            break;
        }
        let position = point![
            usize_to_f64(i_x).mul_add(config.x_step, config.x_min),
            usize_to_f64(i_y).mul_add(config.y_step, config.y_min)
        ];
        let stats = objective.evaluate(position);
        evaluations += 1;
        debug!(
            "scan ({:.3}, {:.3}): hits {} rms {:.4}",
            position.x, position.y, stats.hits, stats.rms_spot_size
        );
        if position.y.abs() < TRACE_Y_TOLERANCE {
            scan_trace.push((position.x, stats.hits));
        }
        if most_hits.map_or(true, |(_, best)| stats.hits > best.hits) {
            most_hits = Some((position, stats));
        }
        if usize_to_f64(stats.hits) >= hit_threshold
            && best_rms.map_or(true, |(_, best)| stats.rms_spot_size < best.rms_spot_size)
        {
            best_rms = Some((position, stats));
        }
    }
    let Some((_, peak)) = most_hits else {
        return Ok(OptimizationResult {
            truncated,
            ..OptimizationResult::default()
        });
    };
    let winner = best_rms.or(most_hits).map_or(Point2::origin(), |(p, _)| p);
    let final_stats = objective.evaluate(winner);
    evaluations += 1;
    info!(
        "coarse scan: best position ({:.3}, {:.3}) with {} hits ({:.2}%), rms {:.4} mm",
        winner.x, winner.y, final_stats.hits, final_stats.hit_percentage, final_stats.rms_spot_size
    );
    Ok(OptimizationResult {
        peak_hits: peak.hits,
        evaluations,
        truncated,
        scan_trace,
        ..OptimizationResult::from_stats(winner, &final_stats)
    })
}
