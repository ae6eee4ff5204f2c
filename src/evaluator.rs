#![warn(missing_docs)]
//! Evaluation and ranking of Cassegrain telescope designs.
//!
//! An [`OpticalConfiguration`] holds the design parameters of a telescope. The [`ConfigurationEvaluator`] builds a
//! two-mirror [`OpticalSystem`] from it, searches the best secondary mirror position and rates the design by a
//! single score (higher is better). Many designs can be ranked in parallel.
use std::{
    fmt::Display,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use itertools::Itertools;
use log::{info, warn};
use nalgebra::{point, Point2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use crate::{
    error::{CassegrainError, CsgResult},
    millimeter,
    optimizer::{
        CoarseScanConfig, HillClimbConfig, OptimizationResult, PositionOptimizer, SystemObjective,
    },
    propagator::TracePolicy,
    rays::Rays,
    surface::{Branch, Hyperbola, Parabola, Sensor},
    system::OpticalSystem,
    utils::length_in_mm,
};

/// Geometry and search parameters used for evaluating an [`OpticalConfiguration`].
///
/// All lengths are given in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// position of the primary mirror apex on the optical axis
    pub primary_apex_x: f64,
    /// the bore of the primary mirror is this much larger than the secondary mirror radius
    pub bore_clearance: f64,
    /// distance of the sensor behind the primary mirror apex
    pub sensor_offset: f64,
    /// width of the sensor
    pub sensor_width: f64,
    /// number of rays of the collimated input bundle
    pub nr_of_rays: usize,
    /// lower height of the ray bundle
    pub ray_y_min: f64,
    /// upper height of the ray bundle
    pub ray_y_max: f64,
    /// the rays start this far in front of the primary mirror apex
    pub ray_start_distance: f64,
    /// half width of the scan window around the estimated secondary position
    pub scan_half_width: f64,
    /// step of the secondary position scan
    pub scan_step: f64,
    /// minimum fraction of the ray bundle on the sensor for a scan position to compete on RMS spot size
    pub min_hit_fraction: f64,
    /// minimum fraction of the ray bundle on the sensor for a hill-climb move (0.0 considers all moves)
    pub climb_min_hit_fraction: f64,
    /// refine the scan result with a hill-climb
    pub refine: bool,
    /// rules for ray propagation
    pub trace_policy: TracePolicy,
}
impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            primary_apex_x: 500.0,
            bore_clearance: 5.0,
            sensor_offset: 40.0,
            sensor_width: 40.0,
            nr_of_rays: 500,
            ray_y_min: -120.0,
            ray_y_max: 120.0,
            ray_start_distance: 1600.0,
            scan_half_width: 50.0,
            scan_step: 2.0,
            min_hit_fraction: 0.5,
            climb_min_hit_fraction: 0.0,
            refine: false,
            trace_policy: TracePolicy::default(),
        }
    }
}
impl EvaluatorSettings {
    /// Create the collimated input ray bundle.
    ///
    /// # Errors
    ///
    /// This function returns an error if the bundle parameters are invalid (e.g. zero rays).
    pub fn ray_bundle(&self) -> CsgResult<Rays> {
        Rays::new_parallel(
            self.nr_of_rays,
            self.primary_apex_x - self.ray_start_distance,
            self.ray_y_min,
            self.ray_y_max,
        )
        .map_err(|e| CassegrainError::Configuration(format!("invalid ray bundle: {e}")))
    }
}

/// Metrics of a previous evaluation stored along with a configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoredMetrics {
    /// ranking score
    pub score: f64,
    /// number of sensor hits
    pub hits: usize,
    /// hit percentage
    pub hit_percentage: f64,
    /// RMS spot size in mm
    pub rms_spot_size: f64,
}

/// Design parameters of a Cassegrain telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalConfiguration {
    /// diameter of the primary mirror
    pub primary_diameter: Length,
    /// diameter of the secondary mirror
    pub secondary_diameter: Length,
    /// vertex radius of curvature of the primary mirror
    pub primary_radius: Length,
    /// vertex radius of curvature of the secondary mirror
    pub secondary_radius: Length,
    /// focal length of the primary mirror
    pub primary_focal_length: Length,
    /// focal length of the secondary mirror
    pub secondary_focal_length: Length,
    /// conic constant of the primary mirror
    pub primary_conic: f64,
    /// conic constant of the secondary mirror
    pub secondary_conic: f64,
    /// distance between the mirrors
    pub mirror_separation: Length,
    /// effective focal length of the telescope
    pub system_focal_length: Length,
    /// index of the configuration in its source file
    pub row_index: usize,
    /// previously found best secondary position (in mm)
    pub best_alignment: Option<Point2<f64>>,
    /// metrics of a previous evaluation
    pub metrics: Option<StoredMetrics>,
}
impl Default for OpticalConfiguration {
    fn default() -> Self {
        Self {
            primary_diameter: millimeter!(300.0),
            secondary_diameter: millimeter!(100.0),
            primary_radius: millimeter!(1600.0),
            secondary_radius: millimeter!(-600.0),
            primary_focal_length: millimeter!(800.0),
            secondary_focal_length: millimeter!(-300.0),
            primary_conic: -1.0,
            secondary_conic: -3.5,
            mirror_separation: millimeter!(450.0),
            system_focal_length: millimeter!(2000.0),
            row_index: 0,
            best_alignment: None,
            metrics: None,
        }
    }
}
impl OpticalConfiguration {
    /// Estimated position of the secondary mirror: primary focus shifted by the mirror separation.
    #[must_use]
    pub fn estimated_secondary_x(&self, settings: &EvaluatorSettings) -> f64 {
        settings.primary_apex_x - length_in_mm(self.primary_focal_length)
            + length_in_mm(self.mirror_separation)
    }
    /// Build the [`OpticalSystem`] of this configuration.
    ///
    /// The secondary mirror is placed at the stored best alignment if present, otherwise at the estimated position.
    ///
    /// # Errors
    ///
    /// This function returns an error if the design parameters do not form a valid system (e.g. a bore larger than
    /// the primary mirror).
    pub fn build_system(&self, settings: &EvaluatorSettings) -> CsgResult<OpticalSystem> {
        let position = self
            .best_alignment
            .unwrap_or_else(|| point![self.estimated_secondary_x(settings), 0.0]);
        self.build_system_at(settings, position)
    }
    /// Build the [`OpticalSystem`] of this configuration with the secondary mirror at the given position.
    ///
    /// # Errors
    ///
    /// This function returns an error if the design parameters do not form a valid system.
    pub fn build_system_at(
        &self,
        settings: &EvaluatorSettings,
        secondary_position: Point2<f64>,
    ) -> CsgResult<OpticalSystem> {
        self.assemble(settings, secondary_position).map_err(|e| {
            CassegrainError::Configuration(format!("configuration {}: {e}", self.row_index))
        })
    }
    fn assemble(
        &self,
        settings: &EvaluatorSettings,
        secondary_position: Point2<f64>,
    ) -> CsgResult<OpticalSystem> {
        let primary_half_aperture = length_in_mm(self.primary_diameter) / 2.0;
        let secondary_half_aperture = length_in_mm(self.secondary_diameter) / 2.0;
        let primary = Parabola::new(
            length_in_mm(self.primary_focal_length),
            -primary_half_aperture,
            primary_half_aperture,
            settings.primary_apex_x,
        )?
        .with_bore(secondary_half_aperture + settings.bore_clearance)?;
        let secondary = Hyperbola::from_conic(
            length_in_mm(self.secondary_radius),
            self.secondary_conic,
            secondary_position,
            secondary_half_aperture,
            Branch::Left,
        )?;
        let sensor = Sensor::new(
            point![settings.primary_apex_x + settings.sensor_offset, 0.0],
            settings.sensor_width,
            std::f64::consts::FRAC_PI_2,
        )?;
        let mut system = OpticalSystem::new(sensor);
        system.add_mirror(primary)?;
        system.add_mirror(secondary)?;
        Ok(system)
    }
}
impl Display for OpticalConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Primary: {:.1}mm, f={:.1}mm | Secondary: {:.1}mm, k={:.2} | System f={:.0}mm",
            length_in_mm(self.primary_diameter),
            length_in_mm(self.primary_focal_length),
            length_in_mm(self.secondary_diameter),
            self.secondary_conic,
            length_in_mm(self.system_focal_length)
        )
    }
}

/// Ranking score of a design: the hit percentage dominates, the RMS spot size (mm) breaks near ties.
#[must_use]
pub fn score(hit_percentage: f64, rms_spot_size: f64) -> f64 {
    100.0f64.mul_add(hit_percentage, -rms_spot_size)
}

/// An evaluated [`OpticalConfiguration`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// evaluated configuration
    pub configuration: OpticalConfiguration,
    /// result of the secondary position search
    pub optimization: OptimizationResult,
    /// ranking score
    pub score: f64,
}

/// Evaluates and ranks [`OpticalConfiguration`]s.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationEvaluator {
    settings: EvaluatorSettings,
    time_budget: Option<Duration>,
}
impl ConfigurationEvaluator {
    /// Creates a new [`ConfigurationEvaluator`].
    #[must_use]
    pub const fn new(settings: EvaluatorSettings) -> Self {
        Self {
            settings,
            time_budget: None,
        }
    }
    /// Limit the search time per configuration.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
    /// Returns the [`EvaluatorSettings`] of this evaluator.
    #[must_use]
    pub const fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }
    /// Evaluate a single configuration.
    ///
    /// The secondary mirror position is scanned along the optical axis around its estimated position (ignoring
    /// a stored alignment) and optionally refined by a hill-climb.
    ///
    /// # Errors
    ///
    /// This function returns an error if the configuration or the evaluator settings are invalid.
    pub fn evaluate(&self, configuration: &OpticalConfiguration) -> CsgResult<BatchResult> {
        let estimate = configuration.estimated_secondary_x(&self.settings);
        let system = configuration.build_system_at(&self.settings, point![estimate, 0.0])?;
        let rays = self.settings.ray_bundle()?;
        let scan = CoarseScanConfig {
            min_hit_fraction: self.settings.min_hit_fraction,
            ..CoarseScanConfig::along_x(
                estimate - self.settings.scan_half_width,
                estimate + self.settings.scan_half_width,
                self.settings.scan_step,
            )
        };
        let climb = HillClimbConfig {
            min_hit_fraction: self.settings.climb_min_hit_fraction,
            ..HillClimbConfig::default()
        };
        let mut optimizer = PositionOptimizer::new(scan, climb);
        if let Some(budget) = self.time_budget {
            optimizer = optimizer.with_time_budget(budget);
        }
        let objective = SystemObjective::new(&system, &rays, self.settings.trace_policy);
        let optimization = if self.settings.refine {
            optimizer.optimize(&objective)
        } else {
            optimizer.coarse_scan(&objective)
        }
        .map_err(|e| {
            CassegrainError::Configuration(format!("configuration {}: {e}", configuration.row_index))
        })?;
        Ok(BatchResult {
            configuration: configuration.clone(),
            score: score(optimization.hit_percentage, optimization.rms_spot_size),
            optimization,
        })
    }
    /// Evaluate all configurations in parallel and return the `top_n` best ones, sorted by descending score.
    ///
    /// Configurations with equal scores keep their input order. Invalid configurations are skipped with a
    /// warning.
    #[must_use]
    pub fn rank(&self, configurations: &[OpticalConfiguration], top_n: usize) -> Vec<BatchResult> {
        let total = configurations.len();
        info!("Evaluating {total} configurations...");
        let processed = AtomicUsize::new(0);
        let results: Vec<(usize, BatchResult)> = configurations
            .par_iter()
            .enumerate()
            .filter_map(|(idx, configuration)| {
                let result = self.evaluate(configuration);
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100 == 0 || done == total {
                    info!("Progress: {done}/{total} ({}%)", 100 * done / total);
                }
                match result {
                    Ok(result) => Some((idx, result)),
                    Err(e) => {
                        warn!("skipping configuration: {e}");
                        None
                    }
                }
            })
            .collect();
        let ranked: Vec<BatchResult> = results
            .into_iter()
            .sorted_by(|(idx_a, a), (idx_b, b)| b.score.total_cmp(&a.score).then(idx_a.cmp(idx_b)))
            .take(top_n)
            .map(|(_, result)| result)
            .collect();
        if let Some(best) = ranked.first() {
            info!(
                "best configuration {} with score {:.2}: {}",
                best.configuration.row_index, best.score, best.configuration
            );
        }
        ranked
    }
}
