#![warn(missing_docs)]
//! Search for the best position of the secondary mirror.
//!
//! The search works in two phases:
//!
//! 1. a [coarse grid scan](coarse_scan) over a rectangular range of positions
//! 2. a [local hill-climb](hill_climb) refining a seed position with a shrinking step size
//!
//! Both phases only see a [`PositionObjective`], i.e. a function mapping a position to [`PositionStats`]. The
//! [`SystemObjective`] implements it for an [`OpticalSystem`] traced with a ray bundle.
pub mod coarse_scan;
pub mod hill_climb;

pub use coarse_scan::CoarseScanConfig;
pub use hill_climb::HillClimbConfig;

use std::time::{Duration, Instant};

use log::warn;
use nalgebra::Point2;

use crate::{
    error::CsgResult,
    propagator::{Propagator, TracePolicy},
    rays::Rays,
    surface::hit_map::SensorHitMap,
    system::OpticalSystem,
};

/// Sensor statistics of a single secondary position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionStats {
    /// number of rays hitting the sensor
    pub hits: usize,
    /// percentage of traced (not blocked) rays hitting the sensor
    pub hit_percentage: f64,
    /// RMS spot size in mm
    pub rms_spot_size: f64,
    /// focus spread in mm
    pub focus_spread: f64,
    /// number of traced (not blocked) rays
    pub rays_traced: usize,
    /// number of blocked rays
    pub blocked_rays: usize,
}
impl From<&SensorHitMap> for PositionStats {
    fn from(hit_map: &SensorHitMap) -> Self {
        Self {
            hits: hit_map.hit_count(),
            hit_percentage: hit_map.hit_percentage(),
            rms_spot_size: hit_map.rms_spot_size(),
            focus_spread: hit_map.focus_spread(),
            rays_traced: hit_map.rays_traced(),
            blocked_rays: hit_map.blocked_rays(),
        }
    }
}

/// Function to be optimized: maps a secondary position to its [`PositionStats`].
pub trait PositionObjective {
    /// Evaluate the given position.
    fn evaluate(&self, position: Point2<f64>) -> PositionStats;
    /// Number of rays used per evaluation.
    fn bundle_size(&self) -> usize;
}

/// Trace a copy of the given system with the secondary mirror moved to `position`.
///
/// The given system is not modified. A system without a secondary mirror yields empty statistics.
#[must_use]
pub fn evaluate_at(
    system: &OpticalSystem,
    rays: &Rays,
    policy: TracePolicy,
    position: Point2<f64>,
) -> PositionStats {
    system
        .with_secondary_at(position)
        .map_or_else(|_| PositionStats::default(), |moved| {
            PositionStats::from(&Propagator::new(&moved, policy).trace_rays(rays))
        })
}

/// [`PositionObjective`] of an [`OpticalSystem`] traced with a given ray bundle.
#[derive(Debug, Clone, Copy)]
pub struct SystemObjective<'a> {
    system: &'a OpticalSystem,
    rays: &'a Rays,
    policy: TracePolicy,
}
impl<'a> SystemObjective<'a> {
    /// Creates a new [`SystemObjective`].
    #[must_use]
    pub const fn new(system: &'a OpticalSystem, rays: &'a Rays, policy: TracePolicy) -> Self {
        Self {
            system,
            rays,
            policy,
        }
    }
}
impl PositionObjective for SystemObjective<'_> {
    fn evaluate(&self, position: Point2<f64>) -> PositionStats {
        evaluate_at(self.system, self.rays, self.policy, position)
    }
    fn bundle_size(&self) -> usize {
        self.rays.nr_of_rays()
    }
}

/// Result of a secondary position search.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// best secondary position found
    pub best_position: Point2<f64>,
    /// number of sensor hits at the best position
    pub hits: usize,
    /// maximum number of sensor hits seen during the search
    pub peak_hits: usize,
    /// hit percentage at the best position
    pub hit_percentage: f64,
    /// RMS spot size at the best position
    pub rms_spot_size: f64,
    /// focus spread at the best position
    pub focus_spread: f64,
    /// number of traced (not blocked) rays at the best position
    pub rays_traced: usize,
    /// number of blocked rays at the best position
    pub blocked_rays: usize,
    /// number of objective evaluations
    pub evaluations: usize,
    /// `true` if the search was stopped by its deadline
    pub truncated: bool,
    /// hits along the x axis (x position, hits) for scan samples at y ≈ 0
    pub scan_trace: Vec<(f64, usize)>,
}
impl Default for OptimizationResult {
    fn default() -> Self {
        Self {
            best_position: Point2::origin(),
            hits: 0,
            peak_hits: 0,
            hit_percentage: 0.0,
            rms_spot_size: 0.0,
            focus_spread: 0.0,
            rays_traced: 0,
            blocked_rays: 0,
            evaluations: 0,
            truncated: false,
            scan_trace: Vec::new(),
        }
    }
}
impl OptimizationResult {
    fn from_stats(position: Point2<f64>, stats: &PositionStats) -> Self {
        Self {
            best_position: position,
            hits: stats.hits,
            peak_hits: stats.hits,
            hit_percentage: stats.hit_percentage,
            rms_spot_size: stats.rms_spot_size,
            focus_spread: stats.focus_spread,
            rays_traced: stats.rays_traced,
            blocked_rays: stats.blocked_rays,
            ..Self::default()
        }
    }
}

/// Time limit of a search, started when the search starts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);
impl Deadline {
    pub(crate) fn start(budget: Option<Duration>) -> Self {
        Self(budget.and_then(|b| Instant::now().checked_add(b)))
    }
    pub(crate) fn expired(&self) -> bool {
        self.0.is_some_and(|end| Instant::now() >= end)
    }
}

/// Two-phase optimizer for the secondary mirror position.
#[derive(Debug, Clone, Default)]
pub struct PositionOptimizer {
    scan: CoarseScanConfig,
    climb: HillClimbConfig,
    time_budget: Option<Duration>,
}
impl PositionOptimizer {
    /// Creates a new [`PositionOptimizer`] with the given phase configurations.
    #[must_use]
    pub const fn new(scan: CoarseScanConfig, climb: HillClimbConfig) -> Self {
        Self {
            scan,
            climb,
            time_budget: None,
        }
    }
    /// Limit the run time of each search started by this optimizer.
    ///
    /// When the time is up the search stops and returns the best result found so far with its `truncated` flag
    /// set.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
    /// Returns the [`CoarseScanConfig`] of this optimizer.
    #[must_use]
    pub const fn scan_config(&self) -> &CoarseScanConfig {
        &self.scan
    }
    /// Returns the [`HillClimbConfig`] of this optimizer.
    #[must_use]
    pub const fn climb_config(&self) -> &HillClimbConfig {
        &self.climb
    }
    /// Run the coarse grid scan.
    ///
    /// # Errors
    ///
    /// This function returns an error if the scan parameters are invalid.
    pub fn coarse_scan(&self, objective: &impl PositionObjective) -> CsgResult<OptimizationResult> {
        coarse_scan::scan(objective, &self.scan, Deadline::start(self.time_budget))
    }
    /// Run the hill-climb starting at the given seed position.
    ///
    /// # Errors
    ///
    /// This function returns an error if the hill-climb parameters are invalid.
    pub fn hill_climb(
        &self,
        objective: &impl PositionObjective,
        seed: Point2<f64>,
    ) -> CsgResult<OptimizationResult> {
        hill_climb::climb(objective, seed, &self.climb, Deadline::start(self.time_budget))
    }
    /// Run the coarse scan followed by a hill-climb seeded at the scan result.
    ///
    /// Both phases share one time budget. The scan trace and the evaluation count of both phases are merged into
    /// the returned result.
    ///
    /// # Errors
    ///
    /// This function returns an error if the scan or hill-climb parameters are invalid.
    pub fn optimize(&self, objective: &impl PositionObjective) -> CsgResult<OptimizationResult> {
        let deadline = Deadline::start(self.time_budget);
        let coarse = coarse_scan::scan(objective, &self.scan, deadline)?;
        if coarse.truncated || coarse.evaluations == 0 {
            return Ok(coarse);
        }
        let mut fine = hill_climb::climb(objective, coarse.best_position, &self.climb, deadline)?;
        fine.evaluations += coarse.evaluations;
        fine.peak_hits = fine.peak_hits.max(coarse.peak_hits);
        fine.scan_trace = coarse.scan_trace;
        Ok(fine)
    }
    /// Optimize the secondary position of an [`OpticalSystem`] traced with the given rays.
    ///
    /// A system without a hyperbolic secondary mirror cannot be optimized and yields
    /// [`OptimizationResult::default()`].
    ///
    /// # Errors
    ///
    /// This function returns an error if the scan or hill-climb parameters are invalid.
    pub fn optimize_system(
        &self,
        system: &OpticalSystem,
        rays: &Rays,
        policy: TracePolicy,
    ) -> CsgResult<OptimizationResult> {
        if system.secondary().is_none() {
            warn!("system has no secondary mirror, nothing to optimize");
            return Ok(OptimizationResult::default());
        }
        self.optimize(&SystemObjective::new(system, rays, policy))
    }
}

#[cfg(test)]
pub(crate) mod test_objective {
    use super::{PositionObjective, PositionStats};
    use crate::utils::{f64_to_usize, usize_to_f64};
    use nalgebra::Point2;
    use std::cell::Cell;

    /// Synthetic objective with a single optimum: hits decrease and the RMS grows with the distance from it.
    pub struct Cone {
        pub optimum: Point2<f64>,
        pub bundle: usize,
        pub calls: Cell<usize>,
    }
    impl Cone {
        pub fn new(optimum: Point2<f64>, bundle: usize) -> Self {
            Self {
                optimum,
                bundle,
                calls: Cell::new(0),
            }
        }
    }
    impl PositionObjective for Cone {
        fn evaluate(&self, position: Point2<f64>) -> PositionStats {
            self.calls.set(self.calls.get() + 1);
            let distance = (position - self.optimum).norm();
            let hits = self.bundle.saturating_sub(f64_to_usize(distance * 10.0));
            PositionStats {
                hits,
                hit_percentage: 100.0 * usize_to_f64(hits) / usize_to_f64(self.bundle),
                rms_spot_size: distance,
                focus_spread: 2.0 * distance,
                rays_traced: self.bundle,
                blocked_rays: 0,
            }
        }
        fn bundle_size(&self) -> usize {
            self.bundle
        }
    }
}

#[cfg(test)]
mod test {
    use super::test_objective::Cone;
    use super::*;
    use crate::surface::{Branch, Hyperbola, Parabola, Sensor};
    use approx::assert_abs_diff_eq;
    use nalgebra::point;
    use std::f64::consts::FRAC_PI_2;

    fn cassegrain() -> OpticalSystem {
        let mut system =
            OpticalSystem::new(Sensor::new(point![540.0, 0.0], 40.0, FRAC_PI_2).unwrap());
        system
            .add_mirror(
                Parabola::new(800.0, -150.0, 150.0, 500.0)
                    .unwrap()
                    .with_bore(55.0)
                    .unwrap(),
            )
            .unwrap();
        system
            .add_mirror(
                Hyperbola::from_conic(-600.0, -3.5, point![150.0, 0.0], 50.0, Branch::Left)
                    .unwrap(),
            )
            .unwrap();
        system
    }
    #[test]
    fn position_stats_from_hit_map() {
        let mut hit_map = SensorHitMap::default();
        hit_map.add_to_hitmap(point![0.0, 1.0]);
        hit_map.add_to_hitmap(point![0.0, -1.0]);
        hit_map.count_traced_ray();
        hit_map.count_traced_ray();
        hit_map.count_traced_ray();
        hit_map.count_traced_ray();
        hit_map.count_blocked_ray();
        let stats = PositionStats::from(&hit_map);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.rays_traced, 4);
        assert_eq!(stats.blocked_rays, 1);
        assert_abs_diff_eq!(stats.hit_percentage, 50.0);
        assert_abs_diff_eq!(stats.rms_spot_size, 1.0);
        assert_abs_diff_eq!(stats.focus_spread, 2.0);
    }
    #[test]
    fn evaluate_at_is_pure() {
        let system = cassegrain();
        let rays = Rays::new_parallel(100, -1100.0, -120.0, 120.0).unwrap();
        let stats = evaluate_at(&system, &rays, TracePolicy::default(), point![232.0, 0.0]);
        assert_eq!(system.secondary_position(), Some(point![150.0, 0.0]));
        assert_eq!(stats.rays_traced + stats.blocked_rays, 100);
        assert!(stats.hit_percentage > 90.0);
        let again = evaluate_at(&system, &rays, TracePolicy::default(), point![232.0, 0.0]);
        assert_eq!(stats, again);
    }
    #[test]
    fn evaluate_at_without_secondary() {
        let system = OpticalSystem::new(Sensor::new(point![540.0, 0.0], 40.0, FRAC_PI_2).unwrap());
        let rays = Rays::new_parallel(10, -1100.0, -10.0, 10.0).unwrap();
        let stats = evaluate_at(&system, &rays, TracePolicy::default(), point![0.0, 0.0]);
        assert_eq!(stats, PositionStats::default());
    }
    #[test]
    fn optimize_system_without_secondary() {
        let system = OpticalSystem::new(Sensor::new(point![540.0, 0.0], 40.0, FRAC_PI_2).unwrap());
        let rays = Rays::new_parallel(10, -1100.0, -10.0, 10.0).unwrap();
        let result = PositionOptimizer::default()
            .optimize_system(&system, &rays, TracePolicy::default())
            .unwrap();
        assert_eq!(result, OptimizationResult::default());
    }
    #[test]
    fn optimize_synthetic() {
        let objective = Cone::new(point![200.0, 3.0], 100);
        let optimizer = PositionOptimizer::new(
            CoarseScanConfig {
                x_min: 190.0,
                x_max: 210.0,
                x_step: 1.0,
                y_min: -5.0,
                y_max: 5.0,
                y_step: 1.0,
                ..CoarseScanConfig::default()
            },
            HillClimbConfig::default(),
        );
        let result = optimizer.optimize(&objective).unwrap();
        assert!(!result.truncated);
        assert_abs_diff_eq!(result.best_position.x, 200.0, epsilon = 2e-3);
        assert_abs_diff_eq!(result.best_position.y, 3.0, epsilon = 2e-3);
        assert_eq!(result.hits, 100);
        assert_eq!(result.peak_hits, 100);
        assert_eq!(result.scan_trace.len(), 21);
        assert_eq!(result.evaluations, objective.calls.get());
    }
    #[test]
    fn optimize_zero_time_budget() {
        let objective = Cone::new(point![200.0, 0.0], 100);
        let optimizer = PositionOptimizer::default().with_time_budget(Duration::ZERO);
        let result = optimizer.optimize(&objective).unwrap();
        assert!(result.truncated);
        assert_eq!(result.evaluations, 0);
        assert_eq!(objective.calls.get(), 0);
    }
}
