#![warn(missing_docs)]
//! Ray propagation through an [`OpticalSystem`].
//!
//! A ray is moved from surface to surface by a small state machine. In each bounce the nearest intersection among
//! the candidate mirrors and the sensor decides how the ray continues:
//!
//! - the sensor is nearest: the ray terminates there and the hit is recorded
//! - a mirror is nearest: the ray is reflected and the next bounce starts
//! - nothing is hit: the ray terminates as a miss
//!
//! Rays hitting the back side of the secondary mirror first are blocked and excluded from all statistics.
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{
    ray::Ray,
    rays::Rays,
    surface::{hit_map::SensorHitMap, GeoSurface, Intersection, SurfaceKind},
    system::OpticalSystem,
};

/// Rules applied while propagating a ray through an [`OpticalSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracePolicy {
    /// maximum number of bounces before a ray is regarded as a miss
    pub max_bounces: usize,
    /// from this bounce index on only the sensor is tested for intersections
    pub mirror_cutoff_bounce: usize,
    /// block rays whose first hit is the hyperbolic (secondary) mirror
    pub block_secondary_first_hit: bool,
    /// length (in mm) by which the path of an escaping ray is extended for display
    pub escape_length: f64,
}
impl Default for TracePolicy {
    fn default() -> Self {
        Self {
            max_bounces: 4,
            mirror_cutoff_bounce: 2,
            block_secondary_first_hit: true,
            escape_length: 2000.0,
        }
    }
}

/// State of a ray after a single propagation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropagationState {
    /// ray ready for the given bounce index
    Propagating(usize),
    /// ray was reflected by a mirror of the given type
    Reflecting(SurfaceKind),
    /// ray terminated at the sensor at the given point
    TerminatedAtSensor(Point2<f64>),
    /// ray left the system
    TerminatedMiss,
    /// ray was blocked (e.g. by the back side of the secondary mirror)
    InvalidatedBlocked,
}

/// Final outcome of tracing a single ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceOutcome {
    /// the ray hit the sensor at the given point
    Sensor(Point2<f64>),
    /// the ray left the system or exceeded the maximum number of bounces
    Miss,
    /// the ray was blocked
    Blocked,
}

/// Propagates rays through a borrowed [`OpticalSystem`] according to a [`TracePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    system: &'a OpticalSystem,
    policy: TracePolicy,
}
impl<'a> Propagator<'a> {
    /// Creates a new [`Propagator`].
    #[must_use]
    pub const fn new(system: &'a OpticalSystem, policy: TracePolicy) -> Self {
        Self { system, policy }
    }
    /// Returns the [`TracePolicy`] of this [`Propagator`].
    #[must_use]
    pub const fn policy(&self) -> &TracePolicy {
        &self.policy
    }
    /// Perform a single propagation step of a ray at the given bounce index.
    ///
    /// The ray is modified in place (reflection, path, validity).
    pub fn step(&self, ray: &mut Ray, bounce: usize) -> PropagationState {
        let nearest_mirror: Option<Intersection> = if bounce < self.policy.mirror_cutoff_bounce {
            self.system
                .mirrors()
                .iter()
                .filter_map(|m| m.intersect(ray))
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
        } else {
            None
        };
        let sensor_hit = self.system.sensor().intersect(ray);
        if let Some(sensor_hit) = sensor_hit {
            if nearest_mirror.map_or(true, |m| sensor_hit.distance < m.distance) {
                ray.add_to_pos_hist(sensor_hit.point);
                return PropagationState::TerminatedAtSensor(sensor_hit.point);
            }
        }
        let Some(hit) = nearest_mirror else {
            ray.extend(self.policy.escape_length);
            return PropagationState::TerminatedMiss;
        };
        if bounce == 0 && hit.kind == SurfaceKind::Hyperbolic && self.policy.block_secondary_first_hit {
            ray.add_to_pos_hist(hit.point);
            ray.invalidate();
            return PropagationState::InvalidatedBlocked;
        }
        ray.reflect(hit.point, hit.normal);
        PropagationState::Reflecting(hit.kind)
    }
    /// Trace a single ray through the system until it terminates.
    pub fn trace_ray(&self, ray: &mut Ray) -> TraceOutcome {
        let mut state = PropagationState::Propagating(0);
        loop {
            state = match state {
                PropagationState::Propagating(bounce) if bounce < self.policy.max_bounces => {
                    match self.step(ray, bounce) {
                        PropagationState::Reflecting(_) => PropagationState::Propagating(bounce + 1),
                        terminal => terminal,
                    }
                }
                PropagationState::Propagating(_) => {
                    ray.extend(self.policy.escape_length);
                    return TraceOutcome::Miss;
                }
                PropagationState::Reflecting(_) | PropagationState::TerminatedMiss => {
                    return TraceOutcome::Miss;
                }
                PropagationState::TerminatedAtSensor(point) => return TraceOutcome::Sensor(point),
                PropagationState::InvalidatedBlocked => return TraceOutcome::Blocked,
            };
        }
    }
    /// Trace a single ray and record its outcome in the given [`SensorHitMap`].
    pub fn trace_into(&self, ray: &mut Ray, hit_map: &mut SensorHitMap) -> TraceOutcome {
        let outcome = self.trace_ray(ray);
        match outcome {
            TraceOutcome::Sensor(point) => {
                hit_map.add_to_hitmap(point);
                hit_map.count_traced_ray();
            }
            TraceOutcome::Miss => hit_map.count_traced_ray(),
            TraceOutcome::Blocked => hit_map.count_blocked_ray(),
        }
        outcome
    }
    /// Trace all rays of a bundle and return the resulting [`SensorHitMap`].
    ///
    /// The given bundle is left untouched.
    #[must_use]
    pub fn trace_rays(&self, rays: &Rays) -> SensorHitMap {
        let mut hit_map = SensorHitMap::default();
        for ray in rays {
            let mut ray = ray.clone();
            self.trace_into(&mut ray, &mut hit_map);
        }
        hit_map
    }
    /// Trace all rays of a bundle and return the traced rays (including their paths) together with their outcome.
    ///
    /// This is used for displaying ray paths.
    #[must_use]
    pub fn trace_paths(&self, rays: &Rays) -> Vec<(Ray, TraceOutcome)> {
        rays.iter()
            .map(|ray| {
                let mut ray = ray.clone();
                let outcome = self.trace_ray(&mut ray);
                (ray, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::surface::{Branch, FlatMirror, Hyperbola, Parabola, Sensor};
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use nalgebra::point;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn cassegrain(secondary_x: f64) -> OpticalSystem {
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
                Hyperbola::from_conic(-600.0, -3.5, point![secondary_x, 0.0], 50.0, Branch::Left)
                    .unwrap(),
            )
            .unwrap();
        system
    }
    #[test]
    fn default_policy() {
        let policy = TracePolicy::default();
        assert_eq!(policy.max_bounces, 4);
        assert_eq!(policy.mirror_cutoff_bounce, 2);
        assert!(policy.block_secondary_first_hit);
    }
    #[test]
    fn sensor_only() {
        let system = OpticalSystem::new(Sensor::new(point![100.0, 0.0], 10.0, FRAC_PI_2).unwrap());
        let propagator = Propagator::new(&system, TracePolicy::default());
        let mut ray = Ray::new_collimated(point![0.0, 2.0]).unwrap();
        assert_eq!(
            propagator.trace_ray(&mut ray),
            TraceOutcome::Sensor(point![100.0, 2.0])
        );
        assert_eq!(ray.path().len(), 2);
        let mut ray = Ray::new_collimated(point![0.0, 20.0]).unwrap();
        assert_eq!(propagator.trace_ray(&mut ray), TraceOutcome::Miss);
        // path extended for display
        assert_eq!(ray.path().len(), 2);
        assert_abs_diff_eq!(ray.path()[1].x, 2000.0);
    }
    #[test]
    fn fold_mirror_to_sensor() {
        let mut system =
            OpticalSystem::new(Sensor::new(point![10.0, 50.0], 10.0, 0.0).unwrap());
        system
            .add_mirror(FlatMirror::new(point![10.0, 0.0], FRAC_PI_4, 10.0).unwrap())
            .unwrap();
        let propagator = Propagator::new(&system, TracePolicy::default());
        let mut ray = Ray::new_collimated(point![0.0, 0.0]).unwrap();
        let outcome = propagator.trace_ray(&mut ray);
        assert_matches!(outcome, TraceOutcome::Sensor(p) if (p.x - 10.0).abs() < 1e-3 && (p.y - 50.0).abs() < 1e-9);
        assert_eq!(ray.number_of_bounces(), 1);
        assert_eq!(ray.path().len(), 3);
    }
    #[test]
    fn max_bounces() {
        // two parallel flat mirrors trap the ray
        let mut system =
            OpticalSystem::new(Sensor::new(point![1000.0, 1000.0], 1.0, 0.0).unwrap());
        system
            .add_mirror(FlatMirror::new(point![10.0, 0.0], FRAC_PI_2, 100.0).unwrap())
            .unwrap();
        system
            .add_mirror(FlatMirror::new(point![-10.0, 0.0], FRAC_PI_2, 100.0).unwrap())
            .unwrap();
        let policy = TracePolicy {
            mirror_cutoff_bounce: 10,
            ..TracePolicy::default()
        };
        let propagator = Propagator::new(&system, policy);
        let mut ray = Ray::new_collimated(point![0.0, 0.0]).unwrap();
        assert_eq!(propagator.trace_ray(&mut ray), TraceOutcome::Miss);
        assert_eq!(ray.number_of_bounces(), 4);
        // with the default policy mirrors are ignored from the third bounce on
        let propagator = Propagator::new(&system, TracePolicy::default());
        let mut ray = Ray::new_collimated(point![0.0, 0.0]).unwrap();
        assert_eq!(propagator.trace_ray(&mut ray), TraceOutcome::Miss);
        assert_eq!(ray.number_of_bounces(), 2);
    }
    #[test]
    fn blocked_by_secondary() {
        let system = cassegrain(200.0);
        let propagator = Propagator::new(&system, TracePolicy::default());
        let mut ray = Ray::new_collimated(point![-1100.0, 10.0]).unwrap();
        assert_eq!(propagator.trace_ray(&mut ray), TraceOutcome::Blocked);
        assert!(!ray.is_valid());
        let mut hit_map = SensorHitMap::default();
        let mut ray = Ray::new_collimated(point![-1100.0, 10.0]).unwrap();
        propagator.trace_into(&mut ray, &mut hit_map);
        assert_eq!(hit_map.blocked_rays(), 1);
        assert_eq!(hit_map.rays_traced(), 0);
        // without blocking the ray is reflected back by the secondary and does not reach the sensor
        let policy = TracePolicy {
            block_secondary_first_hit: false,
            ..TracePolicy::default()
        };
        let propagator = Propagator::new(&system, policy);
        let mut ray = Ray::new_collimated(point![-1100.0, 10.0]).unwrap();
        assert_ne!(propagator.trace_ray(&mut ray), TraceOutcome::Blocked);
        assert!(ray.is_valid());
    }
    #[test]
    fn step() {
        let system = cassegrain(232.0);
        let propagator = Propagator::new(&system, TracePolicy::default());
        let mut ray = Ray::new_collimated(point![-1100.0, 100.0]).unwrap();
        assert_eq!(
            propagator.step(&mut ray, 0),
            PropagationState::Reflecting(SurfaceKind::Parabolic)
        );
        assert_eq!(
            propagator.step(&mut ray, 1),
            PropagationState::Reflecting(SurfaceKind::Hyperbolic)
        );
        assert_matches!(
            propagator.step(&mut ray, 2),
            PropagationState::TerminatedAtSensor(_)
        );
    }
    #[test]
    fn cassegrain_bundle() {
        let system = cassegrain(232.0);
        let propagator = Propagator::new(&system, TracePolicy::default());
        let rays = Rays::new_parallel(500, -1100.0, -120.0, 120.0).unwrap();
        let hit_map = propagator.trace_rays(&rays);
        assert_eq!(hit_map.rays_traced() + hit_map.blocked_rays(), 500);
        assert!(hit_map.blocked_rays() > 0);
        assert!(hit_map.hit_percentage() > 90.0);
        assert!(hit_map.rms_spot_size() < 1.0);
        let paths = propagator.trace_paths(&rays);
        assert_eq!(paths.len(), 500);
        let hits = paths
            .iter()
            .filter(|(_, outcome)| matches!(outcome, TraceOutcome::Sensor(_)))
            .count();
        assert_eq!(hits, hit_map.hit_count());
    }
}
