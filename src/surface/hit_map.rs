//! Data structure for storing intersection points of [`Rays`](crate::rays::Rays) hitting a
//! [`Sensor`](crate::surface::Sensor) and for deriving spot statistics from them.
use nalgebra::{Point2, Vector2};

use crate::utils::usize_to_f64;

#[derive(Default, Debug, Clone, PartialEq)]
///Storage struct for hit points on a sensor from a single ray bundle
pub struct SensorHitMap {
    hit_map: Vec<Point2<f64>>,
    rays_traced: usize,
    blocked_rays: usize,
}

impl SensorHitMap {
    /// Add intersection point to this [`SensorHitMap`].
    pub fn add_to_hitmap(&mut self, hit_point: Point2<f64>) {
        self.hit_map.push(hit_point);
    }
    /// Count a ray that was traced to completion (sensor hit or miss).
    pub fn count_traced_ray(&mut self) {
        self.rays_traced += 1;
    }
    /// Count a ray that was blocked and does not contribute to statistics.
    pub fn count_blocked_ray(&mut self) {
        self.blocked_rays += 1;
    }
    /// Remove all hit points and reset the ray counters.
    pub fn clear_hits(&mut self) {
        self.hit_map.clear();
        self.rays_traced = 0;
        self.blocked_rays = 0;
    }
    /// Returns a reference to the hit points of this [`SensorHitMap`].
    #[must_use]
    pub fn hit_points(&self) -> &[Point2<f64>] {
        &self.hit_map
    }
    /// Returns the number of hit points.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hit_map.len()
    }
    /// Returns the number of traced (not blocked) rays.
    #[must_use]
    pub const fn rays_traced(&self) -> usize {
        self.rays_traced
    }
    /// Returns the number of blocked rays.
    #[must_use]
    pub const fn blocked_rays(&self) -> usize {
        self.blocked_rays
    }
    /// Returns the percentage of traced rays hitting the sensor.
    ///
    /// Returns 0.0 if no ray has been traced.
    #[must_use]
    pub fn hit_percentage(&self) -> f64 {
        if self.rays_traced == 0 {
            0.0
        } else {
            100.0 * usize_to_f64(self.hit_count()) / usize_to_f64(self.rays_traced)
        }
    }
    /// Returns the centroid of all hit points or `None` if the map is empty.
    #[must_use]
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.hit_map.is_empty() {
            return None;
        }
        let sum = self
            .hit_map
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / usize_to_f64(self.hit_map.len())))
    }
    /// Returns the root mean square distance of the hit points from their centroid.
    ///
    /// Returns 0.0 for less than two hit points.
    #[must_use]
    pub fn rms_spot_size(&self) -> f64 {
        if self.hit_map.len() < 2 {
            return 0.0;
        }
        let Some(centroid) = self.centroid() else {
            return 0.0;
        };
        let sum_sq: f64 = self
            .hit_map
            .iter()
            .map(|p| (p - centroid).norm_squared())
            .sum();
        (sum_sq / usize_to_f64(self.hit_map.len())).sqrt()
    }
    /// Returns the focus spread: twice the maximum deviation of the hit heights from their mean height.
    ///
    /// Returns 0.0 for less than two hit points.
    #[must_use]
    pub fn focus_spread(&self) -> f64 {
        if self.hit_map.len() < 2 {
            return 0.0;
        }
        let mean_y =
            self.hit_map.iter().map(|p| p.y).sum::<f64>() / usize_to_f64(self.hit_map.len());
        2.0 * self
            .hit_map
            .iter()
            .map(|p| (p.y - mean_y).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::point;
    #[test]
    fn default() {
        let hm = SensorHitMap::default();
        assert_eq!(hm.hit_count(), 0);
        assert_eq!(hm.rays_traced(), 0);
        assert_eq!(hm.blocked_rays(), 0);
        assert_eq!(hm.hit_percentage(), 0.0);
        assert_eq!(hm.rms_spot_size(), 0.0);
        assert_eq!(hm.focus_spread(), 0.0);
        assert!(hm.centroid().is_none());
    }
    #[test]
    fn single_hit() {
        let mut hm = SensorHitMap::default();
        hm.add_to_hitmap(point![1.0, 2.0]);
        hm.count_traced_ray();
        assert_eq!(hm.hit_percentage(), 100.0);
        assert_eq!(hm.rms_spot_size(), 0.0);
        assert_eq!(hm.focus_spread(), 0.0);
        assert_eq!(hm.centroid(), Some(point![1.0, 2.0]));
    }
    #[test]
    fn statistics() {
        let mut hm = SensorHitMap::default();
        for p in [point![0.0, 1.0], point![0.0, -1.0], point![0.0, 3.0], point![0.0, -3.0]] {
            hm.add_to_hitmap(p);
            hm.count_traced_ray();
        }
        for _ in 0..4 {
            hm.count_traced_ray();
        }
        hm.count_blocked_ray();
        assert_eq!(hm.hit_count(), 4);
        assert_eq!(hm.rays_traced(), 8);
        assert_eq!(hm.blocked_rays(), 1);
        assert_abs_diff_eq!(hm.hit_percentage(), 50.0);
        let centroid = hm.centroid().unwrap();
        assert_abs_diff_eq!(centroid.x, 0.0);
        assert_abs_diff_eq!(centroid.y, 0.0);
        assert_abs_diff_eq!(hm.rms_spot_size(), 5.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(hm.focus_spread(), 6.0, epsilon = 1e-12);
    }
    #[test]
    fn rms_about_centroid() {
        let mut hm = SensorHitMap::default();
        hm.add_to_hitmap(point![10.0, 5.0]);
        hm.add_to_hitmap(point![12.0, 5.0]);
        assert_abs_diff_eq!(hm.rms_spot_size(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hm.focus_spread(), 0.0, epsilon = 1e-12);
    }
    #[test]
    fn clear_hits() {
        let mut hm = SensorHitMap::default();
        hm.add_to_hitmap(point![1.0, 2.0]);
        hm.count_traced_ray();
        hm.count_blocked_ray();
        hm.clear_hits();
        assert_eq!(hm, SensorHitMap::default());
    }
}
