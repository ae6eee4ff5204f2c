#![warn(missing_docs)]
//! Module for handling bundles of rays
use nalgebra::point;

use crate::error::{CassegrainError, CsgResult};
use crate::ray::Ray;
use crate::utils::usize_to_f64;

///Struct containing all relevant information of a created bundle of rays
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Rays {
    ///vector containing rays
    rays: Vec<Ray>,
}
impl Rays {
    /// Generate a bundle of parallel rays propagating along the optical (x) axis.
    ///
    /// All rays start at `start_x`. Their heights are evenly spaced over `[y_min, y_max]` including both ends.
    /// A bundle of a single ray is placed at the center of the height range.
    ///
    /// # Errors
    /// This function returns an error if
    ///  - `nr_of_rays` is zero
    ///  - `start_x`, `y_min` or `y_max` is not finite
    ///  - `y_min > y_max`
    pub fn new_parallel(nr_of_rays: usize, start_x: f64, y_min: f64, y_max: f64) -> CsgResult<Self> {
        if nr_of_rays == 0 {
            return Err(CassegrainError::Other(
                "number of rays must be > 0".into(),
            ));
        }
        if !start_x.is_finite() || !y_min.is_finite() || !y_max.is_finite() {
            return Err(CassegrainError::Other(
                "ray bundle start and height range must be finite".into(),
            ));
        }
        if y_min > y_max {
            return Err(CassegrainError::Other(
                "lower bound of ray heights must be <= upper bound".into(),
            ));
        }
        if nr_of_rays == 1 {
            let ray = Ray::new_collimated(point![start_x, 0.5 * (y_min + y_max)])?;
            return Ok(Self { rays: vec![ray] });
        }
        let y_step = (y_max - y_min) / usize_to_f64(nr_of_rays - 1);
        let rays = (0..nr_of_rays)
            .map(|i| Ray::new_collimated(point![start_x, usize_to_f64(i).mul_add(y_step, y_min)]))
            .collect::<CsgResult<Vec<Ray>>>()?;
        Ok(Self { rays })
    }
    /// Add a single ray to the ray bundle.
    pub fn add_ray(&mut self, ray: Ray) {
        self.rays.push(ray);
    }
    /// Returns the number of rays of this [`Rays`].
    #[must_use]
    pub fn nr_of_rays(&self) -> usize {
        self.rays.len()
    }
    /// Returns `true` if the bundle does not contain any ray.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }
    /// Returns an iterator over the rays of this bundle.
    pub fn iter(&self) -> std::slice::Iter<'_, Ray> {
        self.rays.iter()
    }
}
impl<'a> IntoIterator for &'a Rays {
    type Item = &'a Ray;
    type IntoIter = std::slice::Iter<'a, Ray>;

    fn into_iter(self) -> Self::IntoIter {
        self.rays.iter()
    }
}
impl From<Vec<Ray>> for Rays {
    fn from(rays: Vec<Ray>) -> Self {
        Self { rays }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::vector;
    #[test]
    fn new_parallel() {
        let rays = Rays::new_parallel(5, -100.0, -2.0, 2.0).unwrap();
        assert_eq!(rays.nr_of_rays(), 5);
        let heights: Vec<f64> = rays.iter().map(|r| r.position().y).collect();
        for (height, expected) in heights.iter().zip([-2.0, -1.0, 0.0, 1.0, 2.0]) {
            assert_abs_diff_eq!(*height, expected, epsilon = 1e-12);
        }
        for ray in &rays {
            assert_eq!(ray.position().x, -100.0);
            assert_eq!(ray.direction(), vector![1.0, 0.0]);
        }
    }
    #[test]
    fn new_parallel_single() {
        let rays = Rays::new_parallel(1, 0.0, -120.0, 100.0).unwrap();
        assert_eq!(rays.nr_of_rays(), 1);
        assert_abs_diff_eq!(rays.iter().next().unwrap().position().y, -10.0);
    }
    #[test]
    fn new_parallel_wrong() {
        assert!(Rays::new_parallel(0, 0.0, -1.0, 1.0).is_err());
        assert!(Rays::new_parallel(10, f64::NAN, -1.0, 1.0).is_err());
        assert!(Rays::new_parallel(10, 0.0, 1.0, -1.0).is_err());
        assert!(Rays::new_parallel(10, 0.0, -1.0, f64::INFINITY).is_err());
    }
    #[test]
    fn add_ray() {
        let mut rays = Rays::default();
        assert!(rays.is_empty());
        rays.add_ray(Ray::new_collimated(point![0.0, 0.0]).unwrap());
        assert_eq!(rays.nr_of_rays(), 1);
    }
}
