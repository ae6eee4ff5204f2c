#![warn(missing_docs)]
//! Module for handling optical rays
//!
//! The model is two-dimensional: the x axis is the optical axis, the y axis the lateral direction. All
//! coordinates are given in millimeters.
use nalgebra::{Point2, Vector2};
use num::Zero;

use crate::error::{CassegrainError, CsgResult};

/// Numeric tolerance used for intersection distances, parallelism checks and Newton refinement.
pub const EPSILON: f64 = 1e-6;

///Struct that contains all information about an optical ray
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    /// Stores the current position (origin) of the ray
    pos: Point2<f64>,
    /// Stores the position history of the ray. The first entry is the initial origin.
    pos_hist: Vec<Point2<f64>>,
    /// Stores the current propagation direction of the ray (always normalized)
    dir: Vector2<f64>,
    /// Bounce count of the ray.
    number_of_bounces: usize,
    /// True if ray is allowed to further propagate and contributes to statistics, false else
    valid: bool,
}
impl Ray {
    /// Creates a new [`Ray`].
    ///
    /// The direction vector is normalized.
    ///
    /// # Errors
    /// This function returns an error if
    ///  - the position is not finite
    ///  - the direction vector has a zero length or is not finite
    pub fn new(position: Point2<f64>, direction: Vector2<f64>) -> CsgResult<Self> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(CassegrainError::Other("ray position must be finite".into()));
        }
        if direction.norm().is_zero() || !direction.norm().is_finite() {
            return Err(CassegrainError::Other(
                "length of direction must be >0 and finite".into(),
            ));
        }
        let mut pos_hist = Vec::<Point2<f64>>::with_capacity(5);
        pos_hist.push(position);
        Ok(Self {
            pos: position,
            pos_hist,
            dir: direction.normalize(),
            number_of_bounces: 0,
            valid: true,
        })
    }
    /// Create a new collimated ray.
    ///
    /// Generate a ray propagating along the positive x axis (optical axis).
    ///
    /// # Errors
    /// This function returns an error if the given position is not finite.
    pub fn new_collimated(position: Point2<f64>) -> CsgResult<Self> {
        Self::new(position, Vector2::x())
    }
    /// Returns the position (current origin) of this [`Ray`].
    #[must_use]
    pub const fn position(&self) -> Point2<f64> {
        self.pos
    }
    /// Returns the (normalized) direction of this [`Ray`].
    #[must_use]
    pub const fn direction(&self) -> Vector2<f64> {
        self.dir
    }
    /// Returns the point `position + t * direction`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.pos + t * self.dir
    }
    /// Returns the path of this [`Ray`].
    ///
    /// The path starts with the initial origin and contains all intersection points visited so far.
    #[must_use]
    pub fn path(&self) -> &[Point2<f64>] {
        &self.pos_hist
    }
    /// Adds a position to the path of the ray.
    ///
    /// This is, for example, necessary for adding the final point when the ray hits the sensor.
    pub fn add_to_pos_hist(&mut self, pos: Point2<f64>) {
        self.pos_hist.push(pos);
    }
    /// Append the point at the given distance along the current direction to the path.
    ///
    /// Used for displaying rays escaping the system.
    pub fn extend(&mut self, length: f64) {
        let end_point = self.point_at(length);
        self.pos_hist.push(end_point);
    }
    /// Returns the number of reflections of this [`Ray`].
    #[must_use]
    pub const fn number_of_bounces(&self) -> usize {
        self.number_of_bounces
    }
    /// Returns true if this [`Ray`] has not been invalidated.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
    /// Mark this [`Ray`] as invalid (e.g. blocked by the back side of a mirror).
    ///
    /// Invalid rays are excluded from all sensor statistics.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
    /// Reflect this [`Ray`] at the given hit point on a surface with the given normal.
    ///
    /// The new direction is `d' = d - 2 (d·n) n`. The hit point is added to the path. The new origin is shifted
    /// from the hit point along the normal by a small amount scaled with the magnitude of the hit point
    /// coordinates, which prevents the ray from intersecting the same surface again at its origin. The normal
    /// must be normalized and face against the incoming ray.
    pub fn reflect(&mut self, hit_point: Point2<f64>, normal: Vector2<f64>) {
        self.pos_hist.push(hit_point);
        let reflected = self.dir - 2.0 * self.dir.dot(&normal) * normal;
        self.dir = reflected.normalize();
        let offset = 1e-5 * (hit_point.x.abs() + hit_point.y.abs() + 1.0);
        self.pos = hit_point + normal * offset;
        self.number_of_bounces += 1;
    }
}
