//! Parabolic mirror
//!
//! This module implements a parabolic mirror `x = apex_x - y^2 / (4f)` with its axis on the optical (x) axis.
//! For a positive focal length the mirror opens towards the negative x axis, so that rays entering along +x are
//! focused at `apex_x - f`. An optional central bore lets rays pass through the center of the mirror.

use nalgebra::{point, vector, Point2};

use super::{facing_normal, newton_refine, positive_roots, GeoSurface, Intersection, SurfaceKind};
use crate::{
    error::{CassegrainError, CsgResult},
    ray::{Ray, EPSILON},
};

#[derive(Debug, Clone, PartialEq)]
/// A parabolic mirror with a given focal length, height range, apex position and bore radius.
pub struct Parabola {
    focal_length: f64,
    y_min: f64,
    y_max: f64,
    apex_x: f64,
    bore_radius: f64,
}

impl Parabola {
    /// Create a new [`Parabola`] without a central bore.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the focal length is 0.0 or not finite
    ///  - `y_min` or `y_max` is not finite or `y_min >= y_max`
    ///  - `apex_x` is not finite
    pub fn new(focal_length: f64, y_min: f64, y_max: f64, apex_x: f64) -> CsgResult<Self> {
        if !focal_length.is_normal() {
            return Err(CassegrainError::Surface(
                "focal length must be != 0.0 and finite".into(),
            ));
        }
        if !y_min.is_finite() || !y_max.is_finite() || y_min >= y_max {
            return Err(CassegrainError::Surface(
                "height range must be finite with y_min < y_max".into(),
            ));
        }
        if !apex_x.is_finite() {
            return Err(CassegrainError::Surface("apex position must be finite".into()));
        }
        Ok(Self {
            focal_length,
            y_min,
            y_max,
            apex_x,
            bore_radius: 0.0,
        })
    }
    /// Add a central bore with the given radius to this [`Parabola`].
    ///
    /// Rays hitting the mirror at `|y| < bore_radius` pass through.
    ///
    /// # Errors
    ///
    /// This function will return an error if the bore radius is negative, not finite or not strictly smaller than
    /// the half aperture of the mirror.
    pub fn with_bore(mut self, bore_radius: f64) -> CsgResult<Self> {
        if !bore_radius.is_finite() || bore_radius.is_sign_negative() {
            return Err(CassegrainError::Surface(
                "bore radius must be >= 0.0 and finite".into(),
            ));
        }
        if bore_radius >= self.half_aperture() {
            return Err(CassegrainError::Surface(format!(
                "bore radius ({bore_radius} mm) must be smaller than the half aperture ({} mm)",
                self.half_aperture()
            )));
        }
        self.bore_radius = bore_radius;
        Ok(self)
    }
    /// Returns the focal length of this [`Parabola`].
    #[must_use]
    pub const fn focal_length(&self) -> f64 {
        self.focal_length
    }
    /// Returns the height range (`y_min`, `y_max`) of this [`Parabola`].
    #[must_use]
    pub const fn y_range(&self) -> (f64, f64) {
        (self.y_min, self.y_max)
    }
    /// Returns the half aperture (half of the height range) of this [`Parabola`].
    #[must_use]
    pub fn half_aperture(&self) -> f64 {
        0.5 * (self.y_max - self.y_min)
    }
    /// Returns the apex position on the optical axis.
    #[must_use]
    pub const fn apex_x(&self) -> f64 {
        self.apex_x
    }
    /// Returns the bore radius of this [`Parabola`] (0.0 if no bore).
    #[must_use]
    pub const fn bore_radius(&self) -> f64 {
        self.bore_radius
    }
    /// Returns the focal point `(apex_x - f, 0)`.
    #[must_use]
    pub fn focal_point(&self) -> Point2<f64> {
        point![self.apex_x - self.focal_length, 0.0]
    }
}

impl GeoSurface for Parabola {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let (ox, oy) = (ray.position().x, ray.position().y);
        let (dx, dy) = (ray.direction().x, ray.direction().y);
        let f = self.focal_length;
        // insert ray (o + t*d) into x - apex_x + y^2/(4f) = 0:
        // (dy^2/4f) t^2 + (dx + oy*dy/2f) t + (ox - apex_x + oy^2/4f) = 0
        let a = dy * dy / (4.0 * f);
        let b = oy.mul_add(dy / (2.0 * f), dx);
        let c = ox - self.apex_x + oy * oy / (4.0 * f);
        let t = *positive_roots(a, b, c).first()?;
        let t = newton_refine(
            t,
            3,
            |t| t.mul_add(dx, ox) - self.apex_x + t.mul_add(dy, oy).powi(2) / (4.0 * f),
            |t| dx + dy * t.mul_add(dy, oy) / (2.0 * f),
        );
        if t <= EPSILON {
            return None;
        }
        let point = ray.point_at(t);
        if point.y < self.y_min - EPSILON || point.y > self.y_max + EPSILON {
            return None;
        }
        if point.y.abs() < self.bore_radius {
            return None;
        }
        // grad (x - apex_x + y^2/4f) = (1, y/2f)
        let normal = facing_normal(vector![1.0, point.y / (2.0 * f)], &ray.direction());
        Some(Intersection {
            point,
            normal,
            distance: t,
            kind: SurfaceKind::Parabolic,
        })
    }
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Parabolic
    }
    fn position(&self) -> Point2<f64> {
        point![self.apex_x, 0.0]
    }
    /// Move the apex along the optical axis. The y component is ignored since the mirror axis is the x axis.
    fn set_position(&mut self, position: Point2<f64>) {
        self.apex_x = position.x;
    }
}
