//! Detector plane of an optical system
use nalgebra::{vector, Point2};
use serde::{Deserialize, Serialize};

use super::{
    facing_normal,
    flat::{segment_end_points, segment_parameters},
    GeoSurface, Intersection, SurfaceKind,
};
use crate::{
    error::{CassegrainError, CsgResult},
    ray::{Ray, EPSILON},
};

/// Arc seconds per radian.
const ARCSEC_PER_RAD: f64 = 206_265.0;
/// Arc minutes per radian.
const ARCMIN_PER_RAD: f64 = 3_437.75;

#[derive(Debug, Clone, PartialEq)]
/// A line shaped detector given by its center, its width and its orientation angle.
///
/// A [`Sensor`] does not reflect. Rays hitting it terminate there.
pub struct Sensor {
    center: Point2<f64>,
    width: f64,
    angle: f64,
}
impl Sensor {
    /// Create a new [`Sensor`].
    ///
    /// The angle is measured from the x axis to the detector line, i.e. a sensor perpendicular to the optical axis
    /// has an angle of `π/2`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the center or the angle is not finite or if the width is not
    /// positive and finite.
    pub fn new(center: Point2<f64>, width: f64, angle: f64) -> CsgResult<Self> {
        if !center.x.is_finite() || !center.y.is_finite() || !angle.is_finite() {
            return Err(CassegrainError::Surface(
                "sensor center and angle must be finite".into(),
            ));
        }
        if !width.is_normal() || width.is_sign_negative() {
            return Err(CassegrainError::Surface(
                "sensor width must be > 0.0 and finite".into(),
            ));
        }
        Ok(Self {
            center,
            width,
            angle,
        })
    }
    /// Returns the width of this [`Sensor`].
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }
    /// Returns the orientation angle of this [`Sensor`].
    #[must_use]
    pub const fn angle(&self) -> f64 {
        self.angle
    }
    /// Returns the end points of this [`Sensor`].
    #[must_use]
    pub fn end_points(&self) -> (Point2<f64>, Point2<f64>) {
        segment_end_points(self.center, self.angle, self.width)
    }
}
impl GeoSurface for Sensor {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let (start, end) = self.end_points();
        let (t, s) = segment_parameters(ray, start, end)?;
        if t <= EPSILON || !(0.0..=1.0).contains(&s) {
            return None;
        }
        let (sin, cos) = self.angle.sin_cos();
        Some(Intersection {
            point: ray.point_at(t),
            normal: facing_normal(vector![-sin, cos], &ray.direction()),
            distance: t,
            kind: SurfaceKind::Sensor,
        })
    }
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Sensor
    }
    fn position(&self) -> Point2<f64> {
        self.center
    }
    fn set_position(&mut self, position: Point2<f64>) {
        self.center = position;
    }
}
/// Properties of the camera chip mounted behind the [`Sensor`].
///
/// Used for estimating plate scale and field of view of a telescope design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorChip {
    /// chip width in mm
    pub width: f64,
    /// chip height in mm
    pub height: f64,
    /// pixel pitch in µm
    pub pixel_size: f64,
}
impl Default for SensorChip {
    fn default() -> Self {
        Self {
            width: 11.2,
            height: 6.3,
            pixel_size: 2.9,
        }
    }
}
impl SensorChip {
    /// Angular size of a single pixel in arc seconds for the given effective focal length (in mm).
    #[must_use]
    pub fn angular_resolution_arcsec(&self, effective_focal_length: f64) -> f64 {
        self.pixel_size / 1000.0 / effective_focal_length * ARCSEC_PER_RAD
    }
    /// Field of view (width, height) in arc minutes for the given effective focal length (in mm).
    #[must_use]
    pub fn field_of_view_arcmin(&self, effective_focal_length: f64) -> (f64, f64) {
        (
            self.width / effective_focal_length * ARCMIN_PER_RAD,
            self.height / effective_focal_length * ARCMIN_PER_RAD,
        )
    }
}
