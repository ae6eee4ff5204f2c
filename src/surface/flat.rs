//! Plane mirror segment
use nalgebra::{vector, Point2, Vector2};

use super::{facing_normal, newton_refine, GeoSurface, Intersection, SurfaceKind};
use crate::{
    error::{CassegrainError, CsgResult},
    ray::{Ray, EPSILON},
};

/// Relative tolerance at both ends of a flat mirror segment.
const SEGMENT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
/// A plane mirror given by its center, its orientation angle and its length.
///
/// The orientation angle is measured from the x axis to the mirror line.
pub struct FlatMirror {
    center: Point2<f64>,
    angle: f64,
    length: f64,
}
impl FlatMirror {
    /// Create a new [`FlatMirror`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the center or the angle is not finite or if the length is not
    /// positive and finite.
    pub fn new(center: Point2<f64>, angle: f64, length: f64) -> CsgResult<Self> {
        if !center.x.is_finite() || !center.y.is_finite() || !angle.is_finite() {
            return Err(CassegrainError::Surface(
                "center and angle must be finite".into(),
            ));
        }
        if !length.is_normal() || length.is_sign_negative() {
            return Err(CassegrainError::Surface(
                "length must be > 0.0 and finite".into(),
            ));
        }
        Ok(Self {
            center,
            angle,
            length,
        })
    }
    /// Returns the orientation angle (in radians) of this [`FlatMirror`].
    #[must_use]
    pub const fn angle(&self) -> f64 {
        self.angle
    }
    /// Returns the length of this [`FlatMirror`].
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }
    /// Returns the end points of this [`FlatMirror`].
    #[must_use]
    pub fn end_points(&self) -> (Point2<f64>, Point2<f64>) {
        segment_end_points(self.center, self.angle, self.length)
    }
}
impl GeoSurface for FlatMirror {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let (start, end) = self.end_points();
        let (t, s) = segment_parameters(ray, start, end)?;
        if t <= EPSILON || !(-SEGMENT_TOLERANCE..=1.0 + SEGMENT_TOLERANCE).contains(&s) {
            return None;
        }
        let m = end - start;
        let line_normal = vector![-m.y, m.x];
        let (o, d) = (ray.position(), ray.direction());
        // signed distance of the ray point from the mirror line
        let t = newton_refine(
            t,
            2,
            |t| (o + t * d - start).dot(&line_normal),
            |_| d.dot(&line_normal),
        );
        let (sin, cos) = self.angle.sin_cos();
        Some(Intersection {
            point: ray.point_at(t),
            normal: facing_normal(vector![-sin, cos], &d),
            distance: t,
            kind: SurfaceKind::Flat,
        })
    }
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Flat
    }
    fn position(&self) -> Point2<f64> {
        self.center
    }
    fn set_position(&mut self, position: Point2<f64>) {
        self.center = position;
    }
}
/// End points `center ∓ (length/2)·(cos θ, sin θ)` of a line segment.
pub(super) fn segment_end_points(
    center: Point2<f64>,
    angle: f64,
    length: f64,
) -> (Point2<f64>, Point2<f64>) {
    let (sin, cos) = angle.sin_cos();
    let half: Vector2<f64> = 0.5 * length * vector![cos, sin];
    (center - half, center + half)
}
/// Solve `origin + t·direction = start + s·(end - start)` for the ray parameter `t` and the segment parameter `s`.
///
/// Returns `None` if the ray is (nearly) parallel to the segment.
pub(super) fn segment_parameters(
    ray: &Ray,
    start: Point2<f64>,
    end: Point2<f64>,
) -> Option<(f64, f64)> {
    let m = end - start;
    let d = ray.direction();
    let denom = d.x * m.y - d.y * m.x;
    if denom.abs() <= EPSILON {
        return None;
    }
    let diff = start - ray.position();
    let t = (diff.x * m.y - diff.y * m.x) / denom;
    let s = (diff.x * d.y - diff.y * d.x) / denom;
    Some((t, s))
}
