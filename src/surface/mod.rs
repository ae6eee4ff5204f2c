#![warn(missing_docs)]
//! Module for handling optical surfaces
//!
//! This module contains the two-dimensional mirror shapes ([`Parabola`], [`Hyperbola`], [`FlatMirror`]), the
//! [`Sensor`] and the closed [`Surface`] enum dispatching over all of them. Each shape implements the
//! [`GeoSurface`] trait for calculating the intersection point and normal vector of a [`Ray`].
mod flat;
pub mod hit_map;
mod hyperbola;
mod parabola;
mod sensor;

pub use flat::FlatMirror;
pub use hyperbola::Hyperbola;
pub use parabola::Parabola;
pub use sensor::{Sensor, SensorChip};

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::ray::{Ray, EPSILON};

/// The type of a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// concave parabolic mirror (primary)
    Parabolic,
    /// hyperbolic mirror (secondary)
    Hyperbolic,
    /// plane mirror
    Flat,
    /// detector plane
    Sensor,
}

/// Selects one of the two branches of a [`Hyperbola`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
pub enum Branch {
    /// branch with `x <= center x`
    #[default]
    Left,
    /// branch with `x >= center x`
    Right,
}

/// Result of a successful ray / surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// intersection point
    pub point: Point2<f64>,
    /// normalized surface normal at the intersection point, oriented against the incoming ray
    pub normal: Vector2<f64>,
    /// distance from the ray origin along its direction
    pub distance: f64,
    /// type of the surface being hit
    pub kind: SurfaceKind,
}

/// Trait for handling geometric surfaces.
pub trait GeoSurface {
    /// Calculate intersection point and its normal vector of a [`Ray`] with this surface.
    ///
    /// Only intersections with a distance larger than [`EPSILON`] are considered. This function returns `None`
    /// if the given ray does not intersect with the surface. A miss is a regular outcome, not an error.
    fn intersect(&self, ray: &Ray) -> Option<Intersection>;
    /// Return the type of this surface.
    fn kind(&self) -> SurfaceKind;
    /// Return the reference position of this surface (apex or center).
    fn position(&self) -> Point2<f64>;
    /// Move this surface such that its reference position equals the given point.
    fn set_position(&mut self, position: Point2<f64>);
}

/// A surface of an optical system.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// parabolic mirror
    Parabolic(Parabola),
    /// hyperbolic mirror
    Hyperbolic(Hyperbola),
    /// plane mirror
    Flat(FlatMirror),
    /// detector
    Sensor(Sensor),
}
impl Surface {
    /// Returns `true` if this surface reflects rays (every shape except a [`Sensor`]).
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        !matches!(self, Self::Sensor(_))
    }
    fn as_geo_surface(&self) -> &dyn GeoSurface {
        match self {
            Self::Parabolic(s) => s,
            Self::Hyperbolic(s) => s,
            Self::Flat(s) => s,
            Self::Sensor(s) => s,
        }
    }
}
impl GeoSurface for Surface {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        self.as_geo_surface().intersect(ray)
    }
    fn kind(&self) -> SurfaceKind {
        self.as_geo_surface().kind()
    }
    fn position(&self) -> Point2<f64> {
        self.as_geo_surface().position()
    }
    fn set_position(&mut self, position: Point2<f64>) {
        match self {
            Self::Parabolic(s) => s.set_position(position),
            Self::Hyperbolic(s) => s.set_position(position),
            Self::Flat(s) => s.set_position(position),
            Self::Sensor(s) => s.set_position(position),
        }
    }
}
impl From<Parabola> for Surface {
    fn from(value: Parabola) -> Self {
        Self::Parabolic(value)
    }
}
impl From<Hyperbola> for Surface {
    fn from(value: Hyperbola) -> Self {
        Self::Hyperbolic(value)
    }
}
impl From<FlatMirror> for Surface {
    fn from(value: FlatMirror) -> Self {
        Self::Flat(value)
    }
}
impl From<Sensor> for Surface {
    fn from(value: Sensor) -> Self {
        Self::Sensor(value)
    }
}
/// Normalize the given normal vector and flip it such that it points against the ray direction.
fn facing_normal(normal: Vector2<f64>, direction: &Vector2<f64>) -> Vector2<f64> {
    let normal = normal.normalize();
    if normal.dot(direction) > 0.0 {
        -normal
    } else {
        normal
    }
}
/// Solve `a t^2 + b t + c = 0` and return the roots larger than [`EPSILON`] in ascending order.
///
/// A vanishing leading coefficient falls back to the linear equation.
fn positive_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let roots: Vec<f64> = if a.abs() < EPSILON {
        if b.abs() > EPSILON {
            vec![-c / b]
        } else {
            Vec::new()
        }
    } else {
        match roots::find_roots_quadratic(a, b, c) {
            roots::Roots::One(t) => t.to_vec(),
            roots::Roots::Two(t) => vec![t[0].min(t[1]), t[0].max(t[1])],
            _ => Vec::new(),
        }
    };
    roots.into_iter().filter(|t| *t > EPSILON).collect()
}
/// Refine the root `t` of `f` with a fixed number of Newton-Raphson steps.
///
/// A step is skipped if the derivative is too small.
fn newton_refine(mut t: f64, steps: usize, f: impl Fn(f64) -> f64, df: impl Fn(f64) -> f64) -> f64 {
    for _ in 0..steps {
        let derivative = df(t);
        if derivative.abs() > EPSILON {
            t -= f(t) / derivative;
        }
    }
    t
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{point, vector};
    use strum::IntoEnumIterator;
    #[test]
    fn surface_kind() {
        assert_eq!(SurfaceKind::iter().count(), 4);
        assert_eq!(format!("{}", SurfaceKind::Hyperbolic), "Hyperbolic");
    }
    #[test]
    fn branch() {
        assert_eq!(Branch::default(), Branch::Left);
        assert_eq!(format!("{}", Branch::Right), "Right");
    }
    #[test]
    fn facing() {
        let n = facing_normal(vector![2.0, 0.0], &vector![1.0, 0.0]);
        assert_eq!(n, vector![-1.0, 0.0]);
        let n = facing_normal(vector![0.0, -3.0], &vector![1.0, 1.0]);
        assert_eq!(n, vector![0.0, -1.0]);
    }
    #[test]
    fn quadratic_roots() {
        assert!(positive_roots(1.0, 0.0, 1.0).is_empty());
        assert_eq!(positive_roots(0.0, 2.0, -4.0), vec![2.0]);
        assert!(positive_roots(0.0, 0.0, 1.0).is_empty());
        let r = positive_roots(1.0, -3.0, 2.0);
        assert_eq!(r.len(), 2);
        assert_abs_diff_eq!(r[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[1], 2.0, epsilon = 1e-12);
        let r = positive_roots(1.0, 1.0, -2.0);
        assert_eq!(r.len(), 1);
        assert_abs_diff_eq!(r[0], 1.0, epsilon = 1e-12);
    }
    #[test]
    fn newton() {
        let t = newton_refine(1.5, 3, |t| t * t - 2.0, |t| 2.0 * t);
        assert_abs_diff_eq!(t, 2.0_f64.sqrt(), epsilon = 1e-9);
        // vanishing derivative leaves the value untouched
        let t = newton_refine(0.0, 3, |t| t * t - 2.0, |t| 2.0 * t);
        assert_eq!(t, 0.0);
    }
    #[test]
    fn dispatch() {
        let mut surface: Surface = Sensor::new(point![10.0, 0.0], 4.0, std::f64::consts::FRAC_PI_2)
            .unwrap()
            .into();
        assert!(!surface.is_reflective());
        assert_eq!(surface.kind(), SurfaceKind::Sensor);
        surface.set_position(point![20.0, 1.0]);
        assert_eq!(surface.position(), point![20.0, 1.0]);
        let ray = Ray::new_collimated(point![0.0, 1.5]).unwrap();
        let hit = surface.intersect(&ray).unwrap();
        assert_abs_diff_eq!(hit.distance, 20.0, epsilon = 1e-9);
        let surface: Surface = Parabola::new(100.0, -50.0, 50.0, 0.0).unwrap().into();
        assert!(surface.is_reflective());
        assert_eq!(surface.kind(), SurfaceKind::Parabolic);
    }
}
