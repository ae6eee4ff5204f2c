//! Hyperbolic mirror
//!
//! A hyperbola `(x - cx)^2 / a^2 - (y - cy)^2 / b^2 = 1` with its transverse axis parallel to the optical axis.
//! Only one [`Branch`] acts as mirror surface.
use nalgebra::{point, vector, Point2};

use super::{
    facing_normal, newton_refine, positive_roots, Branch, GeoSurface, Intersection, SurfaceKind,
};
use crate::{
    error::{CassegrainError, CsgResult},
    ray::{Ray, EPSILON},
};

#[derive(Debug, Clone, PartialEq)]
/// One branch of a hyperbola, limited to a height range.
pub struct Hyperbola {
    center: Point2<f64>,
    a: f64,
    b: f64,
    y_min: f64,
    y_max: f64,
    branch: Branch,
}
impl Hyperbola {
    /// Create a new [`Hyperbola`] from its center, its semi-axes and its (absolute) height range.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the center is not finite
    ///  - one of the semi-axes is not finite or not positive
    ///  - `y_min` or `y_max` is not finite or `y_min >= y_max`
    pub fn new(
        center: Point2<f64>,
        a: f64,
        b: f64,
        y_min: f64,
        y_max: f64,
        branch: Branch,
    ) -> CsgResult<Self> {
        if !center.x.is_finite() || !center.y.is_finite() {
            return Err(CassegrainError::Surface("center must be finite".into()));
        }
        if !a.is_normal() || !b.is_normal() || a.is_sign_negative() || b.is_sign_negative() {
            return Err(CassegrainError::Surface(
                "semi-axes must be > 0.0 and finite".into(),
            ));
        }
        if !y_min.is_finite() || !y_max.is_finite() || y_min >= y_max {
            return Err(CassegrainError::Surface(
                "height range must be finite with y_min < y_max".into(),
            ));
        }
        Ok(Self {
            center,
            a,
            b,
            y_min,
            y_max,
            branch,
        })
    }
    /// Create a new [`Hyperbola`] from the design parameters of a conic mirror.
    ///
    /// The semi-axes are derived from the vertex radius of curvature `R` and the conic constant `k` as
    /// `a = |R| / 2` and `b = a * sqrt(|k + 1|)`. The height range is `center.y ± half_aperture`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the resulting semi-axes or height range are invalid (e.g. for
    /// `R = 0` or `k = -1`).
    pub fn from_conic(
        radius_of_curvature: f64,
        conic_constant: f64,
        center: Point2<f64>,
        half_aperture: f64,
        branch: Branch,
    ) -> CsgResult<Self> {
        let a = radius_of_curvature.abs() / 2.0;
        let b = a * (conic_constant + 1.0).abs().sqrt();
        Self::new(
            center,
            a,
            b,
            center.y - half_aperture,
            center.y + half_aperture,
            branch,
        )
    }
    /// Returns the center of this [`Hyperbola`].
    #[must_use]
    pub const fn center(&self) -> Point2<f64> {
        self.center
    }
    /// Returns the semi-axes (`a`, `b`) of this [`Hyperbola`].
    #[must_use]
    pub const fn semi_axes(&self) -> (f64, f64) {
        (self.a, self.b)
    }
    /// Returns the height range (`y_min`, `y_max`) of this [`Hyperbola`].
    #[must_use]
    pub const fn y_range(&self) -> (f64, f64) {
        (self.y_min, self.y_max)
    }
    /// Returns the active [`Branch`] of this [`Hyperbola`].
    #[must_use]
    pub const fn branch(&self) -> Branch {
        self.branch
    }
    /// Returns the vertex of the active branch.
    #[must_use]
    pub fn vertex(&self) -> Point2<f64> {
        match self.branch {
            Branch::Left => point![self.center.x - self.a, self.center.y],
            Branch::Right => point![self.center.x + self.a, self.center.y],
        }
    }
}
impl GeoSurface for Hyperbola {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        // work in coordinates relative to the center
        let ox = ray.position().x - self.center.x;
        let oy = ray.position().y - self.center.y;
        let (dx, dy) = (ray.direction().x, ray.direction().y);
        let a2 = self.a * self.a;
        let b2 = self.b * self.b;
        let qa = dx * dx / a2 - dy * dy / b2;
        let qb = 2.0 * (ox * dx / a2 - oy * dy / b2);
        let qc = ox * ox / a2 - oy * oy / b2 - 1.0;
        let roots = positive_roots(qa, qb, qc);
        let t = match roots.as_slice() {
            [] => return None,
            [t] => *t,
            [t0, t1, ..] => {
                let x0 = t0.mul_add(dx, ox);
                let x1 = t1.mul_add(dx, ox);
                match self.branch {
                    Branch::Left => if x0 < x1 { *t0 } else { *t1 },
                    Branch::Right => if x0 > x1 { *t0 } else { *t1 },
                }
            }
        };
        let t = newton_refine(
            t,
            3,
            |t| t.mul_add(dx, ox).powi(2) / a2 - t.mul_add(dy, oy).powi(2) / b2 - 1.0,
            |t| 2.0 * (t.mul_add(dx, ox) * dx / a2 - t.mul_add(dy, oy) * dy / b2),
        );
        if t <= EPSILON {
            return None;
        }
        let x_rel = t.mul_add(dx, ox);
        let y_rel = t.mul_add(dy, oy);
        let y = y_rel + self.center.y;
        if y < self.y_min - EPSILON || y > self.y_max + EPSILON {
            return None;
        }
        let on_branch = match self.branch {
            Branch::Left => x_rel <= EPSILON,
            Branch::Right => x_rel >= -EPSILON,
        };
        if !on_branch {
            return None;
        }
        let normal = facing_normal(vector![x_rel / a2, -y_rel / b2], &ray.direction());
        Some(Intersection {
            point: point![x_rel + self.center.x, y],
            normal,
            distance: t,
            kind: SurfaceKind::Hyperbolic,
        })
    }
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Hyperbolic
    }
    fn position(&self) -> Point2<f64> {
        self.center
    }
    /// Move the center. The height range moves along with it.
    fn set_position(&mut self, position: Point2<f64>) {
        let shift_y = position.y - self.center.y;
        self.y_min += shift_y;
        self.y_max += shift_y;
        self.center = position;
    }
}
