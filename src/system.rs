#![warn(missing_docs)]
//! Optical system consisting of an ordered list of mirrors and a single [`Sensor`].
use log::info;
use nalgebra::Point2;

use crate::{
    error::{CassegrainError, CsgResult},
    surface::{GeoSurface, Hyperbola, Parabola, Sensor, Surface, SurfaceKind},
};

/// An optical system: reflective surfaces in the order they were added plus exactly one [`Sensor`].
///
/// The sensor is not part of the mirror list. The first [`Hyperbola`] of the mirror list is regarded as the
/// (movable) secondary mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalSystem {
    mirrors: Vec<Surface>,
    sensor: Sensor,
}
impl OpticalSystem {
    /// Creates a new [`OpticalSystem`] with the given [`Sensor`] and without mirrors.
    #[must_use]
    pub const fn new(sensor: Sensor) -> Self {
        Self {
            mirrors: Vec::new(),
            sensor,
        }
    }
    /// Add a reflective surface to this [`OpticalSystem`].
    ///
    /// # Errors
    ///
    /// This function returns an error if the given surface is a [`Sensor`].
    pub fn add_mirror(&mut self, surface: impl Into<Surface>) -> CsgResult<usize> {
        let surface = surface.into();
        if !surface.is_reflective() {
            return Err(CassegrainError::System(
                "a sensor cannot be added as mirror".into(),
            ));
        }
        self.mirrors.push(surface);
        Ok(self.mirrors.len() - 1)
    }
    /// Returns the mirrors of this [`OpticalSystem`].
    #[must_use]
    pub fn mirrors(&self) -> &[Surface] {
        &self.mirrors
    }
    /// Returns the sensor of this [`OpticalSystem`].
    #[must_use]
    pub const fn sensor(&self) -> &Sensor {
        &self.sensor
    }
    /// Returns the first parabolic mirror (primary), if any.
    #[must_use]
    pub fn primary(&self) -> Option<&Parabola> {
        self.mirrors.iter().find_map(|m| match m {
            Surface::Parabolic(p) => Some(p),
            _ => None,
        })
    }
    /// Returns the first hyperbolic mirror (secondary), if any.
    #[must_use]
    pub fn secondary(&self) -> Option<&Hyperbola> {
        self.mirrors.iter().find_map(|m| match m {
            Surface::Hyperbolic(h) => Some(h),
            _ => None,
        })
    }
    /// Returns the position (center) of the secondary mirror, if any.
    #[must_use]
    pub fn secondary_position(&self) -> Option<Point2<f64>> {
        self.secondary().map(GeoSurface::position)
    }
    /// Move the secondary mirror to the given position.
    ///
    /// # Errors
    ///
    /// This function returns an error if the system has no hyperbolic mirror.
    pub fn set_secondary_position(&mut self, position: Point2<f64>) -> CsgResult<()> {
        let secondary = self
            .mirrors
            .iter_mut()
            .find(|m| m.kind() == SurfaceKind::Hyperbolic)
            .ok_or_else(|| CassegrainError::System("system has no secondary mirror".into()))?;
        secondary.set_position(position);
        Ok(())
    }
    /// Returns a copy of this [`OpticalSystem`] with the secondary mirror moved to the given position.
    ///
    /// The original system is left untouched.
    ///
    /// # Errors
    ///
    /// This function returns an error if the system has no hyperbolic mirror.
    pub fn with_secondary_at(&self, position: Point2<f64>) -> CsgResult<Self> {
        let mut system = self.clone();
        system.set_secondary_position(position)?;
        Ok(system)
    }
    /// Log a short summary of all surfaces of this [`OpticalSystem`].
    pub fn log_summary(&self) {
        for (idx, mirror) in self.mirrors.iter().enumerate() {
            let pos = mirror.position();
            info!("mirror {idx}: {} at ({:.3}, {:.3}) mm", mirror.kind(), pos.x, pos.y);
        }
        let pos = self.sensor.position();
        info!("sensor at ({:.3}, {:.3}) mm, width {} mm", pos.x, pos.y, self.sensor.width());
    }
}
