//! This is the documentation for the **cassegrain** package.
//!
//! The crate simulates light propagation through a two-mirror reflecting telescope in two dimensions: a parabolic
//! primary mirror with a central bore, a hyperbolic secondary mirror and a flat sensor behind the primary. Its
//! main purposes are
//!
//!  - finding the position of the secondary mirror which brings most rays to a tight focus on the sensor
//!    ([`optimizer::PositionOptimizer`])
//!  - ranking a large number of candidate designs by imaging quality ([`evaluator::ConfigurationEvaluator`]).
//!
//! All geometry is calculated in millimeters. Design parameters use [`uom`] lengths.
#![allow(clippy::module_name_repetitions)]

pub mod batch_io;
pub mod console;
pub mod error;
pub mod evaluator;
pub mod optimizer;
pub mod propagator;
pub mod ray;
pub mod rays;
pub mod run_config;
pub mod surface;
pub mod system;
pub mod utils;

/// Return the version information of the currently built cassegrain executable.
#[must_use]
pub fn get_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_NAME"))
}
#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn get_ver() {
        let version_string = get_version();
        assert!(version_string.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(version_string.ends_with("(cassegrain)"));
    }
}
