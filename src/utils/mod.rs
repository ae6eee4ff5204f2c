//! Module for additional computational capabilities
pub mod math_utils;
pub mod uom_macros;
pub use math_utils::{f64_to_usize, length_in_mm, sample_count, usize_to_f64};
