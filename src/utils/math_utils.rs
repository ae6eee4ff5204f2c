//! Numeric helpers shared by the ray tracer and the optimizers.
use uom::si::{f64::Length, length::millimeter};

#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}
/// Return the value of the given [`Length`] in millimeters.
///
/// All geometry of this crate is calculated in plain `f64` millimeters.
#[must_use]
pub fn length_in_mm(length: Length) -> f64 {
    length.get::<millimeter>()
}
/// Number of samples `min + i * step` (`i = 0, 1, ...`) that do not exceed `max`.
///
/// Both bounds are inclusive. A small tolerance relative to the step absorbs floating point rounding, so that
/// e.g. `(0.0, 1.0, 0.1)` yields 11 samples. The caller has to make sure that `step > 0.0` and `min <= max`.
/// Returns `None` if the number of samples is not representable as `usize`.
#[must_use]
pub fn sample_count(min: f64, max: f64, step: f64) -> Option<usize> {
    let intervals = ((max - min) / step + 1e-9).floor();
    if !intervals.is_finite() || intervals >= usize_to_f64(usize::MAX) {
        return None;
    }
    f64_to_usize(intervals).checked_add(1)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::millimeter;
    use approx::assert_abs_diff_eq;
    use uom::si::length::meter;
    #[test]
    fn casts() {
        assert_eq!(usize_to_f64(3), 3.0);
        assert_eq!(f64_to_usize(3.9), 3);
        assert_eq!(f64_to_usize(-1.0), 0);
    }
    #[test]
    fn length_conversion() {
        assert_abs_diff_eq!(length_in_mm(millimeter!(12.5)), 12.5, epsilon = 1e-12);
        assert_abs_diff_eq!(length_in_mm(Length::new::<meter>(1.0)), 1000.0, epsilon = 1e-9);
    }
    #[test]
    fn samples() {
        assert_eq!(sample_count(190.0, 210.0, 1.0), Some(21));
        assert_eq!(sample_count(0.0, 1.0, 0.1), Some(11));
        assert_eq!(sample_count(0.0, 0.0, 2.0), Some(1));
        assert_eq!(sample_count(50.0, 450.0, 2.0), Some(201));
        assert_eq!(sample_count(0.0, 0.9, 0.5), Some(2));
        assert_eq!(sample_count(0.0, 1e300, 1.0), None);
        assert_eq!(sample_count(0.0, f64::MAX, f64::MIN_POSITIVE), None);
    }
}
