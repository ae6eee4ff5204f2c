#![warn(missing_docs)]
//! Module for uom macros that facilitate the creation of [`Length`](uom::si::f64::Length) values.
///macro to create a Length in millimeter
#[macro_export]
macro_rules! millimeter {
    ($x:expr) => {{
        use uom::si::{f64::Length, length::millimeter};
        Length::new::<millimeter>($x)
    }};
}
