mod interpolation;
pub use self::interpolation::{ThreePointInterpolator, derivative_table, linear_interpolation};
