use ndarray::{Array1, ArrayView1};

/// Quadratic interpolation of a function tabulated on a regular grid starting
/// at `x = 0`.
///
/// For a point inside the interval `[x_i, x_{i+1})`, the interpolated value is
/// the forward Newton polynomial going through the three knots `x_i`,
/// `x_{i+1}` and `x_{i+2}`. The two last intervals share the same polynomial,
/// which also extrapolates the data beyond the last knot.
#[derive(Debug, Clone)]
pub struct ThreePointInterpolator {
    /// Inverse of the grid spacing
    inverse_delta: f64,
    /// For each interval: value at the first knot, first forward difference
    /// and half of the second forward difference
    coefficients: Vec<[f64; 3]>,
}

impl ThreePointInterpolator {
    /// Create an interpolator for `values`, sampled every `delta` starting at
    /// 0.
    pub fn new(values: ArrayView1<'_, f64>, delta: f64) -> ThreePointInterpolator {
        assert!(values.len() >= 3, "we need at least three points for three-point interpolation");
        assert!(delta > 0.0, "grid spacing must be positive");

        let coefficients = values.windows(3).into_iter()
            .map(|window| {
                let first = window[1] - window[0];
                let second = window[2] - 2.0 * window[1] + window[0];
                [window[0], first, 0.5 * second]
            })
            .collect();

        ThreePointInterpolator {
            inverse_delta: 1.0 / delta,
            coefficients: coefficients,
        }
    }

    /// Get the interpolated value at `x`. The input must be positive.
    #[inline]
    pub fn value(&self, x: f64) -> f64 {
        debug_assert!(x >= 0.0, "can not interpolate at negative x={}", x);
        let position = x * self.inverse_delta;
        let interval = usize::min(position as usize, self.coefficients.len() - 1);
        let fraction = position - interval as f64;

        let [value, first, half_second] = self.coefficients[interval];
        return value + fraction * (first + (fraction - 1.0) * half_second);
    }
}

/// Compute the derivative of a function tabulated every `delta` with finite
/// differences.
///
/// Interior points use the five-point stencil, points next to the boundaries
/// use the three-point central stencil, and the two extreme points are
/// linearly extrapolated from their neighbors.
pub fn derivative_table(values: ArrayView1<'_, f64>, delta: f64) -> Array1<f64> {
    let n = values.len();
    assert!(n >= 4, "we need at least four points to compute derivatives");

    let mut derivative = Array1::zeros(n);
    for i in 1..(n - 1) {
        derivative[i] = if i == 1 || i == n - 2 {
            (values[i + 1] - values[i - 1]) / (2.0 * delta)
        } else {
            (-values[i + 2] + 8.0 * values[i + 1] - 8.0 * values[i - 1] + values[i - 2]) / (12.0 * delta)
        };
    }

    derivative[0] = 2.0 * derivative[1] - derivative[2];
    derivative[n - 1] = 2.0 * derivative[n - 2] - derivative[n - 3];

    return derivative;
}

/// Linear interpolation of the data `(x, y)` at `at`, with `x` sorted in
/// increasing order. Values outside of the data range are clamped to the
/// first/last value.
pub fn linear_interpolation(x: &[f64], y: &[f64], at: f64) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    debug_assert!(!x.is_empty());

    let upper = x.partition_point(|&value| value <= at);
    if upper == 0 {
        return y[0];
    } else if upper == x.len() {
        return y[x.len() - 1];
    }

    let lower = upper - 1;
    let fraction = (at - x[lower]) / (x[upper] - x[lower]);
    return y[lower] + fraction * (y[upper] - y[lower]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quadratic_is_exact() {
        let delta = 0.1;
        let f = |x: f64| 3.0 * x * x - 2.0 * x + 1.0;
        let values = Array1::from_iter((0..50).map(|i| f(i as f64 * delta)));
        let interpolator = ThreePointInterpolator::new(values.view(), delta);

        for &x in &[0.0, 0.05, 0.13, 1.0, 2.777, 4.85, 4.95] {
            assert_relative_eq!(interpolator.value(x), f(x), max_relative = 1e-12);
        }
    }

    #[test]
    fn smooth_function() {
        let delta = 0.01;
        let values = Array1::from_iter((0..1000).map(|i| f64::sin(i as f64 * delta)));
        let interpolator = ThreePointInterpolator::new(values.view(), delta);

        for &x in &[0.123, 1.5, 3.14159, 7.005, 9.98] {
            assert_relative_eq!(interpolator.value(x), f64::sin(x), epsilon = 1e-6);
        }
    }

    #[test]
    fn derivatives() {
        let delta = 0.01;
        let values = Array1::from_iter((0..500).map(|i| f64::exp(-0.5 * i as f64 * delta)));
        let derivative = derivative_table(values.view(), delta);

        for (i, &value) in derivative.iter().enumerate() {
            let x = i as f64 * delta;
            let expected = -0.5 * f64::exp(-0.5 * x);
            assert_relative_eq!(value, expected, max_relative = 1e-4);
        }

        // interior points use the five-point stencil
        assert_relative_eq!(derivative[250], -0.5 * f64::exp(-1.25), max_relative = 1e-9);
    }

    #[test]
    fn linear() {
        let x = [0.0, 1.0, 3.0];
        let y = [1.0, 2.0, 0.0];
        assert_eq!(linear_interpolation(&x, &y, -1.0), 1.0);
        assert_eq!(linear_interpolation(&x, &y, 0.5), 1.5);
        assert_eq!(linear_interpolation(&x, &y, 2.0), 1.0);
        assert_eq!(linear_interpolation(&x, &y, 3.0), 0.0);
        assert_eq!(linear_interpolation(&x, &y, 10.0), 0.0);
    }
}
