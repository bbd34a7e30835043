//! Savitzky–Golay smoothing of one dimensional radial profiles
//!
//! Line-of-sight profiles are noisy at small radii; fitting a low-order
//! polynomial over a sliding window smooths them while preserving peak
//! shapes, and the same fit yields the profile derivative for free. The
//! kernel weights come from the polynomial least-squares normal equations,
//! solved once per window size and cached.

use nalgebra::{DMatrix, DVector};

use crate::MapType;

/// Polynomial order of the smoothing fit
const SMOOTHING_ORDER: usize = 4;

/// Convolution kernel of a Savitzky–Golay fit
#[derive(Clone, Debug)]
pub struct SavGolKernel {
    weights: Vec<f64>,
}

impl SavGolKernel {
    /// Computes the value-reconstruction kernel of the given polynomial
    /// order and window size
    ///
    /// The window has to be odd and larger than the order.
    pub fn new(order: usize, window: usize) -> Self {
        Self::with_derivative(1.0, 0, order, window)
    }

    /// Computes the kernel reconstructing the `deriv`-th derivative of the
    /// fitted polynomial for a series with sample spacing `dx`
    pub fn with_derivative(dx: f64, deriv: usize, order: usize, window: usize) -> Self {
        assert!(window % 2 == 1, "window size must be odd");
        assert!(window > order, "window size must exceed the fit order");
        assert!(deriv <= order);

        let half = (window / 2) as i64;

        // Design matrix of the windowed polynomial fit: one row per sample
        // offset, one column per monomial.
        let mut a = DMatrix::zeros(window, order + 1);
        for (row, i) in (-half..=half).enumerate() {
            for col in 0..=order {
                a[(row, col)] = (i as f64).powi(col as i32);
            }
        }

        let normal = a.transpose() * &a;
        let mut e = DVector::zeros(order + 1);
        e[deriv] = 1.0;
        let coeff = normal
            .lu()
            .solve(&e)
            .expect("singular Savitzky-Golay normal equations");

        let scale = factorial(deriv) / dx.powi(deriv as i32);
        let weights = (a * coeff).iter().map(|w| w * scale).collect();
        Self { weights }
    }

    /// Returns the window size of the kernel
    pub fn window(&self) -> usize {
        self.weights.len()
    }

    /// Convolves the kernel with the series, extending the edge values past
    /// both boundaries
    pub fn convolve_into(&self, ys: &[f64], out: &mut [f64]) {
        assert_eq!(ys.len(), out.len());

        let half = (self.weights.len() / 2) as i64;
        let n = ys.len() as i64;
        for i in 0..n {
            let mut sum = 0.0;
            for (w_idx, weight) in self.weights.iter().enumerate() {
                let j = (i + w_idx as i64 - half).clamp(0, n - 1);
                sum += weight * ys[j as usize];
            }
            out[i as usize] = sum;
        }
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|i| i as f64).product()
}

/// Cache of smoothing kernels keyed by window size
///
/// Derivative kernels bake in the sample spacing of the first series seen
/// for a window; callers smoothing series with different spacings need
/// separate caches.
#[derive(Clone, Default, Debug)]
pub struct SmoothingCache {
    kernels: MapType<usize, SavGolKernel>,
    deriv_kernels: MapType<usize, SavGolKernel>,
}

impl SmoothingCache {
    /// Constructs an empty kernel cache
    pub fn new() -> Self {
        Self::default()
    }

    fn kernels_for(&mut self, window: usize, dx: f64) -> (&SavGolKernel, &SavGolKernel) {
        let kernel = self
            .kernels
            .entry(window)
            .or_insert_with(|| SavGolKernel::new(SMOOTHING_ORDER, window));
        let deriv_kernel = self
            .deriv_kernels
            .entry(window)
            .or_insert_with(|| SavGolKernel::with_derivative(dx, 1, SMOOTHING_ORDER, window));
        (kernel, deriv_kernel)
    }
}

/// Smooths a one dimensional series with a Savitzky–Golay filter of the
/// given window size and returns the smoothed values together with the
/// derivative of the series
///
/// Returns `None` if the series is no longer than the window. The samples
/// are assumed to be uniformly spaced in `xs`.
pub fn smooth(
    xs: &[f64],
    ys: &[f64],
    window: usize,
    cache: &mut SmoothingCache,
) -> Option<(Vec<f64>, Vec<f64>)> {
    assert_eq!(xs.len(), ys.len());
    if xs.len() <= window {
        return None;
    }

    let dx = (xs[xs.len() - 1] - xs[0]) / (xs.len() - 1) as f64;
    let (kernel, deriv_kernel) = cache.kernels_for(window, dx);

    let mut vals = vec![0.0; ys.len()];
    let mut derivs = vec![0.0; ys.len()];
    kernel.convolve_into(ys, &mut vals);
    deriv_kernel.convolve_into(ys, &mut derivs);
    Some((vals, derivs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_weights_sum_to_one() {
        for window in [5, 7, 11] {
            let kernel = SavGolKernel::new(SMOOTHING_ORDER, window);
            let sum: f64 = kernel.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-10);
            assert_eq!(kernel.window(), window);
        }
    }

    #[test]
    fn test_smooth_reproduces_cubic_away_from_edges() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let f = |x: f64| x * x * x - 2.0 * x * x + x;
        let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();

        let mut cache = SmoothingCache::new();
        let (vals, derivs) = smooth(&xs, &ys, 7, &mut cache).unwrap();

        // A degree-4 fit is exact on a cubic wherever the window does not
        // run into the extended boundary.
        for i in 3..17 {
            assert!((vals[i] - ys[i]).abs() < 1e-6);
            let want = 3.0 * xs[i] * xs[i] - 4.0 * xs[i] + 1.0;
            assert!((derivs[i] - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_derivative_respects_sample_spacing() {
        let xs: Vec<f64> = (0..20).map(|i| 0.5 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * x).collect();

        let mut cache = SmoothingCache::new();
        let (_, derivs) = smooth(&xs, &ys, 5, &mut cache).unwrap();
        for i in 2..18 {
            assert!((derivs[i] - 2.0).abs() < 1e-8);
        }
    }

    #[test]
    fn test_short_series_is_rejected() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 3.0];
        let mut cache = SmoothingCache::new();
        assert!(smooth(&xs, &ys, 5, &mut cache).is_none());
        assert!(smooth(&xs, &ys, 3, &mut cache).is_none());
    }

    #[test]
    fn test_cache_is_reused_per_window() {
        let xs: Vec<f64> = (0..32).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| x.sin()).collect();

        let mut cache = SmoothingCache::new();
        let first = smooth(&xs, &ys, 9, &mut cache).unwrap();
        let second = smooth(&xs, &ys, 9, &mut cache).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(cache.kernels.len(), 1);
        assert_eq!(cache.deriv_kernels.len(), 1);
    }
}
