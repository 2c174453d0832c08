use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{ensure_finite, ensure_window_fits, Result, SignalError};
use crate::kernel::{validate_sample_rate, Kernel, KernelCache, KernelSpec};

/// Edge handling for the first and last `k` samples, where a full window does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Leave boundary samples at their input value
    #[default]
    PassThrough,
    /// Clip the window at the series boundary and reduce what remains
    Shrink,
    /// Mirror about the boundary sample (index `-j` reads `x[j]`)
    Reflect,
}

/// Reduction applied to each window.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Arithmetic mean
    Mean,
    /// Dot product with a normalized kernel
    Weighted(Kernel),
    /// Exact median
    Median,
}

impl Reduction {
    /// Reduces one window. `offset` is the kernel tap aligned with `window[0]`;
    /// it is non-zero only for windows clipped at the left boundary.
    fn reduce(&self, window: &[f64], offset: usize, scratch: &mut Vec<f64>) -> f64 {
        match self {
            Reduction::Mean => window.iter().sum::<f64>() / window.len() as f64,
            Reduction::Weighted(kernel) => {
                let taps = &kernel.weights()[offset..offset + window.len()];
                let dot: f64 = taps.iter().zip(window).map(|(w, x)| w * x).sum();
                if taps.len() == kernel.len() {
                    dot
                } else {
                    // Partial kernel: renormalize to unit sum
                    dot / taps.iter().sum::<f64>()
                }
            }
            Reduction::Median => {
                scratch.clear();
                scratch.extend_from_slice(window);
                median(scratch)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Reduction::Mean => "mean",
            Reduction::Weighted(_) => "weighted",
            Reduction::Median => "median",
        }
    }
}

/// Median of a non-empty buffer, reordering it in place.
///
/// Odd lengths return the middle element; even lengths (only produced by clipped
/// windows) return the mean of the two middle elements.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    debug_assert!(n > 0, "median of an empty window");
    let mid = n / 2;
    let (left, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        upper
    } else {
        let lower = left.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        0.5 * (lower + upper)
    }
}

/// Configuration shared by every windowed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Half-width `k`; windows span `2k+1` samples
    pub half_width: usize,
    /// Boundary handling strategy
    pub edge_policy: EdgePolicy,
}

impl WindowConfig {
    pub fn new(half_width: usize) -> Self {
        Self {
            half_width,
            edge_policy: EdgePolicy::default(),
        }
    }

    /// Sets the boundary handling mode
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.edge_policy = policy;
        self
    }
}

/// Sliding-window reduction over a series with a fixed half-width.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedReducer {
    config: WindowConfig,
    reduction: Reduction,
}

impl WindowedReducer {
    /// Creates a reducer.
    ///
    /// A weighted reduction must carry a kernel of the same half-width.
    pub fn new(half_width: usize, reduction: Reduction) -> Result<Self> {
        if let Reduction::Weighted(kernel) = &reduction {
            if kernel.half_width() != half_width || kernel.len() != 2 * half_width + 1 {
                return Err(SignalError::invalid(
                    "kernel",
                    format!(
                        "kernel has {} taps, window half-width {} needs {}",
                        kernel.len(),
                        half_width,
                        2 * half_width + 1
                    ),
                ));
            }
        }

        Ok(Self {
            config: WindowConfig::new(half_width),
            reduction,
        })
    }

    /// Running mean over `2k+1` samples
    pub fn mean(half_width: usize) -> Self {
        Self {
            config: WindowConfig::new(half_width),
            reduction: Reduction::Mean,
        }
    }

    /// Running median over `2k+1` samples
    pub fn median(half_width: usize) -> Self {
        Self {
            config: WindowConfig::new(half_width),
            reduction: Reduction::Median,
        }
    }

    /// Weighted sum with the given kernel; the half-width follows the kernel.
    pub fn weighted(kernel: Kernel) -> Self {
        Self {
            config: WindowConfig::new(kernel.half_width()),
            reduction: Reduction::Weighted(kernel),
        }
    }

    /// Sets the boundary handling mode
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.config.edge_policy = policy;
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    /// Applies the reduction across the series.
    ///
    /// Interior samples `k..=n-1-k` get the reduction of `x[i-k..=i+k]`; the first and
    /// last `k` samples follow the edge policy. The input is never modified.
    ///
    /// # Errors
    ///
    /// `InsufficientData` when `2k+1 > n`, `InvalidParameter` for non-finite samples.
    ///
    /// # Example
    ///
    /// ```rust
    /// use signal_conditioning::WindowedReducer;
    ///
    /// let data = [1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0];
    /// let smoothed = WindowedReducer::mean(1).apply(&data).expect("window fits");
    /// assert_eq!(smoothed[0], 1.0);
    /// ```
    pub fn apply(&self, data: &[f64]) -> Result<Vec<f64>> {
        let k = self.config.half_width;
        let n = data.len();
        ensure_window_fits(n, k)?;
        ensure_finite("series", data)?;

        debug!(
            "{} reducer: n={}, k={}, edges={:?}",
            self.reduction.name(),
            n,
            k,
            self.config.edge_policy
        );

        let mut result = data.to_vec();
        self.fill_interior(data, &mut result[k..n - k]);

        let mut scratch = Vec::with_capacity(2 * k + 1);
        match self.config.edge_policy {
            EdgePolicy::PassThrough => {}
            EdgePolicy::Shrink => {
                for i in (0..k).chain(n - k..n) {
                    result[i] = self.value_at_clipped(data, i, &mut scratch);
                }
            }
            EdgePolicy::Reflect => {
                let mut window = Vec::with_capacity(2 * k + 1);
                for i in (0..k).chain(n - k..n) {
                    window.clear();
                    window.extend((0..=2 * k).map(|j| reflected(data, i as isize + j as isize - k as isize)));
                    result[i] = self.reduction.reduce(&window, 0, &mut scratch);
                }
            }
        }

        Ok(result)
    }

    /// Writes reduced values for the interior; `out[j]` corresponds to input index `j + k`.
    #[cfg(not(feature = "parallel"))]
    fn fill_interior(&self, data: &[f64], out: &mut [f64]) {
        let k = self.config.half_width;
        let mut scratch = Vec::with_capacity(2 * k + 1);
        for (j, value) in out.iter_mut().enumerate() {
            *value = self.reduction.reduce(&data[j..=j + 2 * k], 0, &mut scratch);
        }
    }

    #[cfg(feature = "parallel")]
    fn fill_interior(&self, data: &[f64], out: &mut [f64]) {
        let k = self.config.half_width;
        out.par_iter_mut().enumerate().for_each_init(
            || Vec::with_capacity(2 * k + 1),
            |scratch, (j, value)| {
                *value = self.reduction.reduce(&data[j..=j + 2 * k], 0, scratch);
            },
        );
    }

    /// Reduction over `[max(0, i-k), min(n-1, i+k)]`.
    pub(crate) fn value_at_clipped(&self, data: &[f64], center: usize, scratch: &mut Vec<f64>) -> f64 {
        let k = self.config.half_width;
        let lo = center.saturating_sub(k);
        let hi = (center + k).min(data.len() - 1);
        // Kernel tap aligned with `lo`
        let offset = lo + k - center;
        self.reduction.reduce(&data[lo..=hi], offset, scratch)
    }
}

/// Mirrors an out-of-range index back into the series about its end samples.
fn reflected(data: &[f64], idx: isize) -> f64 {
    let last = data.len() as isize - 1;
    let mirrored = if idx < 0 {
        -idx
    } else if idx > last {
        2 * last - idx
    } else {
        idx
    };
    data[mirrored.clamp(0, last) as usize]
}

/// Converts a window duration in milliseconds to a half-width in samples.
///
/// `k = round(duration_ms · sample_rate / 1000 / 2)`, so the `2k+1` window spans
/// approximately the requested duration.
pub fn half_width_for_duration(duration_ms: f64, sample_rate: f64) -> Result<usize> {
    validate_sample_rate(sample_rate)?;
    if !duration_ms.is_finite() || duration_ms < 0.0 {
        return Err(SignalError::invalid(
            "duration_ms",
            format!("must be a non-negative finite number, got {}", duration_ms),
        ));
    }
    Ok((duration_ms * sample_rate / 1000.0 / 2.0).round() as usize)
}

/// Smoothing filter with a fixed window and a cache of Gaussian kernels.
pub struct Smoother {
    config: WindowConfig,
    cache: KernelCache,
}

impl Smoother {
    /// Creates a smoother with half-width `k` and pass-through edges.
    ///
    /// # Example
    ///
    /// ```rust
    /// use signal_conditioning::Smoother;
    ///
    /// let data: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
    /// let mut smoother = Smoother::new(4);
    /// let smoothed = smoother.gaussian(&data, 3.0).expect("valid parameters");
    /// assert_eq!(smoothed.len(), data.len());
    /// ```
    pub fn new(half_width: usize) -> Self {
        Self::with_config(WindowConfig::new(half_width))
    }

    /// Creates a smoother with custom configuration
    pub fn with_config(config: WindowConfig) -> Self {
        Self {
            config,
            cache: KernelCache::default(),
        }
    }

    /// Sets the boundary handling mode
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.config.edge_policy = policy;
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Running mean
    pub fn mean(&self, data: &[f64]) -> Result<Vec<f64>> {
        WindowedReducer::mean(self.config.half_width)
            .with_edge_policy(self.config.edge_policy)
            .apply(data)
    }

    /// Running median
    pub fn median(&self, data: &[f64]) -> Result<Vec<f64>> {
        WindowedReducer::median(self.config.half_width)
            .with_edge_policy(self.config.edge_policy)
            .apply(data)
    }

    /// Gaussian-weighted smoothing with the FWHM given in samples.
    pub fn gaussian(&mut self, data: &[f64], fwhm: f64) -> Result<Vec<f64>> {
        let spec = KernelSpec::new(self.config.half_width, fwhm)?;
        self.gaussian_with_spec(data, &spec)
    }

    /// Gaussian-weighted smoothing with the FWHM given in milliseconds.
    pub fn gaussian_with_rate(&mut self, data: &[f64], fwhm_ms: f64, sample_rate: f64) -> Result<Vec<f64>> {
        let spec = KernelSpec::new(self.config.half_width, fwhm_ms)?.with_sample_rate(sample_rate)?;
        self.gaussian_with_spec(data, &spec)
    }

    fn gaussian_with_spec(&mut self, data: &[f64], spec: &KernelSpec) -> Result<Vec<f64>> {
        // Fail before building a kernel that cannot be applied
        ensure_window_fits(data.len(), spec.half_width)?;
        let kernel = self.cache.get_kernel(spec)?.clone();
        WindowedReducer::weighted(kernel)
            .with_edge_policy(self.config.edge_policy)
            .apply(data)
    }

    /// Kernels built so far
    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_scenario() {
        let data = [1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0];
        let result = WindowedReducer::mean(1).apply(&data).unwrap();
        let expected = [1.0, 1.0, 7.0 / 3.0, 7.0 / 3.0, 7.0 / 3.0, 1.0, 1.0];
        for (actual, expected) in result.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(actual, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_median_basic() {
        let data = [3.0, 1.0, 2.0, 9.0, 4.0, 6.0, 5.0];
        let result = WindowedReducer::median(1).apply(&data).unwrap();
        assert_eq!(result, vec![3.0, 2.0, 2.0, 4.0, 6.0, 5.0, 5.0]);
    }

    #[test]
    fn test_median_helper() {
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [7.0]), 7.0);
    }

    #[test]
    fn test_weighted_with_uniform_kernel_matches_mean() {
        let data: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64).collect();
        let mean = WindowedReducer::mean(3).apply(&data).unwrap();
        let weighted = WindowedReducer::weighted(Kernel::uniform(3).unwrap()).apply(&data).unwrap();
        for (a, b) in mean.iter().zip(weighted.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_kernel_half_width_mismatch() {
        let result = WindowedReducer::new(2, Reduction::Weighted(Kernel::uniform(3).unwrap()));
        assert!(matches!(result, Err(SignalError::InvalidParameter { name: "kernel", .. })));
        assert!(WindowedReducer::new(3, Reduction::Weighted(Kernel::uniform(3).unwrap())).is_ok());
    }

    #[test]
    fn test_window_too_long() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            WindowedReducer::mean(2).apply(&data),
            Err(SignalError::InsufficientData { len: 4, required: 5 })
        );
        assert!(WindowedReducer::median(0).apply(&[]).is_err());
    }

    #[test]
    fn test_window_equal_to_series() {
        let data = [1.0, 2.0, 6.0];
        let result = WindowedReducer::mean(1).apply(&data).unwrap();
        assert_eq!(result, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_zero_half_width_is_identity() {
        let data = [4.0, -1.0, 2.5];
        assert_eq!(WindowedReducer::mean(0).apply(&data).unwrap(), data.to_vec());
        assert_eq!(WindowedReducer::median(0).apply(&data).unwrap(), data.to_vec());
    }

    #[test]
    fn test_shrink_edges() {
        let data = [0.0, 3.0, 6.0, 9.0, 12.0];
        let result = WindowedReducer::mean(1)
            .with_edge_policy(EdgePolicy::Shrink)
            .apply(&data)
            .unwrap();
        assert_abs_diff_eq!(result[0], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(result[4], 10.5, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shrink_weighted_renormalizes() {
        // A constant stays constant even with clipped kernels
        let kernel = KernelSpec::new(3, 2.0).unwrap().build().unwrap();
        let result = WindowedReducer::weighted(kernel)
            .with_edge_policy(EdgePolicy::Shrink)
            .apply(&[2.0; 10])
            .unwrap();
        for value in result {
            assert_abs_diff_eq!(value, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reflect_edges() {
        let data = [1.0, 2.0, 4.0, 8.0, 16.0];
        let result = WindowedReducer::mean(1)
            .with_edge_policy(EdgePolicy::Reflect)
            .apply(&data)
            .unwrap();
        // Index 0 sees [x1, x0, x1]; index 4 sees [x3, x4, x3]
        assert_abs_diff_eq!(result[0], 5.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[4], 32.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reflected_index() {
        let data = [10.0, 20.0, 30.0];
        assert_eq!(reflected(&data, -1), 20.0);
        assert_eq!(reflected(&data, -2), 30.0);
        assert_eq!(reflected(&data, 3), 20.0);
        assert_eq!(reflected(&data, 1), 20.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let data = [1.0, f64::NAN, 3.0];
        assert!(matches!(
            WindowedReducer::median(1).apply(&data),
            Err(SignalError::InvalidParameter { name: "series", .. })
        ));
    }

    #[test]
    fn test_half_width_for_duration() {
        assert_eq!(half_width_for_duration(20.0, 1000.0).unwrap(), 10);
        assert_eq!(half_width_for_duration(50.0, 256.0).unwrap(), 6);
        assert!(half_width_for_duration(-1.0, 1000.0).is_err());
        assert!(half_width_for_duration(20.0, 0.0).is_err());
    }

    #[test]
    fn test_smoother_reuses_kernels() {
        let data: Vec<f64> = (0..40).map(|i| (i as f64 * 0.2).cos()).collect();
        let mut smoother = Smoother::new(5);
        let first = smoother.gaussian(&data, 3.0).unwrap();
        let second = smoother.gaussian(&data, 3.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(smoother.cache().len(), 1);

        smoother.gaussian_with_rate(&data, 10.0, 500.0).unwrap();
        assert_eq!(smoother.cache().len(), 2);
    }

    #[test]
    fn test_smoother_short_data_fails_before_caching() {
        let mut smoother = Smoother::new(5);
        assert!(smoother.gaussian(&[1.0; 4], 3.0).is_err());
        assert!(smoother.cache().is_empty());
    }
}
