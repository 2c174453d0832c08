//! # Signal Conditioning
//!
//! Building blocks for cleaning up 1-D time series: removing slow trends and
//! isolated outliers, smoothing high-frequency noise and highlighting bursts
//! of energy.
//!
//! Every operation takes a complete, in-memory series and returns a new series
//! of the same length (plus diagnostics where they are meaningful). Inputs are
//! never modified.
//!
//! ## Features
//!
//! - Sliding-window mean, Gaussian-weighted and median smoothing with
//!   pass-through, shrinking or reflecting edges
//! - Gaussian kernels built from a full width at half maximum, in samples or milliseconds
//! - Least squares polynomial detrending with BIC-based order selection
//! - Median despiking of samples above an amplitude threshold
//! - Teager-Kaiser energy operator for burst detection
//! - Optional `parallel` feature running the per-sample work on rayon
//!
//! ## Example
//!
//! ```rust
//! use signal_conditioning::{despike, select_order, DespikeConfig, OrderRange, Smoother};
//!
//! let raw: Vec<f64> = (0..200)
//!     .map(|i| 0.05 * i as f64 + (i as f64 * 0.7).sin() + if i == 50 { 40.0 } else { 0.0 })
//!     .collect();
//!
//! let clean = despike(&raw, &DespikeConfig::new(25.0, 3).unwrap()).unwrap();
//! let detrended = select_order(&clean.series, OrderRange::new(0, 5).unwrap()).unwrap();
//! let smoothed = Smoother::new(4).gaussian(detrended.detrended(), 4.0).unwrap();
//! assert_eq!(smoothed.len(), raw.len());
//! ```

mod despike;
mod energy;
mod error;
mod kernel;
mod order;
mod trend;
mod window;

pub use despike::{despike, DespikeConfig, Despiked, ThresholdPolicy};
pub use energy::{teager_kaiser, zscore_against_baseline};
pub use error::{Result, SignalError};
pub use kernel::{gaussian_kernel, Kernel, KernelCache, KernelSpec};
pub use order::{bic, select_order, select_order_with_axis, Minimizer, Minimum, OrderRange, OrderSelection};
pub use trend::{fit_trend, fit_trend_with_axis, index_axis, linear_detrend, PolynomialModel, Trend};
pub use window::{half_width_for_duration, median, EdgePolicy, Reduction, Smoother, WindowConfig, WindowedReducer};

/// Running mean over `2k+1` samples with pass-through edges.
///
/// # Arguments
///
/// * `data` - The input signal data
/// * `half_width` - Half-width `k` of the window
///
/// # Example
///
/// ```rust
/// use signal_conditioning::mean_smooth;
///
/// let smoothed = mean_smooth(&[1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0], 1).unwrap();
/// assert_eq!(smoothed[0], 1.0);
/// ```
pub fn mean_smooth(data: &[f64], half_width: usize) -> Result<Vec<f64>> {
    WindowedReducer::mean(half_width).apply(data)
}

/// Gaussian smoothing with the FWHM given in samples.
pub fn gaussian_smooth(data: &[f64], half_width: usize, fwhm: f64) -> Result<Vec<f64>> {
    Smoother::new(half_width).gaussian(data, fwhm)
}

/// Running median over `2k+1` samples with pass-through edges.
pub fn median_smooth(data: &[f64], half_width: usize) -> Result<Vec<f64>> {
    WindowedReducer::median(half_width).apply(data)
}

/// Removes the polynomial trend whose order in `0..=max_order` minimizes BIC.
///
/// # Returns
///
/// The order selection, holding the trend, the detrended series and the BIC curve
pub fn detrend(data: &[f64], max_order: usize) -> Result<OrderSelection> {
    select_order(data, OrderRange::new(0, max_order)?)
}
