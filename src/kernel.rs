use std::collections::HashMap;

use log::{debug, warn};

use crate::error::{window_len, Result, SignalError};

/// `4·ln 2`: places the half-maximum of `exp(-c·g²/fwhm²)` exactly at `g = ±fwhm/2`.
const HALF_MAX_FACTOR: f64 = 4.0 * std::f64::consts::LN_2;

/// Parameters of a Gaussian smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSpec {
    /// Half-width `k`; the kernel holds `2k+1` weights
    pub half_width: usize,
    /// Requested full width at half maximum, in axis units
    pub fwhm: f64,
    /// When set, the axis is in milliseconds (`(i - k)·1000 / sample_rate`)
    pub sample_rate: Option<f64>,
}

impl KernelSpec {
    /// Creates a kernel specification on a sample-count axis.
    pub fn new(half_width: usize, fwhm: f64) -> Result<Self> {
        if !fwhm.is_finite() || fwhm <= 0.0 {
            return Err(SignalError::invalid(
                "fwhm",
                format!("must be a positive finite number, got {}", fwhm),
            ));
        }

        Ok(Self {
            half_width,
            fwhm,
            sample_rate: None,
        })
    }

    /// Expresses the axis (and therefore the FWHM) in milliseconds for the given sample rate in Hz.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        self.sample_rate = Some(sample_rate);
        Ok(self)
    }

    /// Position of tap `i` on the kernel axis.
    fn axis_value(&self, i: usize) -> f64 {
        let offset = i as f64 - self.half_width as f64;
        match self.sample_rate {
            Some(rate) => offset * 1000.0 / rate,
            None => offset,
        }
    }

    /// Builds the normalized kernel.
    pub fn build(&self) -> Result<Kernel> {
        gaussian_kernel(self)
    }
}

pub(crate) fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(SignalError::invalid(
            "sample_rate",
            format!("must be a positive finite number, got {}", sample_rate),
        ));
    }
    Ok(())
}

/// A symmetric weighting kernel of `2k+1` non-negative weights summing to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Vec<f64>,
    half_width: usize,
    requested_fwhm: Option<f64>,
    empirical_fwhm: Option<f64>,
}

impl Kernel {
    /// Boxcar kernel of `2k+1` equal weights, as used by the running mean.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `2k+1` overflows `usize`.
    pub fn uniform(half_width: usize) -> Result<Self> {
        let len = window_len(half_width)?;
        Ok(Self {
            weights: vec![1.0 / len as f64; len],
            half_width,
            requested_fwhm: None,
            empirical_fwhm: None,
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// FWHM the kernel was built for (`None` for uniform kernels)
    pub fn requested_fwhm(&self) -> Option<f64> {
        self.requested_fwhm
    }

    /// Distance between the taps nearest to half maximum on either side of the peak.
    ///
    /// `None` for uniform kernels and for `k = 0`, where there is no left flank to search.
    pub fn empirical_fwhm(&self) -> Option<f64> {
        self.empirical_fwhm
    }
}

/// Builds a normalized Gaussian kernel from a requested FWHM.
///
/// The unnormalized curve `exp(-4·ln2·g²/fwhm²)` is sampled on the symmetric axis
/// `g[i] = i - k` (in milliseconds when a sample rate is given), then divided by its
/// sum. The half-maximum crossings of the sampled curve are located independently
/// left and right of the centre to report the empirical FWHM.
///
/// # Arguments
///
/// * `spec` - Half-width, FWHM and optional sample rate
///
/// # Example
///
/// ```rust
/// use signal_conditioning::{gaussian_kernel, KernelSpec};
///
/// let spec = KernelSpec::new(10, 5.0).expect("valid fwhm");
/// let kernel = gaussian_kernel(&spec).expect("kernel");
/// assert_eq!(kernel.len(), 21);
/// ```
pub fn gaussian_kernel(spec: &KernelSpec) -> Result<Kernel> {
    // Re-check in case the spec was built field by field
    if !spec.fwhm.is_finite() || spec.fwhm <= 0.0 {
        return Err(SignalError::invalid(
            "fwhm",
            format!("must be a positive finite number, got {}", spec.fwhm),
        ));
    }
    if let Some(rate) = spec.sample_rate {
        validate_sample_rate(rate)?;
    }

    let k = spec.half_width;
    let len = window_len(k)?;

    let axis: Vec<f64> = (0..len).map(|i| spec.axis_value(i)).collect();
    let curve: Vec<f64> = axis
        .iter()
        .map(|g| (-(HALF_MAX_FACTOR * g * g) / (spec.fwhm * spec.fwhm)).exp())
        .collect();

    let empirical_fwhm = if k == 0 {
        None
    } else {
        let (left, right) = half_max_taps(&curve, k);
        Some(axis[right] - axis[left])
    };

    let total: f64 = curve.iter().sum();
    let weights: Vec<f64> = curve.iter().map(|w| w / total).collect();

    if let Some(emp) = empirical_fwhm {
        debug!(
            "Gaussian kernel: k={}, requested FWHM={}, empirical FWHM={}",
            k, spec.fwhm, emp
        );
        let step = spec.axis_value(1) - spec.axis_value(0);
        if (emp - spec.fwhm).abs() > step {
            warn!(
                "Empirical FWHM {} differs from requested {} by more than one axis step ({}); \
                 the kernel is too short or too coarse for this width",
                emp, spec.fwhm, step
            );
        }
    }

    Ok(Kernel {
        weights,
        half_width: k,
        requested_fwhm: Some(spec.fwhm),
        empirical_fwhm,
    })
}

/// Taps closest to half maximum on either side of the peak at `k`.
///
/// Both flanks are searched from the peak outward, so on ties each side keeps the
/// tap nearest the centre and a symmetric curve yields symmetric taps.
fn half_max_taps(curve: &[f64], k: usize) -> (usize, usize) {
    let right = k + nearest_to_half(curve[k..].iter());
    let left = k - 1 - nearest_to_half(curve[..k].iter().rev());
    (left, right)
}

/// Position of the value closest to 0.5; first one wins on ties.
fn nearest_to_half<'a>(values: impl Iterator<Item = &'a f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, v) in values.enumerate() {
        let dist = (v - 0.5).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Memoised Gaussian kernels, keyed by half-width, FWHM and sample rate.
pub struct KernelCache {
    kernels: HashMap<(usize, u64, u64), Kernel, ahash::RandomState>,
}

impl KernelCache {
    /// Creates an empty kernel cache
    pub fn new() -> Self {
        Self {
            kernels: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Gets a kernel from the cache or builds it if not cached
    pub fn get_kernel(&mut self, spec: &KernelSpec) -> Result<&Kernel> {
        let rate_bits = spec.sample_rate.map_or(0, f64::to_bits);
        let key = (spec.half_width, spec.fwhm.to_bits(), rate_bits);

        if !self.kernels.contains_key(&key) {
            let kernel = gaussian_kernel(spec)?;
            self.kernels.insert(key, kernel);
        }

        Ok(&self.kernels[&key])
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn clear(&mut self) {
        self.kernels.clear();
    }
}

impl Default for KernelCache {
    fn default() -> Self {
        Self::new()
    }
}
