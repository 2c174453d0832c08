use log::debug;

use crate::error::{ensure_finite, ensure_window_fits, Result, SignalError};
use crate::window::WindowedReducer;

/// Which excursions count as spikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdPolicy {
    /// `|x_i| > threshold`: catches both positive and negative outliers
    #[default]
    Absolute,
    /// `x_i > threshold`: positive excursions only
    Positive,
}

impl ThresholdPolicy {
    fn exceeds(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdPolicy::Absolute => value.abs() > threshold,
            ThresholdPolicy::Positive => value > threshold,
        }
    }
}

/// Configuration for median despiking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DespikeConfig {
    /// Amplitude above which a sample is replaced
    pub threshold: f64,
    /// Half-width of the median window around each spike
    pub half_width: usize,
    /// Spike detection rule
    pub policy: ThresholdPolicy,
}

impl DespikeConfig {
    pub fn new(threshold: f64, half_width: usize) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(SignalError::invalid(
                "threshold",
                format!("must be finite, got {}", threshold),
            ));
        }
        Ok(Self {
            threshold,
            half_width,
            policy: ThresholdPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Despiked series plus the indices that were replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Despiked {
    pub series: Vec<f64>,
    /// Replaced indices, ascending
    pub replaced: Vec<usize>,
    pub threshold: f64,
    pub policy: ThresholdPolicy,
}

impl Despiked {
    pub fn count(&self) -> usize {
        self.replaced.len()
    }
}

/// Replaces every sample exceeding the threshold with the median of its neighbourhood.
///
/// The neighbourhood is `[max(0, i-k), min(n-1, i+k)]`, clipped at the series
/// boundaries. Medians are always taken from the original series, so adjacent
/// spikes do not influence each other's replacement through already patched values.
///
/// # Example
///
/// ```rust
/// use signal_conditioning::{despike, DespikeConfig};
///
/// let data = [0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 0.0];
/// let result = despike(&data, &DespikeConfig::new(5.0, 1).unwrap()).unwrap();
/// assert_eq!(result.series, vec![0.0; 7]);
/// assert_eq!(result.replaced, vec![3]);
/// ```
pub fn despike(data: &[f64], config: &DespikeConfig) -> Result<Despiked> {
    if !config.threshold.is_finite() {
        return Err(SignalError::invalid(
            "threshold",
            format!("must be finite, got {}", config.threshold),
        ));
    }
    ensure_window_fits(data.len(), config.half_width)?;
    ensure_finite("series", data)?;

    let replaced: Vec<usize> = data
        .iter()
        .enumerate()
        .filter(|&(_, &x)| config.policy.exceeds(x, config.threshold))
        .map(|(i, _)| i)
        .collect();

    let reducer = WindowedReducer::median(config.half_width);
    let mut series = data.to_vec();
    let mut scratch = Vec::with_capacity(2 * config.half_width + 1);
    for &i in &replaced {
        series[i] = reducer.value_at_clipped(data, i, &mut scratch);
    }

    debug!(
        "Despike: {} of {} samples above {} ({:?}) replaced, k={}",
        replaced.len(),
        data.len(),
        config.threshold,
        config.policy,
        config.half_width
    );

    Ok(Despiked {
        series,
        replaced,
        threshold: config.threshold,
        policy: config.policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spike() {
        let data = [0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 0.0];
        let result = despike(&data, &DespikeConfig::new(5.0, 1).unwrap()).unwrap();
        assert_eq!(result.series, vec![0.0; 7]);
        assert_eq!(result.replaced, vec![3]);
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn test_no_spikes_is_not_an_error() {
        let data = [1.0, -2.0, 3.0, 0.5];
        let result = despike(&data, &DespikeConfig::new(10.0, 1).unwrap()).unwrap();
        assert_eq!(result.series, data.to_vec());
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn test_negative_spike_policies() {
        let data = [1.0, 2.0, -50.0, 2.0, 1.0];
        let absolute = despike(&data, &DespikeConfig::new(10.0, 1).unwrap()).unwrap();
        assert_eq!(absolute.replaced, vec![2]);
        assert_eq!(absolute.series[2], 2.0);

        let positive_config = DespikeConfig::new(10.0, 1)
            .unwrap()
            .with_policy(ThresholdPolicy::Positive);
        let positive = despike(&data, &positive_config).unwrap();
        assert!(positive.replaced.is_empty());
        assert_eq!(positive.series, data.to_vec());
        assert_eq!(positive.policy, ThresholdPolicy::Positive);
    }

    #[test]
    fn test_replacements_read_original_series() {
        // Two adjacent spikes: each median window still sees the other spike
        let data = [0.0, 0.0, 40.0, 60.0, 0.0, 0.0];
        let result = despike(&data, &DespikeConfig::new(10.0, 1).unwrap()).unwrap();
        assert_eq!(result.replaced, vec![2, 3]);
        // median(0, 40, 60) and median(40, 60, 0)
        assert_eq!(result.series[2], 40.0);
        assert_eq!(result.series[3], 40.0);
    }

    #[test]
    fn test_boundary_spike_uses_clipped_window() {
        let data = [90.0, 1.0, 3.0, 2.0, 2.0];
        let result = despike(&data, &DespikeConfig::new(10.0, 1).unwrap()).unwrap();
        // Window [0, 1] clipped at the left edge: median(90, 1) = 45.5
        assert_eq!(result.series[0], 45.5);

        let result = despike(&data, &DespikeConfig::new(10.0, 2).unwrap()).unwrap();
        // Window [0, 2]: median(90, 1, 3) = 3
        assert_eq!(result.series[0], 3.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DespikeConfig::new(f64::NAN, 1).is_err());
        let config = DespikeConfig::new(1.0, 3).unwrap();
        assert_eq!(
            despike(&[0.0; 5], &config),
            Err(SignalError::InsufficientData { len: 5, required: 7 })
        );
    }
}
