use std::ops::Range;

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{ensure_finite, Result, SignalError};

/// Teager-Kaiser energy operator.
///
/// `y_i = x_i² - x_{i-1}·x_{i+1}` for `1 <= i <= n-2`; the first and last samples
/// have no neighbour on one side and are copied from the input.
///
/// # Errors
///
/// `InsufficientData` for series shorter than 3 samples.
///
/// # Example
///
/// ```rust
/// use signal_conditioning::teager_kaiser;
///
/// let energy = teager_kaiser(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0]).unwrap();
/// assert_eq!(energy[3], 100.0);
/// ```
pub fn teager_kaiser(data: &[f64]) -> Result<Vec<f64>> {
    let n = data.len();
    if n < 3 {
        return Err(SignalError::InsufficientData { len: n, required: 3 });
    }
    ensure_finite("series", data)?;

    let mut result = data.to_vec();
    fill_energy(data, &mut result[1..n - 1]);
    Ok(result)
}

#[cfg(not(feature = "parallel"))]
fn fill_energy(data: &[f64], out: &mut [f64]) {
    for (y, w) in out.iter_mut().zip(data.windows(3)) {
        *y = w[1] * w[1] - w[0] * w[2];
    }
}

#[cfg(feature = "parallel")]
fn fill_energy(data: &[f64], out: &mut [f64]) {
    out.par_iter_mut()
        .zip(data.par_windows(3))
        .for_each(|(y, w)| *y = w[1] * w[1] - w[0] * w[2]);
}

/// Z-scores a series against the mean and sample standard deviation of a baseline segment.
///
/// Typically applied to energy traces so a burst threshold can be given in
/// baseline standard deviations.
pub fn zscore_against_baseline(data: &[f64], baseline: Range<usize>) -> Result<Vec<f64>> {
    if baseline.start > baseline.end || baseline.end > data.len() {
        return Err(SignalError::invalid(
            "baseline",
            format!(
                "range {}..{} is not within a series of {} samples",
                baseline.start,
                baseline.end,
                data.len()
            ),
        ));
    }
    let segment = &data[baseline.clone()];
    if segment.len() < 2 {
        return Err(SignalError::InsufficientData {
            len: segment.len(),
            required: 2,
        });
    }
    ensure_finite("series", data)?;

    let mean = segment.iter().sum::<f64>() / segment.len() as f64;
    let variance = segment.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (segment.len() - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return Err(SignalError::NumericDegeneracy(format!(
            "baseline {}..{} is constant",
            baseline.start, baseline.end
        )));
    }

    debug!("Baseline {:?}: mean={}, std={}", baseline, mean, std);
    Ok(data.iter().map(|x| (x - mean) / std).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_burst_scenario() {
        let data = [0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0];
        let energy = teager_kaiser(&data).unwrap();
        assert_eq!(energy, vec![0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_boundaries_pass_through() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0];
        let energy = teager_kaiser(&data).unwrap();
        assert_eq!(energy[0], 3.0);
        assert_eq!(energy[4], 5.0);
        assert_eq!(energy[1], 1.0 - 12.0);
        assert_eq!(energy[2], 16.0 - 1.0);
        assert_eq!(energy[3], 1.0 - 20.0);
    }

    #[test]
    fn test_pure_tone_energy_is_constant() {
        // For A·sin(ωi) the operator returns A²·sin²(ω) at every interior sample
        let (amp, omega) = (2.0, 0.4);
        let data: Vec<f64> = (0..64).map(|i| amp * (omega * i as f64).sin()).collect();
        let energy = teager_kaiser(&data).unwrap();
        let expected = amp * amp * omega.sin().powi(2);
        for value in &energy[1..63] {
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            teager_kaiser(&[1.0, 2.0]),
            Err(SignalError::InsufficientData { len: 2, required: 3 })
        );
    }

    #[test]
    fn test_zscore_against_baseline() {
        let data = [1.0, 3.0, 1.0, 3.0, 10.0];
        let z = zscore_against_baseline(&data, 0..4).unwrap();
        // Baseline mean 2, sample std sqrt(4/3)
        let std = (4.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(z[0], -1.0 / std, epsilon = 1e-12);
        assert_abs_diff_eq!(z[4], 8.0 / std, epsilon = 1e-12);
    }

    #[test]
    fn test_zscore_invalid_baselines() {
        let data = [1.0, 2.0, 3.0];
        assert!(matches!(
            zscore_against_baseline(&data, 0..5),
            Err(SignalError::InvalidParameter { name: "baseline", .. })
        ));
        assert!(matches!(
            zscore_against_baseline(&data, 1..2),
            Err(SignalError::InsufficientData { len: 1, required: 2 })
        ));
        assert!(matches!(
            zscore_against_baseline(&[4.0, 4.0, 9.0], 0..2),
            Err(SignalError::NumericDegeneracy(_))
        ));
    }
}
