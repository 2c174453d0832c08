use thiserror::Error;

/// Error types for signal conditioning operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// A parameter is outside its valid domain (non-positive FWHM, reversed order range, NaN input, ...)
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
    /// Input series is too short for the requested window or model
    #[error("Insufficient data: {len} samples, need at least {required}")]
    InsufficientData { len: usize, required: usize },
    /// Degenerate input: too few distinct axis values for the order, constant baseline
    #[error("Numerically degenerate computation: {0}")]
    NumericDegeneracy(String),
    /// The axis supports the order but a pivot of the least squares factorization vanished
    #[error("Order {order} fit is ill-conditioned at column {column}")]
    IllConditioned { order: usize, column: usize },
}

impl SignalError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SignalError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for signal conditioning operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Fails with `InvalidParameter` if any sample is NaN or infinite.
pub(crate) fn ensure_finite(name: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(SignalError::invalid(
            name,
            format!("non-finite value {} at index {}", values[idx], idx),
        )),
        None => Ok(()),
    }
}

/// Window length `2k+1`, or `InvalidParameter` if it overflows `usize`.
pub(crate) fn window_len(half_width: usize) -> Result<usize> {
    half_width
        .checked_mul(2)
        .and_then(|w| w.checked_add(1))
        .ok_or_else(|| SignalError::invalid("half_width", "window length overflows usize"))
}

/// Fails with `InsufficientData` unless a `2k+1` window fits inside `len` samples.
pub(crate) fn ensure_window_fits(len: usize, half_width: usize) -> Result<()> {
    let required = window_len(half_width)?;
    if len < required {
        return Err(SignalError::InsufficientData { len, required });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SignalError::InsufficientData { len: 3, required: 5 };
        assert_eq!(err.to_string(), "Insufficient data: 3 samples, need at least 5");

        let err = SignalError::invalid("fwhm", "must be positive");
        assert_eq!(err.to_string(), "Invalid parameter `fwhm`: must be positive");

        let err = SignalError::IllConditioned { order: 33, column: 31 };
        assert_eq!(err.to_string(), "Order 33 fit is ill-conditioned at column 31");
    }

    #[test]
    fn test_window_fit_check() {
        assert!(ensure_window_fits(5, 2).is_ok());
        assert_eq!(
            ensure_window_fits(4, 2),
            Err(SignalError::InsufficientData { len: 4, required: 5 })
        );
        assert!(ensure_window_fits(0, 0).is_err());
        assert!(ensure_window_fits(10, usize::MAX).is_err());
    }

    #[test]
    fn test_finite_check() {
        assert!(ensure_finite("series", &[1.0, 2.0]).is_ok());
        assert!(ensure_finite("series", &[1.0, f64::NAN]).is_err());
        assert!(ensure_finite("series", &[f64::INFINITY]).is_err());
    }
}
