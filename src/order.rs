use log::{debug, trace, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, SignalError};
use crate::trend::{index_axis, PolynomialModel, Trend};

/// Residuals below this fraction of the signal's variance count as a perfect fit.
const PERFECT_FIT_RATIO: f64 = 1e-24;

/// Relative rounding level of the samples themselves, `(64·ε)²` of their mean square.
const ROUNDING_FLOOR: f64 = (64.0 * f64::EPSILON) * (64.0 * f64::EPSILON);

/// Inclusive range of candidate polynomial orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRange {
    pub min: usize,
    pub max: usize,
}

impl OrderRange {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(SignalError::invalid(
                "order_range",
                format!("minimum order {} exceeds maximum order {}", min, max),
            ));
        }
        Ok(Self { min, max })
    }

    /// Orders that a series of `len` samples can support (`p <= len - 1`).
    fn feasible(&self, len: usize) -> Result<std::ops::RangeInclusive<usize>> {
        if len <= self.min {
            return Err(SignalError::InsufficientData {
                len,
                required: self.min + 1,
            });
        }
        Ok(self.min..=self.max.min(len - 1))
    }
}

/// Best candidate found by a [`Minimizer`], with the full score curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum<C, T> {
    pub candidate: C,
    pub score: f64,
    pub payload: T,
    /// Every `(candidate, score)` pair in the order offered
    pub curve: Vec<(C, f64)>,
}

/// Scan-and-minimise over a candidate set.
///
/// Candidates are offered in order; a strictly smaller score replaces the incumbent,
/// so on ties the earliest candidate wins. Only the best payload is retained.
#[derive(Debug, Clone)]
pub struct Minimizer<C, T> {
    best: Option<(C, f64, T)>,
    curve: Vec<(C, f64)>,
}

impl<C: Copy, T> Minimizer<C, T> {
    pub fn new() -> Self {
        Self {
            best: None,
            curve: Vec::new(),
        }
    }

    pub fn offer(&mut self, candidate: C, score: f64, payload: T) {
        self.curve.push((candidate, score));
        let replace = match &self.best {
            None => true,
            Some((_, best_score, _)) => score < *best_score,
        };
        if replace {
            self.best = Some((candidate, score, payload));
        }
    }

    /// `None` if nothing was offered.
    pub fn finish(self) -> Option<Minimum<C, T>> {
        let curve = self.curve;
        self.best.map(|(candidate, score, payload)| Minimum {
            candidate,
            score,
            payload,
            curve,
        })
    }
}

impl<C: Copy, T> Default for Minimizer<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bayes Information Criterion `n·ln(e) + p·ln(n)` for mean squared residual `e`.
///
/// A perfect fit (`e <= floor`) scores `f64::MIN` rather than `-inf`.
pub fn bic(len: usize, mean_squared_error: f64, order: usize, floor: f64) -> f64 {
    if mean_squared_error <= floor {
        return f64::MIN;
    }
    let n = len as f64;
    n * mean_squared_error.ln() + order as f64 * n.ln()
}

/// Outcome of order selection.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSelection {
    /// Selected order
    pub order: usize,
    /// Trend, residual and mean squared error at the selected order
    pub fit: Trend,
    /// `(order, BIC)` for every feasible candidate
    pub bic_curve: Vec<(usize, f64)>,
}

impl OrderSelection {
    pub fn trend(&self) -> &[f64] {
        &self.fit.trend
    }

    pub fn detrended(&self) -> &[f64] {
        &self.fit.detrended
    }
}

/// Selects the polynomial trend order minimizing BIC on the index axis.
///
/// # Example
///
/// ```rust
/// use signal_conditioning::{select_order, OrderRange};
///
/// let data: Vec<f64> = (0..100).map(|i| {
///     let x = i as f64 / 10.0;
///     x * x - 3.0 * x
/// }).collect();
/// let selection = select_order(&data, OrderRange::new(0, 6).unwrap()).unwrap();
/// assert_eq!(selection.order, 2);
/// ```
pub fn select_order(data: &[f64], range: OrderRange) -> Result<OrderSelection> {
    select_order_with_axis(&index_axis(data.len()), data, range)
}

/// Selects the polynomial trend order minimizing BIC against an explicit axis.
///
/// Orders above `n - 1` are skipped. A candidate whose order exceeds the number of
/// distinct axis values aborts the search with `NumericDegeneracy`. A candidate that is
/// merely ill-conditioned is logged and left out of the BIC curve; if no candidate
/// could be fitted, its `IllConditioned` error is returned.
pub fn select_order_with_axis(axis: &[f64], data: &[f64], range: OrderRange) -> Result<OrderSelection> {
    let n = data.len();
    let orders = range.feasible(n)?;
    if axis.len() != n {
        return Err(SignalError::invalid(
            "axis",
            format!("axis has {} values but series has {}", axis.len(), n),
        ));
    }

    let floor = perfect_fit_floor(data);

    let mut minimizer = Minimizer::new();
    let mut skipped = None;
    for candidate in fit_candidates(axis, data, orders) {
        let (order, fit) = match candidate {
            Ok(fitted) => fitted,
            Err(err @ SignalError::IllConditioned { .. }) => {
                warn!("Skipping candidate: {}", err);
                skipped.get_or_insert(err);
                continue;
            }
            Err(err) => return Err(err),
        };
        let score = bic(n, fit.mean_squared_error, order, floor);
        trace!("Order {}: mse={:e}, BIC={}", order, fit.mean_squared_error, score);
        minimizer.offer(order, score, fit);
    }

    let best = match (minimizer.finish(), skipped) {
        (Some(best), _) => best,
        (None, Some(err)) => return Err(err),
        (None, None) => {
            return Err(SignalError::InsufficientData {
                len: n,
                required: range.min + 1,
            })
        }
    };

    debug!(
        "Selected order {} of {}..={} (BIC={}, mse={:e})",
        best.candidate, range.min, range.max, best.score, best.payload.mean_squared_error
    );

    Ok(OrderSelection {
        order: best.candidate,
        fit: best.payload,
        bic_curve: best.curve,
    })
}

/// Mean squared residual at or below which a fit counts as perfect.
///
/// Relative to the variance about the mean, so a large constant offset does not
/// hide a small but real variation; never below the rounding level of the samples.
fn perfect_fit_floor(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let mean_square = data.iter().map(|x| x * x).sum::<f64>() / n;
    (PERFECT_FIT_RATIO * variance).max(ROUNDING_FLOOR * mean_square)
}

#[cfg(not(feature = "parallel"))]
fn fit_candidates(
    axis: &[f64],
    data: &[f64],
    orders: std::ops::RangeInclusive<usize>,
) -> Vec<Result<(usize, Trend)>> {
    orders.map(|order| fit_one(axis, data, order)).collect()
}

#[cfg(feature = "parallel")]
fn fit_candidates(
    axis: &[f64],
    data: &[f64],
    orders: std::ops::RangeInclusive<usize>,
) -> Vec<Result<(usize, Trend)>> {
    // Collect keeps ascending order for the tie-break
    orders.into_par_iter().map(|order| fit_one(axis, data, order)).collect()
}

fn fit_one(axis: &[f64], data: &[f64], order: usize) -> Result<(usize, Trend)> {
    let model = PolynomialModel::fit(axis, data, order)?;
    Ok((order, Trend::from_model(&model, axis, data)))
}
