use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{ensure_finite, Result, SignalError};

/// Pivots of `R` below `max|R_jj| · max(n, p+1) · ε · RANK_TOLERANCE` count as zero.
const RANK_TOLERANCE: f64 = 100.0;

/// Least squares polynomial fitted on a centred and scaled axis.
///
/// The axis is mapped to `t = (x - center) / scale` in `[-1, 1]` and the curve is
/// expanded in Legendre polynomials `P_0(t) … P_p(t)`, whose columns stay close to
/// orthogonal on long series where monomial powers of `t` become collinear.
/// Coefficients `a_0 … a_p` are the Legendre coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialModel {
    coefficients: Vec<f64>,
    center: f64,
    scale: f64,
}

impl PolynomialModel {
    /// Fits a polynomial of the given order to `(axis[i], values[i])` pairs.
    ///
    /// # Arguments
    ///
    /// * `axis` - Sample positions
    /// * `values` - Observed samples, same length as `axis`
    /// * `order` - Polynomial order (0 fits the mean, 1 a straight line)
    ///
    /// # Errors
    ///
    /// * `InsufficientData` if there are fewer than `order + 1` points
    /// * `NumericDegeneracy` if the axis has fewer than `order + 1` distinct values
    /// * `IllConditioned` if the design matrix is numerically rank deficient anyway
    pub fn fit(axis: &[f64], values: &[f64], order: usize) -> Result<Self> {
        if axis.len() != values.len() {
            return Err(SignalError::invalid(
                "axis",
                format!("axis has {} values but series has {}", axis.len(), values.len()),
            ));
        }
        let n = values.len();
        if n <= order {
            return Err(SignalError::InsufficientData {
                len: n,
                required: order + 1,
            });
        }
        ensure_finite("axis", axis)?;
        ensure_finite("series", values)?;

        let center = axis.iter().sum::<f64>() / n as f64;
        let spread = axis.iter().map(|x| (x - center).abs()).fold(0.0, f64::max);
        let scale = if spread > 0.0 { spread } else { 1.0 };

        let distinct = distinct_count(axis);
        if distinct <= order {
            return Err(SignalError::NumericDegeneracy(format!(
                "order {} fit needs {} distinct axis values, axis has {}",
                order,
                order + 1,
                distinct
            )));
        }

        // Design matrix: one row per sample, one column per Legendre polynomial
        let cols = order + 1;
        let mut design = DMatrix::<f64>::zeros(n, cols);
        let mut basis = vec![0.0; cols];
        for (i, x) in axis.iter().enumerate() {
            legendre_basis((x - center) / scale, &mut basis);
            for (j, value) in basis.iter().enumerate() {
                design[(i, j)] = *value;
            }
        }

        let (q, r) = design.qr().unpack();

        let diag_max = (0..cols).map(|j| r[(j, j)].abs()).fold(0.0, f64::max);
        let tolerance = diag_max * n.max(cols) as f64 * f64::EPSILON * RANK_TOLERANCE;
        if let Some(column) = (0..cols).find(|&j| r[(j, j)].abs() <= tolerance) {
            return Err(SignalError::IllConditioned { order, column });
        }

        let rhs = q.transpose() * DVector::from_column_slice(values);
        let solution = r.solve_upper_triangular(&rhs).ok_or_else(|| {
            SignalError::NumericDegeneracy(format!("order {} triangular solve failed", order))
        })?;

        Ok(Self {
            coefficients: solution.iter().copied().collect(),
            center,
            scale,
        })
    }

    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Legendre coefficients `a_0 … a_p` in the normalized variable.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Axis centre and scale used for normalization.
    pub fn normalization(&self) -> (f64, f64) {
        (self.center, self.scale)
    }

    /// Evaluates the polynomial at `x` (Clenshaw recurrence).
    pub fn evaluate(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.scale;
        // b_j = a_j + α_j(t)·b_{j+1} + β_{j+1}·b_{j+2}, with
        // α_j = (2j+1)t/(j+1) and β_j = -j/(j+1)
        let mut b1 = 0.0;
        let mut b2 = 0.0;
        for (j, a) in self.coefficients.iter().enumerate().rev() {
            let jf = j as f64;
            let alpha = (2.0 * jf + 1.0) * t / (jf + 1.0);
            let beta = -(jf + 1.0) / (jf + 2.0);
            let b0 = a + alpha * b1 + beta * b2;
            b2 = b1;
            b1 = b0;
        }
        b1
    }

    pub fn evaluate_all(&self, axis: &[f64]) -> Vec<f64> {
        axis.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// Fills `out[j] = P_j(t)` using `(j+1)·P_{j+1} = (2j+1)·t·P_j - j·P_{j-1}`.
fn legendre_basis(t: f64, out: &mut [f64]) {
    if out.is_empty() {
        return;
    }
    out[0] = 1.0;
    if out.len() > 1 {
        out[1] = t;
    }
    for j in 1..out.len().saturating_sub(1) {
        let jf = j as f64;
        out[j + 1] = ((2.0 * jf + 1.0) * t * out[j] - jf * out[j - 1]) / (jf + 1.0);
    }
}

/// Number of distinct axis positions.
fn distinct_count(axis: &[f64]) -> usize {
    let mut sorted = axis.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// A fitted trend together with the detrended residual.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    /// Polynomial order of the fit
    pub order: usize,
    /// Fitted curve at every sample
    pub trend: Vec<f64>,
    /// `input - trend`
    pub detrended: Vec<f64>,
    /// `(1/n)·Σ(x_i - trend_i)²`
    pub mean_squared_error: f64,
}

impl Trend {
    pub(crate) fn from_model(model: &PolynomialModel, axis: &[f64], values: &[f64]) -> Self {
        let trend = model.evaluate_all(axis);
        let detrended: Vec<f64> = values.iter().zip(&trend).map(|(x, t)| x - t).collect();
        let mean_squared_error = detrended.iter().map(|r| r * r).sum::<f64>() / values.len() as f64;

        Self {
            order: model.order(),
            trend,
            detrended,
            mean_squared_error,
        }
    }
}

/// Integer index axis `0, 1, …, n-1`.
pub fn index_axis(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

/// Fits a polynomial trend on the implicit index axis.
///
/// # Example
///
/// ```rust
/// use signal_conditioning::fit_trend;
///
/// let data: Vec<f64> = (0..20).map(|i| 3.0 + 0.5 * i as f64).collect();
/// let fit = fit_trend(&data, 1).expect("enough points");
/// assert!(fit.mean_squared_error < 1e-20);
/// ```
pub fn fit_trend(data: &[f64], order: usize) -> Result<Trend> {
    fit_trend_with_axis(&index_axis(data.len()), data, order)
}

/// Fits a polynomial trend against an explicit axis.
pub fn fit_trend_with_axis(axis: &[f64], data: &[f64], order: usize) -> Result<Trend> {
    let model = PolynomialModel::fit(axis, data, order)?;
    let fit = Trend::from_model(&model, axis, data);
    debug!("Order {} trend: n={}, mse={:e}", order, data.len(), fit.mean_squared_error);
    Ok(fit)
}

/// Removes the least squares straight line.
pub fn linear_detrend(data: &[f64]) -> Result<Vec<f64>> {
    Ok(fit_trend(data, 1)?.detrended)
}
