use serde::{Deserialize, Serialize};

use crate::curves::skew_normal;
use crate::types::{Money, MonthRange, TimeAxis};

/// Dispersion values below this floor are clamped to avoid a singular
/// density.
pub const MIN_DISPERSION: f64 = 1e-6;

/// Cumulative mass under this threshold is treated as numerically zero.
const ZERO_MASS_EPS: f64 = 1e-9;

/// Where the activity peak sits inside the curve window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PeakPosition {
    /// Absolute project month
    Month(f64),
    /// Fraction of the window duration, 0.0 = window start, 1.0 = window end
    Fraction(f64),
}

/// Spread of the activity curve around its peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dispersion {
    /// Absolute spread in months
    Months(f64),
    /// Fraction of the window duration
    Fraction(f64),
}

/// Shape and magnitude of one absorption/spending curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub peak: PeakPosition,
    /// Skew-normal asymmetry parameter; 0 is symmetric, positive pushes
    /// mass past the peak
    pub skew: f64,
    pub dispersion: Dispersion,
    /// Total magnitude the cumulative curve reaches at the window end
    pub total: Money,
}

impl CurveParams {
    /// Same curve shape with a different total magnitude.
    pub fn with_total(&self, total: Money) -> Self {
        Self {
            total,
            ..self.clone()
        }
    }

    /// Resolve fractional peak/dispersion against a concrete window into
    /// canonical absolute values.
    pub fn resolve(&self, window: MonthRange) -> ResolvedCurveParams {
        let duration = window.duration();
        let peak_month = match self.peak {
            PeakPosition::Month(month) => month,
            PeakPosition::Fraction(fraction) => window.start + fraction * duration,
        };
        let dispersion = match self.dispersion {
            Dispersion::Months(months) => months,
            Dispersion::Fraction(fraction) => fraction * duration,
        };
        ResolvedCurveParams {
            peak_month,
            skew: self.skew,
            dispersion: dispersion.max(MIN_DISPERSION),
            total: self.total,
        }
    }
}

/// Curve parameters with peak and dispersion resolved to absolute months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCurveParams {
    pub peak_month: f64,
    pub skew: f64,
    pub dispersion: f64,
    pub total: Money,
}

/// Cumulative curve of `params` evaluated on `axis`.
///
/// The skew-normal location is solved so the density mode lands exactly on
/// `peak_month`, the cumulative form is evaluated along the axis, and the
/// result is renormalised to start at exactly 0 and end at exactly `total`.
/// A degenerate window or a numerically zero mass yields an all-zero series.
pub fn cumulative_curve(params: &ResolvedCurveParams, axis: &TimeAxis) -> Vec<f64> {
    let x = axis.points();
    if x.is_empty() {
        return Vec::new();
    }
    let n = x.len();
    if n == 1 || x[n - 1] - x[0] <= 0.0 {
        return vec![0.0; n];
    }

    let location =
        skew_normal::location_for_peak(params.peak_month, params.skew, params.dispersion);

    let density: Vec<f64> = x
        .iter()
        .map(|&xi| skew_normal::pdf(xi, params.skew, location, params.dispersion))
        .collect();

    // Cumulative trapezoidal mass from the window start.
    let mut cumulative = vec![0.0; n];
    for i in 1..n {
        cumulative[i] =
            cumulative[i - 1] + 0.5 * (density[i] + density[i - 1]) * (x[i] - x[i - 1]);
    }

    let mass = cumulative[n - 1];
    if mass <= ZERO_MASS_EPS {
        return vec![0.0; n];
    }

    cumulative
        .iter()
        .map(|&v| v / mass * params.total)
        .collect()
}

/// First differences of a cumulative series, with an implicit leading zero.
pub fn incremental_from_cumulative(cumulative: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    cumulative
        .iter()
        .map(|&v| {
            let step = v - prev;
            prev = v;
            step
        })
        .collect()
}
