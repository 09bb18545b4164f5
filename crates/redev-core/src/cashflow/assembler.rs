use serde::{Deserialize, Serialize};

use crate::curves::{cumulative_curve, incremental_from_cumulative, CurveParams};
use crate::schedule::LandSchedule;
use crate::types::{CashflowSeries, Money, MonthRange, TimeAxis};

/// One fully-resolved project scenario: the three component specifications
/// plus the time windows they run over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub sales: CurveParams,
    pub construction: CurveParams,
    pub land: LandSchedule,
    /// Overall project window
    pub months: MonthRange,
    /// Construction may run over a sub-window, e.g. only the build period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_window: Option<MonthRange>,
}

impl ScenarioSpec {
    pub fn construction_range(&self) -> MonthRange {
        self.construction_window.unwrap_or(self.months)
    }
}

/// Normalized (total = 1) increment arrays plus the fixed land increments,
/// all on one shared axis. Precomputed once so Monte Carlo iterations can
/// scale totals without re-fitting distributions. Valid only while curve
/// shape parameters stay fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCurves {
    pub axis: TimeAxis,
    pub sales_increments: Vec<f64>,
    pub construction_increments: Vec<f64>,
    pub land_increments: Vec<f64>,
}

/// Assemble the full cash-flow series for a scenario.
///
/// Sales are generated on the primary axis; construction on its own window
/// and resampled onto the primary axis by linear interpolation of the
/// cumulative series; the land schedule is expanded from integer months the
/// same way. Degenerate windows propagate as all-zero component series.
pub fn build_cashflow(spec: &ScenarioSpec, n_points: usize) -> CashflowSeries {
    let axis = TimeAxis::linspace(spec.months, n_points);

    let sales = sales_increments(&spec.sales, spec.months, &axis);
    let construction =
        construction_increments(&spec.construction, spec.construction_range(), &axis, n_points);
    let land = land_increments(&spec.land, spec.months, &axis);

    CashflowSeries::from_components(&axis, &sales, &construction, &land)
}

/// Precompute the normalized curves for the fast scaling path.
///
/// The land increments do not vary with sales/cost perturbation, so they are
/// extracted from a zero-total dummy assembly.
pub fn precompute_normalized(spec: &ScenarioSpec, n_points: usize) -> NormalizedCurves {
    let axis = TimeAxis::linspace(spec.months, n_points);

    let sales = sales_increments(&spec.sales.with_total(1.0), spec.months, &axis);
    let construction = construction_increments(
        &spec.construction.with_total(1.0),
        spec.construction_range(),
        &axis,
        n_points,
    );

    let zero_totals = ScenarioSpec {
        sales: spec.sales.with_total(0.0),
        construction: spec.construction.with_total(0.0),
        land: spec.land.clone(),
        months: spec.months,
        construction_window: spec.construction_window,
    };
    let land = build_cashflow(&zero_totals, n_points)
        .points
        .iter()
        .map(|p| p.land_outflow)
        .collect();

    NormalizedCurves {
        axis,
        sales_increments: sales,
        construction_increments: construction,
        land_increments: land,
    }
}

/// Fast variant: scale the precomputed normalized increments by
/// scenario-specific totals instead of re-fitting the distributions.
pub fn scale_cashflow(
    curves: &NormalizedCurves,
    total_sales: Money,
    total_cost: Money,
) -> CashflowSeries {
    let sales: Vec<f64> = curves
        .sales_increments
        .iter()
        .map(|v| v * total_sales)
        .collect();
    let construction: Vec<f64> = curves
        .construction_increments
        .iter()
        .map(|v| v * total_cost)
        .collect();

    CashflowSeries::from_components(&curves.axis, &sales, &construction, &curves.land_increments)
}

fn sales_increments(params: &CurveParams, window: MonthRange, axis: &TimeAxis) -> Vec<f64> {
    let cumulative = cumulative_curve(&params.resolve(window), axis);
    incremental_from_cumulative(&cumulative)
}

fn construction_increments(
    params: &CurveParams,
    window: MonthRange,
    axis: &TimeAxis,
    n_points: usize,
) -> Vec<f64> {
    let own_axis = TimeAxis::linspace(window, n_points);
    let cumulative = cumulative_curve(&params.resolve(window), &own_axis);
    // Resample the cumulative series; interpolating increments directly
    // would break monotonicity at resample boundaries.
    let resampled = interp(axis.points(), own_axis.points(), &cumulative);
    incremental_from_cumulative(&resampled)
}

fn land_increments(land: &LandSchedule, months: MonthRange, axis: &TimeAxis) -> Vec<f64> {
    let monthly = land.monthly_amounts(months);
    if monthly.is_empty() {
        return vec![0.0; axis.len()];
    }

    let mut cumulative = Vec::with_capacity(monthly.len());
    let mut running = 0.0;
    for amount in &monthly {
        running += amount;
        cumulative.push(running);
    }
    let month_axis: Vec<f64> = (0..monthly.len()).map(|m| m as f64).collect();

    let resampled = interp(axis.points(), &month_axis, &cumulative);
    incremental_from_cumulative(&resampled)
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x_new`, clamped to the
/// endpoint values outside the sample range. `xp` must be sorted ascending.
fn interp(x_new: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    debug_assert_eq!(xp.len(), fp.len());
    x_new.iter().map(|&x| interp_one(x, xp, fp)).collect()
}

fn interp_one(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.is_empty() {
        return 0.0;
    }
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let j = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[j - 1], xp[j]);
    if x1 <= x0 {
        return fp[j - 1];
    }
    fp[j - 1] + (fp[j] - fp[j - 1]) * (x - x0) / (x1 - x0)
}
