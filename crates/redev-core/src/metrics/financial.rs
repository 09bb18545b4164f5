use serde::{Deserialize, Serialize};

use crate::metrics::brent;
use crate::types::{CashflowSeries, Money, Rate};

/// Default annual discount rate (10%).
pub const DEFAULT_ANNUAL_RATE: Rate = 0.10;

/// Investment metrics derived from one assembled cash flow.
///
/// `irr` is absent when the flow has no sign change or the root search does
/// not converge; that is a legitimate outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    pub max_financing_need: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_financing_month: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_month: Option<f64>,
}

/// Tuned IRR search policy. The defaults reproduce the engine's standard
/// bracket, widening schedule, and loss-ratio fast-fail cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrPolicy {
    /// Initial annual-rate search bracket
    pub bracket: (Rate, Rate),
    /// Fallback low endpoints tried when the objective is non-finite at the
    /// bracket start
    pub low_fallbacks: Vec<Rate>,
    /// Upper bounds tried in order when the initial bracket holds no sign
    /// change
    pub widen_candidates: Vec<Rate>,
    /// No realistic root exists when `sum(flows) < -cutoff * sum(|flows|)`
    pub loss_ratio_cutoff: f64,
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for IrrPolicy {
    fn default() -> Self {
        Self {
            bracket: (-0.5, 5.0),
            low_fallbacks: vec![-0.3, 0.0],
            widen_candidates: vec![10.0, 20.0],
            loss_ratio_cutoff: 0.5,
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

/// Equivalent monthly compounding rate for an annual rate.
pub fn annual_to_monthly(annual: Rate) -> Rate {
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}

/// Net present value of the series at an annual discount rate.
///
/// Each step's net flow is discounted by `(1 + monthly)^month` on the fine
/// axis. Callers supply `annual_rate > -1`.
pub fn npv(series: &CashflowSeries, annual_rate: Rate) -> Money {
    let monthly = annual_to_monthly(annual_rate);
    discounted_sum(series, monthly)
}

fn discounted_sum(series: &CashflowSeries, monthly_rate: Rate) -> f64 {
    series
        .points
        .iter()
        .map(|p| p.net_flow / (1.0 + monthly_rate).powf(p.month))
        .sum()
}

/// Internal rate of return with the default search policy.
pub fn irr(series: &CashflowSeries) -> Option<Rate> {
    irr_with_policy(series, &IrrPolicy::default())
}

/// Internal rate of return: the annual rate at which NPV is zero.
///
/// Fast-fails to `None` when the flow holds no sign change or the
/// cumulative loss is too deep for a realistic root, then runs a bracketed
/// Brent search, widening the upper bound per the policy before giving up.
pub fn irr_with_policy(series: &CashflowSeries, policy: &IrrPolicy) -> Option<Rate> {
    let has_positive = series.points.iter().any(|p| p.net_flow > 0.0);
    let has_negative = series.points.iter().any(|p| p.net_flow < 0.0);
    if !has_positive || !has_negative {
        return None;
    }

    let total: f64 = series.points.iter().map(|p| p.net_flow).sum();
    let magnitude: f64 = series.points.iter().map(|p| p.net_flow.abs()).sum();
    if total < -policy.loss_ratio_cutoff * magnitude {
        return None;
    }

    // Non-finite evaluations count as +infinity rather than poisoning the
    // search.
    let objective = |annual: f64| -> f64 {
        if annual <= -1.0 {
            return f64::INFINITY;
        }
        let monthly = annual_to_monthly(annual);
        if monthly <= -1.0 {
            return f64::INFINITY;
        }
        let value = discounted_sum(series, monthly);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    let at_zero = objective(0.0);
    if !at_zero.is_finite() {
        return None;
    }

    let (mut low, mut high) = policy.bracket;
    let mut at_low = objective(low);
    for &fallback in &policy.low_fallbacks {
        if at_low.is_finite() {
            break;
        }
        low = fallback;
        at_low = objective(low);
    }
    if !at_low.is_finite() {
        return None;
    }

    let at_high = objective(high);
    if at_low * at_high >= 0.0 {
        let mut bracketed = false;
        for &candidate in &policy.widen_candidates {
            let value = objective(candidate);
            if value.is_finite() && at_low * value < 0.0 {
                high = candidate;
                bracketed = true;
                break;
            }
        }
        if !bracketed {
            return None;
        }
    }

    brent::find_root(objective, low, high, policy.tolerance, policy.max_iterations)
}

/// Peak external funding required: the deepest negative excursion of the
/// cumulative balance, and the first month it occurs. A balance that never
/// dips below zero needs no financing and reports no month.
pub fn max_financing_need(series: &CashflowSeries) -> (Money, Option<f64>) {
    let mut minimum = f64::INFINITY;
    let mut month = None;
    for p in &series.points {
        if p.cumulative_balance < minimum {
            minimum = p.cumulative_balance;
            month = Some(p.month);
        }
    }
    if !minimum.is_finite() || minimum >= 0.0 {
        return (0.0, None);
    }
    (-minimum, month)
}

/// First month at which the cumulative balance is non-negative; `None` if
/// the balance never recovers inside the window.
pub fn break_even_month(series: &CashflowSeries) -> Option<f64> {
    series
        .points
        .iter()
        .find(|p| p.cumulative_balance >= 0.0)
        .map(|p| p.month)
}

/// All metrics for one series at the given annual discount rate.
pub fn compute_metrics(series: &CashflowSeries, annual_rate: Rate) -> Metrics {
    let (need, need_month) = max_financing_need(series);
    Metrics {
        npv: npv(series, annual_rate),
        irr: irr(series),
        max_financing_need: need,
        max_financing_month: need_month,
        break_even_month: break_even_month(series),
    }
}
