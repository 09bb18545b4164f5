use serde::{Deserialize, Serialize};

/// All monetary values. The engine works in continuous f64 arithmetic.
pub type Money = f64;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Resolution of the fine time axis used for curve fitting and assembly.
pub const DEFAULT_N_POINTS: usize = 500;

/// A window of project months, e.g. (0, 36) for a three-year project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: f64,
    pub end: f64,
}

impl MonthRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Evenly spaced sample points over a month window.
///
/// The fine axis (default 500 points) is used for curve fitting and
/// cash-flow assembly; integer-month granularity lives in the land
/// scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    points: Vec<f64>,
}

impl TimeAxis {
    /// Sample `n_points` evenly spaced months across `range`, endpoints
    /// included.
    pub fn linspace(range: MonthRange, n_points: usize) -> Self {
        if n_points == 0 {
            return Self { points: Vec::new() };
        }
        if n_points == 1 {
            return Self {
                points: vec![range.start],
            };
        }
        let step = range.duration() / (n_points - 1) as f64;
        let mut points: Vec<f64> = (0..n_points)
            .map(|i| range.start + step * i as f64)
            .collect();
        // Anchor the final sample exactly on the window end.
        points[n_points - 1] = range.end;
        Self { points }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One sample of the assembled cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowPoint {
    /// Month on the fine axis (fractional between integer months)
    pub month: f64,
    /// Sales receipts attributed to this step
    pub sales_inflow: Money,
    /// Construction spending attributed to this step
    pub construction_outflow: Money,
    /// Land payments attributed to this step
    pub land_outflow: Money,
    /// sales_inflow - construction_outflow - land_outflow
    pub net_flow: Money,
    /// Running sum of net_flow in month order
    pub cumulative_balance: Money,
}

/// An assembled cash-flow series on a shared fine axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSeries {
    pub points: Vec<CashflowPoint>,
}

impl CashflowSeries {
    /// Combine per-step component amounts into net and cumulative flow.
    ///
    /// The three component slices must be sampled on `axis`.
    pub fn from_components(
        axis: &TimeAxis,
        sales: &[f64],
        construction: &[f64],
        land: &[f64],
    ) -> Self {
        let mut points = Vec::with_capacity(axis.len());
        let mut balance = 0.0;
        for (i, &month) in axis.points().iter().enumerate() {
            let sales_inflow = sales[i];
            let construction_outflow = construction[i];
            let land_outflow = land[i];
            let net_flow = sales_inflow - construction_outflow - land_outflow;
            balance += net_flow;
            points.push(CashflowPoint {
                month,
                sales_inflow,
                construction_outflow,
                land_outflow,
                net_flow,
                cumulative_balance: balance,
            });
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of all net flows over the window.
    pub fn total_net_flow(&self) -> Money {
        self.points.iter().map(|p| p.net_flow).sum()
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
