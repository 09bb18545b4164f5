use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cashflow::{precompute_normalized, scale_cashflow, ScenarioSpec};
use crate::error::RedevError;
use crate::metrics::{irr, npv};
use crate::simulation::monte_carlo::validate_discount_rate;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, DEFAULT_N_POINTS};
use crate::RedevResult;

fn default_steps() -> usize {
    5
}

fn default_span() -> f64 {
    0.20
}

/// Controls for the price-vs-cost sensitivity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Number of sweep values per variable (minimum 2)
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Half-width of the sweep: totals vary over `±span`
    #[serde(default = "default_span")]
    pub span: f64,
}

impl Default for SensitivityInput {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            span: default_span(),
        }
    }
}

/// One grid cell: metrics at a (sales, cost) variation pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub sales_variation: f64,
    pub cost_variation: f64,
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
}

/// Output of the sensitivity sweep. Cells are ordered sales-major, matching
/// `variations` × `variations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variations: Vec<f64>,
    pub cells: Vec<SensitivityCell>,
}

/// Sweep total sales value and total construction cost over `±span`,
/// recomputing NPV and IRR at every grid cell.
///
/// Only totals vary, so the curves are precomputed once and scaled per
/// cell instead of re-fitted.
pub fn run_sensitivity(
    spec: &ScenarioSpec,
    discount_rate: Rate,
    input: &SensitivityInput,
) -> RedevResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    if input.steps < 2 {
        return Err(RedevError::InvalidInput {
            field: "steps".into(),
            reason: "Must be at least 2".into(),
        });
    }
    if input.span < 0.0 {
        return Err(RedevError::InvalidInput {
            field: "span".into(),
            reason: "Must be non-negative".into(),
        });
    }
    validate_discount_rate(discount_rate)?;

    let variations: Vec<f64> = (0..input.steps)
        .map(|i| -input.span + 2.0 * input.span * i as f64 / (input.steps - 1) as f64)
        .collect();

    let normalized = precompute_normalized(spec, DEFAULT_N_POINTS);
    let base_sales = spec.sales.total;
    let base_cost = spec.construction.total;

    let mut cells = Vec::with_capacity(input.steps * input.steps);
    for &sales_variation in &variations {
        for &cost_variation in &variations {
            let series = scale_cashflow(
                &normalized,
                base_sales * (1.0 + sales_variation),
                base_cost * (1.0 + cost_variation),
            );
            cells.push(SensitivityCell {
                sales_variation,
                cost_variation,
                npv: npv(&series, discount_rate),
                irr: irr(&series),
            });
        }
    }

    let output = SensitivityOutput { variations, cells };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Price vs Cost Sensitivity Grid",
        &serde_json::json!({
            "steps": input.steps,
            "span": input.span,
            "discount_rate": discount_rate,
            "base_sales": base_sales,
            "base_cost": base_cost,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{CurveParams, Dispersion, PeakPosition};
    use crate::schedule::{LandPayment, LandSchedule};
    use crate::simulation::run_deterministic;
    use crate::types::MonthRange;
    use approx::assert_relative_eq;

    fn base_spec() -> ScenarioSpec {
        ScenarioSpec {
            sales: CurveParams {
                peak: PeakPosition::Month(18.0),
                skew: 2.5,
                dispersion: Dispersion::Months(8.0),
                total: 1_500_000.0,
            },
            construction: CurveParams {
                peak: PeakPosition::Month(20.0),
                skew: -0.5,
                dispersion: Dispersion::Months(9.0),
                total: 1_000_000.0,
            },
            land: LandSchedule::Cash {
                total_value: 350_000.0,
                payments: vec![LandPayment {
                    month: 0,
                    fraction: 1.0,
                }],
            },
            months: MonthRange::new(0.0, 36.0),
            construction_window: Some(MonthRange::new(0.0, 30.0)),
        }
    }

    #[test]
    fn test_grid_dimensions_and_sweep_bounds() {
        let out = run_sensitivity(&base_spec(), 0.10, &SensitivityInput::default()).unwrap();
        assert_eq!(out.result.variations.len(), 5);
        assert_eq!(out.result.cells.len(), 25);
        assert_relative_eq!(out.result.variations[0], -0.20, epsilon = 1e-12);
        assert_relative_eq!(out.result.variations[4], 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_center_cell_matches_deterministic_base() {
        let spec = base_spec();
        let out = run_sensitivity(&spec, 0.10, &SensitivityInput::default()).unwrap();
        let base = run_deterministic(&spec, 0.10).unwrap();

        let center = out
            .result
            .cells
            .iter()
            .find(|c| c.sales_variation == 0.0 && c.cost_variation == 0.0)
            .expect("odd step count includes the base case");
        assert_relative_eq!(
            center.npv,
            base.result.metrics.npv,
            epsilon = 1e-4,
            max_relative = 1e-8
        );
    }

    #[test]
    fn test_npv_monotonic_in_both_axes() {
        let out = run_sensitivity(&base_spec(), 0.10, &SensitivityInput::default()).unwrap();
        let steps = out.result.variations.len();

        // Along sales (cost fixed): NPV strictly increases.
        for c in 0..steps {
            for s in 1..steps {
                let prev = &out.result.cells[(s - 1) * steps + c];
                let cur = &out.result.cells[s * steps + c];
                assert!(cur.npv > prev.npv);
            }
        }
        // Along cost (sales fixed): NPV strictly decreases.
        for s in 0..steps {
            for c in 1..steps {
                let prev = &out.result.cells[s * steps + c - 1];
                let cur = &out.result.cells[s * steps + c];
                assert!(cur.npv < prev.npv);
            }
        }
    }

    #[test]
    fn test_single_step_rejected() {
        let input = SensitivityInput {
            steps: 1,
            span: 0.2,
        };
        assert!(run_sensitivity(&base_spec(), 0.10, &input).is_err());
    }

    #[test]
    fn test_negative_span_rejected() {
        let input = SensitivityInput {
            steps: 5,
            span: -0.1,
        };
        assert!(run_sensitivity(&base_spec(), 0.10, &input).is_err());
    }
}
