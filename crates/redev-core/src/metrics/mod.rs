pub mod brent;
pub mod financial;

pub use financial::{
    annual_to_monthly, break_even_month, compute_metrics, irr, irr_with_policy,
    max_financing_need, npv, IrrPolicy, Metrics, DEFAULT_ANNUAL_RATE,
};
