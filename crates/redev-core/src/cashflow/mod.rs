pub mod assembler;

pub use assembler::{
    build_cashflow, precompute_normalized, scale_cashflow, NormalizedCurves, ScenarioSpec,
};
