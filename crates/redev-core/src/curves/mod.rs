pub mod generator;
pub mod skew_normal;

pub use generator::{
    cumulative_curve, incremental_from_cumulative, CurveParams, Dispersion, PeakPosition,
    ResolvedCurveParams, MIN_DISPERSION,
};
