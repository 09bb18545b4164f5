pub mod cashflow;
pub mod curves;
pub mod error;
pub mod metrics;
pub mod schedule;
pub mod simulation;
pub mod types;

pub use error::RedevError;
pub use types::*;

/// Standard result type for all redev operations
pub type RedevResult<T> = Result<T, RedevError>;
