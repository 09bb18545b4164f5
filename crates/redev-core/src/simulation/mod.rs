pub mod monte_carlo;
pub mod sensitivity;

pub use monte_carlo::{
    run_deterministic, run_monte_carlo, DeterministicOutput, IterationResult, RetainedCurve,
    ShapeVariation, SimulationInput, SimulationMode, SimulationOutput,
};
pub use sensitivity::{run_sensitivity, SensitivityCell, SensitivityInput, SensitivityOutput};
