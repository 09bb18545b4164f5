pub mod land;

pub use land::{LandPayment, LandSchedule};
