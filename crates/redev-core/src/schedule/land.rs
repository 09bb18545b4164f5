use serde::{Deserialize, Serialize};

use crate::types::{Money, MonthRange};

/// One land payment: a fraction of the total land value due at an integer
/// project month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandPayment {
    pub month: u32,
    pub fraction: f64,
}

/// How the land acquisition is settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LandSchedule {
    /// Settled in kind; the value transferred is captured upstream as a
    /// reduction of gross sales, so no cash leaves the project.
    Barter,
    /// Discrete cash payments. Fractions are applied to `total_value`
    /// as-is; they are not required to sum to 1.0.
    Cash {
        total_value: Money,
        payments: Vec<LandPayment>,
    },
}

impl LandSchedule {
    /// Month-indexed absolute payment amounts over `[0, range.end]`.
    ///
    /// Payments landing outside the window are dropped, not rejected.
    pub fn monthly_amounts(&self, range: MonthRange) -> Vec<Money> {
        let n_months = (range.end as i64 + 1).max(0) as usize;
        let mut schedule = vec![0.0; n_months];

        match self {
            LandSchedule::Barter => schedule,
            LandSchedule::Cash {
                total_value,
                payments,
            } => {
                for payment in payments {
                    let month = payment.month as usize;
                    if month < n_months {
                        schedule[month] += total_value * payment.fraction;
                    }
                }
                schedule
            }
        }
    }
}
