//! Error taxonomy for the planning core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced while building a trading plan.
///
/// Every variant is returned as a value, never raised as a process abort,
/// so callers (an interactive planner, a batch simulator) can retry with
/// adjusted parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// An input to an allocation step was unusable. Non-fatal for a single
    /// top-up stage, fatal when it concerns the initial stage.
    #[error("invalid input: {what} = {value}")]
    InvalidInput { what: &'static str, value: Decimal },

    /// The initial order alone already meets or exceeds the profit target,
    /// leaving nothing to distribute across top-ups. Terminal for the run.
    #[error("profit target exhausted: remaining target {remaining} <= 0")]
    TargetExhausted { remaining: Decimal },

    /// The profit validator could not reconcile the stage results with the
    /// target gain within its iteration bound. Terminal for the run.
    #[error("plan did not converge after {iterations} refit iterations (deviation {deviation})")]
    NoConvergence { iterations: u32, deviation: Decimal },
}

impl PlanError {
    pub fn invalid(what: &'static str, value: Decimal) -> Self {
        Self::InvalidInput { what, value }
    }
}
