//! Plan stages: the initial order and its top-ups.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which stage of the scaled entry this is.
///
/// Stages activate strictly in order (Initial, then TopUp 1..N) as price
/// crosses each entry level; within one planning run a stage is never
/// deactivated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    /// The initial market order
    Initial,
    /// The n-th top-up stop order (1-based)
    TopUp(usize),
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Initial => write!(f, "Initial"),
            StageKind::TopUp(n) => write!(f, "TopUp_{}", n),
        }
    }
}

/// One stage of the plan as sized by the allocators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stage identity
    pub kind: StageKind,

    /// Volume-step-aligned lot size, the volume this stage actually trades.
    /// `None` means the stage is unavailable (zero-weight level
    /// or an input that made sizing impossible) and must be skipped, not
    /// treated as a zero-lot order.
    pub lot: Option<Decimal>,

    /// Entry level as a pip offset from the initial entry price
    pub entry_offset_pips: Decimal,

    /// Pips captured if the take-profit is hit after this entry, net of spread
    pub pip_gain: Decimal,

    /// Dollar contribution of this stage at take-profit
    pub gain: Decimal,

    /// Dollar cost of crossing the spread with this stage's lot
    pub spread_cost: Decimal,
}

impl Stage {
    /// Whether the stage can actually be traded.
    pub fn is_available(&self) -> bool {
        self.lot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Initial.to_string(), "Initial");
        assert_eq!(StageKind::TopUp(2).to_string(), "TopUp_2");
    }
}
