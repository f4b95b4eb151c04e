//! Break-even stop schedules, one per top-up activation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StageKind;

/// One row of a break-even table: the outcome for a single already-active
/// stage if the whole blended position is closed at the break-even stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Which stage this row describes
    pub stage: StageKind,

    /// The stage's lot size
    pub lot: Decimal,

    /// The stage's entry offset in pips from the initial entry
    pub entry_offset_pips: Decimal,

    /// Signed pips this stage makes (or gives back) closing at the stop
    pub pip_gain: Decimal,

    /// Dollar cost of the spread for this stage
    pub spread_cost: Decimal,

    /// Dollar result for this stage closing at the stop
    pub result: Decimal,
}

/// Break-even schedule for the activation of one top-up stage.
///
/// Computed over all stages active at that point (initial plus top-ups up to
/// and including the newly activated one). The defining property: closing
/// every active stage at `weighted_offset_pips` nets zero, so
/// `total_result` is zero up to floating tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenSchedule {
    /// The newly activated stage that triggered this schedule
    pub activated: StageKind,

    /// Lot-weighted average entry offset of all active stages, in pips (exact)
    pub weighted_offset_pips: Decimal,

    /// Order-facing stop level in pips (weighted offset rounded up)
    pub stop_level_pips: Decimal,

    /// Per-stage outcomes at the stop
    pub rows: Vec<ScheduleRow>,

    /// Running spread cost across all rows
    pub total_spread: Decimal,

    /// Running signed pip gain across all rows
    pub total_pip_gain: Decimal,

    /// Running dollar result across all rows (zero at the exact stop)
    pub total_result: Decimal,
}
