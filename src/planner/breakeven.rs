//! Break-even stop scheduling across activated stages.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::PlanError;
use crate::models::{BreakEvenSchedule, ScheduleRow, Stage, StageKind};

use super::PipGainConvention;

/// Computes, for each top-up activation, the stop level at which the blended
/// position closes flat.
///
/// Pure given its inputs: the caller supplies the stages active so far
/// (initial first, then top-ups in activation order) and receives the
/// schedule; nothing here polls prices or mutates state.
pub struct BreakEvenScheduler {
    spread_pips: Decimal,
    value_per_point: Decimal,
    convention: PipGainConvention,
}

impl BreakEvenScheduler {
    pub fn new(
        spread_pips: Decimal,
        value_per_point: Decimal,
        convention: PipGainConvention,
    ) -> Self {
        Self {
            spread_pips,
            value_per_point,
            convention,
        }
    }

    /// Build the break-even schedule for the most recently activated stage.
    ///
    /// `active` holds every stage active at this point, in activation order;
    /// unavailable stages contribute nothing and are skipped. The stop is the
    /// lot-weighted average entry offset: closing every active lot there nets
    /// zero by construction, which is the invariant callers rely on.
    pub fn schedule(&self, active: &[Stage]) -> Result<BreakEvenSchedule, PlanError> {
        let activated = active
            .last()
            .ok_or_else(|| PlanError::invalid("active_stages", Decimal::ZERO))?;
        if !activated.is_available() {
            return Err(PlanError::invalid("activated_lot", Decimal::ZERO));
        }

        let tradable: Vec<&Stage> = active.iter().filter(|s| s.is_available()).collect();
        let total_lots: Decimal = tradable.iter().filter_map(|s| s.lot).sum();
        if total_lots <= Decimal::ZERO {
            return Err(PlanError::invalid("total_lots", total_lots));
        }

        let weighted_offset_pips = tradable
            .iter()
            .map(|s| s.entry_offset_pips * s.lot.unwrap_or_default())
            .sum::<Decimal>()
            / total_lots;
        let stop_level_pips = weighted_offset_pips.ceil();

        let mut rows = Vec::with_capacity(tradable.len());
        let mut total_spread = Decimal::ZERO;
        let mut total_pip_gain = Decimal::ZERO;
        let mut total_result = Decimal::ZERO;

        for stage in &tradable {
            let lot = stage.lot.unwrap_or_default();
            let advance = weighted_offset_pips - stage.entry_offset_pips;

            // Under Retrace, pips a later stage gives back read positive and
            // the value factor flips with them; dollar results are identical
            // under both conventions.
            let (pip_gain, value) = match (self.convention, stage.kind) {
                (_, StageKind::Initial) | (PipGainConvention::Advance, _) => {
                    (advance, self.value_per_point)
                }
                (PipGainConvention::Retrace, _) => (-advance, -self.value_per_point),
            };

            let spread_cost = lot * self.spread_pips * self.value_per_point;
            let result = lot * pip_gain * value;

            total_spread += spread_cost;
            total_pip_gain += pip_gain;
            total_result += result;

            rows.push(ScheduleRow {
                stage: stage.kind,
                lot,
                entry_offset_pips: stage.entry_offset_pips,
                pip_gain,
                spread_cost,
                result,
            });
        }

        debug!(
            activated = %activated.kind,
            stop = %stop_level_pips,
            total_result = %total_result,
            "break-even schedule computed"
        );

        Ok(BreakEvenSchedule {
            activated: activated.kind,
            weighted_offset_pips,
            stop_level_pips,
            rows,
            total_spread,
            total_pip_gain,
            total_result,
        })
    }
}
