//! Initial order sizing from the risk budget.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::models::Instrument;

/// Size the initial market order so that hitting the initial stop loses
/// exactly the risk budget.
///
/// `risk_usd = account_size * risk_percent / 100`, then
/// `lot = risk_usd / (stop_distance_pips * value_per_point)`, clamped to the
/// tradable volume range and aligned to the volume step.
///
/// Returns `PlanError::InvalidInput` when the stop distance or the pip value
/// is non-positive; callers must check before using the lot.
pub fn allocate_initial(
    account_size: Decimal,
    risk_percent: Decimal,
    stop_distance_pips: Decimal,
    instrument: &Instrument,
) -> Result<Decimal, PlanError> {
    if stop_distance_pips <= Decimal::ZERO {
        warn!(stop = %stop_distance_pips, "initial stop distance must be positive");
        return Err(PlanError::invalid("stop_distance_pips", stop_distance_pips));
    }
    if instrument.value_per_point <= Decimal::ZERO {
        warn!(value_per_point = %instrument.value_per_point, "pip value must be positive");
        return Err(PlanError::invalid("value_per_point", instrument.value_per_point));
    }

    let risk_usd = account_size * risk_percent / dec!(100);
    let raw_lot = risk_usd / (stop_distance_pips * instrument.value_per_point);
    let lot = instrument.align_volume(raw_lot);

    if lot != raw_lot {
        debug!(raw = %raw_lot, lot = %lot, "initial lot adjusted to volume bounds");
    }

    Ok(lot)
}
