//! Instrument snapshot: venue-reported metadata and quotes for one symbol.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlanError;

/// Immutable per-run snapshot of an instrument, as reported by the trading
/// venue. The planning core only reads from it; acquiring and refreshing the
/// snapshot is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Symbol name (e.g., "EURUSD", "GBPJPY")
    pub symbol: String,

    /// Smallest raw price increment reported by the venue
    pub point: Decimal,

    /// Number of decimal digits in the quoted price
    pub digits: u32,

    /// Account-currency value of one pip per 1.0 lot
    pub value_per_point: Decimal,

    /// Minimum tradable volume
    pub volume_min: Decimal,

    /// Maximum tradable volume
    pub volume_max: Decimal,

    /// Volume step the venue accepts
    pub volume_step: Decimal,

    /// Current bid price
    pub bid: Decimal,

    /// Current ask price
    pub ask: Decimal,

    /// Minimum distance (in points) the venue allows between price and stops
    #[serde(default)]
    pub stop_level_points: Decimal,

    /// Distance (in points) inside which pending orders are frozen
    #[serde(default)]
    pub freeze_level_points: Decimal,
}

impl Instrument {
    /// Current ask-minus-bid gap in points.
    pub fn spread_points(&self) -> Decimal {
        (self.ask - self.bid) / self.point
    }

    /// Clamp a raw lot size into the tradable volume range.
    ///
    /// Below-min and above-max lots are silently pulled to the bound; this
    /// is a normal, expected path, not an error.
    pub fn clamp_volume(&self, lot: Decimal) -> Decimal {
        lot.max(self.volume_min).min(self.volume_max)
    }

    /// Clamp a raw lot and align it to the volume step (flooring, so an
    /// aligned order never exceeds the risk the raw lot was sized for).
    pub fn align_volume(&self, lot: Decimal) -> Decimal {
        let clamped = self.clamp_volume(lot);
        if self.volume_step <= Decimal::ZERO {
            return clamped;
        }
        let aligned = (clamped / self.volume_step).floor() * self.volume_step;
        // Flooring can undershoot the venue minimum; pull back up.
        let aligned = aligned.max(self.volume_min);
        if aligned != lot {
            debug!(symbol = %self.symbol, raw = %lot, aligned = %aligned, "volume adjusted");
        }
        aligned
    }

    /// Clamp a raw lot and align it to the volume step, rounding up (the
    /// sizing convention for top-ups: the stage must carry at least the
    /// dollar share it was sized for). Never exceeds the venue maximum.
    pub fn align_volume_up(&self, lot: Decimal) -> Decimal {
        let clamped = self.clamp_volume(lot);
        if self.volume_step <= Decimal::ZERO {
            return clamped;
        }
        let aligned = ((clamped / self.volume_step).ceil() * self.volume_step)
            .min(self.volume_max)
            .max(self.volume_min);
        if aligned != lot {
            debug!(symbol = %self.symbol, raw = %lot, aligned = %aligned, "volume adjusted");
        }
        aligned
    }

    /// Sanity-check the snapshot before planning against it.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.point <= Decimal::ZERO {
            return Err(PlanError::invalid("point", self.point));
        }
        if self.value_per_point <= Decimal::ZERO {
            return Err(PlanError::invalid("value_per_point", self.value_per_point));
        }
        if self.volume_min <= Decimal::ZERO || self.volume_max < self.volume_min {
            return Err(PlanError::invalid("volume_max", self.volume_max));
        }
        if self.ask < self.bid {
            return Err(PlanError::invalid("ask", self.ask));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eurusd() -> Instrument {
        Instrument {
            symbol: "EURUSD".to_string(),
            point: dec!(0.00001),
            digits: 5,
            value_per_point: dec!(10),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
            volume_step: dec!(0.01),
            bid: dec!(1.08500),
            ask: dec!(1.08630),
            stop_level_points: dec!(0),
            freeze_level_points: dec!(0),
        }
    }

    #[test]
    fn test_spread_points() {
        assert_eq!(eurusd().spread_points(), dec!(130));
    }

    #[test]
    fn test_align_volume_floors_to_step() {
        let inst = eurusd();
        assert_eq!(inst.align_volume(dec!(0.1234)), dec!(0.12));
        assert_eq!(inst.align_volume(dec!(0.10)), dec!(0.10));
    }

    #[test]
    fn test_align_volume_up_ceils_to_step() {
        let inst = eurusd();
        assert_eq!(inst.align_volume_up(dec!(0.0171)), dec!(0.02));
        assert_eq!(inst.align_volume_up(dec!(0.02)), dec!(0.02));
    }

    #[test]
    fn test_align_volume_up_never_exceeds_max() {
        let mut inst = eurusd();
        inst.volume_max = dec!(0.055);
        assert_eq!(inst.align_volume_up(dec!(0.052)), dec!(0.055));
    }

    #[test]
    fn test_align_volume_clamps() {
        let inst = eurusd();
        assert_eq!(inst.align_volume(dec!(0.001)), dec!(0.01));
        assert_eq!(inst.align_volume(dec!(250)), dec!(100));
    }

    #[test]
    fn test_validate_rejects_bad_point() {
        let mut inst = eurusd();
        inst.point = Decimal::ZERO;
        assert!(inst.validate().is_err());
    }
}
