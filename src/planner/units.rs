//! Pip/point conversion for instrument price precision.
//!
//! One canonical policy, used everywhere: 5- and 3-digit instruments quote
//! 10 points per pip; 4- and 2-digit instruments quote 1 point per pip.
//! Any other precision passes through unchanged with a diagnostic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

/// How many raw price increments make up one pip at the given precision.
pub fn points_per_pip(digits: u32) -> Decimal {
    match digits {
        5 | 3 => dec!(10),
        4 | 2 => Decimal::ONE,
        other => {
            warn!(digits = other, "unhandled digit count, assuming 1 pip = 1 point");
            Decimal::ONE
        }
    }
}

/// Convert a pip count into raw price increments.
pub fn pips_to_points(digits: u32, pips: Decimal) -> Decimal {
    pips * points_per_pip(digits)
}

/// Convert raw price increments into pips.
pub fn points_to_pips(digits: u32, points: Decimal) -> Decimal {
    points / points_per_pip(digits)
}

/// Price size of one pip.
pub fn pip_size(digits: u32, point: Decimal) -> Decimal {
    point * points_per_pip(digits)
}

/// Absolute price offset corresponding to a pip distance.
pub fn pips_to_price_offset(digits: u32, point: Decimal, pips: Decimal) -> Decimal {
    pips * pip_size(digits, point)
}
