//! Plan parameters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Sign convention for top-up pip gains in break-even schedules.
///
/// The drifted implementations of this strategy disagree on whether a
/// top-up's pips at the break-even stop are reported as a signed advance or
/// flipped positive as "pips given back". Dollar results are identical under
/// both; the convention only changes how the pip columns read. It is an
/// explicit parameter so whoever owns the strategy fixes the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipGainConvention {
    /// Pip gain is positive when price advanced past the stage entry
    Advance,
    /// Pip gain is positive when the stage gives back pips at the stop
    Retrace,
}

impl PipGainConvention {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "retrace" => Self::Retrace,
            _ => Self::Advance,
        }
    }
}

/// Parameters for one planning run. Supplied once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanParams {
    /// Account size in account currency
    pub account_size: Decimal,

    /// Percent of the account risked on the initial stop (0-100)
    pub risk_percent: Decimal,

    /// Percent of the account targeted as total gain (0-100)
    pub target_gain_percent: Decimal,

    /// Distance to the initial stop loss, in pips
    pub initial_stop_pips: Decimal,

    /// Distance to the take-profit target, in pips
    pub take_profit_pips: Decimal,

    /// Top-up levels as percentages of the take-profit distance (0-100).
    /// Any number of levels is allowed; a zero weight disables that stage.
    pub topup_levels: Vec<Decimal>,

    /// Acceptable deviation between planned and targeted gain, in currency
    pub tolerance: Decimal,

    /// Refit attempts before the validator gives up
    pub max_refit_iterations: u32,

    /// Sign convention for break-even pip gains
    pub pip_gain_convention: PipGainConvention,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            account_size: dec!(1250),
            risk_percent: dec!(4),        // 4% of account on the initial stop
            target_gain_percent: dec!(10),
            initial_stop_pips: dec!(50),
            take_profit_pips: dec!(100),
            topup_levels: vec![dec!(35), dec!(50), dec!(65)],
            tolerance: dec!(0.01),
            max_refit_iterations: 10,
            pip_gain_convention: PipGainConvention::Advance,
        }
    }
}

impl PlanParams {
    /// Dollar amount at risk on the initial stop.
    pub fn risk_usd(&self) -> Decimal {
        self.account_size * self.risk_percent / dec!(100)
    }

    /// Dollar gain targeted by the whole plan.
    pub fn target_gain(&self) -> Decimal {
        self.account_size * self.target_gain_percent / dec!(100)
    }

    /// Reject parameter sets the allocators cannot work with.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.account_size <= Decimal::ZERO {
            return Err(PlanError::invalid("account_size", self.account_size));
        }
        if self.risk_percent <= Decimal::ZERO || self.risk_percent > dec!(100) {
            return Err(PlanError::invalid("risk_percent", self.risk_percent));
        }
        if self.target_gain_percent <= Decimal::ZERO || self.target_gain_percent > dec!(100) {
            return Err(PlanError::invalid(
                "target_gain_percent",
                self.target_gain_percent,
            ));
        }
        if self.initial_stop_pips <= Decimal::ZERO {
            return Err(PlanError::invalid("initial_stop_pips", self.initial_stop_pips));
        }
        if self.take_profit_pips <= Decimal::ZERO {
            return Err(PlanError::invalid("take_profit_pips", self.take_profit_pips));
        }
        for &level in &self.topup_levels {
            if level < Decimal::ZERO || level > dec!(100) {
                return Err(PlanError::invalid("topup_level", level));
            }
        }
        Ok(())
    }
}
