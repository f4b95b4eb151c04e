//! The completed trading plan: stages, break-even schedules, and orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BreakEvenSchedule, Stage, StageKind};

/// Venue order type for a planned stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Market buy at the current ask
    Buy,
    /// Pending buy-stop at a level above the current ask
    BuyStop,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Buy => write!(f, "BUY"),
            OrderType::BuyStop => write!(f, "BUY_STOP"),
        }
    }
}

/// A submission-ready order produced for one plan stage. Actual routing is
/// the external order-execution collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Stage this order belongs to
    pub stage: StageKind,

    /// Order type
    pub order_type: OrderType,

    /// Volume-step-aligned lot size
    pub lot: Decimal,

    /// Entry price
    pub entry_price: Decimal,

    /// Stop-loss price
    pub stop_loss: Decimal,

    /// Take-profit price
    pub take_profit: Decimal,
}

/// A complete plan for one scaled-entry trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePlan {
    /// Symbol the plan was built for
    pub symbol: String,

    /// Spread at planning time, in pips
    pub spread_pips: Decimal,

    /// Dollar amount at risk on the initial stop
    pub risk_usd: Decimal,

    /// Dollar gain targeted by the whole plan
    pub target_gain: Decimal,

    /// Dollar gain the plan's step-aligned volumes produce at take-profit
    pub total_gain: Decimal,

    /// How many refit iterations the validator needed
    pub refit_iterations: u32,

    /// All stages, initial first, in activation order
    pub stages: Vec<Stage>,

    /// Break-even schedule per top-up stage; `None` where the stage is
    /// unavailable and the schedule would be meaningless
    pub schedules: Vec<Option<BreakEvenSchedule>>,

    /// Submission-ready orders for the available stages
    pub orders: Vec<OrderSpec>,

    /// When the plan was computed
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for TradePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^66}", " TRADING PLAN ")?;
        writeln!(f)?;
        writeln!(f, "Symbol:        {}", self.symbol)?;
        writeln!(f, "Spread:        {:.2} pips", self.spread_pips)?;
        writeln!(f, "Risk:          ${:.2}", self.risk_usd)?;
        writeln!(f, "Target Gain:   ${:.2}", self.target_gain)?;
        writeln!(f, "Planned Gain:  ${:.2} ({} refit iterations)",
            self.total_gain, self.refit_iterations)?;

        writeln!(f)?;
        writeln!(f, "--- Stages ---")?;
        writeln!(
            f,
            "{:<10} {:>8} {:>8} {:>10} {:>10}",
            "TRADE", "PIPS", "LOTS", "PIP GAIN", "GAIN $"
        )?;
        for stage in &self.stages {
            match stage.lot {
                Some(lot) => writeln!(
                    f,
                    "{:<10} {:>8.0} {:>8.2} {:>10.2} {:>10.2}",
                    stage.kind.to_string(),
                    stage.entry_offset_pips,
                    lot,
                    stage.pip_gain,
                    stage.gain
                )?,
                None => writeln!(
                    f,
                    "{:<10} {:>8} {:>8} {:>10} {:>10}",
                    stage.kind.to_string(),
                    "N/A",
                    "N/A",
                    "N/A",
                    "N/A"
                )?,
            }
        }

        for schedule in &self.schedules {
            match schedule {
                Some(s) => {
                    writeln!(f)?;
                    writeln!(f, "--- Break-even stop at {} ---", s.activated)?;
                    writeln!(f, "Stop level: {:.0} pips (exact {:.4})",
                        s.stop_level_pips, s.weighted_offset_pips)?;
                    writeln!(
                        f,
                        "{:<10} {:>8} {:>8} {:>10} {:>10}",
                        "TRADE", "SPREAD", "LOTS", "PIP GAIN", "RESULT"
                    )?;
                    for row in &s.rows {
                        writeln!(
                            f,
                            "{:<10} {:>8.1} {:>8.2} {:>10.1} {:>10.1}",
                            row.stage.to_string(),
                            row.spread_cost,
                            row.lot,
                            row.pip_gain,
                            row.result
                        )?;
                    }
                    writeln!(
                        f,
                        "{:<10} {:>8.1} {:>8} {:>10.1} {:>10.1}",
                        "Total", s.total_spread, "", s.total_pip_gain, s.total_result
                    )?;
                }
                None => {
                    writeln!(f)?;
                    writeln!(f, "--- Break-even stop: N/A (stage unavailable) ---")?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "--- Orders ---")?;
        writeln!(
            f,
            "{:<10} {:<9} {:>8} {:>12} {:>12} {:>12}",
            "STAGE", "TYPE", "LOTS", "ENTRY", "SL", "TP"
        )?;
        for order in &self.orders {
            writeln!(
                f,
                "{:<10} {:<9} {:>8.2} {:>12} {:>12} {:>12}",
                order.stage.to_string(),
                order.order_type.to_string(),
                order.lot,
                order.entry_price,
                order.stop_loss,
                order.take_profit
            )?;
        }
        writeln!(f, "{:=^66}", "")?;
        Ok(())
    }
}
