//! Data models for instruments, plan stages, schedules, and orders.

mod instrument;
mod plan;
mod schedule;
mod stage;

pub use instrument::Instrument;
pub use plan::{OrderSpec, OrderType, TradePlan};
pub use schedule::{BreakEvenSchedule, ScheduleRow};
pub use stage::{Stage, StageKind};
