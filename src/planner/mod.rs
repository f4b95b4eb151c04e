//! Planning core: unit conversion, sizing, break-even scheduling, validation.

mod breakeven;
mod config;
mod engine;
mod risk;
mod topup;
pub mod units;
mod validator;

pub use breakeven::BreakEvenScheduler;
pub use config::{PipGainConvention, PlanParams};
pub use engine::PlanEngine;
pub use risk::allocate_initial;
pub use topup::{allocate_topups, TopUpAllocation, TopUpStage};
pub use validator::{validate_and_refit, ValidatedAllocation};
