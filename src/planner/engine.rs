//! Plan engine: wires the allocators, validator, and scheduler together.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::PlanError;
use crate::models::{
    BreakEvenSchedule, Instrument, OrderSpec, OrderType, Stage, StageKind, TradePlan,
};

use super::breakeven::BreakEvenScheduler;
use super::config::PlanParams;
use super::{risk, units, validator};

/// Builds complete trading plans from an instrument snapshot and a parameter
/// set. One engine instance can plan against many snapshots; every call is a
/// pure function over its inputs.
pub struct PlanEngine {
    params: PlanParams,
}

impl PlanEngine {
    /// Create an engine with the given parameters.
    pub fn new(params: PlanParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlanParams {
        &self.params
    }

    /// Build the full plan: initial sizing, top-up allocation, profit
    /// reconciliation, break-even schedules, and submission-ready orders.
    pub fn build_plan(&self, instrument: &Instrument) -> Result<TradePlan, PlanError> {
        instrument.validate()?;
        self.params.validate()?;

        let params = &self.params;
        let vpp = instrument.value_per_point;

        let spread_pips = units::points_to_pips(instrument.digits, instrument.spread_points());
        let initial_pip_gain = params.take_profit_pips - spread_pips;
        if initial_pip_gain <= Decimal::ZERO {
            warn!(
                spread = %spread_pips,
                take_profit = %params.take_profit_pips,
                "spread swallows the whole take-profit distance"
            );
            return Err(PlanError::invalid("take_profit_pips", params.take_profit_pips));
        }

        let initial_lot = risk::allocate_initial(
            params.account_size,
            params.risk_percent,
            params.initial_stop_pips,
            instrument,
        )?;

        let target_gain = params.target_gain();
        let validated = validator::validate_and_refit(
            initial_lot,
            initial_pip_gain,
            &params.topup_levels,
            params.take_profit_pips,
            spread_pips,
            target_gain,
            params.tolerance,
            params.max_refit_iterations,
            instrument,
        )?;

        // Assemble stages in activation order, initial first. Stage lots are
        // the step-aligned ones: the gains, break-even schedules, and orders
        // below all describe the volumes that will actually trade.
        let initial_lot = validated.allocation.initial_lot;
        let mut stages = vec![Stage {
            kind: StageKind::Initial,
            lot: Some(initial_lot),
            entry_offset_pips: Decimal::ZERO,
            pip_gain: initial_pip_gain,
            gain: initial_lot * initial_pip_gain * vpp,
            spread_cost: initial_lot * spread_pips * vpp,
        }];
        for topup in &validated.allocation.stages {
            stages.push(Stage {
                kind: StageKind::TopUp(topup.index),
                lot: topup.lot,
                entry_offset_pips: topup.entry_offset_pips,
                pip_gain: topup.pip_gain,
                gain: topup
                    .lot
                    .map(|lot| lot * topup.pip_gain * vpp)
                    .unwrap_or_default(),
                spread_cost: topup
                    .lot
                    .map(|lot| lot * spread_pips * vpp)
                    .unwrap_or_default(),
            });
        }

        // One break-even schedule per top-up activation; unavailable stages
        // get no schedule instead of dividing by nothing.
        let scheduler = BreakEvenScheduler::new(spread_pips, vpp, params.pip_gain_convention);
        let mut schedules = Vec::with_capacity(stages.len().saturating_sub(1));
        for k in 1..stages.len() {
            if stages[k].is_available() {
                schedules.push(Some(scheduler.schedule(&stages[..=k])?));
            } else {
                schedules.push(None);
            }
        }

        let orders = self.build_orders(instrument, &stages, &schedules);

        // What the aligned volumes actually produce at take-profit; the
        // validator reconciled the sizing intent, this is the traded plan.
        let total_gain: Decimal = stages.iter().map(|s| s.gain).sum();

        info!(
            symbol = %instrument.symbol,
            stages = stages.len(),
            orders = orders.len(),
            reconciled_gain = %validated.total_profit,
            total_gain = %total_gain,
            "plan built"
        );

        Ok(TradePlan {
            symbol: instrument.symbol.clone(),
            spread_pips,
            risk_usd: params.risk_usd(),
            target_gain,
            total_gain,
            refit_iterations: validated.iterations,
            stages,
            schedules,
            orders,
            created_at: Utc::now(),
        })
    }

    /// Turn the stage set into venue-ready orders: a market buy for the
    /// initial stage and a buy-stop per available top-up, each with its stop
    /// placed at that activation's break-even level.
    fn build_orders(
        &self,
        instrument: &Instrument,
        stages: &[Stage],
        schedules: &[Option<BreakEvenSchedule>],
    ) -> Vec<OrderSpec> {
        let digits = instrument.digits;
        let point = instrument.point;
        let entry = instrument.ask;
        let take_profit =
            (entry + units::pips_to_price_offset(digits, point, self.params.take_profit_pips))
                .round_dp(digits);

        let mut orders = Vec::new();

        if let Some(lot) = stages[0].lot {
            let stop_loss = (entry
                - units::pips_to_price_offset(digits, point, self.params.initial_stop_pips))
            .round_dp(digits);
            orders.push(self.checked_order(
                instrument,
                OrderSpec {
                    stage: StageKind::Initial,
                    order_type: OrderType::Buy,
                    lot,
                    entry_price: entry.round_dp(digits),
                    stop_loss,
                    take_profit,
                },
            ));
        }

        for (stage, schedule) in stages[1..].iter().zip(schedules) {
            let (Some(lot), Some(schedule)) = (stage.lot, schedule.as_ref()) else {
                continue;
            };
            let entry_price = (entry
                + units::pips_to_price_offset(digits, point, stage.entry_offset_pips))
            .round_dp(digits);
            // Once this top-up fires, the stop for the whole position moves
            // to its break-even level (an offset from the initial entry).
            let stop_loss = (entry
                + units::pips_to_price_offset(digits, point, schedule.stop_level_pips))
            .round_dp(digits);
            orders.push(self.checked_order(
                instrument,
                OrderSpec {
                    stage: stage.kind,
                    order_type: OrderType::BuyStop,
                    lot,
                    entry_price,
                    stop_loss,
                    take_profit,
                },
            ));
        }

        orders
    }

    /// Flag orders whose stop sits inside the venue's stop or freeze
    /// distance. Observability only; the order is still emitted.
    fn checked_order(&self, instrument: &Instrument, order: OrderSpec) -> OrderSpec {
        if let Some(limit) = violated_distance_limit(instrument, &order) {
            let distance_points = stop_distance_points(instrument, &order);
            warn!(
                stage = %order.stage,
                distance_points = %distance_points,
                stop_level = %instrument.stop_level_points,
                freeze_level = %instrument.freeze_level_points,
                "stop inside the venue's {} distance",
                limit
            );
        }
        order
    }
}

fn stop_distance_points(instrument: &Instrument, order: &OrderSpec) -> Decimal {
    (order.entry_price - order.stop_loss).abs() / instrument.point
}

/// Which venue distance limit, if any, the order's stop violates.
fn violated_distance_limit(instrument: &Instrument, order: &OrderSpec) -> Option<&'static str> {
    if instrument.point <= Decimal::ZERO {
        return None;
    }
    let distance_points = stop_distance_points(instrument, order);
    if instrument.stop_level_points > Decimal::ZERO
        && distance_points < instrument.stop_level_points
    {
        return Some("stop level");
    }
    if instrument.freeze_level_points > Decimal::ZERO
        && distance_points < instrument.freeze_level_points
    {
        return Some("freeze level");
    }
    None
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
    fn test_reference_plan_end_to_end() {
        let engine = PlanEngine::new(PlanParams::default());
        let plan = engine.build_plan(&eurusd()).unwrap();

        assert_eq!(plan.spread_pips, dec!(13));
        assert_eq!(plan.risk_usd, dec!(50));
        assert_eq!(plan.target_gain, dec!(125));
        assert_eq!(plan.stages[0].lot, Some(dec!(0.10)));
        assert_eq!(plan.stages[0].pip_gain, dec!(87));
        assert_eq!(plan.refit_iterations, 1);

        // Stage lots are the step-aligned workbook lots
        let lots: Vec<Decimal> = plan.stages[1..]
            .iter()
            .map(|s| s.lot.unwrap())
            .collect();
        assert_eq!(lots, vec![dec!(0.02), dec!(0.04), dec!(0.08)]);

        // The traded total reflects those lots: 87 + 10.4 + 14.8 + 17.6
        assert_eq!(plan.total_gain, dec!(129.8));

        // Entry offsets at 35/50/65% of the 100-pip target
        let offsets: Vec<Decimal> = plan.stages[1..]
            .iter()
            .map(|s| s.entry_offset_pips)
            .collect();
        assert_eq!(offsets, vec![dec!(35), dec!(50), dec!(65)]);

        // Every schedule present and closing at zero
        assert_eq!(plan.schedules.len(), 3);
        for schedule in plan.schedules.iter().flatten() {
            assert!(schedule.total_result.abs() < dec!(0.000001));
        }

        // Break-even stops match the reference workbook tables
        let stops: Vec<Decimal> = plan
            .schedules
            .iter()
            .map(|s| s.as_ref().unwrap().stop_level_pips)
            .collect();
        assert_eq!(stops, vec![dec!(6), dec!(17), dec!(33)]);
    }

    #[test]
    fn test_schedules_price_the_emitted_lots() {
        // The lots the schedules were computed from must be the lots the
        // orders carry, and closing the emitted volumes at each schedule's
        // exact break-even offset must net zero.
        let engine = PlanEngine::new(PlanParams::default());
        let plan = engine.build_plan(&eurusd()).unwrap();

        for (k, schedule) in plan.schedules.iter().enumerate() {
            let schedule = schedule.as_ref().unwrap();
            let mut closure = Decimal::ZERO;
            for row in &schedule.rows {
                let order = plan
                    .orders
                    .iter()
                    .find(|o| o.stage == row.stage)
                    .unwrap_or_else(|| panic!("no order for {}", row.stage));
                assert_eq!(order.lot, row.lot, "schedule {} lot mismatch", k + 1);
                closure += order.lot
                    * (schedule.weighted_offset_pips - row.entry_offset_pips)
                    * dec!(10);
            }
            assert!(
                closure.abs() < dec!(0.01),
                "closing emitted lots at schedule {} nets {}",
                k + 1,
                closure
            );
        }
    }

    #[test]
    fn test_reference_plan_orders() {
        let engine = PlanEngine::new(PlanParams::default());
        let plan = engine.build_plan(&eurusd()).unwrap();

        assert_eq!(plan.orders.len(), 4);

        let initial = &plan.orders[0];
        assert_eq!(initial.order_type, OrderType::Buy);
        assert_eq!(initial.lot, dec!(0.10));
        assert_eq!(initial.entry_price, dec!(1.08630));
        assert_eq!(initial.stop_loss, dec!(1.08130)); // 50 pips below
        assert_eq!(initial.take_profit, dec!(1.09630)); // 100 pips above

        let topup1 = &plan.orders[1];
        assert_eq!(topup1.order_type, OrderType::BuyStop);
        assert_eq!(topup1.lot, dec!(0.02));
        assert_eq!(topup1.entry_price, dec!(1.08980)); // 35 pips above
        assert_eq!(topup1.stop_loss, dec!(1.08690)); // break-even at 6 pips
        assert_eq!(topup1.take_profit, dec!(1.09630));

        // Later stops track the workbook break-even levels 17 and 33
        assert_eq!(plan.orders[2].stop_loss, dec!(1.08800));
        assert_eq!(plan.orders[3].stop_loss, dec!(1.08960));
    }

    #[test]
    fn test_stop_inside_venue_limits_is_flagged() {
        let mut inst = eurusd();
        inst.stop_level_points = dec!(300); // 30 pips
        inst.freeze_level_points = dec!(500); // 50 pips

        let engine = PlanEngine::new(PlanParams::default());
        let plan = engine.build_plan(&inst).unwrap();

        // TopUp_1 enters at 35 pips with its stop at 6: 29 pips of distance,
        // inside the venue's stop level
        let topup1 = &plan.orders[1];
        assert_eq!(
            violated_distance_limit(&inst, topup1),
            Some("stop level")
        );

        // TopUp_2 (50 in, stop 17: 33 pips) clears the stop level but not
        // the freeze distance
        let topup2 = &plan.orders[2];
        assert_eq!(
            violated_distance_limit(&inst, topup2),
            Some("freeze level")
        );

        // The 50-pip initial stop clears both; flagged orders still emit
        assert_eq!(violated_distance_limit(&inst, &plan.orders[0]), None);
        assert_eq!(plan.orders.len(), 4);
    }

    #[test]
    fn test_zero_weight_level_yields_na_schedule() {
        let params = PlanParams {
            topup_levels: vec![dec!(35), dec!(0), dec!(65)],
            ..Default::default()
        };
        let engine = PlanEngine::new(params);
        let plan = engine.build_plan(&eurusd()).unwrap();

        assert!(plan.schedules[0].is_some());
        assert!(plan.schedules[1].is_none());
        assert!(plan.schedules[2].is_some());

        // No order is emitted for the disabled stage
        assert_eq!(plan.orders.len(), 3);
        assert!(plan
            .orders
            .iter()
            .all(|o| o.stage != StageKind::TopUp(2)));
    }

    #[test]
    fn test_initial_gain_beyond_target_is_terminal() {
        let params = PlanParams {
            target_gain_percent: dec!(5), // $62.50 target vs $87 initial gain
            ..Default::default()
        };
        let engine = PlanEngine::new(params);
        let err = engine.build_plan(&eurusd()).unwrap_err();
        assert!(matches!(err, PlanError::TargetExhausted { .. }));
    }

    #[test]
    fn test_spread_wider_than_target_is_invalid() {
        let mut inst = eurusd();
        inst.ask = inst.bid + dec!(0.01050); // 105 pips of spread
        let engine = PlanEngine::new(PlanParams::default());
        let err = engine.build_plan(&inst).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput { .. }));
    }

    #[test]
    fn test_plan_without_topups_has_single_order() {
        let params = PlanParams {
            topup_levels: vec![],
            max_refit_iterations: 10,
            tolerance: dec!(50), // only the initial order contributes
            ..Default::default()
        };
        let engine = PlanEngine::new(params);
        let plan = engine.build_plan(&eurusd()).unwrap();

        assert_eq!(plan.stages.len(), 1);
        assert!(plan.schedules.is_empty());
        assert_eq!(plan.orders.len(), 1);
    }
}
