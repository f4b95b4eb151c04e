//! Top-up sizing: distributing the remaining profit target across levels.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::error::PlanError;
use crate::models::Instrument;

/// One sized top-up level.
#[derive(Debug, Clone)]
pub struct TopUpStage {
    /// 1-based level index
    pub index: usize,

    /// Percentage weight of this level (0-100)
    pub weight: Decimal,

    /// Entry level in pips above the initial entry, rounded up to a whole pip
    pub entry_offset_pips: Decimal,

    /// Pips left to the take-profit from this entry, net of spread
    pub pip_gain: Decimal,

    /// Dollar share of the remaining target assigned to this level
    pub contribution: Decimal,

    /// Tradable lot size, aligned up to the volume step; `None` when the
    /// level is unavailable (zero weight, or the spread eats the whole
    /// remaining distance). This is the lot the stage carries everywhere:
    /// break-even schedules, reported gains, and emitted orders.
    pub lot: Option<Decimal>,

    /// Lot as sized, before step alignment. Exactly recovers the dollar
    /// contribution; reconciliation against the target uses this one.
    pub raw_lot: Option<Decimal>,
}

/// Result of a top-up allocation pass.
#[derive(Debug, Clone)]
pub struct TopUpAllocation {
    /// Sized top-up stages, in level order
    pub stages: Vec<TopUpStage>,

    /// The initial lot after any global rescale
    pub initial_lot: Decimal,

    /// Set when a max-volume overflow forced a proportional rescale
    pub rescale_factor: Option<Decimal>,
}

/// Distribute `remaining_target` dollars across the top-up levels.
///
/// Each level with weight `w` gets a `w / Σw` share of the remaining target;
/// its entry sits `ceil(take_profit_pips * w/100)` pips above the initial
/// entry, and its lot converts the dollar share through the pips left to the
/// target (`take_profit_pips * (1 - w/100) - spread`). Top-up lots are then
/// aligned up to the volume step; the aligned lot is what the stage trades
/// and what every downstream table is computed from, while the pre-alignment
/// lot is kept for target reconciliation.
///
/// If any resulting lot exceeds the instrument's maximum volume, every lot
/// including the initial one is rescaled by `volume_max / max_lot` so the
/// relative proportions survive, then re-clamped to the minimum. Clamping and
/// rescaling are normal paths and only logged.
///
/// `remaining_target <= 0` means the initial order alone already meets the
/// target; that is terminal for the run.
pub fn allocate_topups(
    remaining_target: Decimal,
    initial_lot: Decimal,
    levels: &[Decimal],
    take_profit_pips: Decimal,
    spread_pips: Decimal,
    instrument: &Instrument,
) -> Result<TopUpAllocation, PlanError> {
    if remaining_target <= Decimal::ZERO {
        warn!(remaining = %remaining_target, "initial order already exceeds the profit target");
        return Err(PlanError::TargetExhausted {
            remaining: remaining_target,
        });
    }

    let weight_sum: Decimal = levels.iter().filter(|w| **w > Decimal::ZERO).copied().sum();

    let mut stages = Vec::with_capacity(levels.len());
    for (i, &weight) in levels.iter().enumerate() {
        let index = i + 1;

        if weight <= Decimal::ZERO {
            warn!(level = index, "zero-weight top-up level, stage unavailable");
            stages.push(TopUpStage {
                index,
                weight,
                entry_offset_pips: Decimal::ZERO,
                pip_gain: Decimal::ZERO,
                contribution: Decimal::ZERO,
                lot: None,
                raw_lot: None,
            });
            continue;
        }

        let proportion = weight / dec!(100);
        let entry_offset_pips = (take_profit_pips * proportion).ceil();
        let pip_gain = take_profit_pips * (Decimal::ONE - proportion) - spread_pips;
        let contribution = remaining_target * weight / weight_sum;

        if pip_gain <= Decimal::ZERO {
            warn!(
                level = index,
                pip_gain = %pip_gain,
                "spread leaves no profitable distance at this level, stage unavailable"
            );
            stages.push(TopUpStage {
                index,
                weight,
                entry_offset_pips,
                pip_gain,
                contribution,
                lot: None,
                raw_lot: None,
            });
            continue;
        }

        let raw = contribution / (pip_gain * instrument.value_per_point);
        stages.push(TopUpStage {
            index,
            weight,
            entry_offset_pips,
            pip_gain,
            contribution,
            lot: None, // aligned below, once rescaling has settled
            raw_lot: Some(raw),
        });
    }

    // A lot above the venue maximum rescales the whole stage set (initial
    // included) so the blended proportions survive.
    let max_lot = stages
        .iter()
        .filter_map(|s| s.raw_lot)
        .fold(initial_lot, Decimal::max);

    let mut rescale_factor = None;
    let mut initial_lot = initial_lot;
    if max_lot > instrument.volume_max {
        let factor = instrument.volume_max / max_lot;
        warn!(
            max_lot = %max_lot,
            volume_max = %instrument.volume_max,
            factor = %factor,
            "max volume exceeded, rescaling all lots"
        );
        initial_lot *= factor;
        for stage in &mut stages {
            if let Some(raw) = stage.raw_lot {
                stage.raw_lot = Some(raw * factor);
            }
        }
        rescale_factor = Some(factor);
    }

    initial_lot = instrument.align_volume(instrument.clamp_volume(initial_lot));
    for stage in &mut stages {
        if let Some(raw) = stage.raw_lot {
            let raw = instrument.clamp_volume(raw);
            stage.raw_lot = Some(raw);
            stage.lot = Some(instrument.align_volume_up(raw));
        }
    }

    info!(
        levels = stages.len(),
        remaining = %remaining_target,
        rescaled = rescale_factor.is_some(),
        "top-up allocation complete"
    );

    Ok(TopUpAllocation {
        stages,
        initial_lot,
        rescale_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument() -> Instrument {
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

    fn assert_close(a: Decimal, b: Decimal) {
        assert!((a - b).abs() < dec!(0.000000001), "{} != {}", a, b);
    }

    fn reference_allocation() -> TopUpAllocation {
        // Workbook reference: 125 target, 87 from the initial order
        allocate_topups(
            dec!(38),
            dec!(0.10),
            &[dec!(35), dec!(50), dec!(65)],
            dec!(100),
            dec!(13),
            &instrument(),
        )
        .unwrap()
    }

    #[test]
    fn test_entry_offsets_follow_levels() {
        let alloc = reference_allocation();
        let offsets: Vec<Decimal> = alloc.stages.iter().map(|s| s.entry_offset_pips).collect();
        assert_eq!(offsets, vec![dec!(35), dec!(50), dec!(65)]);
    }

    #[test]
    fn test_contributions_split_remaining_by_weight() {
        let alloc = reference_allocation();
        let total: Decimal = alloc.stages.iter().map(|s| s.contribution).sum();
        assert_close(total, dec!(38));
        // Pairwise ratio of contributions equals the ratio of weights
        assert_close(
            alloc.stages[1].contribution / alloc.stages[0].contribution,
            dec!(50) / dec!(35),
        );
    }

    #[test]
    fn test_raw_lot_converts_contribution_through_pip_distance() {
        let alloc = reference_allocation();
        for stage in &alloc.stages {
            let raw = stage.raw_lot.unwrap();
            // raw_lot * pip_gain * value_per_point recovers the dollar share
            assert_close(raw * stage.pip_gain * dec!(10), stage.contribution);
        }
    }

    #[test]
    fn test_tradable_lots_align_up_to_volume_step() {
        // Workbook lots: sized 0.0170../0.0342../0.0748.., carried as
        // 0.02 / 0.04 / 0.08
        let alloc = reference_allocation();
        let lots: Vec<Decimal> = alloc.stages.iter().map(|s| s.lot.unwrap()).collect();
        assert_eq!(lots, vec![dec!(0.02), dec!(0.04), dec!(0.08)]);
    }

    #[test]
    fn test_pip_gain_is_distance_left_minus_spread() {
        let alloc = reference_allocation();
        let gains: Vec<Decimal> = alloc.stages.iter().map(|s| s.pip_gain).collect();
        assert_eq!(gains, vec![dec!(52), dec!(37), dec!(22)]);
    }

    #[test]
    fn test_rescale_preserves_pairwise_ratios() {
        let mut inst = instrument();
        inst.volume_max = dec!(0.05);
        inst.volume_min = dec!(0.0001);

        let before = reference_allocation();
        let after = allocate_topups(
            dec!(38),
            dec!(0.10),
            &[dec!(35), dec!(50), dec!(65)],
            dec!(100),
            dec!(13),
            &inst,
        )
        .unwrap();

        assert!(after.rescale_factor.is_some());

        // Ratios among the sized lots are unchanged by the rescale (the
        // step-aligned lots quantize and need not keep exact ratios)
        let ratio = |a: Decimal, b: Decimal| a / b;
        assert_close(
            ratio(after.stages[2].raw_lot.unwrap(), after.stages[0].raw_lot.unwrap()),
            ratio(before.stages[2].raw_lot.unwrap(), before.stages[0].raw_lot.unwrap()),
        );
        assert_close(
            ratio(after.stages[2].raw_lot.unwrap(), after.stages[1].raw_lot.unwrap()),
            ratio(before.stages[2].raw_lot.unwrap(), before.stages[1].raw_lot.unwrap()),
        );

        // And nothing exceeds the maximum anymore
        assert!(after.initial_lot <= inst.volume_max);
        for stage in &after.stages {
            assert!(stage.lot.unwrap() <= inst.volume_max);
        }
    }

    #[test]
    fn test_zero_weight_level_is_unavailable() {
        let alloc = allocate_topups(
            dec!(38),
            dec!(0.10),
            &[dec!(35), dec!(0), dec!(65)],
            dec!(100),
            dec!(13),
            &instrument(),
        )
        .unwrap();

        assert!(alloc.stages[0].lot.is_some());
        assert!(alloc.stages[1].lot.is_none());
        assert!(alloc.stages[2].lot.is_some());

        // The zero level's share flows to the others
        let total: Decimal = alloc.stages.iter().map(|s| s.contribution).sum();
        assert_close(total, dec!(38));
    }

    #[test]
    fn test_exhausted_target_is_terminal() {
        let err = allocate_topups(
            dec!(-5),
            dec!(0.10),
            &[dec!(35)],
            dec!(100),
            dec!(13),
            &instrument(),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::TargetExhausted { .. }));
    }

    #[test]
    fn test_no_levels_is_a_valid_plan() {
        let alloc =
            allocate_topups(dec!(38), dec!(0.10), &[], dec!(100), dec!(13), &instrument()).unwrap();
        assert!(alloc.stages.is_empty());
        assert_eq!(alloc.initial_lot, dec!(0.10));
    }

    #[test]
    fn test_spread_wider_than_distance_is_unavailable() {
        // Level at 95% leaves 5 pips to target, spread is 13
        let alloc = allocate_topups(
            dec!(38),
            dec!(0.10),
            &[dec!(95)],
            dec!(100),
            dec!(13),
            &instrument(),
        )
        .unwrap();
        assert!(alloc.stages[0].lot.is_none());
    }
}
