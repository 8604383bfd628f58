// 4.0 stage.rs: stage progression. transitions 1->2->3->4, each gated by
// cumulative token_a volume crossing its threshold. transitions are
// computed from volume alone, never from wall-clock time, so any replay
// of the same swaps lands on the same stages.

use crate::pool::Pool;
use crate::types::Stage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One threshold crossing: the stage entered and the burn scheduled for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub new_stage: Stage,
    pub burn_amount: Decimal,
}

/// Add `added_volume` to the pool's cumulative volume and walk every
/// threshold newly crossed, in strictly increasing stage order.
///
/// A single swap large enough to cross several thresholds produces one
/// transition per threshold; overshooting a gate never skips its burn.
/// Stage 4 is terminal. Returns the transitions taken, oldest first.
pub fn advance(pool: &mut Pool, added_volume: Decimal) -> Vec<StageTransition> {
    debug_assert!(added_volume >= Decimal::ZERO);
    pool.cumulative_volume += added_volume;

    let mut transitions = Vec::new();
    while let Some(next) = pool.stage.next() {
        let threshold = match pool.threshold_to_enter(next) {
            Some(t) => t,
            None => break,
        };
        if pool.cumulative_volume < threshold {
            break;
        }
        pool.stage = next;
        transitions.push(StageTransition {
            new_stage: next,
            burn_amount: pool.burn_amount_for(next),
        });
    }
    transitions
}
