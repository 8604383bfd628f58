// 2.0 pool.rs: the Pool entity. virtual reserves, fee halving schedule,
// stage thresholds and burn configuration. reserves are virtual: nothing
// here custodies tokens, the pool only prices them.

use crate::quote::QuoteResult;
use crate::types::{round_amount, PoolId, Side, Stage, Timestamp, TokenId, BPS_DENOMINATOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Administrative parameters supplied at pool creation. Validated once,
/// then immutable for the life of the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    /// Stage-1 fee in basis points; halves at each later stage.
    pub fee_bps_base: u32,
    /// Cumulative token_a volume gates, ascending. Crossing the Nth gate
    /// enters stage N+1.
    pub stage1_threshold: Decimal,
    pub stage2_threshold: Decimal,
    pub stage3_threshold: Decimal,
    pub burn_token_id: TokenId,
    /// Burn amount scheduled for entering each stage. The stage-1 slot is
    /// kept for configuration symmetry; stage 1 is never entered by a
    /// transition, so it is never emitted.
    pub burn_stage_amounts: [Decimal; 4],
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.reserve_a <= Decimal::ZERO || self.reserve_b <= Decimal::ZERO {
            return Err(PoolError::NonPositiveReserves {
                reserve_a: self.reserve_a,
                reserve_b: self.reserve_b,
            });
        }
        if self.fee_bps_base > BPS_DENOMINATOR {
            return Err(PoolError::FeeOutOfRange(self.fee_bps_base));
        }
        if self.token_a == self.token_b {
            return Err(PoolError::IdenticalTokens(self.token_a));
        }
        let ascending = Decimal::ZERO < self.stage1_threshold
            && self.stage1_threshold < self.stage2_threshold
            && self.stage2_threshold < self.stage3_threshold;
        if !ascending {
            return Err(PoolError::ThresholdsNotAscending {
                stage1: self.stage1_threshold,
                stage2: self.stage2_threshold,
                stage3: self.stage3_threshold,
            });
        }
        if self.burn_stage_amounts.iter().any(|a| *a < Decimal::ZERO) {
            return Err(PoolError::NegativeBurnAmount);
        }
        Ok(())
    }
}

/// 2.1: live pool state. Mutated only under the registry's per-pool write
/// lock, and only by the swap commit path or an administrative reserve
/// adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub config: PoolConfig,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub stage: Stage,
    /// Lifetime swap volume denominated in token_a units. Monotonic.
    pub cumulative_volume: Decimal,
    /// Collected fees per source side. Accounting only; `effective_in`
    /// already excludes the fee, so these never sit inside the reserves.
    pub fee_accum_a: Decimal,
    pub fee_accum_b: Decimal,
    pub created_at: Timestamp,
}

impl Pool {
    pub fn new(id: PoolId, config: PoolConfig, created_at: Timestamp) -> Self {
        let reserve_a = config.reserve_a;
        let reserve_b = config.reserve_b;
        Self {
            id,
            config,
            reserve_a,
            reserve_b,
            stage: Stage::initial(),
            cumulative_volume: Decimal::ZERO,
            fee_accum_a: Decimal::ZERO,
            fee_accum_b: Decimal::ZERO,
            created_at,
        }
    }

    /// Current fee under the halving schedule: floor(base / 2^(stage-1)).
    pub fn fee_bps(&self) -> u32 {
        self.config.fee_bps_base / self.stage.fee_divisor()
    }

    pub fn tokens_for(&self, side: Side) -> (TokenId, TokenId) {
        match side {
            Side::AtoB => (self.config.token_a, self.config.token_b),
            Side::BtoA => (self.config.token_b, self.config.token_a),
        }
    }

    pub fn reserves_for(&self, side: Side) -> (Decimal, Decimal) {
        match side {
            Side::AtoB => (self.reserve_a, self.reserve_b),
            Side::BtoA => (self.reserve_b, self.reserve_a),
        }
    }

    /// Volume gate that must be crossed to enter `stage`, if any.
    pub fn threshold_to_enter(&self, stage: Stage) -> Option<Decimal> {
        match stage.value() {
            2 => Some(self.config.stage1_threshold),
            3 => Some(self.config.stage2_threshold),
            4 => Some(self.config.stage3_threshold),
            _ => None,
        }
    }

    /// Burn amount scheduled for entering `stage`.
    pub fn burn_amount_for(&self, stage: Stage) -> Decimal {
        self.config.burn_stage_amounts[(stage.value() - 1) as usize]
    }

    /// Apply a quoted swap to the reserves. The fee stays out of the
    /// tradable reserve and lands in the source side's fee accumulator.
    pub fn apply_swap(&mut self, side: Side, quote: &QuoteResult) {
        match side {
            Side::AtoB => {
                self.reserve_a += quote.effective_in;
                self.reserve_b -= quote.amount_out;
                self.fee_accum_a += quote.fee_amount;
            }
            Side::BtoA => {
                self.reserve_b += quote.effective_in;
                self.reserve_a -= quote.amount_out;
                self.fee_accum_b += quote.fee_amount;
            }
        }
        debug_assert!(self.reserve_a > Decimal::ZERO && self.reserve_b > Decimal::ZERO);
    }

    /// Administrative reserve adjustment. Both reserves must stay strictly
    /// positive; anything else is rejected without mutation.
    pub fn adjust_reserves(&mut self, delta_a: Decimal, delta_b: Decimal) -> Result<(), PoolError> {
        let new_a = round_amount(self.reserve_a + delta_a);
        let new_b = round_amount(self.reserve_b + delta_b);
        if new_a <= Decimal::ZERO || new_b <= Decimal::ZERO {
            return Err(PoolError::NonPositiveReserves {
                reserve_a: new_a,
                reserve_b: new_b,
            });
        }
        self.reserve_a = new_a;
        self.reserve_b = new_b;
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            id: self.id,
            token_a: self.config.token_a,
            token_b: self.config.token_b,
            reserve_a: self.reserve_a,
            reserve_b: self.reserve_b,
            fee_bps_base: self.config.fee_bps_base,
            fee_bps: self.fee_bps(),
            stage: self.stage,
            cumulative_volume: self.cumulative_volume,
            fee_accum_a: self.fee_accum_a,
            fee_accum_b: self.fee_accum_b,
            created_at: self.created_at,
        }
    }
}

/// 2.2: point-in-time read view of a pool. Quotes price against this;
/// it may be stale relative to an in-flight swap and is purely advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub fee_bps_base: u32,
    pub fee_bps: u32,
    pub stage: Stage,
    pub cumulative_volume: Decimal,
    pub fee_accum_a: Decimal,
    pub fee_accum_b: Decimal,
    pub created_at: Timestamp,
}

impl PoolSnapshot {
    pub fn reserves_for(&self, side: Side) -> (Decimal, Decimal) {
        match side {
            Side::AtoB => (self.reserve_a, self.reserve_b),
            Side::BtoA => (self.reserve_b, self.reserve_a),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("reserves must be strictly positive, got a={reserve_a} b={reserve_b}")]
    NonPositiveReserves { reserve_a: Decimal, reserve_b: Decimal },

    #[error("fee_bps_base {0} exceeds 10000")]
    FeeOutOfRange(u32),

    #[error("token_a and token_b are both {0:?}")]
    IdenticalTokens(TokenId),

    #[error("stage thresholds must be positive and ascending, got {stage1} / {stage2} / {stage3}")]
    ThresholdsNotAscending {
        stage1: Decimal,
        stage2: Decimal,
        stage3: Decimal,
    },

    #[error("burn amounts must be non-negative")]
    NegativeBurnAmount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> PoolConfig {
        PoolConfig {
            token_a: TokenId(1),
            token_b: TokenId(2),
            reserve_a: dec!(1000),
            reserve_b: dec!(65000000),
            fee_bps_base: 30,
            stage1_threshold: dec!(10000),
            stage2_threshold: dec!(50000),
            stage3_threshold: dec!(250000),
            burn_token_id: TokenId(2),
            burn_stage_amounts: [dec!(0), dec!(100), dec!(200), dec!(400)],
        }
    }

    #[test]
    fn config_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.reserve_a = Decimal::ZERO;
        assert!(matches!(
            bad.validate(),
            Err(PoolError::NonPositiveReserves { .. })
        ));

        let mut bad = config();
        bad.fee_bps_base = 10_001;
        assert!(matches!(bad.validate(), Err(PoolError::FeeOutOfRange(_))));

        let mut bad = config();
        bad.stage2_threshold = dec!(5000);
        assert!(matches!(
            bad.validate(),
            Err(PoolError::ThresholdsNotAscending { .. })
        ));

        let mut bad = config();
        bad.token_b = TokenId(1);
        assert!(matches!(bad.validate(), Err(PoolError::IdenticalTokens(_))));
    }

    #[test]
    fn fee_halves_per_stage() {
        let mut pool = Pool::new(PoolId(1), config(), Timestamp::from_millis(0));
        assert_eq!(pool.fee_bps(), 30);
        pool.stage = Stage::new(2).unwrap();
        assert_eq!(pool.fee_bps(), 15);
        pool.stage = Stage::new(3).unwrap();
        assert_eq!(pool.fee_bps(), 7); // floor(30 / 4)
        pool.stage = Stage::new(4).unwrap();
        assert_eq!(pool.fee_bps(), 3); // floor(30 / 8)
    }

    #[test]
    fn adjust_reserves_rejects_drain() {
        let mut pool = Pool::new(PoolId(1), config(), Timestamp::from_millis(0));
        assert!(pool.adjust_reserves(dec!(-1000), Decimal::ZERO).is_err());
        assert_eq!(pool.reserve_a, dec!(1000)); // untouched on failure

        pool.adjust_reserves(dec!(500), dec!(-5000000)).unwrap();
        assert_eq!(pool.reserve_a, dec!(1500));
        assert_eq!(pool.reserve_b, dec!(60000000));
    }

    #[test]
    fn threshold_mapping() {
        let pool = Pool::new(PoolId(1), config(), Timestamp::from_millis(0));
        assert_eq!(pool.threshold_to_enter(Stage::new(2).unwrap()), Some(dec!(10000)));
        assert_eq!(pool.threshold_to_enter(Stage::new(4).unwrap()), Some(dec!(250000)));
        assert_eq!(pool.threshold_to_enter(Stage::initial()), None);
        assert_eq!(pool.burn_amount_for(Stage::new(2).unwrap()), dec!(100));
    }
}
