// 3.0 quote.rs: constant-product pricing. pure functions over a pool
// snapshot, no mutation anywhere. the swap path re-runs the same math
// against freshly locked state, so a quote is always advisory.

use crate::pool::PoolSnapshot;
use crate::types::{bps_fraction, round_amount, Side, BPS_DENOMINATOR};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Everything a caller needs to judge a swap before committing to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub amount_out: Decimal,
    pub fee_bps: u32,
    pub fee_amount: Decimal,
    pub effective_in: Decimal,
    /// Realized price: amount_out per unit of amount_in.
    pub execution_price: Decimal,
    /// Deviation of the post-trade spot price from the pre-trade spot
    /// price, in basis points.
    pub price_impact_bps: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("amount_in must be > 0, got {0}")]
    InvalidAmount(Decimal),

    #[error("fee of {fee_bps} bps leaves no effective input from {amount_in}")]
    FeeConsumesInput { amount_in: Decimal, fee_bps: u32 },

    #[error("pool reserves are exhausted")]
    EmptyReserves,

    #[error("output {requested_out} exceeds usable liquidity {available_out}")]
    InsufficientLiquidity {
        requested_out: Decimal,
        available_out: Decimal,
    },
}

/// Price `amount_in` against the snapshot.
///
/// Rounding contract: `effective_in` and `amount_out` round toward zero
/// at the amount scale, so the implied fee (`amount_in - effective_in`)
/// rounds up and output never rounds in the trader's favor.
/// `max_drain_fraction` bounds how much of the output reserve one swap
/// may take; beyond it the trade would leave the pool unusable.
pub fn quote_swap(
    snapshot: &PoolSnapshot,
    side: Side,
    amount_in: Decimal,
    max_drain_fraction: Decimal,
) -> Result<QuoteResult, QuoteError> {
    if amount_in <= Decimal::ZERO {
        return Err(QuoteError::InvalidAmount(amount_in));
    }

    let (reserve_in, reserve_out) = snapshot.reserves_for(side);
    if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Err(QuoteError::EmptyReserves);
    }

    let fee_bps = snapshot.fee_bps;
    let keep = Decimal::from(BPS_DENOMINATOR - fee_bps);
    let effective_in = round_amount(amount_in * keep / Decimal::from(BPS_DENOMINATOR));
    if effective_in <= Decimal::ZERO {
        return Err(QuoteError::FeeConsumesInput { amount_in, fee_bps });
    }
    let fee_amount = amount_in - effective_in;

    // x*y=k: out = reserve_out * dx / (reserve_in + dx)
    let denominator = reserve_in + effective_in;
    let amount_out = round_amount(reserve_out * effective_in / denominator);

    let usable = reserve_out * max_drain_fraction;
    if amount_out > usable {
        return Err(QuoteError::InsufficientLiquidity {
            requested_out: amount_out,
            available_out: usable,
        });
    }

    let execution_price = round_amount(amount_out / amount_in);

    // spot before vs spot after, in bps of the pre-trade spot
    let spot_before = reserve_out / reserve_in;
    let spot_after = (reserve_out - amount_out) / (reserve_in + effective_in);
    let price_impact_bps = ((spot_before - spot_after) / spot_before * dec!(10000))
        .round_dp_with_strategy(4, rust_decimal::RoundingStrategy::ToZero);

    Ok(QuoteResult {
        amount_out,
        fee_bps,
        fee_amount,
        effective_in,
        execution_price,
        price_impact_bps,
    })
}

/// Spot price of the output token per input token, fee ignored.
pub fn spot_price(snapshot: &PoolSnapshot, side: Side) -> Option<Decimal> {
    let (reserve_in, reserve_out) = snapshot.reserves_for(side);
    if reserve_in <= Decimal::ZERO {
        return None;
    }
    Some(reserve_out / reserve_in)
}

/// Fraction of input kept after the fee, as a decimal (30 bps -> 0.997).
pub fn fee_keep_fraction(fee_bps: u32) -> Decimal {
    Decimal::ONE - bps_fraction(fee_bps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Pool, PoolConfig};
    use crate::types::{PoolId, Stage, Timestamp, TokenId};

    fn snapshot() -> PoolSnapshot {
        let config = PoolConfig {
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
        };
        Pool::new(PoolId(1), config, Timestamp::from_millis(0)).snapshot()
    }

    #[test]
    fn quote_small_trade() {
        let q = quote_swap(&snapshot(), Side::AtoB, dec!(1), dec!(0.9)).unwrap();
        assert_eq!(q.fee_bps, 30);
        assert_eq!(q.effective_in, dec!(0.9970));
        assert_eq!(q.fee_amount, dec!(0.0030));

        let expected = round_amount(dec!(65000000) * dec!(0.997) / dec!(1000.997));
        assert_eq!(q.amount_out, expected);
        assert!(q.amount_out < dec!(65000000));
        assert_eq!(q.execution_price, q.amount_out); // amount_in = 1
    }

    #[test]
    fn quote_is_pure_and_deterministic() {
        let snap = snapshot();
        let a = quote_swap(&snap, Side::BtoA, dec!(12345.678), dec!(0.9)).unwrap();
        let b = quote_swap(&snap, Side::BtoA, dec!(12345.678), dec!(0.9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(snap, snapshot()); // untouched
    }

    #[test]
    fn rejects_non_positive_input() {
        assert!(matches!(
            quote_swap(&snapshot(), Side::AtoB, Decimal::ZERO, dec!(0.9)),
            Err(QuoteError::InvalidAmount(_))
        ));
        assert!(matches!(
            quote_swap(&snapshot(), Side::AtoB, dec!(-5), dec!(0.9)),
            Err(QuoteError::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_pool_drain() {
        // an input this large would claim nearly the whole output reserve
        let res = quote_swap(&snapshot(), Side::AtoB, dec!(100000000), dec!(0.9));
        assert!(matches!(
            res,
            Err(QuoteError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn fee_and_effective_in_reassemble() {
        let q = quote_swap(&snapshot(), Side::AtoB, dec!(7.531), dec!(0.9)).unwrap();
        assert_eq!(q.effective_in + q.fee_amount, dec!(7.531));
        assert!(q.fee_amount >= Decimal::ZERO);
    }

    #[test]
    fn price_impact_grows_with_size() {
        let small = quote_swap(&snapshot(), Side::AtoB, dec!(1), dec!(0.9)).unwrap();
        let large = quote_swap(&snapshot(), Side::AtoB, dec!(100), dec!(0.9)).unwrap();
        assert!(large.price_impact_bps > small.price_impact_bps);
        assert!(small.price_impact_bps >= Decimal::ZERO);
    }

    #[test]
    fn stage_lowers_fee_in_quote() {
        let mut snap = snapshot();
        snap.stage = Stage::new(3).unwrap();
        snap.fee_bps = 7; // floor(30 / 4), kept in sync by Pool::snapshot
        let q = quote_swap(&snap, Side::AtoB, dec!(1), dec!(0.9)).unwrap();
        assert_eq!(q.fee_bps, 7);
        assert_eq!(q.effective_in, dec!(0.9993));
    }
}
