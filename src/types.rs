// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, swap side, stage, timestamps. each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BurnEventId(pub u64);

// 1.1: swap direction. AtoB sells token_a into the pool, BtoA sells token_b.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    AtoB,
    BtoA,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::AtoB => Side::BtoA,
            Side::BtoA => Side::AtoB,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::AtoB => write!(f, "AtoB"),
            Side::BtoA => write!(f, "BtoA"),
        }
    }
}

// 1.2: pool lifecycle stage. 1 through 4, monotonically non-decreasing,
// stage 4 is terminal. each stage halves the base fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stage(u8);

pub const MAX_STAGE: u8 = 4;

impl Stage {
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        if (1..=MAX_STAGE).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn initial() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_terminal(&self) -> bool {
        self.0 == MAX_STAGE
    }

    pub fn next(&self) -> Option<Self> {
        if self.is_terminal() {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    // fee divisor for the halving schedule: 2^(stage-1)
    pub fn fee_divisor(&self) -> u32 {
        1u32 << (self.0 - 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: fixed-point scale for token amounts. 18 fractional digits, always
// rounded toward zero so amount_out and effective_in never round in the
// trader's favor.
pub const AMOUNT_SCALE: u32 = 18;

pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, rust_decimal::RoundingStrategy::ToZero)
}

// 1.4: basis points. 100 bps = 1%. fee fields are bounded to [0, 10000].
pub const BPS_DENOMINATOR: u32 = 10_000;

pub fn bps_fraction(bps: u32) -> Decimal {
    Decimal::from(bps) / dec!(10000)
}

// 1.5: millisecond timestamp. the engine keeps an explicit logical clock
// so replays are deterministic; `now` exists for callers that want wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_bounds() {
        assert!(Stage::new(0).is_none());
        assert!(Stage::new(5).is_none());
        assert_eq!(Stage::new(1), Some(Stage::initial()));
        assert!(Stage::new(4).unwrap().is_terminal());
        assert!(Stage::new(4).unwrap().next().is_none());
        assert_eq!(Stage::new(2).unwrap().next(), Some(Stage::new(3).unwrap()));
    }

    #[test]
    fn fee_divisor_doubles_per_stage() {
        assert_eq!(Stage::new(1).unwrap().fee_divisor(), 1);
        assert_eq!(Stage::new(2).unwrap().fee_divisor(), 2);
        assert_eq!(Stage::new(3).unwrap().fee_divisor(), 4);
        assert_eq!(Stage::new(4).unwrap().fee_divisor(), 8);
    }

    #[test]
    fn round_amount_truncates() {
        let v = Decimal::from_str_exact("1.0000000000000000019").unwrap();
        assert_eq!(
            round_amount(v),
            Decimal::from_str_exact("1.000000000000000001").unwrap()
        );
        let neg = Decimal::from_str_exact("-0.0000000000000000019").unwrap();
        assert_eq!(
            round_amount(neg),
            Decimal::from_str_exact("-0.000000000000000001").unwrap()
        );
    }

    #[test]
    fn bps_conversion() {
        assert_eq!(bps_fraction(100), dec!(0.01));
        assert_eq!(bps_fraction(30), dec!(0.003));
    }
}
