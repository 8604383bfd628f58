// 10.0.2: caller-facing error taxonomy. every failure carries a stable
// machine-readable kind plus a human-readable message; rendering is the
// caller's job.

use crate::audit::AuditError;
use crate::ledger::LedgerError;
use crate::pool::PoolError;
use crate::quote::QuoteError;
use crate::types::PoolId;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pool {0:?} not found")]
    PoolNotFound(PoolId),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("insufficient liquidity: requested {requested_out} of usable {available_out}")]
    InsufficientLiquidity {
        requested_out: Decimal,
        available_out: Decimal,
    },

    #[error("pool {0:?} is busy, commit lock not acquired in time")]
    ConcurrencyConflict(PoolId),

    #[error("persistence failure: {0}")]
    Persistence(#[from] AuditError),
}

impl SwapError {
    /// Stable machine-readable kind for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::InvalidInput(_) => "invalid_input",
            SwapError::PoolNotFound(_) => "pool_not_found",
            SwapError::InsufficientBalance { .. } => "insufficient_balance",
            SwapError::InsufficientLiquidity { .. } => "insufficient_liquidity",
            SwapError::ConcurrencyConflict(_) => "concurrency_conflict",
            SwapError::Persistence(_) => "internal_persistence_error",
        }
    }

    /// Only concurrency conflicts are worth retrying; validation failures
    /// will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::ConcurrencyConflict(_))
    }
}

impl From<QuoteError> for SwapError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::InvalidAmount(_) | QuoteError::FeeConsumesInput { .. } => {
                SwapError::InvalidInput(err.to_string())
            }
            QuoteError::EmptyReserves => SwapError::InsufficientLiquidity {
                requested_out: Decimal::ZERO,
                available_out: Decimal::ZERO,
            },
            QuoteError::InsufficientLiquidity {
                requested_out,
                available_out,
            } => SwapError::InsufficientLiquidity {
                requested_out,
                available_out,
            },
        }
    }
}

impl From<LedgerError> for SwapError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                requested,
                available,
            } => SwapError::InsufficientBalance {
                requested,
                available,
            },
            LedgerError::InvalidAmount(_) => SwapError::InvalidInput(err.to_string()),
        }
    }
}

impl From<PoolError> for SwapError {
    fn from(err: PoolError) -> Self {
        SwapError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            SwapError::InvalidInput("x".into()).kind(),
            "invalid_input"
        );
        assert_eq!(
            SwapError::ConcurrencyConflict(PoolId(1)).kind(),
            "concurrency_conflict"
        );
        assert_eq!(
            SwapError::InsufficientBalance {
                requested: dec!(1),
                available: dec!(0)
            }
            .kind(),
            "insufficient_balance"
        );
    }

    #[test]
    fn only_conflicts_retry() {
        assert!(SwapError::ConcurrencyConflict(PoolId(1)).is_retryable());
        assert!(!SwapError::PoolNotFound(PoolId(1)).is_retryable());
        assert!(!SwapError::InsufficientLiquidity {
            requested_out: dec!(1),
            available_out: dec!(0)
        }
        .is_retryable());
    }
}
