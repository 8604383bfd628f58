// 5.0 ledger.rs: per-user, per-token balances. debit is an atomic
// check-and-subtract, credit an atomic add. the sharded map serializes
// access per (user, token) key only; unrelated keys never contend and
// there is no global lock.

use crate::types::{TokenId, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// External read view of one balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("amount must be non-negative, got {0}")]
    InvalidAmount(Decimal),
}

/// Balance store. Rows are created lazily on first credit; a balance is
/// never negative.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: DashMap<(UserId, TokenId), Decimal>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    /// Atomic check-and-subtract. Fails without mutation when the current
    /// balance is below `amount`. Returns the new balance.
    pub fn debit(
        &self,
        user_id: UserId,
        token_id: TokenId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        match self.balances.entry((user_id, token_id)) {
            Entry::Occupied(mut row) => {
                let current = *row.get();
                if current < amount {
                    return Err(LedgerError::InsufficientBalance {
                        requested: amount,
                        available: current,
                    });
                }
                let updated = current - amount;
                *row.get_mut() = updated;
                Ok(updated)
            }
            Entry::Vacant(_) => Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: Decimal::ZERO,
            }),
        }
    }

    /// Atomic add. Creates the row when absent. Returns the new balance.
    pub fn credit(
        &self,
        user_id: UserId,
        token_id: TokenId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut row = self
            .balances
            .entry((user_id, token_id))
            .or_insert(Decimal::ZERO);
        *row += amount;
        Ok(*row)
    }

    pub fn balance(&self, user_id: UserId, token_id: TokenId) -> Decimal {
        self.balances
            .get(&(user_id, token_id))
            .map(|row| *row)
            .unwrap_or(Decimal::ZERO)
    }

    /// All balance rows for one user, ordered by token id.
    pub fn list_balances(&self, user_id: UserId) -> Vec<TokenBalance> {
        let mut rows: Vec<TokenBalance> = self
            .balances
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| TokenBalance {
                user_id,
                token_id: entry.key().1,
                amount: *entry.value(),
            })
            .collect();
        rows.sort_by_key(|row| row.token_id);
        rows
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
