// 6.0 audit.rs: the durable trail. every committed swap appends exactly
// one Trade plus zero or more BurnEvents, in one atomic step under a
// single lock. rows are immutable once written; there is no update or
// delete. a full journal is a persistence failure, never a silent drop
// (unlike the notification event buffer, which may drain old entries).

use crate::types::{BurnEventId, PoolId, Side, Stage, Timestamp, TokenId, TradeId, UserId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable record of one executed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub side: Side,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee_amount: Decimal,
    pub execution_price: Decimal,
    /// Pool stage after any transitions this swap itself triggered.
    pub stage_at_execution: Stage,
    pub created_at: Timestamp,
}

/// Immutable record of one supply burn, tied to the stage transition
/// that scheduled it. One per stage transition ever taken by a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnEvent {
    pub id: BurnEventId,
    pub pool_id: PoolId,
    pub stage: Stage,
    pub token_id: TokenId,
    pub amount: Decimal,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("audit log full: {entries} entries at capacity {capacity}")]
    Full { entries: usize, capacity: usize },
}

#[derive(Debug, Default)]
struct AuditInner {
    trades: Vec<Trade>,
    burns: Vec<BurnEvent>,
}

/// Append-only journal of trades and burns sharing one lock, so a swap's
/// rows either all persist or none do.
#[derive(Debug)]
pub struct AuditLog {
    inner: Mutex<AuditInner>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(AuditInner::default()),
            capacity,
        }
    }

    /// Persist one trade and its burn events atomically. Nothing is
    /// appended when the batch would exceed capacity.
    pub fn commit_swap(&self, trade: Trade, burns: Vec<BurnEvent>) -> Result<(), AuditError> {
        let mut inner = self.inner.lock();
        let entries = inner.trades.len() + inner.burns.len();
        if entries + 1 + burns.len() > self.capacity {
            return Err(AuditError::Full {
                entries,
                capacity: self.capacity,
            });
        }
        inner.trades.push(trade);
        inner.burns.extend(burns);
        Ok(())
    }

    /// Append a single burn event outside a swap commit.
    pub fn record_burn(&self, burn: BurnEvent) -> Result<(), AuditError> {
        let mut inner = self.inner.lock();
        let entries = inner.trades.len() + inner.burns.len();
        if entries + 1 > self.capacity {
            return Err(AuditError::Full {
                entries,
                capacity: self.capacity,
            });
        }
        inner.burns.push(burn);
        Ok(())
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.inner.lock().trades.clone()
    }

    pub fn burns(&self) -> Vec<BurnEvent> {
        self.inner.lock().burns.clone()
    }

    pub fn trades_for_user(&self, user_id: UserId) -> Vec<Trade> {
        self.inner
            .lock()
            .trades
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn burns_for_pool(&self, pool_id: PoolId) -> Vec<BurnEvent> {
        self.inner
            .lock()
            .burns
            .iter()
            .filter(|b| b.pool_id == pool_id)
            .cloned()
            .collect()
    }

    pub fn trade_count(&self) -> usize {
        self.inner.lock().trades.len()
    }

    pub fn burn_count(&self) -> usize {
        self.inner.lock().burns.len()
    }
}
