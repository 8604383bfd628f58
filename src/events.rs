// 8.0 events.rs: state transition events for notification and inspection.
// the buffer is bounded and drains its oldest entries; the audit log in
// audit.rs is the durable trail, these are for listeners.

use crate::types::{PoolId, Side, Stage, Timestamp, TokenId, TradeId, UserId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Pool lifecycle
    PoolCreated(PoolCreatedEvent),
    ReservesAdjusted(ReservesAdjustedEvent),

    // Swap path
    SwapExecuted(SwapExecutedEvent),
    StageAdvanced(StageAdvancedEvent),
    BurnRecorded(BurnRecordedEvent),

    // Payment collaborator
    DepositCredited(DepositCreditedEvent),
    WithdrawalSettled(WithdrawalSettledEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),
}

/// Bounded in-memory event buffer. One instance is shared between the
/// engine and any collaborators that publish events; ids are allocated
/// here so the stream stays totally ordered across publishers.
#[derive(Debug)]
pub struct EventBuffer {
    inner: Mutex<Vec<Event>>,
    next_id: AtomicU64,
    max_events: usize,
}

impl EventBuffer {
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            max_events,
        }
    }

    /// Append an event, draining the oldest entries past the bound.
    pub fn emit(&self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut events = self.inner.lock();
        events.push(Event::new(id, timestamp, payload));
        if events.len() > self.max_events {
            let drain_count = events.len() - self.max_events;
            events.drain(0..drain_count);
        }
        id
    }

    pub fn all(&self) -> Vec<Event> {
        self.inner.lock().clone()
    }

    pub fn recent(&self, count: usize) -> Vec<Event> {
        let events = self.inner.lock();
        let start = events.len().saturating_sub(count);
        events[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCreatedEvent {
    pub pool_id: PoolId,
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub fee_bps_base: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservesAdjustedEvent {
    pub pool_id: PoolId,
    pub delta_a: Decimal,
    pub delta_b: Decimal,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapExecutedEvent {
    pub pool_id: PoolId,
    pub trade_id: TradeId,
    pub user_id: UserId,
    pub side: Side,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee_amount: Decimal,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAdvancedEvent {
    pub pool_id: PoolId,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub cumulative_volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnRecordedEvent {
    pub pool_id: PoolId,
    pub stage: Stage,
    pub token_id: TokenId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCreditedEvent {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalSettledEvent {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
    pub reason: String,
}
