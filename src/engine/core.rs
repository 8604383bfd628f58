// 10.1 engine/core.rs: shared state and the administrative surface.
// every method takes &self; the engine is shared across threads as-is.

use super::config::EngineConfig;
use super::results::SwapError;
use crate::audit::{AuditLog, BurnEvent};
use crate::events::{
    BurnRecordedEvent, Event, EventBuffer, EventPayload, PoolCreatedEvent, ReservesAdjustedEvent,
};
use crate::ledger::{BalanceLedger, TokenBalance};
use crate::pool::{PoolConfig, PoolSnapshot};
use crate::quote::{quote_swap, QuoteResult};
use crate::registry::PoolRegistry;
use crate::types::{BurnEventId, PoolId, Side, Stage, Timestamp, TokenId, TradeId, UserId};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct SwapEngine {
    pub(super) config: EngineConfig,
    pub(super) pools: PoolRegistry,
    pub(super) ledger: Arc<BalanceLedger>,
    pub(super) audit: AuditLog,
    pub(super) events: Arc<EventBuffer>,
    pub(super) next_trade_id: AtomicU64,
    pub(super) next_burn_id: AtomicU64,
    // logical clock in millis; swaps and events are stamped from here so
    // replays are deterministic
    pub(super) current_time: AtomicI64,
}

impl SwapEngine {
    pub fn new(config: EngineConfig) -> Self {
        let audit = AuditLog::new(config.audit_capacity);
        let events = Arc::new(EventBuffer::new(config.max_events));
        Self {
            config,
            pools: PoolRegistry::new(),
            ledger: Arc::new(BalanceLedger::new()),
            audit,
            events,
            next_trade_id: AtomicU64::new(1),
            next_burn_id: AtomicU64::new(1),
            current_time: AtomicI64::new(0),
        }
    }

    pub fn set_time(&self, timestamp: Timestamp) {
        self.current_time
            .store(timestamp.as_millis(), Ordering::Relaxed);
    }

    pub fn advance_time(&self, millis: i64) {
        self.current_time.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn time(&self) -> Timestamp {
        Timestamp::from_millis(self.current_time.load(Ordering::Relaxed))
    }

    /// Administrative: register a new pool. Reserves, fee and thresholds
    /// are validated before anything is stored.
    pub fn create_pool(&self, config: PoolConfig) -> Result<PoolSnapshot, SwapError> {
        let snapshot = self.pools.insert(config, self.time())?;
        info!(
            pool_id = snapshot.id.0,
            reserve_a = %snapshot.reserve_a,
            reserve_b = %snapshot.reserve_b,
            fee_bps_base = snapshot.fee_bps_base,
            "pool created"
        );
        self.emit_event(EventPayload::PoolCreated(PoolCreatedEvent {
            pool_id: snapshot.id,
            token_a: snapshot.token_a,
            token_b: snapshot.token_b,
            reserve_a: snapshot.reserve_a,
            reserve_b: snapshot.reserve_b,
            fee_bps_base: snapshot.fee_bps_base,
        }));
        Ok(snapshot)
    }

    /// Most recent committed state of a pool.
    pub fn get_pool(&self, pool_id: PoolId) -> Result<PoolSnapshot, SwapError> {
        self.pools
            .snapshot(pool_id)
            .ok_or(SwapError::PoolNotFound(pool_id))
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.ids()
    }

    /// Read-only price quote. No balance check, no mutation; the result
    /// is advisory and may be stale relative to an in-flight swap.
    pub fn quote(
        &self,
        pool_id: PoolId,
        side: Side,
        amount_in: Decimal,
    ) -> Result<QuoteResult, SwapError> {
        let snapshot = self.get_pool(pool_id)?;
        Ok(quote_swap(
            &snapshot,
            side,
            amount_in,
            self.config.max_drain_fraction,
        )?)
    }

    pub fn list_balances(&self, user_id: UserId) -> Vec<TokenBalance> {
        self.ledger.list_balances(user_id)
    }

    /// Administrative reserve adjustment. Takes the same commit lock as a
    /// swap; both reserves must stay strictly positive.
    pub fn adjust_reserves(
        &self,
        pool_id: PoolId,
        delta_a: Decimal,
        delta_b: Decimal,
    ) -> Result<PoolSnapshot, SwapError> {
        let handle = self
            .pools
            .get(pool_id)
            .ok_or(SwapError::PoolNotFound(pool_id))?;
        let mut pool = handle
            .try_write_for(self.config.pool_lock_wait)
            .ok_or(SwapError::ConcurrencyConflict(pool_id))?;
        pool.adjust_reserves(delta_a, delta_b)?;
        let snapshot = pool.snapshot();
        drop(pool);

        self.emit_event(EventPayload::ReservesAdjusted(ReservesAdjustedEvent {
            pool_id,
            delta_a,
            delta_b,
            reserve_a: snapshot.reserve_a,
            reserve_b: snapshot.reserve_b,
        }));
        Ok(snapshot)
    }

    /// Administrative: journal a supply burn outside the swap path, such
    /// as a one-off correction. Swap-triggered burns never come through
    /// here; they persist atomically with their trade.
    pub fn record_burn(
        &self,
        pool_id: PoolId,
        stage: Stage,
        token_id: TokenId,
        amount: Decimal,
    ) -> Result<BurnEvent, SwapError> {
        if amount <= Decimal::ZERO {
            return Err(SwapError::InvalidInput(format!(
                "burn amount must be > 0, got {amount}"
            )));
        }
        if self.pools.get(pool_id).is_none() {
            return Err(SwapError::PoolNotFound(pool_id));
        }
        let burn = BurnEvent {
            id: self.next_burn_id(),
            pool_id,
            stage,
            token_id,
            amount,
            created_at: self.time(),
        };
        self.audit.record_burn(burn.clone())?;
        self.emit_event(EventPayload::BurnRecorded(BurnRecordedEvent {
            pool_id,
            stage,
            token_id,
            amount,
        }));
        Ok(burn)
    }

    pub fn ledger(&self) -> &Arc<BalanceLedger> {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Pool handles and commit locks. Exposed so tooling can pin a pool
    /// while inspecting it; holding a write guard stalls swaps.
    pub fn registry(&self) -> &PoolRegistry {
        &self.pools
    }

    /// Shared notification buffer; hand this to collaborators that
    /// publish into the same event stream.
    pub fn event_buffer(&self) -> &Arc<EventBuffer> {
        &self.events
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.all()
    }

    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        self.events.recent(count)
    }

    pub(super) fn next_trade_id(&self) -> TradeId {
        TradeId(self.next_trade_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(super) fn next_burn_id(&self) -> BurnEventId {
        BurnEventId(self.next_burn_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(super) fn emit_event(&self, payload: EventPayload) {
        self.events.emit(self.time(), payload);
    }
}
