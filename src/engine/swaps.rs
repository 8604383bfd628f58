// 10.2 engine/swaps.rs: the transactional swap path. quote, debit, stage
// the pool mutation on a scratch copy, persist, credit, then and only
// then publish the new pool state. the shared pool is assigned after
// every fallible step has succeeded, so no partially-applied swap is
// ever observable; the one mutation applied early (the debit) is
// refunded on abort.

use super::core::SwapEngine;
use super::results::SwapError;
use crate::audit::{BurnEvent, Trade};
use crate::events::{
    BurnRecordedEvent, EventPayload, StageAdvancedEvent, SwapExecutedEvent,
};
use crate::quote::quote_swap;
use crate::stage;
use crate::types::{PoolId, Side, UserId};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

impl SwapEngine {
    /// Execute a swap as a single atomic unit.
    ///
    /// Concurrency conflicts (the pool's commit lock not acquired within
    /// the configured wait) are retried internally with a fresh re-quote,
    /// a bounded number of times. Validation failures never retry.
    pub fn swap(
        &self,
        pool_id: PoolId,
        user_id: UserId,
        side: Side,
        amount_in: Decimal,
    ) -> Result<Trade, SwapError> {
        if amount_in <= Decimal::ZERO {
            return Err(SwapError::InvalidInput(format!(
                "amount_in must be > 0, got {amount_in}"
            )));
        }

        let mut attempt = 0;
        loop {
            match self.try_swap_once(pool_id, user_id, side, amount_in) {
                Err(err) if err.is_retryable() && attempt < self.config.max_swap_retries => {
                    attempt += 1;
                    debug!(
                        pool_id = pool_id.0,
                        attempt,
                        "commit lock contended, retrying with fresh quote"
                    );
                }
                result => return result,
            }
        }
    }

    fn try_swap_once(
        &self,
        pool_id: PoolId,
        user_id: UserId,
        side: Side,
        amount_in: Decimal,
    ) -> Result<Trade, SwapError> {
        let handle = self
            .pools
            .get(pool_id)
            .ok_or(SwapError::PoolNotFound(pool_id))?;
        let mut pool = handle
            .try_write_for(self.config.pool_lock_wait)
            .ok_or(SwapError::ConcurrencyConflict(pool_id))?;

        // re-quote against the freshly locked state; any earlier quote the
        // caller held was advisory
        let locked_state = pool.snapshot();
        let quote = quote_swap(
            &locked_state,
            side,
            amount_in,
            self.config.max_drain_fraction,
        )?;

        let (token_in, token_out) = pool.tokens_for(side);

        // first real mutation: reserve the input. aborting after this
        // point must refund it.
        self.ledger.debit(user_id, token_in, amount_in)?;

        // stage everything else on a scratch copy
        let mut staged = pool.clone();
        staged.apply_swap(side, &quote);

        // volume is denominated in token_a: the input for AtoB, the
        // output for BtoA
        let added_volume = match side {
            Side::AtoB => amount_in,
            Side::BtoA => quote.amount_out,
        };
        let transitions = stage::advance(&mut staged, added_volume);

        let now = self.time();
        let burns: Vec<BurnEvent> = transitions
            .iter()
            .map(|t| BurnEvent {
                id: self.next_burn_id(),
                pool_id,
                stage: t.new_stage,
                token_id: staged.config.burn_token_id,
                amount: t.burn_amount,
                created_at: now,
            })
            .collect();

        let trade = Trade {
            id: self.next_trade_id(),
            pool_id,
            user_id,
            side,
            amount_in,
            amount_out: quote.amount_out,
            fee_amount: quote.fee_amount,
            execution_price: quote.execution_price,
            stage_at_execution: staged.stage,
            created_at: now,
        };

        if let Err(err) = self.audit.commit_swap(trade.clone(), burns.clone()) {
            // the pool is untouched; refund the debit and abort. the
            // refund cannot fail for a positive amount, but a lost refund
            // must never pass silently.
            let refund = self.ledger.credit(user_id, token_in, amount_in);
            debug_assert!(refund.is_ok(), "refund of a validated debit failed");
            if let Err(refund_err) = refund {
                error!(
                    pool_id = pool_id.0,
                    user_id = user_id.0,
                    amount = %amount_in,
                    %refund_err,
                    "refund failed during swap rollback"
                );
            }
            warn!(
                pool_id = pool_id.0,
                trade_id = trade.id.0,
                %err,
                "audit commit failed, swap rolled back"
            );
            return Err(SwapError::Persistence(err));
        }

        // amount_out is non-negative by construction, so this cannot fail
        self.ledger.credit(user_id, token_out, quote.amount_out)?;

        // publish: the staged state becomes the committed pool
        let previous_stage = locked_state.stage;
        let cumulative_volume = staged.cumulative_volume;
        *pool = staged;
        drop(pool);

        let mut from_stage = previous_stage;
        for (transition, burn) in transitions.iter().zip(&burns) {
            self.emit_event(EventPayload::StageAdvanced(StageAdvancedEvent {
                pool_id,
                from_stage,
                to_stage: transition.new_stage,
                cumulative_volume,
            }));
            self.emit_event(EventPayload::BurnRecorded(BurnRecordedEvent {
                pool_id,
                stage: burn.stage,
                token_id: burn.token_id,
                amount: burn.amount,
            }));
            from_stage = transition.new_stage;
        }
        self.emit_event(EventPayload::SwapExecuted(SwapExecutedEvent {
            pool_id,
            trade_id: trade.id,
            user_id,
            side,
            amount_in,
            amount_out: quote.amount_out,
            fee_amount: quote.fee_amount,
            stage: trade.stage_at_execution,
        }));

        info!(
            pool_id = pool_id.0,
            trade_id = trade.id.0,
            user_id = user_id.0,
            %side,
            amount_in = %amount_in,
            amount_out = %quote.amount_out,
            stage = trade.stage_at_execution.value(),
            transitions = transitions.len(),
            "swap committed"
        );

        Ok(trade)
    }
}
