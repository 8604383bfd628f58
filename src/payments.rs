// 9.0 payments.rs: external settlement collaborator. deposits and
// withdrawals ride an idempotency-keyed ticket state machine
// (pending -> confirmed | failed) and touch the core only through
// BalanceLedger credits and debits. this domain has its own locking and
// never shares a lock with pool commit exclusion.

use crate::events::{
    DepositCreditedEvent, EventBuffer, EventPayload, WithdrawalRejectedEvent,
    WithdrawalSettledEvent,
};
use crate::ledger::{BalanceLedger, LedgerError};
use crate::types::{Timestamp, TokenId, UserId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-supplied idempotency key, typically the provider's payment hash.
pub type TxId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Confirmed,
    Failed,
    Expired,
}

/// What the upstream provider reports for a ticket during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Settled,
    Failed,
}

/// Provider lookup seam. The wire protocol behind it is out of scope;
/// tests plug in an in-memory fake.
pub trait PaymentProvider {
    fn deposit_status(&self, tx_id: &str) -> ProviderStatus;
    fn withdrawal_status(&self, tx_id: &str) -> ProviderStatus;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositTicket {
    pub tx_id: TxId,
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
    pub status: TransferStatus,
    /// Latch: the ledger is credited at most once per ticket, even if a
    /// confirmation is replayed.
    pub credited: bool,
    pub created_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalTicket {
    pub tx_id: TxId,
    pub user_id: UserId,
    pub token_id: TokenId,
    pub amount: Decimal,
    pub status: TransferStatus,
    pub created_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("unknown ticket {0}")]
    UnknownTicket(TxId),

    #[error("amount must be > 0, got {0}")]
    InvalidAmount(Decimal),

    #[error("ticket {tx_id} already settled as {status:?}")]
    AlreadySettled { tx_id: TxId, status: TransferStatus },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Pending deposits older than this age out to Expired during a
/// reconciliation sweep.
pub const DEFAULT_DEPOSIT_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Deposit/withdrawal processor. All methods take `&self`; each ticket
/// map has its own lock.
pub struct PaymentProcessor {
    ledger: Arc<BalanceLedger>,
    events: Option<Arc<EventBuffer>>,
    deposit_ttl_millis: i64,
    deposits: Mutex<HashMap<TxId, DepositTicket>>,
    withdrawals: Mutex<HashMap<TxId, WithdrawalTicket>>,
}

impl PaymentProcessor {
    pub fn new(ledger: Arc<BalanceLedger>) -> Self {
        Self {
            ledger,
            events: None,
            deposit_ttl_millis: DEFAULT_DEPOSIT_TTL_MILLIS,
            deposits: Mutex::new(HashMap::new()),
            withdrawals: Mutex::new(HashMap::new()),
        }
    }

    /// Publish settlement events into a shared buffer, typically the
    /// engine's via `SwapEngine::event_buffer`.
    pub fn with_events(mut self, events: Arc<EventBuffer>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_deposit_ttl(mut self, ttl_millis: i64) -> Self {
        self.deposit_ttl_millis = ttl_millis;
        self
    }

    fn emit(&self, now: Timestamp, payload: EventPayload) {
        if let Some(events) = &self.events {
            events.emit(now, payload);
        }
    }

    /// Register an incoming deposit. Idempotent: resubmitting a known key
    /// returns the existing ticket untouched.
    pub fn submit_deposit(
        &self,
        tx_id: TxId,
        user_id: UserId,
        token_id: TokenId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<DepositTicket, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(amount));
        }
        let mut deposits = self.deposits.lock();
        if let Some(existing) = deposits.get(&tx_id) {
            return Ok(existing.clone());
        }
        let ticket = DepositTicket {
            tx_id: tx_id.clone(),
            user_id,
            token_id,
            amount,
            status: TransferStatus::Pending,
            credited: false,
            created_at: now,
            settled_at: None,
        };
        deposits.insert(tx_id, ticket.clone());
        Ok(ticket)
    }

    /// Mark a deposit paid and credit the ledger. Replaying a confirmation
    /// is a no-op; the credit lands exactly once.
    pub fn confirm_deposit(&self, tx_id: &str, now: Timestamp) -> Result<DepositTicket, PaymentError> {
        let mut deposits = self.deposits.lock();
        let ticket = deposits
            .get_mut(tx_id)
            .ok_or_else(|| PaymentError::UnknownTicket(tx_id.to_string()))?;
        match ticket.status {
            TransferStatus::Pending => {
                ticket.status = TransferStatus::Confirmed;
                ticket.settled_at = Some(now);
            }
            TransferStatus::Confirmed => {}
            status => {
                return Err(PaymentError::AlreadySettled {
                    tx_id: tx_id.to_string(),
                    status,
                })
            }
        }
        if !ticket.credited {
            let new_balance = self
                .ledger
                .credit(ticket.user_id, ticket.token_id, ticket.amount)?;
            ticket.credited = true;
            info!(
                tx_id,
                user_id = ticket.user_id.0,
                amount = %ticket.amount,
                new_balance = %new_balance,
                "deposit credited"
            );
            self.emit(
                now,
                EventPayload::DepositCredited(DepositCreditedEvent {
                    user_id: ticket.user_id,
                    token_id: ticket.token_id,
                    amount: ticket.amount,
                    new_balance,
                }),
            );
        }
        Ok(ticket.clone())
    }

    /// Mark a deposit failed or aged out. Nothing was credited, so there
    /// is nothing to undo.
    pub fn fail_deposit(
        &self,
        tx_id: &str,
        status: TransferStatus,
        now: Timestamp,
    ) -> Result<DepositTicket, PaymentError> {
        debug_assert!(matches!(
            status,
            TransferStatus::Failed | TransferStatus::Expired
        ));
        let mut deposits = self.deposits.lock();
        let ticket = deposits
            .get_mut(tx_id)
            .ok_or_else(|| PaymentError::UnknownTicket(tx_id.to_string()))?;
        match ticket.status {
            TransferStatus::Pending => {
                ticket.status = status;
                ticket.settled_at = Some(now);
                Ok(ticket.clone())
            }
            current if current == status => Ok(ticket.clone()),
            current => Err(PaymentError::AlreadySettled {
                tx_id: tx_id.to_string(),
                status: current,
            }),
        }
    }

    /// Register an outgoing withdrawal and reserve the funds up front.
    /// Idempotent on the key; the debit happens only for a fresh ticket.
    pub fn submit_withdrawal(
        &self,
        tx_id: TxId,
        user_id: UserId,
        token_id: TokenId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<WithdrawalTicket, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(amount));
        }
        let mut withdrawals = self.withdrawals.lock();
        if let Some(existing) = withdrawals.get(&tx_id) {
            return Ok(existing.clone());
        }
        self.ledger.debit(user_id, token_id, amount)?;
        let ticket = WithdrawalTicket {
            tx_id: tx_id.clone(),
            user_id,
            token_id,
            amount,
            status: TransferStatus::Pending,
            created_at: now,
            settled_at: None,
        };
        withdrawals.insert(tx_id, ticket.clone());
        Ok(ticket)
    }

    /// Finalize a sent withdrawal. Funds were debited at submission.
    pub fn confirm_withdrawal(
        &self,
        tx_id: &str,
        now: Timestamp,
    ) -> Result<WithdrawalTicket, PaymentError> {
        let mut withdrawals = self.withdrawals.lock();
        let ticket = withdrawals
            .get_mut(tx_id)
            .ok_or_else(|| PaymentError::UnknownTicket(tx_id.to_string()))?;
        match ticket.status {
            TransferStatus::Pending => {
                ticket.status = TransferStatus::Confirmed;
                ticket.settled_at = Some(now);
                info!(tx_id, amount = %ticket.amount, "withdrawal confirmed");
                self.emit(
                    now,
                    EventPayload::WithdrawalSettled(WithdrawalSettledEvent {
                        user_id: ticket.user_id,
                        token_id: ticket.token_id,
                        amount: ticket.amount,
                    }),
                );
                Ok(ticket.clone())
            }
            TransferStatus::Confirmed => Ok(ticket.clone()),
            status => Err(PaymentError::AlreadySettled {
                tx_id: tx_id.to_string(),
                status,
            }),
        }
    }

    /// A withdrawal the provider could not complete: refund the reserved
    /// funds and close the ticket.
    pub fn fail_withdrawal(
        &self,
        tx_id: &str,
        now: Timestamp,
    ) -> Result<WithdrawalTicket, PaymentError> {
        let mut withdrawals = self.withdrawals.lock();
        let ticket = withdrawals
            .get_mut(tx_id)
            .ok_or_else(|| PaymentError::UnknownTicket(tx_id.to_string()))?;
        match ticket.status {
            TransferStatus::Pending => {
                self.ledger
                    .credit(ticket.user_id, ticket.token_id, ticket.amount)?;
                ticket.status = TransferStatus::Failed;
                ticket.settled_at = Some(now);
                warn!(tx_id, amount = %ticket.amount, "withdrawal failed, funds refunded");
                self.emit(
                    now,
                    EventPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                        user_id: ticket.user_id,
                        token_id: ticket.token_id,
                        amount: ticket.amount,
                        reason: "provider reported failure, funds refunded".to_string(),
                    }),
                );
                Ok(ticket.clone())
            }
            TransferStatus::Failed => Ok(ticket.clone()),
            status => Err(PaymentError::AlreadySettled {
                tx_id: tx_id.to_string(),
                status,
            }),
        }
    }

    /// One reconciliation sweep: poll the provider for every pending
    /// ticket and settle what it reports. Deposits the provider still
    /// reports pending age out to Expired once older than the configured
    /// TTL; withdrawals never expire, the funds already left the ledger.
    /// Returns the number of tickets settled. Callers schedule this
    /// explicitly; there is no background thread here.
    pub fn reconcile(&self, provider: &dyn PaymentProvider, now: Timestamp) -> usize {
        let pending_deposits: Vec<(TxId, Timestamp)> = {
            let deposits = self.deposits.lock();
            deposits
                .values()
                .filter(|t| t.status == TransferStatus::Pending)
                .map(|t| (t.tx_id.clone(), t.created_at))
                .collect()
        };
        let pending_withdrawals: Vec<TxId> = {
            let withdrawals = self.withdrawals.lock();
            withdrawals
                .values()
                .filter(|t| t.status == TransferStatus::Pending)
                .map(|t| t.tx_id.clone())
                .collect()
        };

        let mut settled = 0;
        for (tx_id, created_at) in pending_deposits {
            match provider.deposit_status(&tx_id) {
                ProviderStatus::Settled => {
                    if self.confirm_deposit(&tx_id, now).is_ok() {
                        settled += 1;
                    }
                }
                ProviderStatus::Failed => {
                    if self.fail_deposit(&tx_id, TransferStatus::Failed, now).is_ok() {
                        settled += 1;
                    }
                }
                ProviderStatus::Pending => {
                    let age = now.as_millis() - created_at.as_millis();
                    if age >= self.deposit_ttl_millis
                        && self.fail_deposit(&tx_id, TransferStatus::Expired, now).is_ok()
                    {
                        warn!(%tx_id, age_millis = age, "pending deposit aged out");
                        settled += 1;
                    }
                }
            }
        }
        for tx_id in pending_withdrawals {
            match provider.withdrawal_status(&tx_id) {
                ProviderStatus::Settled => {
                    if self.confirm_withdrawal(&tx_id, now).is_ok() {
                        settled += 1;
                    }
                }
                ProviderStatus::Failed => {
                    if self.fail_withdrawal(&tx_id, now).is_ok() {
                        settled += 1;
                    }
                }
                ProviderStatus::Pending => {}
            }
        }
        settled
    }

    pub fn deposit(&self, tx_id: &str) -> Option<DepositTicket> {
        self.deposits.lock().get(tx_id).cloned()
    }

    pub fn withdrawal(&self, tx_id: &str) -> Option<WithdrawalTicket> {
        self.withdrawals.lock().get(tx_id).cloned()
    }

    pub fn pending_deposits(&self) -> usize {
        self.deposits
            .lock()
            .values()
            .filter(|t| t.status == TransferStatus::Pending)
            .count()
    }

    pub fn pending_withdrawals(&self) -> usize {
        self.withdrawals
            .lock()
            .values()
            .filter(|t| t.status == TransferStatus::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn processor() -> (Arc<BalanceLedger>, PaymentProcessor) {
        let ledger = Arc::new(BalanceLedger::new());
        let processor = PaymentProcessor::new(Arc::clone(&ledger));
        (ledger, processor)
    }

    fn t0() -> Timestamp {
        Timestamp::from_millis(0)
    }

    #[test]
    fn deposit_credits_exactly_once() {
        let (ledger, p) = processor();
        p.submit_deposit("inv-1".into(), UserId(1), TokenId(1), dec!(500), t0())
            .unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(0));

        p.confirm_deposit("inv-1", t0()).unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(500));

        // replayed confirmation does not double-credit
        let ticket = p.confirm_deposit("inv-1", t0()).unwrap();
        assert_eq!(ticket.status, TransferStatus::Confirmed);
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(500));
    }

    #[test]
    fn deposit_submission_is_idempotent() {
        let (_, p) = processor();
        let a = p
            .submit_deposit("inv-1".into(), UserId(1), TokenId(1), dec!(500), t0())
            .unwrap();
        // same key with a different amount returns the original ticket
        let b = p
            .submit_deposit("inv-1".into(), UserId(1), TokenId(1), dec!(900), t0())
            .unwrap();
        assert_eq!(a.amount, b.amount);
        assert_eq!(p.pending_deposits(), 1);
    }

    #[test]
    fn withdrawal_reserves_then_refunds_on_failure() {
        let (ledger, p) = processor();
        ledger.credit(UserId(1), TokenId(1), dec!(100)).unwrap();

        p.submit_withdrawal("wd-1".into(), UserId(1), TokenId(1), dec!(60), t0())
            .unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(40));

        p.fail_withdrawal("wd-1", t0()).unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(100));

        // failing again stays settled and does not refund twice
        p.fail_withdrawal("wd-1", t0()).unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(100));
    }

    #[test]
    fn withdrawal_rejected_on_insufficient_balance() {
        let (ledger, p) = processor();
        ledger.credit(UserId(1), TokenId(1), dec!(10)).unwrap();
        let err = p.submit_withdrawal("wd-1".into(), UserId(1), TokenId(1), dec!(60), t0());
        assert!(matches!(err, Err(PaymentError::Ledger(_))));
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(10));
        assert!(p.withdrawal("wd-1").is_none());
    }

    struct FakeProvider {
        paid: Vec<&'static str>,
        failed: Vec<&'static str>,
    }

    impl PaymentProvider for FakeProvider {
        fn deposit_status(&self, tx_id: &str) -> ProviderStatus {
            if self.paid.contains(&tx_id) {
                ProviderStatus::Settled
            } else if self.failed.contains(&tx_id) {
                ProviderStatus::Failed
            } else {
                ProviderStatus::Pending
            }
        }

        fn withdrawal_status(&self, tx_id: &str) -> ProviderStatus {
            self.deposit_status(tx_id)
        }
    }

    #[test]
    fn reconcile_settles_what_the_provider_reports() {
        let (ledger, p) = processor();
        p.submit_deposit("inv-1".into(), UserId(1), TokenId(1), dec!(100), t0())
            .unwrap();
        p.submit_deposit("inv-2".into(), UserId(1), TokenId(1), dec!(200), t0())
            .unwrap();
        p.submit_deposit("inv-3".into(), UserId(1), TokenId(1), dec!(300), t0())
            .unwrap();

        let provider = FakeProvider {
            paid: vec!["inv-1"],
            failed: vec!["inv-2"],
        };
        let settled = p.reconcile(&provider, t0());
        assert_eq!(settled, 2);
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(100));
        assert_eq!(p.deposit("inv-2").unwrap().status, TransferStatus::Failed);
        assert_eq!(p.deposit("inv-3").unwrap().status, TransferStatus::Pending);
        assert_eq!(p.pending_deposits(), 1);
    }

    #[test]
    fn reconcile_expires_stale_pending_deposits() {
        let (ledger, p) = processor();
        let p = p.with_deposit_ttl(1_000);
        p.submit_deposit("inv-old".into(), UserId(1), TokenId(1), dec!(100), t0())
            .unwrap();
        p.submit_deposit(
            "inv-new".into(),
            UserId(1),
            TokenId(1),
            dec!(200),
            Timestamp::from_millis(900),
        )
        .unwrap();

        let provider = FakeProvider {
            paid: vec![],
            failed: vec![],
        };
        // at t=1500 only the older ticket has crossed the ttl
        let settled = p.reconcile(&provider, Timestamp::from_millis(1_500));
        assert_eq!(settled, 1);
        assert_eq!(p.deposit("inv-old").unwrap().status, TransferStatus::Expired);
        assert_eq!(p.deposit("inv-new").unwrap().status, TransferStatus::Pending);
        // nothing was ever credited
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(0));

        // an expired ticket cannot be confirmed later
        let err = p.confirm_deposit("inv-old", Timestamp::from_millis(2_000));
        assert!(matches!(err, Err(PaymentError::AlreadySettled { .. })));
    }

    #[test]
    fn settlement_publishes_events() {
        use crate::events::{EventBuffer, EventPayload};

        let (ledger, p) = processor();
        let buffer = Arc::new(EventBuffer::new(100));
        let p = p.with_events(Arc::clone(&buffer));

        p.submit_deposit("inv-1".into(), UserId(1), TokenId(1), dec!(500), t0())
            .unwrap();
        p.confirm_deposit("inv-1", t0()).unwrap();
        // replay credits nothing, so no second event
        p.confirm_deposit("inv-1", t0()).unwrap();

        p.submit_withdrawal("wd-1".into(), UserId(1), TokenId(1), dec!(200), t0())
            .unwrap();
        p.confirm_withdrawal("wd-1", t0()).unwrap();

        p.submit_withdrawal("wd-2".into(), UserId(1), TokenId(1), dec!(100), t0())
            .unwrap();
        p.fail_withdrawal("wd-2", t0()).unwrap();
        assert_eq!(ledger.balance(UserId(1), TokenId(1)), dec!(300));

        let events = buffer.all();
        assert_eq!(events.len(), 3);
        match &events[0].payload {
            EventPayload::DepositCredited(e) => {
                assert_eq!(e.amount, dec!(500));
                assert_eq!(e.new_balance, dec!(500));
            }
            other => panic!("expected DepositCredited, got {other:?}"),
        }
        assert!(matches!(
            events[1].payload,
            EventPayload::WithdrawalSettled(_)
        ));
        match &events[2].payload {
            EventPayload::WithdrawalRejected(e) => assert_eq!(e.amount, dec!(100)),
            other => panic!("expected WithdrawalRejected, got {other:?}"),
        }
    }
}
