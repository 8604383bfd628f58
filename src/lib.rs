// swap-core: virtual-pool AMM swap engine.
// pricing-first architecture: the constant-product math and the swap
// commit boundary take priority. all computation is deterministic
// fixed-point with an explicit logical clock and no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: PoolId, UserId, TokenId, Side, Stage
//   2.x  pool.rs: Pool entity, fee halving schedule, virtual reserves
//   3.x  quote.rs: constant-product pricing, rounding contract
//   4.x  stage.rs: volume-gated stage FSM, burn instructions
//   5.x  ledger.rs: per-(user, token) balance store
//   6.x  audit.rs: append-only Trade/BurnEvent journal
//   7.x  registry.rs: pool ownership + per-pool commit locks
//   8.x  events.rs: state transition events for listeners
//   9.x  payments.rs: settlement collaborator (idempotent tickets)
//   10.x engine/: swap orchestration: config, core, swaps, results

// core swap modules
pub mod audit;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod pool;
pub mod quote;
pub mod registry;
pub mod stage;
pub mod types;

// integration modules
pub mod payments;

// re exports for convenience
pub use audit::{AuditError, AuditLog, BurnEvent, Trade};
pub use engine::{EngineConfig, SwapEngine, SwapError};
pub use events::{Event, EventBuffer, EventId, EventPayload};
pub use ledger::{BalanceLedger, LedgerError, TokenBalance};
pub use pool::{Pool, PoolConfig, PoolError, PoolSnapshot};
pub use quote::{quote_swap, QuoteError, QuoteResult};
pub use registry::PoolRegistry;
pub use stage::StageTransition;
pub use types::*;
pub use payments::{
    DepositTicket, PaymentError, PaymentProcessor, PaymentProvider, ProviderStatus,
    TransferStatus, WithdrawalTicket,
};
