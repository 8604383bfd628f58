// 10.0.1: engine tuning knobs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounded notification buffer; oldest entries drain past this.
    pub max_events: usize,
    /// Audit journal capacity. Exceeding it is a persistence failure.
    pub audit_capacity: usize,
    /// Largest share of the output reserve a single swap may take.
    pub max_drain_fraction: Decimal,
    /// How long a swap waits for the pool's commit lock before reporting
    /// a concurrency conflict.
    pub pool_lock_wait: Duration,
    /// Internal retries for concurrency conflicts, each with a fresh
    /// re-quote, before the conflict surfaces to the caller.
    pub max_swap_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            audit_capacity: 1_000_000,
            max_drain_fraction: dec!(0.9),
            pool_lock_wait: Duration::from_millis(500),
            max_swap_retries: 3,
        }
    }
}
