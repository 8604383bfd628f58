// 10.x engine/: the orchestration layer. core.rs owns shared state and
// the admin surface, swaps.rs is the transactional swap path, results.rs
// the caller-facing error taxonomy.

mod config;
mod core;
mod results;
mod swaps;

pub use config::EngineConfig;
pub use core::SwapEngine;
pub use results::SwapError;
