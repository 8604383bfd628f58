// 7.0 registry.rs: owns every Pool and its commit lock. quotes take a
// short read lock on the committed state; a swap holds the write lock
// for its whole commit, so swaps against one pool are linearized while
// different pools proceed fully in parallel.

use crate::pool::{Pool, PoolConfig, PoolError, PoolSnapshot};
use crate::types::{PoolId, Timestamp};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct PoolRegistry {
    pools: DashMap<PoolId, Arc<RwLock<Pool>>>,
    next_id: AtomicU64,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate the config and register a new pool at stage 1.
    pub fn insert(
        &self,
        config: PoolConfig,
        created_at: Timestamp,
    ) -> Result<PoolSnapshot, PoolError> {
        config.validate()?;
        let id = PoolId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let pool = Pool::new(id, config, created_at);
        let snapshot = pool.snapshot();
        self.pools.insert(id, Arc::new(RwLock::new(pool)));
        Ok(snapshot)
    }

    /// Handle for the commit path. The caller takes the write lock with a
    /// bounded wait; holding the Arc keeps the pool alive across that wait.
    pub fn get(&self, id: PoolId) -> Option<Arc<RwLock<Pool>>> {
        self.pools.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Most recent committed state. Advisory: may be stale the moment it
    /// is returned.
    pub fn snapshot(&self, id: PoolId) -> Option<PoolSnapshot> {
        self.get(id).map(|pool| pool.read().snapshot())
    }

    pub fn ids(&self) -> Vec<PoolId> {
        let mut ids: Vec<PoolId> = self.pools.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
