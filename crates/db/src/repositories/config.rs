//! Entitlement policy storage.
//!
//! `InMemoryEntitlementConfigStore` is the source of truth.
//! `CachedEntitlementConfigStore` fronts any store with a Moka cache so the
//! calculator does not hit the backing store on every request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use moka::sync::Cache;

use leavewise_core::LeaveError;
use leavewise_core::collaborators::EntitlementConfigStore;
use leavewise_core::entitlement::{
    EntitlementConfig, EntitlementConfigUpdate, LeaveType, seed_configs,
};
use leavewise_shared::CacheConfig;

/// Policy rows held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEntitlementConfigStore {
    rows: RwLock<BTreeMap<LeaveType, EntitlementConfig>>,
}

impl InMemoryEntitlementConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `configs`.
    #[must_use]
    pub fn with_configs(configs: impl IntoIterator<Item = EntitlementConfig>) -> Self {
        let rows = configs.into_iter().map(|c| (c.leave_type, c)).collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Inserts or replaces a whole row.
    pub fn put(&self, config: EntitlementConfig) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.leave_type, config);
    }
}

impl EntitlementConfigStore for InMemoryEntitlementConfigStore {
    fn get(&self, leave_type: LeaveType) -> Result<EntitlementConfig, LeaveError> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&leave_type)
            .cloned()
            .ok_or(LeaveError::ConfigurationMissing(leave_type))
    }

    fn list(&self) -> Vec<EntitlementConfig> {
        let mut configs: Vec<EntitlementConfig> = self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.display_order);
        configs
    }

    fn update(
        &self,
        leave_type: LeaveType,
        update: &EntitlementConfigUpdate,
    ) -> Result<EntitlementConfig, LeaveError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let row = rows
            .get_mut(&leave_type)
            .ok_or(LeaveError::ConfigurationMissing(leave_type))?;
        update.apply_to(row);
        Ok(row.clone())
    }

    fn seed_defaults_if_empty(&self) -> usize {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        if !rows.is_empty() {
            return 0;
        }
        rows.extend(seed_configs().into_iter().map(|c| (c.leave_type, c)));
        tracing::info!(rows = rows.len(), "Seeded default entitlement policy");
        rows.len()
    }
}

/// Read-through cache in front of another policy store.
///
/// Misses are not cached, so a row added later is picked up on the next read.
/// Every write bumps `generation`; a fill that raced a write is dropped again
/// so a row read before the write never outlives it in the cache.
pub struct CachedEntitlementConfigStore<S> {
    inner: S,
    cache: Cache<LeaveType, EntitlementConfig>,
    generation: AtomicU64,
}

impl<S: EntitlementConfigStore> CachedEntitlementConfigStore<S> {
    /// Wraps `inner` with the given cache settings.
    #[must_use]
    pub fn new(inner: S, settings: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.config_capacity)
            .time_to_live(Duration::from_secs(settings.config_ttl_secs))
            .build();

        Self {
            inner,
            cache,
            generation: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drops every cached row.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }
}

impl<S: EntitlementConfigStore> EntitlementConfigStore for CachedEntitlementConfigStore<S> {
    fn get(&self, leave_type: LeaveType) -> Result<EntitlementConfig, LeaveError> {
        if let Some(config) = self.cache.get(&leave_type) {
            return Ok(config);
        }
        let seen = self.generation.load(Ordering::SeqCst);
        let config = self.inner.get(leave_type)?;
        self.cache.insert(leave_type, config.clone());
        if self.generation.load(Ordering::SeqCst) != seen {
            self.cache.invalidate(&leave_type);
        }
        Ok(config)
    }

    fn list(&self) -> Vec<EntitlementConfig> {
        self.inner.list()
    }

    fn update(
        &self,
        leave_type: LeaveType,
        update: &EntitlementConfigUpdate,
    ) -> Result<EntitlementConfig, LeaveError> {
        let updated = self.inner.update(leave_type, update)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&leave_type);
        tracing::info!(%leave_type, "Entitlement policy updated");
        Ok(updated)
    }

    fn seed_defaults_if_empty(&self) -> usize {
        let seeded = self.inner.seed_defaults_if_empty();
        if seeded > 0 {
            self.invalidate_all();
        }
        seeded
    }
}
