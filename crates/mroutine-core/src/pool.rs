// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Free-list pools keyed by concrete type.
//!
//! Commands are leased from a [`PoolRegistry`] on the hot path instead of
//! being freshly allocated, then handed back when their routine no longer
//! needs them. Each type gets its own [`Pool`], created lazily on first use
//! and optionally carrying a reset hook that scrubs an instance on return.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Counters describing the state of a single [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances ever constructed by the pool.
    pub created: usize,
    /// Instances sitting in the free list.
    pub available: usize,
    /// Instances currently leased out.
    pub in_use: usize,
}

/// A free list of boxed `T` with an optional reset hook.
pub struct Pool<T> {
    free: Vec<Box<T>>,
    reset: Option<fn(&mut T)>,
    created: usize,
    in_use: usize,
    warn_on_missing_reset: bool,
    warned: bool,
}

impl<T: Default> Pool<T> {
    /// Creates an empty pool without a reset hook.
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            reset: None,
            created: 0,
            in_use: 0,
            warn_on_missing_reset: true,
            warned: false,
        }
    }

    /// Installs the function run on every instance returned to the pool.
    pub fn set_reset(&mut self, reset: fn(&mut T)) {
        self.reset = Some(reset);
    }

    /// Returns `true` if a reset hook is installed.
    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    /// Takes an instance from the free list, constructing one if it is empty.
    pub fn lease(&mut self) -> Box<T> {
        self.in_use += 1;
        match self.free.pop() {
            Some(item) => item,
            None => {
                self.created += 1;
                Box::default()
            }
        }
    }

    /// Returns an instance to the free list, running the reset hook first.
    ///
    /// Without a hook the instance is still recycled as-is, and a warning is
    /// logged the first time this happens for the type.
    pub fn release(&mut self, mut item: Box<T>) {
        match self.reset {
            Some(reset) => reset(&mut item),
            None => {
                if self.warn_on_missing_reset && !self.warned {
                    self.warned = true;
                    log::warn!(
                        "Pool<{}> has no reset hook; recycled instances may keep stale state.",
                        std::any::type_name::<T>()
                    );
                }
            }
        }
        self.in_use = self.in_use.saturating_sub(1);
        self.free.push(item);
    }

    /// Constructs instances until at least `count` are available.
    pub fn prewarm(&mut self, count: usize) {
        while self.free.len() < count {
            self.created += 1;
            self.free.push(Box::default());
        }
    }

    /// Returns the pool's counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            available: self.free.len(),
            in_use: self.in_use,
        }
    }
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A registry of [`Pool`]s keyed by [`TypeId`].
///
/// Pools are stored type-erased and recovered by downcasting to
/// `Pool<T>`, so the registry can host any number of command types without
/// knowing them up front.
///
/// # Example
///
/// ```rust
/// use mroutine_core::pool::PoolRegistry;
///
/// #[derive(Default)]
/// struct Scratch { values: Vec<u32> }
///
/// let mut pools = PoolRegistry::new();
/// pools.register::<Scratch>(|s| s.values.clear());
///
/// let mut scratch = pools.lease::<Scratch>();
/// scratch.values.push(4);
/// pools.release(scratch);
///
/// let again = pools.lease::<Scratch>();
/// assert!(again.values.is_empty());
/// assert_eq!(pools.stats::<Scratch>().created, 1);
/// ```
pub struct PoolRegistry {
    pools: HashMap<TypeId, Box<dyn Any>>,
    deferred: Vec<Box<dyn Any>>,
    warn_on_missing_reset: bool,
}

impl PoolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            deferred: Vec::new(),
            warn_on_missing_reset: true,
        }
    }

    /// Controls whether pools created from now on warn about a missing reset hook.
    pub fn set_warn_on_missing_reset(&mut self, warn: bool) {
        self.warn_on_missing_reset = warn;
    }

    fn pool_mut<T: Default + 'static>(&mut self) -> &mut Pool<T> {
        let warn = self.warn_on_missing_reset;
        let entry = self.pools.entry(TypeId::of::<T>()).or_insert_with(|| {
            let mut pool = Pool::<T>::new();
            pool.warn_on_missing_reset = warn;
            Box::new(pool)
        });
        // The entry for TypeId::of::<T>() only ever holds a Pool<T>.
        match entry.downcast_mut::<Pool<T>>() {
            Some(pool) => pool,
            None => unreachable!("pool registered under the wrong TypeId"),
        }
    }

    /// Installs (or replaces) the reset hook for `T`.
    pub fn register<T: Default + 'static>(&mut self, reset: fn(&mut T)) {
        self.pool_mut::<T>().set_reset(reset);
    }

    /// Leases an instance of `T`, creating the pool on first use.
    pub fn lease<T: Default + 'static>(&mut self) -> Box<T> {
        self.pool_mut::<T>().lease()
    }

    /// Leases an instance of `T`, installing `reset` if the pool has no hook yet.
    pub fn lease_with<T: Default + 'static>(&mut self, reset: fn(&mut T)) -> Box<T> {
        let pool = self.pool_mut::<T>();
        if !pool.has_reset() {
            pool.set_reset(reset);
        }
        pool.lease()
    }

    /// Returns an instance to the pool for `T`.
    pub fn release<T: Default + 'static>(&mut self, item: Box<T>) {
        self.pool_mut::<T>().release(item);
    }

    /// Parks `value` until the owner of the registry calls
    /// [`take_deferred`](PoolRegistry::take_deferred).
    ///
    /// Used for state released while the registry is borrowed, so destructors
    /// of user values never run inside that borrow.
    pub fn defer_drop<T: 'static>(&mut self, value: T) {
        self.deferred.push(Box::new(value));
    }

    /// Hands back everything parked by [`defer_drop`](PoolRegistry::defer_drop).
    /// The caller drops it once the registry is no longer borrowed.
    #[must_use]
    pub fn take_deferred(&mut self) -> Vec<Box<dyn Any>> {
        std::mem::take(&mut self.deferred)
    }

    /// Constructs instances of `T` until at least `count` are available.
    pub fn prewarm<T: Default + 'static>(&mut self, count: usize) {
        self.pool_mut::<T>().prewarm(count);
    }

    /// Returns the counters for `T`, or zeroes if no pool exists yet.
    #[must_use]
    pub fn stats<T: Default + 'static>(&self) -> PoolStats {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Pool<T>>())
            .map(Pool::stats)
            .unwrap_or_default()
    }

    /// Returns `true` if a pool for `T` exists.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.pools.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Returns `true` if no pool has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Drops every pool, every idle instance they hold, and anything still
    /// waiting in the deferred drops.
    pub fn clear(&mut self) {
        self.pools.clear();
        self.deferred.clear();
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Payload {
        value: u32,
    }

    #[derive(Default)]
    struct Other;

    #[test]
    fn test_lease_reuses_released_instance() {
        let mut pools = PoolRegistry::new();
        pools.register::<Payload>(|p| p.value = 0);

        let first = pools.lease::<Payload>();
        let first_addr = &*first as *const Payload;
        pools.release(first);

        let second = pools.lease::<Payload>();
        assert_eq!(&*second as *const Payload, first_addr);
        assert_eq!(pools.stats::<Payload>().created, 1);
    }

    #[test]
    fn test_reset_hook_runs_on_release() {
        let mut pools = PoolRegistry::new();
        pools.register::<Payload>(|p| p.value = 0);

        let mut item = pools.lease::<Payload>();
        item.value = 42;
        pools.release(item);

        assert_eq!(pools.lease::<Payload>().value, 0);
    }

    #[test]
    fn test_missing_reset_hook_still_recycles() {
        let mut pools = PoolRegistry::new();
        let mut item = pools.lease::<Payload>();
        item.value = 9;
        pools.release(item);

        let stats = pools.stats::<Payload>();
        assert_eq!(stats.available, 1);
        assert_eq!(stats.in_use, 0);
        // No hook means no scrub.
        assert_eq!(pools.lease::<Payload>().value, 9);
    }

    #[test]
    fn test_lease_with_keeps_existing_hook() {
        let mut pools = PoolRegistry::new();
        pools.register::<Payload>(|p| p.value = 1);

        let mut item = pools.lease_with::<Payload>(|p| p.value = 2);
        item.value = 50;
        pools.release(item);
        assert_eq!(pools.lease::<Payload>().value, 1);
    }

    #[test]
    fn test_deferred_values_outlive_the_call_that_parked_them() {
        use std::rc::Rc;

        let mut pools = PoolRegistry::new();
        let shared = Rc::new(());
        pools.defer_drop(shared.clone());
        assert_eq!(Rc::strong_count(&shared), 2);

        let parked = pools.take_deferred();
        assert_eq!(parked.len(), 1);
        drop(parked);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn test_pools_are_separate_per_type() {
        let mut pools = PoolRegistry::new();
        let payload = pools.lease::<Payload>();
        let other = pools.lease::<Other>();

        assert_eq!(pools.len(), 2);
        assert_eq!(pools.stats::<Payload>().in_use, 1);
        assert_eq!(pools.stats::<Other>().in_use, 1);

        pools.release(payload);
        pools.release(other);
        assert_eq!(pools.stats::<Payload>().available, 1);
    }

    #[test]
    fn test_prewarm_and_clear() {
        let mut pools = PoolRegistry::default();
        pools.prewarm::<Payload>(4);
        assert_eq!(pools.stats::<Payload>().available, 4);

        pools.clear();
        assert!(pools.is_empty());
        assert_eq!(pools.stats::<Payload>(), PoolStats::default());
    }
}
