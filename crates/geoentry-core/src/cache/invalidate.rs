// ── Invalidation ──
//
// Marks entries stale so the next read refetches them. Nothing here
// fetches; pending requests for marked entries are detached and their
// results dropped on arrival.

use geoentry_api::ResourceId;
use tracing::debug;

use super::key::{CacheKey, ResourceKind};
use super::store::QueryCache;

impl QueryCache {
    /// Invalidate every entry whose key satisfies `predicate`.
    ///
    /// Returns the number of entries marked.
    pub fn invalidate_where(&self, predicate: impl Fn(&CacheKey) -> bool) -> usize {
        let mut marked = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if predicate(entry.key()) {
                entry.value_mut().invalidate();
                marked += 1;
            }
        }
        marked
    }

    /// Invalidate exactly `key`, ignoring its owner.
    pub fn invalidate_key(&self, key: &CacheKey) -> usize {
        let marked = self.invalidate_where(|k| k.path() == key.path());
        debug!(key = %key, marked, "invalidated key");
        marked
    }

    /// Invalidate every entry of `kind`: collections, scoped lists and items.
    pub fn invalidate_kind(&self, kind: ResourceKind) -> usize {
        let marked = self.invalidate_where(|k| k.kind() == kind);
        debug!(%kind, marked, "invalidated kind");
        marked
    }

    /// Invalidate the collection and scoped-list entries of `kind`.
    pub fn invalidate_collections(&self, kind: ResourceKind) -> usize {
        self.invalidate_where(|k| k.kind() == kind && k.is_collection())
    }

    /// Invalidate everything cached on behalf of `user`.
    pub fn invalidate_user_data(&self, user: &ResourceId) -> usize {
        let marked = self.invalidate_where(|k| k.owner() == Some(user));
        debug!(%user, marked, "invalidated user data");
        marked
    }

    /// Invalidate every entry whose path starts with `pattern` on a
    /// segment boundary. A blank pattern marks nothing.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let marked = self.invalidate_where(|k| k.matches_pattern(pattern));
        debug!(pattern, marked, "invalidated by pattern");
        marked
    }

    pub fn invalidate_all(&self) -> usize {
        let marked = self.invalidate_where(|_| true);
        debug!(marked, "invalidated all entries");
        marked
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::CoreError;

    async fn load(cache: &QueryCache, key: CacheKey, calls: &Arc<AtomicUsize>) {
        let calls = Arc::clone(calls);
        let state = cache
            .fetch(key, move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, CoreError>(1u32) }
            })
            .await;
        assert!(state.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_all_causes_one_refetch_per_key() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let devices = CacheKey::collection(ResourceKind::Devices);

        load(&cache, devices.clone(), &calls).await;
        assert_eq!(cache.invalidate_all(), 1);
        assert!(!cache.is_fresh(&devices));

        load(&cache, devices.clone(), &calls).await;
        load(&cache, devices.clone(), &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pattern_hits_only_matching_entries() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let events = CacheKey::collection(ResourceKind::ProximityEvents);
        let by_device = events.clone().scoped("device", 42);
        let devices = CacheKey::collection(ResourceKind::Devices);

        for key in [&events, &by_device, &devices] {
            load(&cache, key.clone(), &calls).await;
        }

        assert_eq!(cache.invalidate_by_pattern("proximity-events"), 2);
        assert!(!cache.is_fresh(&events));
        assert!(!cache.is_fresh(&by_device));
        assert!(cache.is_fresh(&devices));
        assert_eq!(cache.invalidate_by_pattern(""), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn user_scoped_invalidation_leaves_other_users() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let alice = ResourceId::from(1);
        let bob = ResourceId::from(2);
        let alice_devices = CacheKey::collection(ResourceKind::Devices).owned_by(alice.clone());
        let bob_devices = CacheKey::collection(ResourceKind::Devices).owned_by(bob);

        load(&cache, alice_devices.clone(), &calls).await;
        load(&cache, bob_devices.clone(), &calls).await;

        assert_eq!(cache.invalidate_user_data(&alice), 1);
        assert!(!cache.is_fresh(&alice_devices));
        assert!(cache.is_fresh(&bob_devices));
    }

    #[tokio::test(start_paused = true)]
    async fn collections_only_skips_items() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let list = CacheKey::collection(ResourceKind::Locations);
        let scoped = CacheKey::collection(ResourceKind::Devices).scoped("location", 3);
        let item = CacheKey::item(ResourceKind::Locations, ResourceId::from(3));

        for key in [&list, &scoped, &item] {
            load(&cache, key.clone(), &calls).await;
        }

        assert_eq!(cache.invalidate_collections(ResourceKind::Locations), 1);
        assert!(cache.is_fresh(&item));
        assert!(cache.is_fresh(&scoped));
        assert_eq!(cache.invalidate_kind(ResourceKind::Locations), 2);
        assert!(!cache.is_fresh(&item));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidating_unknown_key_marks_nothing() {
        let cache = QueryCache::default();
        let key = CacheKey::item(ResourceKind::Devices, ResourceId::from(9));
        assert_eq!(cache.invalidate_key(&key), 0);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.is_empty());
    }
}
