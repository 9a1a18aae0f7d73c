// ── Query cache ──
//
// Keyed store of fetched server data. Every read goes through `fetch`,
// which serves fresh data from memory, attaches to a pending request for
// the same key, or starts exactly one new request. Requests run as
// spawned tasks so a caller going away never aborts a fetch other callers
// are waiting on.
//
// An entry owns at most one in-flight request. Invalidation detaches it
// (the entry forgets the request); a detached request still answers its
// own waiters but never writes back into the entry.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::key::CacheKey;
use super::policy::{CachePolicies, RefetchTrigger, StalenessPolicy};
use super::state::QueryState;
use crate::error::CoreError;

pub(crate) type CacheValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<CacheValue, CoreError>;
type Refetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Per-attempt timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Entry ────────────────────────────────────────────────────────────

pub(crate) struct InFlight {
    request_id: u64,
    future: SharedFetch,
}

#[derive(Default)]
pub(crate) struct CacheEntry {
    value: Option<CacheValue>,
    error: Option<CoreError>,
    updated_at: Option<Instant>,
    pub(crate) invalidated: bool,
    pub(crate) in_flight: Option<InFlight>,
    /// How to load this key again without the original caller.
    refetch: Option<Refetcher>,
}

impl CacheEntry {
    fn is_stale(&self, policy: &StalenessPolicy) -> bool {
        self.invalidated
            || self
                .updated_at
                .is_none_or(|at| policy.is_stale_after(at.elapsed()))
    }

    /// Data that may be served without touching the network.
    fn servable(&self, policy: &StalenessPolicy) -> Option<&CacheValue> {
        let value = self.value.as_ref()?;
        if self.invalidated {
            return None;
        }
        if !self.is_stale(policy) || !policy.refetch_on_mount {
            return Some(value);
        }
        None
    }

    fn has_loaded(&self) -> bool {
        self.value.is_some() || self.error.is_some()
    }

    /// Mark stale and detach any pending request.
    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
        if let Some(detached) = self.in_flight.take() {
            trace!(request_id = detached.request_id, "detached in-flight request");
        }
    }
}

/// Diagnostic view of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path: String,
    pub has_data: bool,
    pub error: Option<CoreError>,
    pub invalidated: bool,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub age: Option<Duration>,
}

// ── QueryCache ───────────────────────────────────────────────────────

/// Shared query cache.
///
/// Cheaply cloneable; all clones address the same entries.
#[derive(Clone)]
pub struct QueryCache {
    pub(crate) inner: Arc<CacheInner>,
}

pub(crate) struct CacheInner {
    pub(crate) entries: DashMap<CacheKey, CacheEntry>,
    policies: CachePolicies,
    request_timeout: Duration,
    cancel: CancellationToken,
    /// Child of `cancel`; replaced on every teardown.
    cancel_child: ArcSwap<CancellationToken>,
    next_request_id: AtomicU64,
}

impl QueryCache {
    pub fn new(policies: CachePolicies, request_timeout: Duration) -> Self {
        let cancel = CancellationToken::new();
        let cancel_child = ArcSwap::from_pointee(cancel.child_token());
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                policies,
                request_timeout,
                cancel,
                cancel_child,
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn policies(&self) -> &CachePolicies {
        &self.inner.policies
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Read `key`, fetching through `fetcher` if the cached value is
    /// missing, stale, or invalidated.
    ///
    /// Concurrent calls for the same key share one request. Transient
    /// failures are retried per the kind's policy; each attempt is bounded
    /// by the request timeout. A failure keeps the previous data.
    pub async fn fetch<T, F, Fut>(&self, key: CacheKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let refetch: Refetcher = Arc::new(move || {
            let attempt = fetcher();
            async move {
                let value: CacheValue = Arc::new(attempt.await?);
                Ok(value)
            }
            .boxed()
        });

        let pending = {
            let policy = self.inner.policies.get(key.kind());
            let mut entry = self.inner.entries.entry(key.clone()).or_default();
            entry.refetch = Some(refetch);

            if let Some(value) = entry.servable(policy) {
                trace!(key = %key, "serving cached data");
                return QueryState {
                    data: downcast(value.clone()),
                    error: entry.error.clone(),
                    is_loading: false,
                    is_stale: entry.is_stale(policy),
                    updated_at: entry.updated_at,
                    enabled: true,
                };
            }
            self.inner.attach_or_start(&key, &mut entry)
        };

        let outcome = pending.await;
        let snapshot = self.peek::<T>(&key);
        match outcome {
            Ok(value) => match downcast::<T>(value) {
                Some(data) => QueryState {
                    data: Some(data),
                    error: None,
                    is_loading: false,
                    is_stale: false,
                    updated_at: snapshot.updated_at.or_else(|| Some(Instant::now())),
                    enabled: true,
                },
                None => QueryState {
                    error: Some(CoreError::Internal(format!(
                        "cached value for {key} has an unexpected type"
                    ))),
                    ..snapshot
                },
            },
            Err(err) => QueryState {
                error: Some(err),
                is_loading: false,
                ..snapshot
            },
        }
    }

    /// Current state of `key` without fetching.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &CacheKey) -> QueryState<T> {
        let Some(entry) = self.inner.entries.get(key) else {
            return QueryState::idle();
        };
        let policy = self.inner.policies.get(key.kind());
        QueryState {
            data: entry.value.clone().and_then(downcast),
            error: entry.error.clone(),
            is_loading: entry.in_flight.is_some(),
            is_stale: entry.is_stale(policy),
            updated_at: entry.updated_at,
            enabled: true,
        }
    }

    /// Whether `key` holds data that a read would serve without fetching.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        let policy = self.inner.policies.get(key.kind());
        self.inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.value.is_some() && !entry.is_stale(policy))
    }

    pub fn entry_info(&self, key: &CacheKey) -> Option<EntryInfo> {
        let policy = self.inner.policies.get(key.kind());
        self.inner.entries.get(key).map(|entry| EntryInfo {
            path: key.path(),
            has_data: entry.value.is_some(),
            error: entry.error.clone(),
            invalidated: entry.invalidated,
            is_stale: entry.is_stale(policy),
            is_fetching: entry.in_flight.is_some(),
            age: entry.updated_at.map(|at| at.elapsed()),
        })
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    // ── Background triggers ──────────────────────────────────────────

    /// Start refetches for stale entries whose kind opts into `trigger`.
    ///
    /// Does not wait for the requests. Returns how many were started.
    pub fn refetch_stale(&self, trigger: RefetchTrigger) -> usize {
        let candidates: Vec<CacheKey> = self
            .inner
            .entries
            .iter()
            .filter(|entry| {
                let policy = self.inner.policies.get(entry.key().kind());
                policy.refetches_on(trigger)
                    && entry.refetch.is_some()
                    && entry.in_flight.is_none()
                    && entry.has_loaded()
                    && entry.is_stale(policy)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut started = 0;
        for key in candidates {
            if let Some(mut entry) = self.inner.entries.get_mut(&key) {
                if entry.in_flight.is_none() {
                    drop(self.inner.attach_or_start(&key, &mut entry));
                    started += 1;
                }
            }
        }
        debug!(?trigger, started, "background refetch");
        started
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Cancel every pending request and drop all entries.
    ///
    /// Waiters on cancelled requests receive [`CoreError::Cancelled`].
    pub fn teardown(&self) {
        let fresh = Arc::new(self.inner.cancel.child_token());
        let previous = self.inner.cancel_child.swap(fresh);
        previous.cancel();

        let dropped = self.inner.entries.len();
        self.inner.entries.clear();
        info!(dropped, "query cache cleared");
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CachePolicies::default(), DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Request lifecycle ────────────────────────────────────────────────

impl CacheInner {
    /// Join the entry's pending request or spawn a new one.
    ///
    /// Must be called with the entry locked so that the spawned task
    /// cannot complete before it is registered.
    fn attach_or_start(self: &Arc<Self>, key: &CacheKey, entry: &mut CacheEntry) -> SharedFetch {
        if let Some(ref pending) = entry.in_flight {
            trace!(key = %key, request_id = pending.request_id, "joining in-flight request");
            return pending.future.clone();
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let future = match entry.refetch.clone() {
            Some(refetch) => {
                debug!(key = %key, request_id, "starting fetch");
                let policy = *self.policies.get(key.kind());
                let cancel = self.cancel_child.load_full();
                let task = tokio::spawn(run_fetch(
                    Arc::clone(self),
                    key.clone(),
                    request_id,
                    refetch,
                    policy.retry_count,
                    (*cancel).clone(),
                ));
                async move {
                    task.await
                        .unwrap_or_else(|e| Err(CoreError::Internal(format!("fetch task failed: {e}"))))
                }
                .boxed()
                .shared()
            }
            None => futures_util::future::ready(Err(CoreError::Internal(format!(
                "no fetcher registered for {key}"
            ))))
            .boxed()
            .shared(),
        };

        entry.in_flight = Some(InFlight {
            request_id,
            future: future.clone(),
        });
        future
    }

    /// Record a finished request, unless it was detached meanwhile.
    fn complete(&self, key: &CacheKey, request_id: u64, outcome: &FetchResult) {
        let Some(mut entry) = self.entries.get_mut(key) else {
            trace!(key = %key, request_id, "entry dropped before completion");
            return;
        };
        if entry
            .in_flight
            .as_ref()
            .is_none_or(|pending| pending.request_id != request_id)
        {
            debug!(key = %key, request_id, "discarding detached result");
            return;
        }
        entry.in_flight = None;

        match outcome {
            Ok(value) => {
                entry.value = Some(Arc::clone(value));
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.invalidated = false;
            }
            Err(CoreError::Cancelled) => {}
            Err(err) => {
                warn!(key = %key, error = %err, "fetch failed");
                entry.error = Some(err.clone());
            }
        }
    }
}

async fn run_fetch(
    inner: Arc<CacheInner>,
    key: CacheKey,
    request_id: u64,
    refetch: Refetcher,
    retry_count: u32,
    cancel: CancellationToken,
) -> FetchResult {
    let outcome = tokio::select! {
        () = cancel.cancelled() => Err(CoreError::Cancelled),
        result = fetch_with_retry(&key, &refetch, retry_count, inner.request_timeout) => result,
    };
    inner.complete(&key, request_id, &outcome);
    outcome
}

async fn fetch_with_retry(
    key: &CacheKey,
    refetch: &Refetcher,
    retry_count: u32,
    timeout: Duration,
) -> FetchResult {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(timeout, refetch()).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        };

        match result {
            Err(err) if err.is_retryable() && attempt < retry_count => {
                let delay = StalenessPolicy::retry_delay(attempt);
                attempt += 1;
                debug!(key = %key, attempt, ?delay, error = %err, "retrying fetch");
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

fn downcast<T: Send + Sync + 'static>(value: CacheValue) -> Option<Arc<T>> {
    value.downcast::<T>().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::cache::key::ResourceKind;

    fn devices() -> CacheKey {
        CacheKey::collection(ResourceKind::Devices)
    }

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl Fn() -> BoxFuture<'static, Result<Vec<String>, CoreError>> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(delay).await;
                Ok(vec![format!("fetch-{n}")])
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_data_is_served_from_memory() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.fetch(devices(), counting_fetcher(&calls, Duration::ZERO)).await;
        assert!(first.is_success());

        tokio::time::advance(Duration::from_secs(4 * 60 + 59)).await;
        let second = cache.fetch(devices(), counting_fetcher(&calls, Duration::ZERO)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.data.unwrap()[0], "fetch-1");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_data_is_refetched() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(devices(), counting_fetcher(&calls, Duration::ZERO)).await;
        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        assert!(!cache.is_fresh(&devices()));

        let state = cache.fetch(devices(), counting_fetcher(&calls, Duration::ZERO)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.data.unwrap()[0], "fetch-2");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.fetch(devices(), counting_fetcher(&calls, Duration::from_millis(200))),
            cache.fetch(devices(), counting_fetcher(&calls, Duration::from_millis(200))),
            cache.fetch(devices(), counting_fetcher(&calls, Duration::from_millis(200))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for state in [a, b, c] {
            assert_eq!(state.data.unwrap()[0], "fetch-1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let started = Instant::now();
        let state = cache
            .fetch(devices(), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CoreError::NetworkFailure {
                            message: "unreachable".into(),
                            status: None,
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*state.data.unwrap(), 2);
        // 1s + 2s of backoff.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_at_policy_limit() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let key = CacheKey::collection(ResourceKind::ProximityEvents);
        let state = cache
            .fetch(key, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<u32, _>(CoreError::NetworkFailure {
                        message: "bad gateway".into(),
                        status: Some(502),
                    })
                }
            })
            .await;

        // One retry for proximity events.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(state.error, Some(CoreError::NetworkFailure { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failures_are_not_retried() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let state = cache
            .fetch(devices(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<u32, _>(CoreError::ValidationFailure {
                        message: "bad filter".into(),
                        field: None,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(state.data.is_none());
        assert!(state.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_bounded_by_the_timeout() {
        let cache = QueryCache::new(CachePolicies::default(), Duration::from_secs(5));
        let key = CacheKey::collection(ResourceKind::Health);

        let state = cache
            .fetch(key, || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1u8)
            })
            .await;

        assert_eq!(state.error, Some(CoreError::Timeout { timeout_secs: 5 }));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_last_good_data() {
        let cache = QueryCache::default();
        cache.fetch(devices(), || async { Ok(vec![1u32, 2]) }).await;
        tokio::time::advance(Duration::from_secs(301)).await;

        let state = cache
            .fetch(devices(), || async {
                Err::<Vec<u32>, _>(CoreError::ValidationFailure {
                    message: "nope".into(),
                    field: None,
                })
            })
            .await;

        assert_eq!(*state.data.unwrap(), vec![1, 2]);
        assert!(state.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn detached_results_are_not_written_back() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = cache.clone();
        let fetcher = counting_fetcher(&calls, Duration::from_secs(1));
        let pending = tokio::spawn(async move { slow.fetch(devices(), fetcher).await });
        tokio::task::yield_now().await;

        cache.inner.entries.get_mut(&devices()).unwrap().invalidate();
        let detached = pending.await.unwrap();
        assert_eq!(detached.data.unwrap()[0], "fetch-1");

        // Entry never received the detached value.
        assert!(cache.peek::<Vec<String>>(&devices()).data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_waiters_and_clears_entries() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let waiting = cache.clone();
        let fetcher = counting_fetcher(&calls, Duration::from_secs(10));
        let pending = tokio::spawn(async move { waiting.fetch(devices(), fetcher).await });
        tokio::task::yield_now().await;

        cache.teardown();
        let state = pending.await.unwrap();
        assert_eq!(state.error, Some(CoreError::Cancelled));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn focus_refetches_only_opted_in_kinds() {
        let cache = QueryCache::default();
        let device_calls = Arc::new(AtomicUsize::new(0));
        let location_calls = Arc::new(AtomicUsize::new(0));
        let locations = CacheKey::collection(ResourceKind::Locations);

        cache
            .fetch(devices(), counting_fetcher(&device_calls, Duration::ZERO))
            .await;
        cache
            .fetch(locations, counting_fetcher(&location_calls, Duration::ZERO))
            .await;

        // Fresh entries are left alone.
        assert_eq!(cache.refetch_stale(RefetchTrigger::WindowFocus), 0);

        tokio::time::advance(Duration::from_secs(16 * 60)).await;
        assert_eq!(cache.refetch_stale(RefetchTrigger::WindowFocus), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(device_calls.load(Ordering::SeqCst), 2);
        assert_eq!(location_calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&devices()));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_refetches_invalidated_entries() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let locations = CacheKey::collection(ResourceKind::Locations);

        cache
            .fetch(locations.clone(), counting_fetcher(&calls, Duration::ZERO))
            .await;
        cache.inner.entries.get_mut(&locations).unwrap().invalidate();

        assert_eq!(cache.refetch_stale(RefetchTrigger::Reconnect), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
