// ── Dashboard facade ──
//
// Owns the query cache, the session and the readiness gate, and ties
// their lifecycles together: login installs a session and warms the gated
// queries, logout invalidates and tears down everything the session
// produced.

use std::sync::{Arc, Mutex, PoisonError};

use geoentry_api::{ApiClient, Device, Location, ResourceId, User};
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::cache::{QueryCache, RefetchTrigger};
use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::notify::{Notifier, Toast};
use crate::query::Queries;
use crate::readiness::{Readiness, ReadinessGate};
use crate::remote::RemoteData;
use crate::session::{AuthSession, FileSessionStore, SessionStore};
use crate::stats::{DashboardSummary, SummaryMemo};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`.
pub struct Dashboard<R> {
    inner: Arc<DashboardInner<R>>,
}

struct DashboardInner<R> {
    config: DashboardConfig,
    remote: Arc<R>,
    storage: Arc<dyn SessionStore>,
    cache: QueryCache,
    session: watch::Sender<Option<Arc<AuthSession>>>,
    readiness: ReadinessGate,
    notifier: Notifier,
    queries: Queries<R>,
    memo: Mutex<SummaryMemo>,
    no_devices: Arc<Vec<Device>>,
    no_locations: Arc<Vec<Location>>,
}

impl<R> Clone for Dashboard<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Dashboard<ApiClient> {
    /// Build a dashboard backed by the HTTP API and the session file.
    pub fn from_config(config: DashboardConfig) -> Result<Self, CoreError> {
        let client = ApiClient::new(config.api_url.as_str(), &config.transport())?;
        let path = config
            .session_path
            .clone()
            .or_else(FileSessionStore::default_path)
            .ok_or_else(|| CoreError::Config {
                message: "cannot determine a session file location".into(),
            })?;
        Ok(Self::new(config, client, FileSessionStore::new(path)))
    }
}

impl<R: RemoteData> Dashboard<R> {
    /// Create a dashboard. Does not touch storage or the network; call
    /// [`restore`](Self::restore) or [`login`](Self::login) next.
    pub fn new(config: DashboardConfig, remote: R, storage: impl SessionStore) -> Self {
        let remote = Arc::new(remote);
        let cache = QueryCache::new(config.policies.clone(), config.timeout);
        let (session, session_rx) = watch::channel(None);
        let readiness = ReadinessGate::new();
        let notifier = Notifier::new(config.notification_capacity);
        let queries = Queries::new(
            Arc::clone(&remote),
            cache.clone(),
            session_rx,
            readiness.clone(),
            notifier.clone(),
        );

        Self {
            inner: Arc::new(DashboardInner {
                config,
                remote,
                storage: Arc::new(storage),
                cache,
                session,
                readiness,
                notifier,
                queries,
                memo: Mutex::new(SummaryMemo::new()),
                no_devices: Arc::new(Vec::new()),
                no_locations: Arc::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn queries(&self) -> &Queries<R> {
        &self.inner.queries
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.inner.remote
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.readiness.state()
    }

    pub fn subscribe_readiness(&self) -> watch::Receiver<Readiness> {
        self.inner.readiness.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Toast> {
        self.inner.notifier.subscribe()
    }

    pub fn session(&self) -> Option<Arc<AuthSession>> {
        self.inner.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Option<Arc<AuthSession>>> {
        self.inner.session.subscribe()
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Reinstate the session saved by an earlier run.
    ///
    /// Returns `true` when a session is active afterwards. A stored
    /// session that cannot be decoded, or whose token the server rejects,
    /// is removed.
    pub async fn restore(&self) -> Result<bool, CoreError> {
        let Some(raw) = self.inner.storage.read()? else {
            debug!("no stored session");
            return Ok(false);
        };

        let session = match AuthSession::decode(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding invalid stored session");
                self.inner.storage.remove()?;
                return Ok(false);
            }
        };

        info!(user = %session.user.email, "restoring session");
        self.install(session);

        match self.refresh_profile().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_auth() => {
                warn!(error = %e, "stored session rejected by server");
                Ok(false)
            }
            Err(e) => {
                // Server unreachable; keep the session and let queries retry.
                warn!(error = %e, "could not verify restored session");
                Ok(true)
            }
        }
    }

    /// Sign in, persist the session and warm the gated queries.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, CoreError> {
        let grant = self.inner.remote.login(email, password).await?;

        if self.session().is_some() {
            self.inner.cache.teardown();
        }
        self.inner.cache.invalidate_all();

        let session = AuthSession::new(grant.user, grant.token);
        self.persist(&session);
        self.install(session);

        let user = match self.refresh_profile().await {
            Ok(user) => user,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(error = %e, "profile load failed after login");
                self.session()
                    .map(|s| s.user.clone())
                    .ok_or(CoreError::AuthRequired)?
            }
        };

        info!(user = %user.email, "signed in");
        self.warm_up().await;
        Ok(user)
    }

    /// Sign out and drop everything the session produced.
    ///
    /// Remote logout is best-effort; its failure is only logged.
    pub async fn logout(&self) {
        self.clear_local_session();

        if let Err(e) = self.inner.remote.logout().await {
            warn!(error = %e, "remote logout failed");
        }
        self.inner.remote.set_token(None);
        info!("signed out");
    }

    /// Reload the user profile under the profile loading flag.
    ///
    /// An authentication failure ends the session locally.
    pub async fn refresh_profile(&self) -> Result<User, CoreError> {
        if self.session().is_none() {
            return Err(CoreError::AuthRequired);
        }

        let result = {
            let _loading = ProfileLoading::start(&self.inner.readiness);
            self.inner.remote.get_profile().await
        };

        match result {
            Ok(user) => {
                let mut updated = None;
                self.inner.session.send_if_modified(|current| {
                    let Some(session) = current.as_ref() else {
                        return false;
                    };
                    let next = Arc::new(AuthSession {
                        user: user.clone(),
                        ..AuthSession::clone(session)
                    });
                    updated = Some(Arc::clone(&next));
                    *current = Some(next);
                    true
                });
                if let Some(session) = updated {
                    self.persist(&session);
                }
                debug!(user = %user.email, "profile loaded");
                Ok(user)
            }
            Err(e) => {
                let err = CoreError::from(e);
                if err.is_auth() {
                    warn!(error = %err, "session no longer valid");
                    self.clear_local_session();
                    self.inner.remote.set_token(None);
                }
                Err(err)
            }
        }
    }

    /// Load the queries that hold the readiness gate.
    pub async fn warm_up(&self) {
        let queries = &self.inner.queries;
        let (devices, locations) = tokio::join!(queries.devices(), queries.locations());
        debug!(
            devices = devices.data.as_ref().map_or(0, |d| d.len()),
            locations = locations.data.as_ref().map_or(0, |l| l.len()),
            "warm-up complete"
        );
    }

    fn install(&self, session: AuthSession) {
        self.inner.remote.set_token(Some(session.token.clone()));
        // Profile loading first so the gate goes straight to Loading.
        self.inner.readiness.set_profile_loading(true);
        self.inner.readiness.set_session_present(true);
        self.inner.session.send_replace(Some(Arc::new(session)));
    }

    fn persist(&self, session: &AuthSession) {
        if let Err(e) = session
            .encode()
            .and_then(|raw| self.inner.storage.write(&raw))
        {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn clear_local_session(&self) {
        self.inner.readiness.set_session_present(false);
        self.inner.session.send_replace(None);
        self.inner.cache.invalidate_all();
        self.inner.cache.teardown();
        if let Err(e) = self.inner.storage.remove() {
            warn!(error = %e, "failed to remove stored session");
        }
    }

    // ── Invalidation ─────────────────────────────────────────────────

    pub fn invalidate_user_data(&self, user: &ResourceId) -> usize {
        self.inner.cache.invalidate_user_data(user)
    }

    pub fn invalidate_all(&self) -> usize {
        self.inner.cache.invalidate_all()
    }

    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        self.inner.cache.invalidate_by_pattern(pattern)
    }

    // ── Triggers ─────────────────────────────────────────────────────

    /// The dashboard window regained focus.
    pub fn on_window_focus(&self) -> usize {
        self.inner.cache.refetch_stale(RefetchTrigger::WindowFocus)
    }

    /// Network connectivity came back.
    pub fn on_reconnect(&self) -> usize {
        self.inner.cache.refetch_stale(RefetchTrigger::Reconnect)
    }

    // ── Derived state ────────────────────────────────────────────────

    /// Overview counts over the cached device and location lists.
    ///
    /// Recomputed only when either list has been refetched.
    pub async fn summary(&self) -> Arc<DashboardSummary> {
        let queries = &self.inner.queries;
        let (devices, locations) = tokio::join!(queries.devices(), queries.locations());
        let devices = devices
            .data
            .unwrap_or_else(|| Arc::clone(&self.inner.no_devices));
        let locations = locations
            .data
            .unwrap_or_else(|| Arc::clone(&self.inner.no_locations));

        self.inner
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&devices, &locations)
    }

    pub fn summary_recomputations(&self) -> u64 {
        self.inner
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recomputations()
    }
}

/// Holds the profile loading flag for its lifetime.
struct ProfileLoading<'a> {
    gate: &'a ReadinessGate,
}

impl<'a> ProfileLoading<'a> {
    fn start(gate: &'a ReadinessGate) -> Self {
        gate.set_profile_loading(true);
        Self { gate }
    }
}

impl Drop for ProfileLoading<'_> {
    fn drop(&mut self) {
        self.gate.set_profile_loading(false);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use geoentry_api::CreateDevice;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cache::{CacheKey, ResourceKind};
    use crate::notify::ToastLevel;
    use crate::session::MemorySessionStore;
    use crate::testing::{FakeRemote, Failure, PASSWORD};

    fn config() -> DashboardConfig {
        DashboardConfig::new("https://api.geoentry.test".parse().unwrap())
    }

    fn dashboard(remote: FakeRemote) -> Dashboard<FakeRemote> {
        Dashboard::new(config(), remote, MemorySessionStore::new())
    }

    fn password() -> SecretString {
        SecretString::from(PASSWORD)
    }

    async fn signed_in(remote: FakeRemote) -> Dashboard<FakeRemote> {
        let dash = dashboard(remote);
        dash.login("ada@example.com", &password()).await.unwrap();
        dash
    }

    fn owned(kind: ResourceKind) -> CacheKey {
        CacheKey::collection(kind).owned_by(ResourceId::from(1))
    }

    // ── Session ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn login_installs_session_and_warms_gated_queries() {
        let dash = dashboard(FakeRemote::seeded());
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);

        let user = dash.login("ada@example.com", &password()).await.unwrap();

        assert_eq!(user.id, ResourceId::from(1));
        assert_eq!(dash.readiness(), Readiness::Ready);
        assert_eq!(dash.remote().calls("list_devices"), 1);
        assert_eq!(dash.remote().calls("list_locations"), 1);
        assert!(dash.cache().is_fresh(&owned(ResourceKind::Devices)));
        assert!(dash.remote().token().is_some());
    }

    #[tokio::test]
    async fn failed_login_leaves_dashboard_signed_out() {
        let dash = dashboard(FakeRemote::seeded());
        let err = dash
            .login("ada@example.com", &SecretString::from("wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert!(dash.session().is_none());
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);
    }

    #[tokio::test]
    async fn queries_without_session_are_disabled() {
        let dash = dashboard(FakeRemote::seeded());

        let devices = dash.queries().devices().await;
        assert!(!devices.enabled);
        assert!(devices.data.is_none());
        assert!(dash.cache().is_empty());
        assert_eq!(dash.remote().calls("list_devices"), 0);

        // Health needs no session.
        assert!(dash.queries().health().await.is_success());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let dash = signed_in(FakeRemote::seeded()).await;
        assert!(!dash.cache().is_empty());

        dash.logout().await;

        assert!(dash.session().is_none());
        assert!(dash.cache().is_empty());
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);
        assert!(dash.remote().token().is_none());
        assert_eq!(dash.remote().calls("logout"), 1);
    }

    #[tokio::test]
    async fn remote_logout_failure_is_not_fatal() {
        let dash = signed_in(FakeRemote::seeded()).await;
        dash.remote().fail_next("logout", Failure::Unavailable, 1);

        dash.logout().await;
        assert!(dash.session().is_none());
        assert!(dash.remote().token().is_none());
    }

    #[tokio::test]
    async fn restore_reinstates_persisted_session() {
        let stored = AuthSession::new(crate::testing::user(1), SecretString::from("persisted"))
            .encode()
            .unwrap();
        let dash = Dashboard::new(
            config(),
            FakeRemote::seeded(),
            MemorySessionStore::with_contents(stored),
        );

        assert!(dash.restore().await.unwrap());
        assert_eq!(dash.remote().token().as_deref(), Some("persisted"));
        assert_eq!(dash.readiness(), Readiness::Ready);
        assert_eq!(
            dash.session().unwrap().token.expose_secret(),
            "persisted"
        );
    }

    #[tokio::test]
    async fn invalid_stored_session_is_removed() {
        let storage = Arc::new(MemorySessionStore::with_contents("{\"version\":1}"));
        let dash = Dashboard::new(config(), FakeRemote::seeded(), Arc::clone(&storage));

        assert!(!dash.restore().await.unwrap());
        assert_eq!(storage.read().unwrap(), None);
        assert!(dash.session().is_none());
        assert_eq!(dash.remote().calls("get_profile"), 0);
    }

    #[tokio::test]
    async fn rejected_stored_session_is_removed() {
        let stored = AuthSession::new(crate::testing::user(1), SecretString::from("revoked"))
            .encode()
            .unwrap();
        let storage = Arc::new(MemorySessionStore::with_contents(stored));
        let remote = FakeRemote::seeded();
        remote.fail_next("get_profile", Failure::Expired, 1);
        let dash = Dashboard::new(config(), remote, Arc::clone(&storage));

        assert!(!dash.restore().await.unwrap());
        assert!(dash.session().is_none());
        assert_eq!(storage.read().unwrap(), None);
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);
    }

    #[tokio::test]
    async fn login_persists_session() {
        let storage = Arc::new(MemorySessionStore::new());
        let dash = Dashboard::new(config(), FakeRemote::seeded(), Arc::clone(&storage));
        dash.login("ada@example.com", &password()).await.unwrap();

        let stored = AuthSession::decode(&storage.read().unwrap().unwrap()).unwrap();
        assert_eq!(stored.user.id, ResourceId::from(1));
    }

    // ── Readiness ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn readiness_follows_profile_and_gated_queries() {
        let dash = dashboard(FakeRemote::with_latency(Duration::from_millis(100)));
        let mut states = dash.subscribe_readiness();

        let login = {
            let dash = dash.clone();
            tokio::spawn(async move { dash.login("ada@example.com", &password()).await })
        };

        // Login call, then profile load.
        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), Readiness::Loading);

        login.await.unwrap().unwrap();
        assert_eq!(dash.readiness(), Readiness::Ready);

        // A device read mid-flight holds the gate; losing the session wins.
        dash.invalidate_all();
        let reader = {
            let dash = dash.clone();
            tokio::spawn(async move { dash.queries().devices().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dash.readiness(), Readiness::Loading);

        dash.logout().await;
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);
        let _ = reader.await;
        assert_eq!(dash.readiness(), Readiness::NotAuthenticated);
    }

    // ── Mutations ────────────────────────────────────────────────────

    #[tokio::test]
    async fn created_device_is_visible_on_next_read() {
        let dash = signed_in(FakeRemote::seeded()).await;
        let mut toasts = dash.notifications();
        assert_eq!(dash.queries().devices().await.data.unwrap().len(), 2);

        let created = dash
            .queries()
            .create_device(&CreateDevice {
                name: "Garage tag".into(),
                device_type: "tracker".into(),
                location_id: None,
                is_active: None,
            })
            .await
            .unwrap();

        let devices = dash.queries().devices().await.data.unwrap();
        assert_eq!(devices.len(), 3);
        assert!(devices.iter().any(|d| d.id == created.id));
        assert_eq!(dash.remote().calls("list_devices"), 2);

        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.level, ToastLevel::Success);
        assert_eq!(toast.message, "Device created successfully");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_untouched() {
        let dash = signed_in(FakeRemote::seeded()).await;
        let mut toasts = dash.notifications();
        let key = owned(ResourceKind::Devices);
        let before = dash.cache().peek::<Vec<Device>>(&key);

        dash.remote()
            .fail_next("create_device", Failure::Validation, 1);
        let err = dash
            .queries()
            .create_device(&CreateDevice {
                name: String::new(),
                device_type: "tracker".into(),
                location_id: None,
                is_active: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ValidationFailure { .. }));
        let after = dash.cache().peek::<Vec<Device>>(&key);
        assert!(Arc::ptr_eq(
            before.data.as_ref().unwrap(),
            after.data.as_ref().unwrap()
        ));
        assert_eq!(before.updated_at, after.updated_at);
        assert!(dash.cache().is_fresh(&key));
        assert_eq!(dash.remote().calls("create_device"), 1);
        assert_eq!(toasts.recv().await.unwrap().level, ToastLevel::Error);
    }

    #[tokio::test]
    async fn mutations_require_a_session() {
        let dash = dashboard(FakeRemote::seeded());
        let err = dash
            .queries()
            .delete_device(&ResourceId::from(1))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::AuthRequired);
        assert_eq!(dash.remote().calls("delete_device"), 0);
    }

    #[tokio::test]
    async fn deleting_location_invalidates_device_lists_and_stats() {
        let dash = signed_in(FakeRemote::seeded()).await;
        let location = ResourceId::from(1);
        dash.queries().devices_at_location(&location).await;
        dash.queries().location(&location).await;
        dash.queries().dashboard_stats().await;

        dash.queries().delete_location(&location).await.unwrap();

        let at_location = CacheKey::collection(ResourceKind::Devices)
            .scoped("location", &location)
            .owned_by(ResourceId::from(1));
        let by_id =
            CacheKey::item(ResourceKind::Locations, location.clone()).owned_by(ResourceId::from(1));
        assert!(!dash.cache().is_fresh(&owned(ResourceKind::Devices)));
        assert!(!dash.cache().is_fresh(&at_location));
        assert!(!dash.cache().is_fresh(&by_id));
        assert!(!dash.cache().is_fresh(&owned(ResourceKind::DashboardStats)));

        let by_id_state = dash.queries().location(&location).await;
        assert!(matches!(by_id_state.error, Some(CoreError::NotFound { .. })));
    }

    // ── Invalidation facade ──────────────────────────────────────────

    #[tokio::test]
    async fn user_data_invalidation_is_scoped() {
        let dash = signed_in(FakeRemote::seeded()).await;
        dash.queries().health().await;

        assert_eq!(dash.invalidate_user_data(&ResourceId::from(99)), 0);
        assert_eq!(dash.invalidate_user_data(&ResourceId::from(1)), 2);
        assert!(dash.cache().is_fresh(&CacheKey::collection(ResourceKind::Health)));
    }

    // ── Triggers ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn focus_refetches_stale_devices_only() {
        let dash = signed_in(FakeRemote::seeded()).await;

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        assert_eq!(dash.on_window_focus(), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(dash.remote().calls("list_devices"), 2);
        assert_eq!(dash.remote().calls("list_locations"), 1);

        assert_eq!(dash.on_reconnect(), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dash.remote().calls("list_locations"), 2);
    }

    // ── Summary ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn summary_is_memoized_until_refetch() {
        let dash = signed_in(FakeRemote::seeded()).await;

        let first = dash.summary().await;
        assert_eq!(first.total_devices, 2);
        assert_eq!(first.unassigned_devices, 1);
        let again = dash.summary().await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(dash.summary_recomputations(), 1);

        dash.invalidate_by_pattern("devices");
        dash.summary().await;
        assert_eq!(dash.summary_recomputations(), 2);
    }

    #[tokio::test]
    async fn summary_without_session_is_empty() {
        let dash = dashboard(FakeRemote::seeded());
        assert_eq!(*dash.summary().await, DashboardSummary::default());
    }
}
