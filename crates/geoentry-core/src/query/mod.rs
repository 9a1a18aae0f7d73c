// ── Resource queries & mutations ──
//
// Typed reads and writes per resource kind, layered over the query cache.
// Reads of protected kinds only run with a session and are keyed to the
// signed-in user. Writes go straight to the server; on success they
// invalidate what they may have changed and raise a toast.

mod aggregate;
mod devices;
mod locations;
mod proximity;

use std::future::Future;
use std::sync::Arc;

use geoentry_api::ResourceId;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::cache::{CacheKey, QueryCache, QueryState, ResourceKind};
use crate::error::CoreError;
use crate::notify::Notifier;
use crate::readiness::ReadinessGate;
use crate::remote::RemoteData;
use crate::session::AuthSession;

/// Write operation, for notifications and invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

/// Entry point for every resource read and write.
pub struct Queries<R> {
    remote: Arc<R>,
    cache: QueryCache,
    session: watch::Receiver<Option<Arc<AuthSession>>>,
    readiness: ReadinessGate,
    notifier: Notifier,
}

impl<R> Clone for Queries<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            cache: self.cache.clone(),
            session: self.session.clone(),
            readiness: self.readiness.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<R: RemoteData> Queries<R> {
    pub(crate) fn new(
        remote: Arc<R>,
        cache: QueryCache,
        session: watch::Receiver<Option<Arc<AuthSession>>>,
        readiness: ReadinessGate,
        notifier: Notifier,
    ) -> Self {
        Self {
            remote,
            cache,
            session,
            readiness,
            notifier,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn current_user_id(&self) -> Option<ResourceId> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user.id.clone())
    }

    /// Cached read of `key`, loading through `fetcher` when needed.
    ///
    /// Protected kinds are skipped without a session and scoped to the
    /// signed-in user otherwise.
    pub(crate) async fn read<T, F, Fut>(&self, key: CacheKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, geoentry_api::Error>> + Send + 'static,
    {
        let key = if key.kind().is_protected() {
            let Some(user) = self.current_user_id() else {
                trace!(key = %key, "no session, query disabled");
                return QueryState::disabled();
            };
            key.owned_by(user)
        } else {
            key
        };

        let _loading = (!self.cache.is_fresh(&key)).then(|| self.readiness.track(key.kind()));
        let remote = Arc::clone(&self.remote);
        self.cache
            .fetch(key, move || {
                let request = fetcher(Arc::clone(&remote));
                async move { request.await.map_err(CoreError::from) }
            })
            .await
    }

    /// Run a write and settle the cache and notifications.
    ///
    /// Never retried. On failure the cache is left exactly as it was.
    pub(crate) async fn mutate<T, Fut>(
        &self,
        kind: ResourceKind,
        action: MutationAction,
        id: Option<&ResourceId>,
        request: Fut,
    ) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, geoentry_api::Error>>,
    {
        if self.current_user_id().is_none() {
            return Err(CoreError::AuthRequired);
        }

        match request.await {
            Ok(value) => {
                let marked = self.invalidate_after(kind, action, id);
                debug!(%kind, %action, marked, "mutation applied");
                self.notifier.success(format!(
                    "{} {} successfully",
                    capitalize(kind.noun()),
                    action.past_tense()
                ));
                Ok(value)
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(%kind, %action, error = %err, "mutation failed");
                self.notifier
                    .error(format!("Failed to {action} {}: {err}", kind.noun()));
                Err(err)
            }
        }
    }

    fn invalidate_after(
        &self,
        kind: ResourceKind,
        action: MutationAction,
        id: Option<&ResourceId>,
    ) -> usize {
        let dependent = match (kind, action) {
            // Devices reference locations; events reference devices.
            (ResourceKind::Locations, MutationAction::Delete) => Some(ResourceKind::Devices),
            (ResourceKind::Devices, MutationAction::Delete) => Some(ResourceKind::ProximityEvents),
            _ => None,
        };

        self.cache.invalidate_where(|key| {
            let kind_hit = key.kind() == kind && (key.is_collection() || key.id() == id);
            kind_hit
                || key.kind() == ResourceKind::DashboardStats
                || dependent.is_some_and(|dep| key.kind() == dep && key.is_collection())
        })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geoentry_api::ProximityEventFilter;
    use secrecy::SecretString;

    use super::*;
    use crate::testing::{self, FakeRemote, Failure};

    fn queries(signed_in: bool) -> (Queries<FakeRemote>, watch::Sender<Option<Arc<AuthSession>>>) {
        let session = signed_in
            .then(|| Arc::new(AuthSession::new(testing::user(1), SecretString::from("t"))));
        let (tx, rx) = watch::channel(session);
        let queries = Queries::new(
            Arc::new(FakeRemote::seeded()),
            QueryCache::default(),
            rx,
            ReadinessGate::new(),
            Notifier::default(),
        );
        (queries, tx)
    }

    #[test]
    fn nouns_are_capitalized() {
        assert_eq!(capitalize("proximity event"), "Proximity event");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn protected_reads_are_keyed_to_the_user() {
        let (queries, _session) = queries(true);
        queries.devices().await;

        let keys = queries.cache().keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].owner(), Some(&ResourceId::from(1)));
        assert_eq!(keys[0].path(), "devices");
    }

    #[tokio::test]
    async fn unprotected_reads_have_no_owner() {
        let (queries, _session) = queries(false);
        assert!(queries.health().await.is_success());
        assert_eq!(queries.cache().keys()[0].owner(), None);
        assert!(!queries.dashboard_stats().await.enabled);
    }

    #[tokio::test]
    async fn losing_the_session_disables_reads() {
        let (queries, session) = queries(true);
        assert!(queries.locations().await.is_success());

        session.send_replace(None);
        let state = queries.locations().await;
        assert!(!state.enabled);
        assert_eq!(state.into_result().unwrap_err(), CoreError::AuthRequired);
    }

    #[tokio::test]
    async fn deleting_a_device_invalidates_event_lists() {
        let (queries, _session) = queries(true);
        let device = ResourceId::from(1);
        queries.events_for_device(&device, Some(10)).await;
        queries.proximity_events(&ProximityEventFilter::default()).await;
        queries.locations().await;

        queries.delete_device(&device).await.unwrap();

        let cache = queries.cache();
        let stale: Vec<String> = cache
            .keys()
            .into_iter()
            .filter(|k| !cache.is_fresh(k))
            .map(|k| k.path())
            .collect();
        assert_eq!(stale.len(), 2);
        assert!(stale.iter().all(|p| p.starts_with("proximity-events")));
    }

    #[tokio::test]
    async fn update_invalidates_only_its_own_item() {
        let (queries, _session) = queries(true);
        let (one, two) = (ResourceId::from(1), ResourceId::from(2));
        queries.device(&one).await;
        queries.device(&two).await;

        queries
            .update_device(
                &one,
                &geoentry_api::UpdateDevice {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let owner = ResourceId::from(1);
        let key = |id: &ResourceId| {
            CacheKey::item(ResourceKind::Devices, id.clone()).owned_by(owner.clone())
        };
        assert!(!queries.cache().is_fresh(&key(&one)));
        assert!(queries.cache().is_fresh(&key(&two)));
        assert_eq!(queries.device(&one).await.data.unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn failed_mutations_are_not_retried() {
        let (queries, _session) = queries(true);
        queries
            .remote
            .fail_next("delete_location", Failure::Unavailable, 1);

        let err = queries
            .delete_location(&ResourceId::from(1))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(queries.remote.calls("delete_location"), 1);
    }
}
