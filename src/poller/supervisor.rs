//! Aggregate lifecycle control over all group polling loops.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::OAuthClient;

use super::resource::ResourcePoller;

/// One spawned polling aggregate: the joined group loops plus the
/// token that cancels them.
struct Aggregate {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Aggregate {
    fn active(&self) -> bool {
        !self.handle.is_finished() && !self.cancel.is_cancelled()
    }
}

/// Owns start/stop/running over the polling loops of all resource
/// groups, single-flight guarded: at most one aggregate runs at a
/// time.
pub struct PollingSupervisor {
    auth: Arc<OAuthClient>,
    pollers: Arc<Vec<ResourcePoller>>,
    aggregate: Mutex<Option<Aggregate>>,
}

impl PollingSupervisor {
    pub fn new(auth: Arc<OAuthClient>, pollers: Vec<ResourcePoller>) -> Self {
        Self {
            auth,
            pollers: Arc::new(pollers),
            aggregate: Mutex::new(None),
        }
    }

    /// Start the polling aggregate.
    ///
    /// Idempotent: a no-op while an aggregate is already running, and a
    /// no-op without a token. A cancelled predecessor is awaited before
    /// the new aggregate spawns, so two aggregates never overlap even
    /// when start() races with cancellation completion.
    pub async fn start(&self) {
        let mut slot = self.aggregate.lock().await;

        if slot.as_ref().is_some_and(Aggregate::active) {
            tracing::debug!("polling already running");
            return;
        }
        if !self.auth.authorized().await {
            tracing::warn!("not authorized, refusing to start polling");
            return;
        }

        if let Some(previous) = slot.take() {
            if let Err(e) = previous.handle.await {
                tracing::error!(error = %e, "previous polling aggregate failed");
            }
        }

        let cancel = CancellationToken::new();
        let pollers = Arc::clone(&self.pollers);
        let child = cancel.clone();
        let handle = tokio::spawn(async move {
            let loops = pollers.iter().map(|poller| poller.run(child.clone()));
            futures::future::join_all(loops).await;
        });

        tracing::info!(groups = self.pollers.len(), "polling started");
        *slot = Some(Aggregate { handle, cancel });
    }

    /// Request cooperative cancellation of the running aggregate.
    /// Idempotent: a no-op when nothing is running.
    pub async fn stop(&self) {
        let slot = self.aggregate.lock().await;
        match slot.as_ref() {
            Some(aggregate) if aggregate.active() => {
                aggregate.cancel.cancel();
                tracing::info!("polling stop requested");
            }
            _ => tracing::debug!("polling not running"),
        }
    }

    /// True iff an aggregate exists and is neither finished nor
    /// cancelled.
    pub async fn running(&self) -> bool {
        self.aggregate.lock().await.as_ref().is_some_and(Aggregate::active)
    }

    /// Stop and wait for the aggregate to settle. Cancellation is a
    /// normal termination, so the supervisor can be restarted cleanly.
    pub async fn shutdown(&self) {
        let mut slot = self.aggregate.lock().await;
        if let Some(aggregate) = slot.take() {
            aggregate.cancel.cancel();
            if let Err(e) = aggregate.handle.await {
                tracing::error!(error = %e, "polling aggregate failed during shutdown");
            }
            tracing::info!("polling shut down");
        }
    }
}

impl std::fmt::Debug for PollingSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSupervisor")
            .field("groups", &self.pollers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthConfig;
    use crate::metrics::SinkRegistry;
    use crate::poller::GROUPS;
    use crate::Token;

    use chrono::Utc;

    const VIN: &str = "WDB1234567890";

    fn client_with_token(dir: &tempfile::TempDir, authorized: bool) -> Arc<OAuthClient> {
        let state_path = dir.path().join("state.json");
        if authorized {
            let token = Token {
                access_token: "test-at".to_string(),
                refresh_token: "test-rt".to_string(),
                expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
                scope: vec![],
            };
            std::fs::write(&state_path, serde_json::to_vec(&token).unwrap()).unwrap();
        }

        let cfg = OAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            authorize_url: "https://id.example.com/authorize".to_string(),
            token_url: "http://127.0.0.1:1/token".to_string(),
            redirect_uri: "http://localhost:8080/oauth.redirect".to_string(),
            scopes: vec![],
            state_path,
        };
        Arc::new(OAuthClient::new(cfg).unwrap())
    }

    fn build_supervisor(dir: &tempfile::TempDir, authorized: bool) -> PollingSupervisor {
        let auth = client_with_token(dir, authorized);
        let registry = prometheus::Registry::new();
        let sinks = Arc::new(SinkRegistry::new(&registry).unwrap());
        // Unroutable API base: loops run but cycles fail harmlessly.
        let pollers = GROUPS
            .iter()
            .map(|g| {
                ResourcePoller::new(
                    *g,
                    Arc::clone(&auth),
                    Arc::clone(&sinks),
                    VIN,
                    "http://127.0.0.1:1",
                )
            })
            .collect();
        PollingSupervisor::new(auth, pollers)
    }

    #[tokio::test]
    async fn test_stop_on_not_started_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = build_supervisor(&dir, true);

        assert!(!supervisor.running().await);
        supervisor.stop().await;
        assert!(!supervisor.running().await);
    }

    #[tokio::test]
    async fn test_start_without_token_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = build_supervisor(&dir, false);

        supervisor.start().await;
        assert!(!supervisor.running().await);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = build_supervisor(&dir, true);

        supervisor.start().await;
        assert!(supervisor.running().await);
        supervisor.start().await;
        assert!(supervisor.running().await);

        supervisor.shutdown().await;
        assert!(!supervisor.running().await);
    }

    #[tokio::test]
    async fn test_stop_then_restart() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = build_supervisor(&dir, true);

        supervisor.start().await;
        assert!(supervisor.running().await);

        supervisor.stop().await;
        assert!(!supervisor.running().await);
        // stop() again is a no-op.
        supervisor.stop().await;

        // start() settles the cancelled aggregate and spawns a new one.
        supervisor.start().await;
        assert!(supervisor.running().await);

        supervisor.shutdown().await;
        assert!(!supervisor.running().await);
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = build_supervisor(&dir, true);

        supervisor.start().await;
        supervisor.shutdown().await;
        supervisor.shutdown().await;
        assert!(!supervisor.running().await);
    }
}
