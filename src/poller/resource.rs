//! Per-group polling: request, response interpretation, sink updates.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::auth::OAuthClient;
use crate::metrics::SinkRegistry;

use super::group::ResourceGroup;

/// Single-field reading as found in an API payload entry.
type Payload = Vec<serde_json::Map<String, Value>>;

/// Polls one resource group and writes readings into its sinks.
///
/// A cycle never fails: transport errors, unexpected statuses, unknown
/// fields, and malformed readings are logged and skipped so one bad
/// cycle can never terminate the loop, and other groups are unaffected.
pub struct ResourcePoller {
    group: ResourceGroup,
    auth: Arc<OAuthClient>,
    sinks: Arc<SinkRegistry>,
    vin: String,
    api_base: String,
}

impl ResourcePoller {
    pub fn new(
        group: ResourceGroup,
        auth: Arc<OAuthClient>,
        sinks: Arc<SinkRegistry>,
        vin: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            group,
            auth,
            sinks,
            vin: vin.into(),
            api_base,
        }
    }

    pub fn group(&self) -> &ResourceGroup {
        &self.group
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/vehicles/{}/containers/{}",
            self.api_base, self.vin, self.group.container
        )
    }

    /// Perform one poll cycle.
    pub async fn refresh(&self) {
        let url = self.endpoint();
        let response = match self.auth.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(group = %self.group.name, url = %url, error = %e, "request failed");
                return;
            }
        };

        match response.status() {
            StatusCode::OK => match response.json::<Payload>().await {
                Ok(items) => self.apply_payload(&items),
                Err(e) => {
                    tracing::error!(group = %self.group.name, url = %url, error = %e, "invalid payload");
                }
            },
            // The API explicitly reported nothing changed.
            StatusCode::NO_CONTENT => self.mark_all_absent(),
            // Rate limiting is expected; the cycle simply produced nothing.
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::debug!(group = %self.group.name, "rate limited, skipping cycle");
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    group = %self.group.name,
                    %status,
                    url = %url,
                    body = %body,
                    "unexpected status, skipping cycle"
                );
            }
        }
    }

    /// Record all readings from a 200 payload.
    ///
    /// Every expected field found in the payload gets a value; fields
    /// the payload did not mention are marked absent. Unknown keys are
    /// warned about and skipped.
    pub(crate) fn apply_payload(&self, items: &Payload) {
        let mut pending: HashSet<&'static str> = self.group.fields.iter().copied().collect();

        for item in items {
            for (key, reading) in item {
                match pending.take(key.as_str()) {
                    Some(field) => self.record_reading(field, reading),
                    None => {
                        tracing::warn!(group = %self.group.name, key = %key, "unexpected resource");
                    }
                }
            }
        }

        for field in pending {
            if let Some(sink) = self.sinks.get(field) {
                sink.record_absent(&self.vin);
            }
        }
    }

    fn record_reading(&self, field: &'static str, reading: &Value) {
        let Some(sink) = self.sinks.get(field) else {
            tracing::warn!(group = %self.group.name, field, "no sink registered");
            return;
        };

        let raw = reading.get("value").and_then(raw_text);
        let timestamp = reading.get("timestamp").and_then(Value::as_i64);
        let (Some(raw), Some(timestamp)) = (raw, timestamp) else {
            tracing::warn!(group = %self.group.name, field, "malformed reading, skipping");
            return;
        };

        if let Err(e) = sink.record_value(&self.vin, &raw, timestamp) {
            tracing::warn!(group = %self.group.name, field, error = %e, "value mapping failed");
        }
    }

    /// Mark every expected field as checked-but-unchanged.
    fn mark_all_absent(&self) {
        for field in self.group.fields {
            if let Some(sink) = self.sinks.get(field) {
                sink.record_absent(&self.vin);
            }
        }
    }

    /// Poll forever at the group cadence until cancelled.
    ///
    /// Cancelling mid-request or mid-sleep is a normal exit, not an
    /// error.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            group = %self.group.name,
            interval_secs = self.group.interval().as_secs(),
            "polling loop started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.refresh() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.group.interval()) => {}
            }
        }
        tracing::info!(group = %self.group.name, "polling loop stopped");
    }
}

impl std::fmt::Debug for ResourcePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePoller")
            .field("group", &self.group.name)
            .field("vin", &self.vin)
            .finish_non_exhaustive()
    }
}

/// Raw textual form of a reading value. The API sends strings, but
/// numbers and booleans are tolerated.
fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthConfig;
    use crate::poller::group;
    use crate::Token;

    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use chrono::Utc;
    use prometheus::Registry;
    use tokio::net::TcpListener;

    const VIN: &str = "WDB1234567890";

    fn seeded_client(dir: &tempfile::TempDir) -> Arc<OAuthClient> {
        let state_path = dir.path().join("state.json");
        let token = Token {
            access_token: "test-at".to_string(),
            refresh_token: "test-rt".to_string(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            scope: vec![],
        };
        std::fs::write(&state_path, serde_json::to_vec(&token).unwrap()).unwrap();

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

    fn build_poller(
        group: ResourceGroup,
        api_base: &str,
        dir: &tempfile::TempDir,
    ) -> (ResourcePoller, Registry) {
        let registry = Registry::new();
        let sinks = Arc::new(SinkRegistry::new(&registry).unwrap());
        let poller = ResourcePoller::new(group, seeded_client(dir), sinks, VIN, api_base);
        (poller, registry)
    }

    /// Spawn a fixture API returning a fixed status and body for every
    /// container request.
    async fn spawn_api(status: AxumStatus, body: &'static str) -> String {
        let handler = move || async move { (status, body).into_response() };
        let router = Router::new().route("/vehicles/:vin/containers/:container", get(handler));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn series_count(registry: &Registry, name: &str) -> usize {
        registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .map(|family| family.get_metric().len())
            .unwrap_or(0)
    }

    fn gauge_value(registry: &Registry, name: &str) -> Option<f64> {
        registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .and_then(|family| family.get_metric().first().map(|m| m.get_gauge().get_value()))
    }

    #[test]
    fn test_apply_payload_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, "http://127.0.0.1:1", &dir);

        // Only soc present; rangeelectric must be marked absent.
        let items: Payload = serde_json::from_str(
            r#"[{"soc": {"value": "80", "timestamp": 1700000000000}}]"#,
        )
        .unwrap();
        poller.apply_payload(&items);

        assert_eq!(
            gauge_value(&registry, "mb_electric_state_of_charge"),
            Some(80.0)
        );
        assert_eq!(series_count(&registry, "mb_electric_range_meters"), 0);
        assert_eq!(
            series_count(&registry, "mb_electric_range_update_time_seconds"),
            1
        );
    }

    #[test]
    fn test_apply_payload_unknown_key_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, "http://127.0.0.1:1", &dir);

        let items: Payload = serde_json::from_str(
            r#"[
                {"somethingnew": {"value": "1", "timestamp": 1700000000000}},
                {"rangeelectric": {"value": "123.4", "timestamp": 1700000000000}}
            ]"#,
        )
        .unwrap();
        poller.apply_payload(&items);

        // Distance mapper: kilometers in, meters out.
        assert_eq!(
            gauge_value(&registry, "mb_electric_range_meters"),
            Some(123_400.0)
        );
    }

    #[test]
    fn test_apply_payload_malformed_reading_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ODOMETER, "http://127.0.0.1:1", &dir);

        let items: Payload = serde_json::from_str(r#"[{"odo": {"value": null}}]"#).unwrap();
        poller.apply_payload(&items);

        assert_eq!(series_count(&registry, "mb_odometer_meters"), 0);
    }

    #[tokio::test]
    async fn test_refresh_ok_records_values() {
        let body = r#"[
            {"soc": {"value": "55", "timestamp": 1700000000000}},
            {"rangeelectric": {"value": "200", "timestamp": 1700000000000}}
        ]"#;
        let base = spawn_api(AxumStatus::OK, body).await;
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, &base, &dir);

        poller.refresh().await;

        assert_eq!(
            gauge_value(&registry, "mb_electric_state_of_charge"),
            Some(55.0)
        );
        assert_eq!(
            gauge_value(&registry, "mb_electric_range_meters"),
            Some(200_000.0)
        );
    }

    #[tokio::test]
    async fn test_refresh_no_content_marks_all_absent() {
        let base = spawn_api(AxumStatus::NO_CONTENT, "").await;
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, &base, &dir);

        poller.refresh().await;

        assert_eq!(series_count(&registry, "mb_electric_state_of_charge"), 0);
        assert_eq!(
            series_count(&registry, "mb_electric_state_of_charge_update_time_seconds"),
            1
        );
        assert_eq!(
            series_count(&registry, "mb_electric_range_update_time_seconds"),
            1
        );
    }

    #[tokio::test]
    async fn test_refresh_rate_limited_touches_nothing() {
        let base = spawn_api(AxumStatus::TOO_MANY_REQUESTS, "").await;
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, &base, &dir);

        poller.refresh().await;

        assert_eq!(
            series_count(&registry, "mb_electric_state_of_charge_update_time_seconds"),
            0
        );
    }

    #[tokio::test]
    async fn test_refresh_server_error_touches_nothing() {
        let base = spawn_api(AxumStatus::INTERNAL_SERVER_ERROR, "boom").await;
        let dir = tempfile::tempdir().unwrap();
        let (poller, registry) = build_poller(group::ELECTRIC, &base, &dir);

        poller.refresh().await;

        assert_eq!(
            series_count(&registry, "mb_electric_state_of_charge_update_time_seconds"),
            0
        );
    }

    #[test]
    fn test_endpoint_path() {
        let dir = tempfile::tempdir().unwrap();
        let (poller, _) = build_poller(group::LOCK, "http://api.example.com/v2/", &dir);
        assert_eq!(
            poller.endpoint(),
            format!("http://api.example.com/v2/vehicles/{VIN}/containers/vehiclelockstatus")
        );
    }
}
