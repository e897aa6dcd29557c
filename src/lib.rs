//! Paddock - OAuth2 Vehicle Telemetry Exporter
//!
//! Authenticates against the OAuth2-protected vehicle telemetry API,
//! polls each resource group at its own cadence, and republishes the
//! latest readings as Prometheus gauges.
//!
//! # Architecture
//!
//! - **auth**: token lifecycle (code exchange, auto-refresh, JSON-file
//!   persistence) and the serialized outbound request path
//! - **metrics**: static field descriptors, value mappers, and the
//!   gauge sinks they feed
//! - **poller**: one periodic loop per resource group under a
//!   single-flight start/stop supervisor
//! - **server**: `/metrics` exposition and the OAuth browser endpoints
//! - **config**: YAML configuration with environment variable expansion

pub mod auth;
pub mod config;
pub mod metrics;
pub mod poller;
pub mod server;

pub use auth::{AuthError, OAuthClient, Token};
pub use config::AppConfig;
pub use metrics::{MapError, MetricSink, SinkRegistry, ValueMapper};
pub use poller::{PollingSupervisor, ResourceGroup, ResourcePoller};
