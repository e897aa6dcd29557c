//! Metric Layer
//!
//! Maps raw telemetry field readings onto Prometheus gauges:
//!
//! - [`ValueMapper`]: named pure conversions applied to raw values
//! - [`Descriptor`]: static metadata binding an API field key to its
//!   metric name, help text, unit, and mapper
//! - [`MetricSink`]: value gauge plus measurement/update timestamp
//!   gauges for one field, labeled by VIN
//! - [`SinkRegistry`]: field-key lookup over all sinks

mod mapper;
mod registry;
mod sink;

pub use mapper::{MapError, ValueMapper};
pub use registry::{Descriptor, SinkRegistry, DESCRIPTORS};
pub use sink::MetricSink;
