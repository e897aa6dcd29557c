//! Per-field gauge triple: value, measurement time, update time.

use chrono::Utc;
use prometheus::{GaugeVec, Opts, Registry};

use super::mapper::{MapError, ValueMapper};
use super::registry::Descriptor;

/// Live metric state for one telemetry field, labeled by VIN.
///
/// The update-time gauge advances on every poll cycle that covered the
/// field, whether or not a value was present; consumers detect
/// staleness by watching it stop.
pub struct MetricSink {
    value: GaugeVec,
    measurement_time: GaugeVec,
    update_time: GaugeVec,
    mapper: ValueMapper,
}

impl MetricSink {
    /// Build and register the three gauges for a descriptor.
    pub fn new(descriptor: &Descriptor, registry: &Registry) -> Result<Self, prometheus::Error> {
        let value_name = match descriptor.unit {
            Some(unit) => format!("{}_{}", descriptor.metric, unit),
            None => descriptor.metric.to_string(),
        };

        let value = GaugeVec::new(Opts::new(value_name.clone(), descriptor.help), &["vin"])?;
        let measurement_time = GaugeVec::new(
            Opts::new(
                format!("{}_measurement_time_seconds", descriptor.metric),
                format!("Measurement time of {value_name}"),
            ),
            &["vin"],
        )?;
        let update_time = GaugeVec::new(
            Opts::new(
                format!("{}_update_time_seconds", descriptor.metric),
                format!("Update time of {value_name}"),
            ),
            &["vin"],
        )?;

        registry.register(Box::new(value.clone()))?;
        registry.register(Box::new(measurement_time.clone()))?;
        registry.register(Box::new(update_time.clone()))?;

        Ok(Self {
            value,
            measurement_time,
            update_time,
            mapper: descriptor.mapper,
        })
    }

    /// Record a fresh reading: mapped value, measurement time from the
    /// API timestamp (milliseconds since epoch), update time = now.
    pub fn record_value(
        &self,
        vin: &str,
        raw: &str,
        timestamp_millis: i64,
    ) -> Result<(), MapError> {
        let mapped = self.mapper.apply(raw)?;
        self.value.with_label_values(&[vin]).set(mapped);
        self.measurement_time
            .with_label_values(&[vin])
            .set(timestamp_millis as f64 / 1000.0);
        self.touch(vin);
        Ok(())
    }

    /// Record that the field was checked but no new value was reported.
    /// Only the update-time gauge advances.
    pub fn record_absent(&self, vin: &str) {
        self.touch(vin);
    }

    fn touch(&self, vin: &str) {
        self.update_time
            .with_label_values(&[vin])
            .set(Utc::now().timestamp_millis() as f64 / 1000.0);
    }
}

impl std::fmt::Debug for MetricSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSink")
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}
