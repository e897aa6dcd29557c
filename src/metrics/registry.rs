//! Static descriptor table and the sink lookup built from it.

use std::collections::HashMap;

use super::mapper::ValueMapper;
use super::sink::MetricSink;

/// Static metadata for one telemetry field.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    /// Field key as it appears in API payloads. Unique across the table.
    pub key: &'static str,

    /// Base metric name; a unit suffix is appended when present.
    pub metric: &'static str,

    /// Help text for the value gauge.
    pub help: &'static str,

    /// Optional unit, appended to the value gauge name.
    pub unit: Option<&'static str>,

    /// Conversion applied to raw values.
    pub mapper: ValueMapper,
}

/// All known telemetry fields across every resource group.
pub const DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        key: "soc",
        metric: "mb_electric_state_of_charge",
        help: "State of Charge obtained from electric vehicle api",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "rangeelectric",
        metric: "mb_electric_range",
        help: "Electric range in kilometers",
        unit: Some("meters"),
        mapper: ValueMapper::KilometersToMeters,
    },
    Descriptor {
        key: "tanklevelpercent",
        metric: "mb_liquid_fuel_level",
        help: "Liquid fuel level",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "rangeliquid",
        metric: "mb_liquid_range",
        help: "Liquid range",
        unit: Some("meters"),
        mapper: ValueMapper::KilometersToMeters,
    },
    Descriptor {
        key: "odo",
        metric: "mb_odometer",
        help: "Odometer",
        unit: Some("meters"),
        mapper: ValueMapper::KilometersToMeters,
    },
    Descriptor {
        key: "doorlockstatusdecklid",
        metric: "mb_deck_lid_lock_status",
        help: "Deck lid (Kofferraum) lock status",
        unit: None,
        mapper: ValueMapper::BoolInverted,
    },
    Descriptor {
        key: "doorlockstatusvehicle",
        metric: "mb_vehicle_lock_status",
        help: "Vehicle lock status, 0: vehicle unlocked, 1: vehicle internal locked, \
               2: vehicle external locked, 3: vehicle selective unlocked",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "doorlockstatusgas",
        metric: "mb_gas_tank_lock_status",
        help: "Status of gas tank door lock",
        unit: None,
        mapper: ValueMapper::BoolInverted,
    },
    Descriptor {
        key: "positionHeading",
        metric: "mb_vehicle_heading_position",
        help: "Vehicle heading position",
        unit: Some("degrees"),
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "decklidstatus",
        metric: "mb_deck_lid_open",
        help: "Deck lid latch status opened/closed state",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "doorstatusfrontleft",
        metric: "mb_door_status_front_left",
        help: "Status of the front left door",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "doorstatusfrontright",
        metric: "mb_door_status_front_right",
        help: "Status of the front right door",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "doorstatusrearleft",
        metric: "mb_door_status_rear_left",
        help: "Status of the rear left door",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "doorstatusrearright",
        metric: "mb_door_status_rear_right",
        help: "Status of the rear right door",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "interiorLightsFront",
        metric: "mb_interior_front_light_status",
        help: "Front light inside",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "interiorLightsRear",
        metric: "mb_interior_rear_light_status",
        help: "Rear light inside",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "lightswitchposition",
        metric: "mb_light_switch_position",
        help: "Light switch position: 0: auto; 1: headlights; 2: sidelight left; \
               3: sidelight right; 4: parking light",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "readingLampFrontLeft",
        metric: "mb_reading_lamp_front_left",
        help: "Front left reading light",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "readingLampFrontRight",
        metric: "mb_reading_lamp_front_right",
        help: "Front right reading light",
        unit: None,
        mapper: ValueMapper::Bool,
    },
    Descriptor {
        key: "rooftopstatus",
        metric: "mb_roof_top_status",
        help: "Status of the convertible top opened/closed: 0: unlocked; \
               1: open and locked; 2: closed and locked",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "sunroofstatus",
        metric: "mb_sun_roof_status",
        help: "Status of the sunroof; 0: Tilt/slide sunroof is closed; \
               1: Tilt/slide sunroof is complete open; 2: Lifting roof is open; \
               3: Tilt/slide sunroof is running; 4: Tilt/slide sunroof in anti-booming position; \
               5: Sliding roof in intermediate position; 6: Lifting roof in intermediate position",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "windowstatusfrontleft",
        metric: "mb_window_status_front_left",
        help: "Status of the front left window; 0: window in intermediate position; \
               1: window completely opened; 2: window completely closed; \
               3: window airing position; 4: window intermediate airing position; \
               5: window currently running",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "windowstatusfrontright",
        metric: "mb_window_status_front_right",
        help: "Status of the front right window; 0: window in intermediate position; \
               1: window completely opened; 2: window completely closed; \
               3: window airing position; 4: window intermediate airing position; \
               5: window currently running",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "windowstatusrearleft",
        metric: "mb_window_status_rear_left",
        help: "Status of the rear left window; 0: window in intermediate position; \
               1: window completely opened; 2: window completely closed; \
               3: window airing position; 4: window intermediate airing position; \
               5: window currently running",
        unit: None,
        mapper: ValueMapper::Float,
    },
    Descriptor {
        key: "windowstatusrearright",
        metric: "mb_window_status_rear_right",
        help: "Status of the rear right window; 0: window in intermediate position; \
               1: window completely opened; 2: window completely closed; \
               3: window airing position; 4: window intermediate airing position; \
               5: window currently running",
        unit: None,
        mapper: ValueMapper::Float,
    },
];

/// Lookup from API field key to its metric sink.
pub struct SinkRegistry {
    sinks: HashMap<&'static str, MetricSink>,
}

impl SinkRegistry {
    /// Build one sink per descriptor, registering all gauges with the
    /// given Prometheus registry.
    ///
    /// A duplicate field key would collide on metric names and is
    /// rejected by the registry itself.
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let mut sinks = HashMap::with_capacity(DESCRIPTORS.len());
        for descriptor in DESCRIPTORS {
            let sink = MetricSink::new(descriptor, registry)?;
            sinks.insert(descriptor.key, sink);
        }
        Ok(Self { sinks })
    }

    /// Look up the sink for an API field key.
    pub fn get(&self, key: &str) -> Option<&MetricSink> {
        self.sinks.get(key)
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sink_count", &self.sinks.len())
            .finish_non_exhaustive()
    }
}
