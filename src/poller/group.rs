//! Resource group definitions: which fields live behind which API
//! container, and how often each container may be polled.

use std::time::Duration;

/// One API container with its polling cadence and expected fields.
#[derive(Debug, Clone, Copy)]
pub struct ResourceGroup {
    /// Short name used in logs.
    pub name: &'static str,

    /// Container segment of the endpoint path.
    pub container: &'static str,

    /// Allowed calls per hour for this container.
    pub calls_per_hour: u32,

    /// Field keys this container is expected to report.
    pub fields: &'static [&'static str],
}

impl ResourceGroup {
    /// Sleep interval between polls: `ceil(3600 / calls_per_hour)`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(3600u32.div_ceil(self.calls_per_hour)))
    }
}

/// Electric drivetrain status.
pub const ELECTRIC: ResourceGroup = ResourceGroup {
    name: "electric",
    container: "electricvehicle",
    calls_per_hour: 2,
    fields: &["soc", "rangeelectric"],
};

/// Liquid fuel status.
pub const FUEL: ResourceGroup = ResourceGroup {
    name: "fuel",
    container: "fuelstatus",
    calls_per_hour: 1,
    fields: &["tanklevelpercent", "rangeliquid"],
};

/// Odometer reading.
pub const ODOMETER: ResourceGroup = ResourceGroup {
    name: "odometer",
    container: "payasyoudrive",
    calls_per_hour: 1,
    fields: &["odo"],
};

/// Lock status and heading.
pub const LOCK: ResourceGroup = ResourceGroup {
    name: "lock",
    container: "vehiclelockstatus",
    calls_per_hour: 50,
    fields: &[
        "doorlockstatusdecklid",
        "doorlockstatusvehicle",
        "doorlockstatusgas",
        "positionHeading",
    ],
};

/// Doors, lights, roof, and windows.
pub const STATUS: ResourceGroup = ResourceGroup {
    name: "status",
    container: "vehiclestatus",
    calls_per_hour: 50,
    fields: &[
        "decklidstatus",
        "doorstatusfrontleft",
        "doorstatusfrontright",
        "doorstatusrearleft",
        "doorstatusrearright",
        "interiorLightsFront",
        "interiorLightsRear",
        "lightswitchposition",
        "readingLampFrontLeft",
        "readingLampFrontRight",
        "rooftopstatus",
        "sunroofstatus",
        "windowstatusfrontleft",
        "windowstatusfrontright",
        "windowstatusrearleft",
        "windowstatusrearright",
    ],
};

/// All polled resource groups.
pub const GROUPS: [ResourceGroup; 5] = [ELECTRIC, FUEL, ODOMETER, LOCK, STATUS];
