//! Polling Layer
//!
//! One periodic polling loop per resource group, aggregated under a
//! single start/stop lifecycle:
//!
//! - [`ResourceGroup`]: endpoint container, cadence, and field set
//! - [`ResourcePoller`]: one GET-interpret-record cycle per group
//! - [`PollingSupervisor`]: single-flight start/stop/running control
//!   over all group loops

mod group;
mod resource;
mod supervisor;

pub use group::{ResourceGroup, GROUPS};
pub use resource::ResourcePoller;
pub use supervisor::PollingSupervisor;
