//! Device state machine.
//!
//! Transitions are a pure function of the current state and an event, so
//! the legal lifecycle can be checked without running a simulation:
//!
//! ```text
//! Operating --Fail--> Failed --Dispatch(Repair)--> InRepair ------+
//!     |                                                          |
//!     +--Dispatch(Maintenance)--> InMaintenance --Complete--+    |
//!     ^                                                     |    |
//!     +-----------------------------------------------------+----+ (Complete)
//! ```

use crate::error::{CoreError, Result};
use crate::issue::Issue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Operating,
    Failed,
    InRepair,
    InMaintenance,
}

impl DeviceState {
    /// All states, in the order fleet counts are reported.
    pub fn all() -> &'static [DeviceState] {
        &[
            DeviceState::Operating,
            DeviceState::Failed,
            DeviceState::InRepair,
            DeviceState::InMaintenance,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Operating => "operating",
            DeviceState::Failed => "failed",
            DeviceState::InRepair => "repair",
            DeviceState::InMaintenance => "maintenance",
        }
    }

    /// Whether a technician must be bound to a device in this state.
    pub fn is_serviced(&self) -> bool {
        matches!(self, DeviceState::InRepair | DeviceState::InMaintenance)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of technician visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Reactive visit to a failed device.
    Repair,
    /// Preventive visit to a device predicted to fail soon.
    Maintenance,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Repair => "repair",
            ServiceKind::Maintenance => "maintenance",
        }
    }

    /// State a device enters when a technician arrives for this kind of visit.
    pub fn target_state(&self) -> DeviceState {
        match self {
            ServiceKind::Repair => DeviceState::InRepair,
            ServiceKind::Maintenance => DeviceState::InMaintenance,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that drive the device state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A fatal issue's damage was promoted to a failure.
    Fail(Issue),
    /// A technician was bound to the device.
    Dispatch(ServiceKind),
    /// The service duration elapsed.
    Complete,
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::Fail(issue) => write!(f, "fail({})", issue),
            DeviceEvent::Dispatch(kind) => write!(f, "dispatch({})", kind),
            DeviceEvent::Complete => f.write_str("complete"),
        }
    }
}

/// Compute the next state, rejecting any transition outside the lifecycle.
pub fn transition(from: DeviceState, event: DeviceEvent) -> Result<DeviceState> {
    use DeviceEvent::*;
    use DeviceState::*;

    match (from, event) {
        (Operating, Fail(_)) => Ok(Failed),
        (Failed, Dispatch(ServiceKind::Repair)) => Ok(InRepair),
        (Operating, Dispatch(ServiceKind::Maintenance)) => Ok(InMaintenance),
        (InRepair, Complete) | (InMaintenance, Complete) => Ok(Operating),
        _ => Err(CoreError::IllegalTransition { from, event }),
    }
}
