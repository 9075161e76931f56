//! Core data types for the fleet simulation

use crate::error::Result;
use crate::issue::{Issue, IssueId};
use crate::sensor::{Sensor, SensorReading};
use crate::state::{transition, DeviceEvent, DeviceState, ServiceKind};
use serde::{Serialize, Serializer};
use std::fmt;

/// Discrete simulation time
pub type Tick = i64;

/// Stable index of a device in the fleet
pub type DeviceId = usize;

/// Stable index of a technician in the pool
pub type TechnicianId = usize;

/// A simulated device and everything the per-tick stages read or mutate on it.
///
/// Timestamps are `None` whenever the current state gives them no meaning:
/// `fail_time` outside Failed/serviced states, repair times outside serviced states.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub state: DeviceState,
    pub sensors: SensorReading,
    /// One running damage sum per catalog issue, indexed by `IssueId`
    pub damage: Vec<f64>,
    /// Issue that failed the device or that it is being serviced for
    pub issue: Option<Issue>,
    pub technician: Option<TechnicianId>,
    pub fail_time: Option<Tick>,
    pub repair_start_time: Option<Tick>,
    pub repair_complete_time: Option<Tick>,
    pub production_rate: f64,
    /// Production rate in effect at the instant of the last failure
    pub production_rate_at_fail: f64,
    /// Last time each issue's damage was reset by service, indexed by `IssueId`
    pub last_cleared: Vec<Tick>,
    /// Next telemetry output time per sensor channel
    pub next_output: [Tick; Sensor::COUNT],
}

impl Device {
    /// Create an operating device with zeroed sensors and damage.
    ///
    /// `never_cleared` seeds every last-clear time.
    pub fn new(
        id: DeviceId,
        issue_count: usize,
        never_cleared: Tick,
        next_output: [Tick; Sensor::COUNT],
    ) -> Self {
        Self {
            id,
            state: DeviceState::Operating,
            sensors: SensorReading::default(),
            damage: vec![0.0; issue_count],
            issue: None,
            technician: None,
            fail_time: None,
            repair_start_time: None,
            repair_complete_time: None,
            production_rate: 0.0,
            production_rate_at_fail: 0.0,
            last_cleared: vec![never_cleared; issue_count],
            next_output,
        }
    }

    pub fn is_operating(&self) -> bool {
        self.state == DeviceState::Operating
    }

    /// Operating -> Failed, recording the trigger and the production rate at failure.
    ///
    /// Production stops at once, so a device is never non-Operating with a
    /// non-zero rate.
    pub fn fail(&mut self, issue: Issue, now: Tick) -> Result<()> {
        self.state = transition(self.state, DeviceEvent::Fail(issue))?;
        self.issue = Some(issue);
        self.fail_time = Some(now);
        self.production_rate_at_fail = self.production_rate;
        self.production_rate = 0.0;
        Ok(())
    }

    /// Bind a technician and start a repair or maintenance visit.
    pub fn begin_service(
        &mut self,
        kind: ServiceKind,
        issue: Issue,
        technician: TechnicianId,
        now: Tick,
        duration: Tick,
    ) -> Result<()> {
        self.state = transition(self.state, DeviceEvent::Dispatch(kind))?;
        self.issue = Some(issue);
        self.technician = Some(technician);
        self.repair_start_time = Some(now);
        self.repair_complete_time = Some(now + duration);
        self.production_rate = 0.0;
        Ok(())
    }

    /// Whether the service visit has run past its completion time.
    pub fn service_elapsed(&self, now: Tick) -> bool {
        self.state.is_serviced() && self.repair_complete_time.is_some_and(|t| now > t)
    }

    /// Finish the visit: zero the sensors, clear the crud and serviced issue
    /// damage, and return to Operating.
    ///
    /// Returns the released technician, if one was bound. Damage for every
    /// other issue is left untouched.
    pub fn complete_service(
        &mut self,
        crud: IssueId,
        served: Option<IssueId>,
        now: Tick,
    ) -> Result<Option<TechnicianId>> {
        self.state = transition(self.state, DeviceEvent::Complete)?;
        self.sensors.reset();
        self.damage[crud] = 0.0;
        if let Some(id) = served {
            self.damage[id] = 0.0;
            self.last_cleared[id] = now;
        }
        self.issue = None;
        self.fail_time = None;
        self.repair_start_time = None;
        self.repair_complete_time = None;
        self.production_rate_at_fail = 0.0;
        Ok(self.technician.take())
    }
}

/// An interchangeable repair/maintenance resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Technician {
    pub id: TechnicianId,
    /// Device currently being serviced; `None` while idle
    pub assignment: Option<DeviceId>,
}

impl Technician {
    pub fn new(id: TechnicianId) -> Self {
        Self {
            id,
            assignment: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.assignment.is_none()
    }
}

/// Name of a telemetry series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Sensor(Sensor),
    ProductionRate,
    /// Fleet-wide count of technicians bound to a device
    Technicians,
    /// Fleet-wide count of devices in a state
    Devices(DeviceState),
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Sensor(sensor) => sensor.as_str(),
            Metric::ProductionRate => "production_rate",
            Metric::Technicians => "N_technicians",
            Metric::Devices(DeviceState::Operating) => "N_operating",
            Metric::Devices(DeviceState::Failed) => "N_failed",
            Metric::Devices(DeviceState::InRepair) => "N_repair",
            Metric::Devices(DeviceState::InMaintenance) => "N_maintenance",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single telemetry sample. `device` is `None` for fleet-wide aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub time: Tick,
    pub device: Option<DeviceId>,
    pub metric: Metric,
    pub value: f64,
}

impl TelemetryRecord {
    pub fn device(time: Tick, device: DeviceId, metric: Metric, value: f64) -> Self {
        Self {
            time,
            device: Some(device),
            metric,
            value,
        }
    }

    pub fn fleet(time: Tick, metric: Metric, value: f64) -> Self {
        Self {
            time,
            device: None,
            metric,
            value,
        }
    }
}

/// A technician dispatch, later used as a training label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairRecord {
    pub time: Tick,
    pub device: DeviceId,
    pub issue: Issue,
    pub technician: TechnicianId,
    pub kind: ServiceKind,
    /// Sensor values when the technician arrived
    pub sensors: SensorReading,
    /// Production rate at the moment of failure (zero for maintenance visits)
    pub production_rate: f64,
}
