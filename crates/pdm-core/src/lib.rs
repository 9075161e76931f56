//! PdM Core - Core types for the predictive-maintenance fleet simulator
//!
//! This crate provides the fundamental data types shared by the simulation engine:
//! - `Issue` / `IssueSpec` / `IssueCatalog`: wear mechanisms and their damage formulas
//! - `Sensor` / `SensorReading` / `SensorGeometry`: the three raw sensor channels
//!   and the derived quantities the damage formulas use
//! - `DeviceState` / `DeviceEvent`: the device state machine as a pure transition function
//! - `Device` / `Technician`: per-entity simulation state
//! - `TelemetryRecord` / `RepairRecord`: the emitted event streams

pub mod error;
pub mod issue;
pub mod sensor;
pub mod state;
pub mod types;

pub use error::{CoreError, Result};
pub use issue::{Issue, IssueCatalog, IssueId, IssueSpec};
pub use sensor::{Sensor, SensorGeometry, SensorReading};
pub use state::{transition, DeviceEvent, DeviceState, ServiceKind};
pub use types::*;
