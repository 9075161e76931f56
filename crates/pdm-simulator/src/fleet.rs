//! Fleet state: the devices and technicians mutated by every tick.

use crate::config::SimulationConfig;
use crate::rng::SimRng;
use pdm_core::{Device, DeviceId, DeviceState, Sensor, Technician, TechnicianId};
use serde::{Deserialize, Serialize};

/// All per-entity simulation state, owned by the driver and lent to each stage.
#[derive(Debug, Clone)]
pub struct Fleet {
    pub devices: Vec<Device>,
    pub technicians: Vec<Technician>,
}

impl Fleet {
    /// Generates the fleet for a configuration.
    ///
    /// Draws one telemetry jitter per (device, sensor) pair, device-major.
    pub fn generate(config: &SimulationConfig, issue_count: usize, rng: &mut SimRng) -> Self {
        let never_cleared = config.time_start - 1;

        let devices = (0..config.device_count)
            .map(|id| {
                let mut next_output = [0; Sensor::COUNT];
                for slot in next_output.iter_mut() {
                    *slot = config.time_start + rng.jitter(config.output_interval);
                }
                Device::new(id, issue_count, never_cleared, next_output)
            })
            .collect();

        let technicians = (0..config.technician_count).map(Technician::new).collect();

        Self {
            devices,
            technicians,
        }
    }

    /// Bind `technician` to `device`. The technician must be idle.
    pub fn bind(&mut self, technician: TechnicianId, device: DeviceId) -> Result<(), String> {
        let tech = &mut self.technicians[technician];
        if let Some(current) = tech.assignment {
            return Err(format!(
                "technician {} claimed for device {} while serving device {}",
                technician, device, current
            ));
        }
        tech.assignment = Some(device);
        Ok(())
    }

    /// Free `technician` from `device`. The binding must point at that device.
    pub fn release(&mut self, technician: TechnicianId, device: DeviceId) -> Result<(), String> {
        let tech = &mut self.technicians[technician];
        if tech.assignment != Some(device) {
            return Err(format!(
                "technician {} released from device {} but assigned to {:?}",
                technician, device, tech.assignment
            ));
        }
        tech.assignment = None;
        Ok(())
    }

    pub fn busy_technicians(&self) -> usize {
        self.technicians.iter().filter(|t| !t.is_idle()).count()
    }

    pub fn counts(&self) -> FleetCounts {
        let mut counts = FleetCounts {
            busy_technicians: self.busy_technicians(),
            ..Default::default()
        };
        for device in &self.devices {
            match device.state {
                DeviceState::Operating => counts.operating += 1,
                DeviceState::Failed => counts.failed += 1,
                DeviceState::InRepair => counts.in_repair += 1,
                DeviceState::InMaintenance => counts.in_maintenance += 1,
            }
        }
        counts
    }

    /// Sum of production rates across the fleet.
    pub fn total_production(&self) -> f64 {
        self.devices.iter().map(|d| d.production_rate).sum()
    }

    /// Check the cross-entity invariants.
    ///
    /// - a device has a technician iff it is in repair or maintenance
    /// - every busy technician points at a device that points back at it
    /// - production rate is within [0, 1] and zero unless operating
    /// - damage accumulators are non-negative
    pub fn verify(&self) -> Result<(), String> {
        for device in &self.devices {
            if device.state.is_serviced() != device.technician.is_some() {
                return Err(format!(
                    "device {} is {} with technician {:?}",
                    device.id, device.state, device.technician
                ));
            }
            if let Some(t) = device.technician {
                let bound = self.technicians.get(t).and_then(|t| t.assignment);
                if bound != Some(device.id) {
                    return Err(format!(
                        "device {} names technician {} whose assignment is {:?}",
                        device.id, t, bound
                    ));
                }
            }
            if !(0.0..=1.0).contains(&device.production_rate) {
                return Err(format!(
                    "device {} production rate {} outside [0, 1]",
                    device.id, device.production_rate
                ));
            }
            if !device.is_operating() && device.production_rate != 0.0 {
                return Err(format!(
                    "device {} is {} with production rate {}",
                    device.id, device.state, device.production_rate
                ));
            }
            if let Some(d) = device.damage.iter().find(|d| d.is_nan() || **d < 0.0) {
                return Err(format!("device {} has damage {}", device.id, d));
            }
        }

        for tech in &self.technicians {
            if let Some(d) = tech.assignment {
                let back = self.devices.get(d).and_then(|d| d.technician);
                if back != Some(tech.id) {
                    return Err(format!(
                        "technician {} assigned to device {} which names {:?}",
                        tech.id, d, back
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Per-state device counts and busy technicians at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetCounts {
    pub operating: usize,
    pub failed: usize,
    pub in_repair: usize,
    pub in_maintenance: usize,
    pub busy_technicians: usize,
}

impl FleetCounts {
    pub fn get(&self, state: DeviceState) -> usize {
        match state {
            DeviceState::Operating => self.operating,
            DeviceState::Failed => self.failed,
            DeviceState::InRepair => self.in_repair,
            DeviceState::InMaintenance => self.in_maintenance,
        }
    }
}

/// Walks a shuffled technician order, handing out idle technicians first-come.
///
/// Technicians claimed during a tick stay busy for the rest of it, so the
/// cursor never needs to move backwards.
#[derive(Debug, Clone)]
pub struct IdleTechnicians {
    order: Vec<TechnicianId>,
    cursor: usize,
}

impl IdleTechnicians {
    pub fn new(order: Vec<TechnicianId>) -> Self {
        Self { order, cursor: 0 }
    }

    /// Next idle technician in the order, if any remain.
    pub fn next_idle(&mut self, technicians: &[Technician]) -> Option<TechnicianId> {
        while let Some(&id) = self.order.get(self.cursor) {
            if technicians[id].is_idle() {
                return Some(id);
            }
            self.cursor += 1;
        }
        None
    }
}
