//! Maintenance completion: releases technicians once a visit has elapsed.

use crate::error::{Result, SimError};
use crate::fleet::Fleet;
use pdm_core::{DeviceId, DeviceState, Issue, IssueCatalog, ServiceKind, TechnicianId, Tick};
use tracing::debug;

/// A visit that finished this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub time: Tick,
    pub device: DeviceId,
    pub technician: TechnicianId,
    pub issue: Issue,
    pub kind: ServiceKind,
}

/// Return every device whose visit ran past `repair_complete_time` to
/// Operating and free its technician.
///
/// Sensors, crud damage and the served issue's damage are reset; damage for
/// every other issue carries over.
pub fn complete_maintenance(
    fleet: &mut Fleet,
    catalog: &IssueCatalog,
    now: Tick,
) -> Result<Vec<Completion>> {
    let crud = catalog.crud_id();
    let mut completions = Vec::new();

    for device_id in 0..fleet.devices.len() {
        let device = &mut fleet.devices[device_id];
        if !device.service_elapsed(now) {
            continue;
        }

        let kind = if device.state == DeviceState::InRepair {
            ServiceKind::Repair
        } else {
            ServiceKind::Maintenance
        };
        let issue = device
            .issue
            .ok_or_else(|| SimError::invariant(now, "serviced device has no issue", &*device))?;
        let served = catalog.id_of(issue);

        let technician = device
            .complete_service(crud, served, now)
            .map_err(|e| SimError::invariant(now, e.to_string(), &*device))?
            .ok_or_else(|| {
                SimError::invariant(now, "serviced device had no technician", &*device)
            })?;

        fleet
            .release(technician, device_id)
            .map_err(|detail| SimError::invariant(now, detail, &fleet.technicians[technician]))?;

        debug!(time = now, device = device_id, technician, "REPAIR COMPLETE");
        completions.push(Completion {
            time: now,
            device: device_id,
            technician,
            issue,
            kind,
        });
    }

    Ok(completions)
}
