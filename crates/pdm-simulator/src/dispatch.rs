//! Technician dispatch: reactive repair and predictive maintenance.
//!
//! Both policies walk devices and technicians in freshly shuffled orders and
//! claim the first idle technician for each device that needs one. Claims
//! are resolved sequentially, so a technician is never bound twice.

use crate::config::PdmConfig;
use crate::error::{Result, SimError};
use crate::fleet::{Fleet, IdleTechnicians};
use crate::predictor::{check_probability, FailurePredictor, FeatureMatrix, PredictorError};
use crate::rng::SimRng;
use pdm_core::{
    DeviceId, DeviceState, Issue, IssueCatalog, RepairRecord, ServiceKind, TechnicianId, Tick,
};
use tracing::{debug, warn};

/// A predictor query that failed for one device and issue.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorFailure {
    pub time: Tick,
    pub device: DeviceId,
    pub issue: Issue,
    pub error: PredictorError,
}

/// Everything the predictive check produced this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdmOutcome {
    pub repairs: Vec<RepairRecord>,
    pub failures: Vec<PredictorFailure>,
}

/// Send idle technicians to failed devices.
///
/// Draws a device permutation, then a technician permutation. Failed devices
/// left without a technician stay Failed and are retried next tick.
pub fn service_failed_devices(
    fleet: &mut Fleet,
    now: Tick,
    repair_duration: Tick,
    rng: &mut SimRng,
) -> Result<Vec<RepairRecord>> {
    let device_order = rng.permutation(fleet.devices.len());
    let mut idle = IdleTechnicians::new(rng.permutation(fleet.technicians.len()));
    let mut repairs = Vec::new();

    for device_id in device_order {
        let device = &fleet.devices[device_id];
        if device.state != DeviceState::Failed {
            continue;
        }
        let issue = device
            .issue
            .ok_or_else(|| SimError::invariant(now, "failed device has no issue", device))?;

        let Some(tech) = idle.next_idle(&fleet.technicians) else {
            break;
        };
        let record = service_device(
            fleet,
            device_id,
            issue,
            tech,
            ServiceKind::Repair,
            now,
            repair_duration,
        )?;
        debug!(
            time = now,
            device = device_id,
            issue = %issue,
            technician = tech,
            repair_complete_time = now + repair_duration,
            "FAILURE MAINTENANCE"
        );
        repairs.push(record);
    }

    Ok(repairs)
}

/// Send operating devices with a high predicted failure probability to
/// preventive maintenance.
///
/// Draws a technician permutation, then a device permutation, and reuses both
/// for every fatal issue in catalog order. The first issue to trigger wins
/// for a device, since later issues see it no longer Operating. Predictor
/// errors are logged and collected without stopping the check.
pub fn pdm_check(
    fleet: &mut Fleet,
    catalog: &IssueCatalog,
    predictor: &dyn FailurePredictor,
    pdm: &PdmConfig,
    now: Tick,
    maintenance_duration: Tick,
    rng: &mut SimRng,
) -> Result<PdmOutcome> {
    let features = FeatureMatrix::build(&fleet.devices, catalog, now);
    let mut idle = IdleTechnicians::new(rng.permutation(fleet.technicians.len()));
    let device_order = rng.permutation(fleet.devices.len());
    let mut outcome = PdmOutcome::default();

    for spec in catalog.fatal() {
        for &device_id in &device_order {
            if !fleet.devices[device_id].is_operating() {
                continue;
            }

            let row = &features.rows[device_id];
            let probability = match predictor
                .probability(spec.issue, pdm.threshold_time, row)
                .and_then(check_probability)
            {
                Ok(p) => p,
                Err(error) => {
                    warn!(
                        time = now,
                        device = device_id,
                        issue = %spec.issue,
                        error = %error,
                        "Predictor query failed"
                    );
                    outcome.failures.push(PredictorFailure {
                        time: now,
                        device: device_id,
                        issue: spec.issue,
                        error,
                    });
                    continue;
                }
            };
            if probability <= pdm.threshold_probability {
                continue;
            }

            let Some(tech) = idle.next_idle(&fleet.technicians) else {
                continue;
            };
            let record = service_device(
                fleet,
                device_id,
                spec.issue,
                tech,
                ServiceKind::Maintenance,
                now,
                maintenance_duration,
            )?;
            debug!(
                time = now,
                device = device_id,
                issue = %spec.issue,
                technician = tech,
                probability,
                repair_complete_time = now + maintenance_duration,
                "PREVENTIVE MAINTENANCE"
            );
            outcome.repairs.push(record);
        }
    }

    Ok(outcome)
}

/// Bind `tech` to `device_id`, start the visit and build its repair record.
fn service_device(
    fleet: &mut Fleet,
    device_id: DeviceId,
    issue: Issue,
    tech: TechnicianId,
    kind: ServiceKind,
    now: Tick,
    duration: Tick,
) -> Result<RepairRecord> {
    fleet
        .bind(tech, device_id)
        .map_err(|detail| SimError::invariant(now, detail, &fleet.technicians[tech]))?;

    let device = &mut fleet.devices[device_id];
    device
        .begin_service(kind, issue, tech, now, duration)
        .map_err(|e| SimError::invariant(now, e.to_string(), &*device))?;

    Ok(RepairRecord {
        time: now,
        device: device_id,
        issue,
        technician: tech,
        kind,
        sensors: device.sensors,
        production_rate: device.production_rate_at_fail,
    })
}
