//! Stochastic promotion of accumulated fatal damage into failures.

use crate::error::{Result, SimError};
use crate::rng::SimRng;
use pdm_core::{Device, DeviceId, Issue, IssueCatalog, Tick};
use tracing::debug;

/// A device that failed this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Failure {
    pub time: Tick,
    pub device: DeviceId,
    pub issue: Issue,
    pub production_rate: f64,
}

/// Draw one uniform number per device for every fatal issue (issue-major, in
/// catalog order) and fail operating devices whose draw is below their damage.
///
/// Damage is used directly as the failure probability; values above 1 make
/// failure certain.
pub fn check_devices(
    devices: &mut [Device],
    catalog: &IssueCatalog,
    now: Tick,
    rng: &mut SimRng,
) -> Result<Vec<Failure>> {
    let mut failures = Vec::new();

    for spec in catalog.fatal() {
        for device in devices.iter_mut() {
            let draw = rng.uniform();
            if draw < device.damage[spec.id] && device.is_operating() {
                device
                    .fail(spec.issue, now)
                    .map_err(|e| SimError::invariant(now, e.to_string(), &*device))?;
                debug!(
                    time = now,
                    device = device.id,
                    issue = %spec.issue,
                    "DEVICE FAILURE"
                );
                failures.push(Failure {
                    time: now,
                    device: device.id,
                    issue: spec.issue,
                    production_rate: device.production_rate_at_fail,
                });
            }
        }
    }

    Ok(failures)
}
