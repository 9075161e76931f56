//! Telemetry emission.

use crate::fleet::Fleet;
use pdm_core::{DeviceState, Metric, Sensor, TelemetryRecord, Tick};

/// Emit the telemetry due at `now`.
///
/// Sensor-major: for each channel, every device whose next output time has
/// arrived reports that channel's value and its production rate, then is
/// rescheduled `output_interval` ahead. The fleet-wide busy technician and
/// per-state device counts follow.
pub fn generate_telemetry(
    fleet: &mut Fleet,
    now: Tick,
    output_interval: Tick,
) -> Vec<TelemetryRecord> {
    let mut records = Vec::new();

    for sensor in Sensor::all() {
        let channel = sensor.index();
        for device in fleet.devices.iter_mut() {
            if now < device.next_output[channel] {
                continue;
            }
            records.push(TelemetryRecord::device(
                now,
                device.id,
                Metric::Sensor(*sensor),
                device.sensors.get(*sensor),
            ));
            records.push(TelemetryRecord::device(
                now,
                device.id,
                Metric::ProductionRate,
                device.production_rate,
            ));
            device.next_output[channel] = now + output_interval;
        }
    }

    let counts = fleet.counts();
    records.push(TelemetryRecord::fleet(
        now,
        Metric::Technicians,
        counts.busy_technicians as f64,
    ));
    for state in DeviceState::all() {
        records.push(TelemetryRecord::fleet(
            now,
            Metric::Devices(*state),
            counts.get(*state) as f64,
        ));
    }

    records
}
