//! Sensor random walk, damage accrual and production rate.

use crate::rng::SimRng;
use pdm_core::{Device, DeviceState, IssueCatalog, Sensor};

/// Random-walk every operating device's sensors.
///
/// A perturbation is drawn for every (device, sensor) pair, device-major,
/// including frozen non-operating devices, so the draw sequence does not
/// depend on fleet state.
pub fn update_sensors(devices: &mut [Device], sigma: f64, rng: &mut SimRng) {
    for device in devices.iter_mut() {
        let operating = device.is_operating();
        for sensor in Sensor::all() {
            let delta = rng.normal(sigma);
            if operating {
                *device.sensors.get_mut(*sensor) += delta;
            }
        }
    }
}

/// Add this tick's damage increment for every issue to every operating device.
pub fn update_damage(devices: &mut [Device], catalog: &IssueCatalog) {
    for device in devices.iter_mut().filter(|d| d.is_operating()) {
        let geometry = device.sensors.geometry();
        for spec in catalog.specs() {
            device.damage[spec.id] += spec.damage_increment(&geometry);
        }
    }
}

/// Recompute every device's production rate from its current crud damage.
pub fn compute_production(devices: &mut [Device], catalog: &IssueCatalog) {
    let crud = catalog.crud_id();
    for device in devices.iter_mut() {
        device.production_rate = production_rate(device.state, device.damage[crud]);
    }
}

/// `clamp(1 - crud_damage, 0, 1)` while operating, otherwise zero.
pub fn production_rate(state: DeviceState, crud_damage: f64) -> f64 {
    match state {
        DeviceState::Operating => (1.0 - crud_damage).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdm_core::{Issue, IssueSpec, SensorReading};

    fn devices(n: usize) -> Vec<Device> {
        (0..n).map(|id| Device::new(id, 4, -1, [0; 3])).collect()
    }

    #[test]
    fn test_only_operating_devices_move() {
        let mut fleet = devices(3);
        fleet[1].state = DeviceState::Failed;
        let mut rng = SimRng::new(11);
        for _ in 0..10 {
            update_sensors(&mut fleet, 1.0, &mut rng);
        }
        assert_ne!(fleet[0].sensors, SensorReading::default());
        assert_eq!(fleet[1].sensors, SensorReading::default());
        assert_ne!(fleet[2].sensors, SensorReading::default());
    }

    #[test]
    fn test_draw_count_is_independent_of_state() {
        let mut a = devices(4);
        let mut b = devices(4);
        b[0].state = DeviceState::InRepair;
        b[3].state = DeviceState::Failed;

        let mut rng_a = SimRng::new(2);
        let mut rng_b = SimRng::new(2);
        update_sensors(&mut a, 0.3, &mut rng_a);
        update_sensors(&mut b, 0.3, &mut rng_b);

        assert_eq!(a[1].sensors, b[1].sensors);
        assert_eq!(a[2].sensors, b[2].sensors);
        assert_eq!(rng_a.uniform().to_bits(), rng_b.uniform().to_bits());
    }

    #[test]
    fn test_damage_accrues_only_while_operating() {
        let catalog = IssueCatalog::reference();
        let mut fleet = devices(2);
        for d in fleet.iter_mut() {
            d.sensors = SensorReading::new(1.0, 2.0, 3.0);
        }
        fleet[1].state = DeviceState::InMaintenance;

        update_damage(&mut fleet, &catalog);
        update_damage(&mut fleet, &catalog);

        let r = 14f64.sqrt();
        assert!((fleet[0].damage[0] - 2.0 * 0.1 * r).abs() < 1e-12);
        assert!((fleet[0].damage[1] - 2.0 * 0.000_08).abs() < 1e-15);
        assert!((fleet[0].damage[2] - 2.0 * 0.000_01 * 4.0).abs() < 1e-15);
        assert!((fleet[0].damage[3] - 2.0 * 0.000_002 * 5f64.sqrt() * 3.0).abs() < 1e-15);
        assert_eq!(fleet[1].damage, vec![0.0; 4]);
    }

    #[test]
    fn test_damage_is_non_decreasing() {
        let catalog = IssueCatalog::new(vec![
            IssueSpec::new(Issue::Crud, 0, 0.1, false),
            IssueSpec::new(Issue::JammedRotor, 1, 1.0, true),
            IssueSpec::new(Issue::CrackedValve, 2, 1.0, true),
            IssueSpec::new(Issue::BrokenGear, 3, 1.0, true),
        ])
        .unwrap();
        let mut fleet = devices(5);
        let mut rng = SimRng::new(99);
        let mut previous: Vec<Vec<f64>> = fleet.iter().map(|d| d.damage.clone()).collect();
        for _ in 0..200 {
            update_sensors(&mut fleet, 0.5, &mut rng);
            update_damage(&mut fleet, &catalog);
            for (device, before) in fleet.iter().zip(&previous) {
                for (now, then) in device.damage.iter().zip(before) {
                    assert!(now >= then);
                }
            }
            previous = fleet.iter().map(|d| d.damage.clone()).collect();
        }
    }

    #[test]
    fn test_production_rate_uses_accumulated_crud() {
        let catalog = IssueCatalog::reference();
        let mut fleet = devices(3);
        fleet[0].damage[0] = 0.25;
        fleet[1].damage[0] = 3.0;
        fleet[2].damage[0] = 0.25;
        fleet[2].state = DeviceState::Failed;

        compute_production(&mut fleet, &catalog);
        assert_eq!(fleet[0].production_rate, 0.75);
        assert_eq!(fleet[1].production_rate, 0.0);
        assert_eq!(fleet[2].production_rate, 0.0);

        fleet[0].damage[0] = 0.5;
        compute_production(&mut fleet, &catalog);
        assert_eq!(fleet[0].production_rate, 0.5);
    }

    #[test]
    fn test_production_rate_bounds() {
        assert_eq!(production_rate(DeviceState::Operating, 0.0), 1.0);
        assert_eq!(production_rate(DeviceState::Operating, 1.5), 0.0);
        assert_eq!(production_rate(DeviceState::InRepair, 0.0), 0.0);
    }
}
