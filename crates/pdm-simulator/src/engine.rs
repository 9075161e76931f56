//! Simulation driver.
//!
//! Owns the fleet, the issue catalog and the random source, and advances a
//! discrete clock through a fixed pipeline:
//!
//! 1. sensor random walk
//! 2. damage accrual
//! 3. production recompute
//! 4. predictive maintenance (predictive strategy, every `skip_time` ticks)
//! 5. failure draws
//! 6. reactive repair dispatch
//! 7. maintenance completion
//! 8. telemetry emission
//!
//! Later stages see state mutated by earlier ones, so a device can fail and
//! have a technician dispatched within the same tick.

use crate::config::{SimulationConfig, Strategy};
use crate::dispatch::{pdm_check, service_failed_devices, PredictorFailure};
use crate::error::{Result, SimError};
use crate::failure::{check_devices, Failure};
use crate::fleet::Fleet;
use crate::maintenance::{complete_maintenance, Completion};
use crate::predictor::FailurePredictor;
use crate::report::RunReport;
use crate::rng::SimRng;
use crate::sensors::{compute_production, update_damage, update_sensors};
use crate::telemetry::generate_telemetry;
use crate::writer::LogSink;
use pdm_core::{IssueCatalog, RepairRecord, TelemetryRecord, Tick};
use std::time::Instant;
use tracing::{debug, info};

/// Everything one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub time: Tick,
    pub telemetry: Vec<TelemetryRecord>,
    /// Repair and preventive maintenance dispatches, in dispatch order
    pub repairs: Vec<RepairRecord>,
    pub failures: Vec<Failure>,
    pub completions: Vec<Completion>,
    pub predictor_failures: Vec<PredictorFailure>,
}

/// A fleet simulation run.
pub struct Simulation {
    config: SimulationConfig,
    catalog: IssueCatalog,
    fleet: Fleet,
    rng: SimRng,
    predictor: Option<Box<dyn FailurePredictor>>,
    time: Tick,
    end: Tick,
}

impl Simulation {
    /// Validates the configuration and generates the fleet.
    ///
    /// The predictive strategy requires a predictor that supports every
    /// fatal issue in the catalog; otherwise the run never starts.
    pub fn new(
        config: SimulationConfig,
        predictor: Option<Box<dyn FailurePredictor>>,
    ) -> Result<Self> {
        let catalog = config.validate()?;

        if config.strategy == Strategy::Predictive {
            let Some(p) = predictor.as_deref() else {
                return Err(SimError::config(
                    "predictive strategy selected without a failure predictor",
                ));
            };
            let missing: Vec<String> = catalog
                .fatal()
                .filter(|spec| !p.supports(spec.issue))
                .map(|spec| spec.issue.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(SimError::config(format!(
                    "failure predictor has no model for: {}",
                    missing.join(", ")
                )));
            }
        }

        let mut rng = SimRng::new(config.seed);
        let fleet = Fleet::generate(&config, catalog.len(), &mut rng);
        let time = config.time_start;
        let end = config.end_time()?;

        info!(
            devices = config.device_count,
            technicians = config.technician_count,
            strategy = %config.strategy,
            seed = config.seed,
            ticks = config.ticks,
            "Simulation initialized"
        );

        Ok(Self {
            config,
            catalog,
            fleet,
            rng,
            predictor,
            time,
            end,
        })
    }

    /// Advance the clock by one tick.
    pub fn step(&mut self) -> Result<TickOutput> {
        let now = self.time;
        let cfg = &self.config;

        update_sensors(&mut self.fleet.devices, cfg.sensor_sigma, &mut self.rng);
        update_damage(&mut self.fleet.devices, &self.catalog);
        compute_production(&mut self.fleet.devices, &self.catalog);

        let mut repairs = Vec::new();
        let mut predictor_failures = Vec::new();
        if cfg.strategy == Strategy::Predictive && cfg.pdm.is_check_tick(now) {
            if let Some(predictor) = self.predictor.as_deref() {
                let outcome = pdm_check(
                    &mut self.fleet,
                    &self.catalog,
                    predictor,
                    &cfg.pdm,
                    now,
                    cfg.maintenance_duration,
                    &mut self.rng,
                )?;
                repairs = outcome.repairs;
                predictor_failures = outcome.failures;
            }
        }

        let failures = check_devices(&mut self.fleet.devices, &self.catalog, now, &mut self.rng)?;
        repairs.extend(service_failed_devices(
            &mut self.fleet,
            now,
            cfg.repair_duration,
            &mut self.rng,
        )?);
        let completions = complete_maintenance(&mut self.fleet, &self.catalog, now)?;
        let telemetry = generate_telemetry(&mut self.fleet, now, cfg.output_interval);

        if cfg.verify_invariants {
            self.fleet
                .verify()
                .map_err(|detail| SimError::invariant(now, detail, &self.fleet))?;
        }

        self.time += 1;

        Ok(TickOutput {
            time: now,
            telemetry,
            repairs,
            failures,
            completions,
            predictor_failures,
        })
    }

    /// Run the remaining ticks, handing every record to `sink`.
    pub fn run<S: LogSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new(&self.config);
        let progress_every = (self.config.ticks / 10).max(1);

        info!(from = self.time, to = self.end, "Starting simulation");

        while !self.is_finished() {
            let output = self.step()?;
            sink.write_telemetry(&output.telemetry)?;
            sink.write_repairs(&output.repairs)?;
            report.record_tick(&output, self.fleet.counts(), self.fleet.total_production());

            if report.ticks % progress_every == 0 {
                let counts = report.final_counts;
                info!(
                    time = output.time,
                    operating = counts.operating,
                    failed = counts.failed,
                    in_repair = counts.in_repair,
                    in_maintenance = counts.in_maintenance,
                    "Progress"
                );
            } else {
                debug!(
                    time = output.time,
                    failures = output.failures.len(),
                    dispatched = output.repairs.len(),
                    "Tick complete"
                );
            }
        }

        sink.flush()?;
        report.duration = start.elapsed();

        info!(
            ticks = report.ticks,
            failures = report.failures,
            repairs = report.repairs,
            maintenances = report.maintenances,
            elapsed_secs = report.duration.as_secs_f64(),
            "Simulation complete"
        );

        Ok(report)
    }

    /// Time of the next tick to run.
    pub fn time(&self) -> Tick {
        self.time
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.end
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Mutable fleet access for seeding scenarios.
    pub fn fleet_mut(&mut self) -> &mut Fleet {
        &mut self.fleet
    }

    pub fn catalog(&self) -> &IssueCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FeatureRow, PredictorError};
    use crate::writer::MemorySink;
    use pdm_core::Issue;

    fn config(devices: usize, technicians: usize, ticks: u64) -> SimulationConfig {
        SimulationConfig {
            device_count: devices,
            technician_count: technicians,
            ticks,
            ..Default::default()
        }
    }

    struct Partial;

    impl FailurePredictor for Partial {
        fn supports(&self, issue: Issue) -> bool {
            issue != Issue::BrokenGear
        }

        fn probability(
            &self,
            _issue: Issue,
            _horizon: Tick,
            _row: &FeatureRow,
        ) -> std::result::Result<f64, PredictorError> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_predictive_strategy_requires_predictor() {
        let mut cfg = config(5, 1, 10);
        cfg.strategy = Strategy::Predictive;

        assert!(matches!(
            Simulation::new(cfg.clone(), None),
            Err(SimError::Config(_))
        ));
        match Simulation::new(cfg.clone(), Some(Box::new(Partial))) {
            Err(SimError::Config(msg)) => assert!(msg.contains("broken_gear")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }

        // Run-to-fail ignores the predictor entirely.
        cfg.strategy = Strategy::RunToFail;
        assert!(Simulation::new(cfg, Some(Box::new(Partial))).is_ok());
    }

    #[test]
    fn test_oversized_tick_count_is_rejected() {
        assert!(matches!(
            Simulation::new(config(5, 1, u64::MAX), None),
            Err(SimError::Config(_))
        ));

        let sim = Simulation::new(config(5, 1, Tick::MAX as u64 - 1000), None).unwrap();
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_step_advances_clock() {
        let mut cfg = config(10, 2, 3);
        cfg.time_start = 100;
        let mut sim = Simulation::new(cfg, None).unwrap();

        assert_eq!(sim.time(), 100);
        let out = sim.step().unwrap();
        assert_eq!(out.time, 100);
        assert_eq!(sim.time(), 101);
        assert!(out.telemetry.iter().all(|r| r.time == 100));
        assert!(!sim.is_finished());
        sim.step().unwrap();
        sim.step().unwrap();
        assert!(sim.is_finished());
    }

    #[test]
    fn test_run_writes_every_tick() {
        let mut sim = Simulation::new(config(20, 2, 50), None).unwrap();
        let mut sink = MemorySink::new();
        let report = sim.run(&mut sink).unwrap();

        assert_eq!(report.ticks, 50);
        assert_eq!(report.telemetry_records, sink.telemetry.len() as u64);
        assert_eq!(report.repair_records, sink.repairs.len() as u64);
        // Five fleet-wide aggregates every tick.
        let aggregates = sink.telemetry.iter().filter(|r| r.device.is_none()).count();
        assert_eq!(aggregates, 5 * 50);
        assert!(sim.is_finished());
    }

    #[test]
    fn test_corrupted_state_aborts_run() {
        let mut sim = Simulation::new(config(3, 1, 10), None).unwrap();
        sim.fleet_mut().technicians[0].assignment = Some(2);

        match sim.step() {
            Err(SimError::Invariant { tick, context, .. }) => {
                assert_eq!(tick, 0);
                assert!(context.contains("technicians"));
            }
            other => panic!("expected invariant error, got {:?}", other.map(|_| ())),
        }
    }
}
