//! Configuration for the fleet simulator.
//!
//! Loaded from YAML; every field has a default so partial files work.

use crate::error::{Result, SimError};
use crate::predictor::LogisticModel;
use pdm_core::{Issue, IssueCatalog, IssueSpec, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Main configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of devices in the fleet
    pub device_count: usize,

    /// Number of technicians in the pool (may be zero)
    pub technician_count: usize,

    /// Standard deviation of the per-tick sensor random walk
    pub sensor_sigma: f64,

    /// Number of ticks to simulate
    pub ticks: u64,

    /// Time of the first tick
    pub time_start: Tick,

    /// Ticks between telemetry outputs for one (device, sensor) pair
    pub output_interval: Tick,

    /// Maintenance strategy
    pub strategy: Strategy,

    /// Ticks a technician spends on a failed device
    pub repair_duration: Tick,

    /// Ticks a technician spends on preventive maintenance
    pub maintenance_duration: Tick,

    /// Random seed
    pub seed: u64,

    /// Check the device/technician invariants after every tick
    pub verify_invariants: bool,

    /// Predictive-maintenance settings
    pub pdm: PdmConfig,

    /// Issue catalog
    pub issues: Vec<IssueSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let device_count = 1000;
        let repair_duration = 100;
        Self {
            device_count,
            technician_count: device_count / 10,
            sensor_sigma: 0.01,
            ticks: 50_000,
            time_start: 0,
            output_interval: 10,
            strategy: Strategy::RunToFail,
            repair_duration,
            maintenance_duration: repair_duration / 4,
            seed: 17,
            verify_invariants: true,
            pdm: PdmConfig::default(),
            issues: IssueCatalog::reference().specs().to_vec(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write the default config to a file (for generating an example config)
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(&Self::default())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Build the issue catalog described by this configuration.
    pub fn catalog(&self) -> Result<IssueCatalog> {
        IssueCatalog::new(self.issues.clone())
            .map_err(|e| SimError::config(format!("Invalid issue catalog: {}", e)))
    }

    /// Time of the first tick past the run.
    ///
    /// Rejects runs whose clock, never-cleared sentinel or service and
    /// telemetry deadlines would leave the `Tick` range.
    pub fn end_time(&self) -> Result<Tick> {
        let ticks = Tick::try_from(self.ticks)
            .map_err(|_| SimError::config(format!("ticks {} exceeds the tick range", self.ticks)))?;
        self.time_start
            .checked_sub(1)
            .ok_or_else(|| SimError::config("time_start is at the bottom of the tick range"))?;
        let end = self
            .time_start
            .checked_add(ticks)
            .ok_or_else(|| SimError::config("time_start + ticks exceeds the tick range"))?;
        let horizon = self
            .output_interval
            .max(self.repair_duration)
            .max(self.maintenance_duration)
            .max(self.pdm.threshold_time);
        end.checked_add(horizon)
            .ok_or_else(|| SimError::config("run end plus durations exceeds the tick range"))?;
        Ok(end)
    }

    /// Validate the configuration, returning the issue catalog on success.
    pub fn validate(&self) -> Result<IssueCatalog> {
        if self.device_count == 0 {
            return Err(SimError::config("device_count must be positive"));
        }
        if !self.sensor_sigma.is_finite() || self.sensor_sigma < 0.0 {
            return Err(SimError::config(format!(
                "sensor_sigma must be finite and non-negative, got {}",
                self.sensor_sigma
            )));
        }
        if self.output_interval <= 0 {
            return Err(SimError::config("output_interval must be positive"));
        }
        if self.repair_duration <= 0 {
            return Err(SimError::config("repair_duration must be positive"));
        }
        if self.maintenance_duration <= 0 {
            return Err(SimError::config("maintenance_duration must be positive"));
        }

        self.end_time()?;

        let catalog = self.catalog()?;

        if self.strategy == Strategy::Predictive {
            self.pdm.validate()?;
            if catalog.fatal_count() == 0 {
                return Err(SimError::config(
                    "predictive strategy needs at least one fatal issue",
                ));
            }
        }

        Ok(catalog)
    }
}

/// Predictive-maintenance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdmConfig {
    /// Prediction horizon: P(issue within this many ticks)
    pub threshold_time: Tick,

    /// Devices above this failure probability are sent to maintenance
    pub threshold_probability: f64,

    /// Run the predictive check only when `time % skip_time == 0`
    pub skip_time: Tick,

    /// Logistic models per fatal issue, used by the CLI's built-in predictor
    pub models: BTreeMap<Issue, LogisticModel>,
}

impl Default for PdmConfig {
    fn default() -> Self {
        Self {
            threshold_time: 400,
            threshold_probability: 0.5,
            skip_time: 5,
            models: BTreeMap::new(),
        }
    }
}

impl PdmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.skip_time <= 0 {
            return Err(SimError::config("pdm.skip_time must be positive"));
        }
        if self.threshold_time <= 0 {
            return Err(SimError::config("pdm.threshold_time must be positive"));
        }
        if !(0.0..=1.0).contains(&self.threshold_probability) {
            return Err(SimError::config(format!(
                "pdm.threshold_probability must be within [0, 1], got {}",
                self.threshold_probability
            )));
        }
        Ok(())
    }

    /// Whether the predictive check runs on this tick.
    pub fn is_check_tick(&self, time: Tick) -> bool {
        time % self.skip_time == 0
    }
}

/// Maintenance strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Run to failure: technicians are dispatched only to failed devices
    #[serde(rename = "rtf")]
    RunToFail,
    /// Predictive maintenance on top of reactive repair
    #[serde(rename = "pdm")]
    Predictive,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RunToFail => "rtf",
            Strategy::Predictive => "pdm",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rtf" | "run-to-fail" | "run_to_fail" => Ok(Strategy::RunToFail),
            "pdm" | "predictive" => Ok(Strategy::Predictive),
            other => Err(format!("unknown strategy '{}', expected rtf or pdm", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.technician_count, 100);
        assert_eq!(config.maintenance_duration, 25);
        let catalog = config.validate().unwrap();
        assert_eq!(catalog, IssueCatalog::reference());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SimulationConfig::from_yaml(
            "device_count: 5\ntechnician_count: 1\nstrategy: pdm\npdm:\n  skip_time: 10\n",
        )
        .unwrap();
        assert_eq!(config.device_count, 5);
        assert_eq!(config.strategy, Strategy::Predictive);
        assert_eq!(config.pdm.skip_time, 10);
        assert_eq!(config.pdm.threshold_time, 400);
        assert_eq!(config.issues.len(), 4);
    }

    #[test]
    fn test_yaml_issue_catalog_and_models() {
        let yaml = r#"
issues:
  - { issue: crud, id: 0, coefficient: 0.2, fatal: false }
  - { issue: broken_gear, id: 1, coefficient: 0.5, fatal: true }
pdm:
  models:
    broken_gear:
      intercept: -3.0
      weights: { load: 2.0 }
"#;
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        let catalog = config.validate().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.id_of(Issue::BrokenGear), Some(1));
        assert_eq!(config.pdm.models[&Issue::BrokenGear].intercept, -3.0);
    }

    #[test]
    fn test_unknown_issue_name_is_rejected() {
        let yaml = "issues:\n  - { issue: seized_bearing, id: 0, coefficient: 0.1, fatal: true }\n";
        assert!(matches!(
            SimulationConfig::from_yaml(yaml),
            Err(SimError::Yaml(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = SimulationConfig::default();
        config.repair_duration = 0;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.maintenance_duration = -5;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.device_count = 0;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.output_interval = 0;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.issues.retain(|s| s.issue != Issue::Crud);
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.strategy = Strategy::Predictive;
        config.pdm.threshold_probability = 1.5;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        // pdm settings are only checked when the predictive strategy is selected
        let mut config = SimulationConfig::default();
        config.pdm.skip_time = 0;
        assert!(config.validate().is_ok());
        config.strategy = Strategy::Predictive;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_tick_range_overflow_is_rejected() {
        let config = SimulationConfig::default();
        assert_eq!(config.end_time().unwrap(), 50_000);

        let mut config = SimulationConfig::default();
        config.ticks = u64::MAX;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.time_start = Tick::MAX - 10;
        config.ticks = 20;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.time_start = Tick::MAX - 50;
        config.ticks = 20;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let mut config = SimulationConfig::default();
        config.time_start = Tick::MIN;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pdm.yml");
        SimulationConfig::write_default(&path).unwrap();

        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.device_count, 1000);
        assert_eq!(loaded.seed, 17);
        assert_eq!(loaded.catalog().unwrap(), IssueCatalog::reference());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("pdm".parse::<Strategy>().unwrap(), Strategy::Predictive);
        assert_eq!("RTF".parse::<Strategy>().unwrap(), Strategy::RunToFail);
        assert!("always".parse::<Strategy>().is_err());
        assert!(PdmConfig::default().is_check_tick(10));
        assert!(!PdmConfig::default().is_check_tick(11));
    }
}
