//! Failure predictor interface consumed by predictive maintenance.
//!
//! The simulator only needs `P(issue within horizon | features)` per device.
//! Trained classifiers live outside this crate and plug in through
//! [`FailurePredictor`]; [`LogisticPredictor`] is a configurable stand-in
//! so the CLI can run the predictive strategy on its own.

use pdm_core::{Device, DeviceId, Issue, IssueCatalog, Sensor, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-device, per-issue prediction errors. These never halt a tick.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictorError {
    #[error("No model for issue {0}")]
    UnsupportedIssue(Issue),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Malformed features: {0}")]
    MalformedFeatures(String),

    #[error("Probability {0} outside [0, 1]")]
    OutOfRange(f64),

    #[error("Model error: {0}")]
    Model(String),
}

/// Estimates the probability that an issue occurs within a horizon.
pub trait FailurePredictor: Send + Sync {
    /// Whether a model is available for `issue`.
    fn supports(&self, issue: Issue) -> bool;

    /// `P(issue occurs within horizon | row)`.
    fn probability(
        &self,
        issue: Issue,
        horizon: Tick,
        row: &FeatureRow,
    ) -> Result<f64, PredictorError>;
}

/// Feature values for one device at one time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub device: DeviceId,
    pub time: Tick,
    pub values: Vec<f64>,
}

/// Feature rows for the whole fleet, indexed by device id.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// Sensor values, production rate and time since each fatal issue was last cleared.
    pub fn build(devices: &[Device], catalog: &IssueCatalog, now: Tick) -> Self {
        let names = feature_names(catalog);
        let rows = devices
            .iter()
            .map(|device| {
                let mut values = Vec::with_capacity(names.len());
                values.extend(device.sensors.as_array());
                values.push(device.production_rate);
                values.extend(
                    catalog
                        .fatal()
                        .map(|spec| (now - device.last_cleared[spec.id]) as f64),
                );
                FeatureRow {
                    device: device.id,
                    time: now,
                    values,
                }
            })
            .collect();

        Self { names, rows }
    }

    /// Column index of a named feature
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Feature column names in row order.
pub fn feature_names(catalog: &IssueCatalog) -> Vec<String> {
    Sensor::all()
        .iter()
        .map(|s| s.as_str().to_string())
        .chain(std::iter::once("production_rate".to_string()))
        .chain(catalog.fatal().map(|s| format!("time_since_{}", s.issue)))
        .collect()
}

/// Reject probabilities a well-behaved model could not have produced.
pub fn check_probability(p: f64) -> Result<f64, PredictorError> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(PredictorError::OutOfRange(p))
    }
}

/// Logistic regression over named features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

/// Predictor backed by one logistic model per fatal issue.
#[derive(Debug, Clone)]
pub struct LogisticPredictor {
    names: Vec<String>,
    models: BTreeMap<Issue, Vec<f64>>,
    intercepts: BTreeMap<Issue, f64>,
}

impl LogisticPredictor {
    /// Resolve each model's named weights against the catalog's feature layout.
    pub fn new(
        catalog: &IssueCatalog,
        models: &BTreeMap<Issue, LogisticModel>,
    ) -> Result<Self, PredictorError> {
        let names = feature_names(catalog);
        let mut weights = BTreeMap::new();
        let mut intercepts = BTreeMap::new();

        for (issue, model) in models {
            let mut dense = vec![0.0; names.len()];
            for (name, w) in &model.weights {
                let idx = names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| PredictorError::UnknownFeature(name.clone()))?;
                dense[idx] = *w;
            }
            weights.insert(*issue, dense);
            intercepts.insert(*issue, model.intercept);
        }

        Ok(Self {
            names,
            models: weights,
            intercepts,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }
}

impl FailurePredictor for LogisticPredictor {
    fn supports(&self, issue: Issue) -> bool {
        self.models.contains_key(&issue)
    }

    fn probability(
        &self,
        issue: Issue,
        _horizon: Tick,
        row: &FeatureRow,
    ) -> Result<f64, PredictorError> {
        let weights = self
            .models
            .get(&issue)
            .ok_or(PredictorError::UnsupportedIssue(issue))?;
        if row.values.len() != weights.len() {
            return Err(PredictorError::MalformedFeatures(format!(
                "expected {} features, got {}",
                weights.len(),
                row.values.len()
            )));
        }
        if let Some(bad) = row.values.iter().position(|v| !v.is_finite()) {
            return Err(PredictorError::MalformedFeatures(format!(
                "{} is {}",
                self.names[bad], row.values[bad]
            )));
        }

        let intercept = self.intercepts.get(&issue).copied().unwrap_or_default();
        let z: f64 = intercept
            + weights
                .iter()
                .zip(&row.values)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        check_probability(1.0 / (1.0 + (-z).exp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdm_core::SensorReading;

    #[test]
    fn test_feature_layout() {
        let catalog = IssueCatalog::reference();
        assert_eq!(
            feature_names(&catalog),
            vec![
                "temperature",
                "pressure",
                "load",
                "production_rate",
                "time_since_jammed_rotor",
                "time_since_cracked_valve",
                "time_since_broken_gear",
            ]
        );
    }

    #[test]
    fn test_build_matrix() {
        let catalog = IssueCatalog::reference();
        let mut devices: Vec<Device> = (0..2).map(|id| Device::new(id, 4, -1, [0; 3])).collect();
        devices[1].sensors = SensorReading::new(0.1, 0.2, 0.3);
        devices[1].production_rate = 0.9;
        devices[1].last_cleared[2] = 40;

        let matrix = FeatureMatrix::build(&devices, &catalog, 50);
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.rows[0].values, vec![0.0, 0.0, 0.0, 0.0, 51.0, 51.0, 51.0]);
        assert_eq!(matrix.rows[1].values, vec![0.1, 0.2, 0.3, 0.9, 51.0, 10.0, 51.0]);
        assert_eq!(matrix.rows[1].device, 1);
        assert_eq!(matrix.rows[1].time, 50);
        assert_eq!(matrix.index_of("time_since_cracked_valve"), Some(5));
    }

    fn predictor() -> LogisticPredictor {
        let mut models = BTreeMap::new();
        models.insert(
            Issue::JammedRotor,
            LogisticModel {
                intercept: -2.0,
                weights: BTreeMap::from([("temperature".to_string(), 4.0)]),
            },
        );
        LogisticPredictor::new(&IssueCatalog::reference(), &models).unwrap()
    }

    fn row(values: Vec<f64>) -> FeatureRow {
        FeatureRow {
            device: 0,
            time: 0,
            values,
        }
    }

    #[test]
    fn test_logistic_probability() {
        let p = predictor();
        assert!(p.supports(Issue::JammedRotor));
        assert!(!p.supports(Issue::BrokenGear));

        let half = p
            .probability(Issue::JammedRotor, 400, &row(vec![0.5, 9.0, 9.0, 1.0, 3.0, 3.0, 3.0]))
            .unwrap();
        assert!((half - 0.5).abs() < 1e-12);

        let low = p
            .probability(Issue::JammedRotor, 400, &row(vec![0.0; 7]))
            .unwrap();
        assert!((low - 1.0 / (1.0 + 2f64.exp())).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_errors() {
        let p = predictor();
        assert_eq!(
            p.probability(Issue::BrokenGear, 400, &row(vec![0.0; 7])),
            Err(PredictorError::UnsupportedIssue(Issue::BrokenGear))
        );
        assert!(matches!(
            p.probability(Issue::JammedRotor, 400, &row(vec![0.0; 3])),
            Err(PredictorError::MalformedFeatures(_))
        ));
        assert!(matches!(
            p.probability(Issue::JammedRotor, 400, &row(vec![f64::NAN; 7])),
            Err(PredictorError::MalformedFeatures(_))
        ));

        let models = BTreeMap::from([(
            Issue::JammedRotor,
            LogisticModel {
                intercept: 0.0,
                weights: BTreeMap::from([("humidity".to_string(), 1.0)]),
            },
        )]);
        assert_eq!(
            LogisticPredictor::new(&IssueCatalog::reference(), &models).unwrap_err(),
            PredictorError::UnknownFeature("humidity".to_string())
        );
    }

    #[test]
    fn test_check_probability() {
        assert_eq!(check_probability(0.3), Ok(0.3));
        assert_eq!(check_probability(1.2), Err(PredictorError::OutOfRange(1.2)));
        assert!(check_probability(f64::NAN).is_err());
    }
}
