//! Predictive-maintenance fleet simulator.
//!
//! Simulates a fleet of industrial devices whose sensors drift, whose wear
//! accumulates into stochastic failures, and whose technicians are dispatched
//! either reactively (run-to-fail) or ahead of predicted failures. The run
//! emits telemetry and repair logs suitable for training failure models.
//!
//! # Determinism
//! All randomness comes from one seeded [`rng::SimRng`] consumed in a fixed
//! order, so equal seeds and configurations give byte-identical logs.
//!
//! # Usage
//! ```bash
//! # Run-to-fail with the default 1000-device fleet
//! pdm-simulator run --output-dir out/
//!
//! # Predictive maintenance driven by the models in a config file
//! pdm-simulator run --config pdm.yml --strategy pdm --report out/report
//!
//! # Write an example configuration
//! pdm-simulator generate-config --output pdm.yml
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod failure;
pub mod fleet;
pub mod labels;
pub mod maintenance;
pub mod predictor;
pub mod report;
pub mod rng;
pub mod sensors;
pub mod telemetry;
pub mod writer;

pub use config::{PdmConfig, SimulationConfig, Strategy};
pub use engine::{Simulation, TickOutput};
pub use error::{Result, SimError};
pub use fleet::{Fleet, FleetCounts};
pub use predictor::{FailurePredictor, FeatureRow, LogisticPredictor, PredictorError};
pub use report::RunReport;
pub use writer::{DelimitedSink, LogSink, MemorySink, Tee};
