//! Error types for the simulator

use pdm_core::Tick;
use thiserror::Error;

/// Simulator errors
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected at startup; the simulation never begins.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal assertion failure. Carries a dump of the offending state.
    #[error("Invariant violated at tick {tick}: {detail}\n{context}")]
    Invariant {
        tick: Tick,
        detail: String,
        context: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn config(message: impl Into<String>) -> Self {
        SimError::Config(message.into())
    }

    pub fn invariant(tick: Tick, detail: impl Into<String>, context: impl std::fmt::Debug) -> Self {
        SimError::Invariant {
            tick,
            detail: detail.into(),
            context: format!("{:#?}", context),
        }
    }
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;
