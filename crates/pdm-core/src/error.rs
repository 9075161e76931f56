//! Error types for pdm-core

use crate::state::{DeviceEvent, DeviceState};
use thiserror::Error;

/// Core error types
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("Unknown issue: {0}")]
    UnknownIssue(String),

    #[error("Unknown sensor: {0}")]
    UnknownSensor(String),

    #[error("Duplicate issue in catalog: {0}")]
    DuplicateIssue(String),

    #[error("Issue ids must be contiguous from 0, found {found} at position {position}")]
    NonContiguousIssueId { position: usize, found: usize },

    #[error("Catalog is missing required issue: {0}")]
    MissingIssue(&'static str),

    #[error("Invalid coefficient for {issue}: {value}")]
    InvalidCoefficient { issue: String, value: f64 },

    #[error("Illegal transition from {from} on {event}")]
    IllegalTransition {
        from: DeviceState,
        event: DeviceEvent,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
