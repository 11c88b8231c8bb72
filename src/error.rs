use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::domain::CostOverflow;

/// Input rejected at the engine boundary, before any network activity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("quantity must be a finite number, got {0}")]
    NonFiniteQuantity(f64),
    #[error("quantity cannot be negative, got {0}")]
    NegativeQuantity(f64),
    #[error("quantity of {0} quintals is too large")]
    QuantityTooLarge(f64),
    #[error("invalid {field}: {value}")]
    InvalidCoordinate { field: &'static str, value: f64 },
    #[error("transport rate must be a finite, non-negative number within range, got {0}")]
    InvalidRate(String),
    #[error("unknown vehicle profile: {0}")]
    UnknownVehicle(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("arbitrage run cancelled")]
    Cancelled,
    #[error("arbitrage run exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
    #[error(transparent)]
    Cost(#[from] CostOverflow),
    #[error("candidate resolution failed: {0}")]
    Task(#[from] JoinError),
}
