//! Picks the wholesale market (mandi) that nets a farmer the most for a crop
//! once transport cost is paid.

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod util;

pub use app::ArbitrageEngine;
pub use error::{EngineError, ValidationError};
