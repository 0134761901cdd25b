//! Infrastructure layer module
//!
//! External integrations and adapters:
//! - `matrix`: reqwest client speaking the Matrix client-server API
//! - `config`: figment-based configuration loading and validation
//! - `logging`: tracing subscriber setup

pub mod config;
pub mod logging;
pub mod matrix;

pub use config::{ConfigError, ConfigLoader};
pub use matrix::MatrixClient;
