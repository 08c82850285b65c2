//! Shared infrastructure for the voco crates: logging setup and the common
//! error type used by binaries.

pub mod errors;
pub mod logging;

pub use errors::{Error, Result};
pub use logging::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
