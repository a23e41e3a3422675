//! # Shared
//! Logging and failure helpers shared by the snapshot uploader crates.
//!

#![warn(missing_docs)]

mod failure;
mod logger;

pub use failure::{Failure, log_and_panic};
pub use logger::{LogConfig, LogLevel, LoggerError, init_logger};
