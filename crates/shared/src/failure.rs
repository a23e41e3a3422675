use core::fmt::Display;

use tracing::{error, warn};

/// Log an error then panic with the same message.
pub fn log_and_panic<Err: Display>(error: Err, message: &str) -> ! {
    error!("{message}: {error}");

    panic!("{message}: {error}");
}

/// Extension trait for results.
pub trait Failure<T> {
    /// Log an error an panic.
    fn or_log_and_panic(self, message: &str) -> T;

    /// Log an error as a warning and discard it.
    fn or_log_warning(self, message: &str) -> Option<T>;
}

impl<T, E: Display> Failure<T> for Result<T, E> {
    fn or_log_and_panic(self, message: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => log_and_panic(error, message),
        }
    }

    fn or_log_warning(self, message: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                warn!("{message}: {error}");
                None
            }
        }
    }
}
