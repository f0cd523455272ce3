//! Custom error types for the application.
//!
//! This module defines the primary error type, `SweepError`, for the
//! entire application. Using the `thiserror` crate, it provides a
//! centralized and consistent way to classify failures, which matters
//! here because the sweep controller treats different failure classes
//! very differently:
//!
//! - **`Connection`**: opening the instrument session failed. Fatal to
//!   the whole sweep; no points can run.
//! - **`Timeout` / `Communication`**: a command or query failed at the
//!   transport level. Recovered at point granularity: the current
//!   (band, power) point is marked failed and iteration continues.
//! - **`Parse`**: the instrument replied, but the reply was not the
//!   numeric value a measurement step expected. Handled like a
//!   communication failure (point-granular).
//! - **`EmptyResult`**: a sweep finished with zero completed points.
//!   Surfaced to the user as "no measurements were completed" instead
//!   of silently writing a header-only file.
//! - **`Config` / `Configuration`**: file-level and semantic
//!   configuration problems, caught before the sweep starts.
//!
//! Note that an unavailable-marker (`NAV`) response is *not* an error:
//! it flows through the bounded-retry policy in [`crate::poller`].

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to instrument at '{address}': {reason}")]
    Connection { address: String, reason: String },

    #[error("Instrument query timed out after {timeout_ms} ms: {command}")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("Instrument communication error: {0}")]
    Communication(String),

    #[error("Instrument error: {0}")]
    Instrument(String),

    #[error("Failed to parse instrument response '{response}' for {command}: {reason}")]
    Parse {
        command: String,
        response: String,
        reason: String,
    },

    #[error("No measurements were completed; nothing to persist")]
    EmptyResult,
}
