//! Instrument session abstraction.
//!
//! The sweep controller talks to exactly one stateful instrument
//! through the [`ScpiEndpoint`] trait: fire-and-forget directives
//! (`write`), queries with an explicit or default timeout, and an
//! idempotent `close`. Every write and query is observable on the
//! physical instrument — this layer performs no retries; retry policy
//! lives in [`crate::poller`] and the sweep controller.
//!
//! Two implementations are provided:
//!
//! - [`SocketInstrument`] — newline-framed SCPI over a raw TCP socket
//!   (the CMW500's direct socket interface, port 5025 by default).
//! - [`MockEndpoint`] — a scripted in-memory double with a command
//!   transcript and injectable transport faults, used by the tests and
//!   by the binary's `--dry-run` mode.

pub mod mock;
pub mod socket;

pub use mock::MockEndpoint;
pub use socket::SocketInstrument;

use crate::error::AppResult;
use std::time::Duration;

/// Synchronous SCPI command/query endpoint.
///
/// The timeout model is deliberately explicit: `query_with_timeout`
/// threads the timeout through each call, and plain `query` falls back
/// to the session default set via `set_timeout`. This preserves the
/// instrument's "set the timeout before any query whose latency
/// differs" discipline without hiding it in mutable session state at
/// the call sites that care.
pub trait ScpiEndpoint {
    /// Send a directive with no reply expected (e.g. `*RST`,
    /// `SOURce:LTE:SIGN:CELL:STATe ON`).
    fn write(&mut self, cmd: &str) -> AppResult<()>;

    /// Send a query and block until a reply arrives or `timeout`
    /// elapses.
    fn query_with_timeout(&mut self, cmd: &str, timeout: Duration) -> AppResult<String>;

    /// Send a query using the session's default timeout.
    fn query(&mut self, cmd: &str) -> AppResult<String> {
        let timeout = self.timeout();
        self.query_with_timeout(cmd, timeout)
    }

    /// Set the default timeout used by subsequent [`Self::query`] calls.
    fn set_timeout(&mut self, timeout: Duration);

    /// Current default timeout.
    fn timeout(&self) -> Duration;

    /// Release the connection. Safe to call on an already-closed or
    /// already-failed session.
    fn close(&mut self) -> AppResult<()>;

    /// Query instrument identity (`*IDN?`).
    fn identify(&mut self) -> AppResult<String> {
        self.query("*IDN?")
    }
}
