//! Core library for the lte_sweep application.
//!
//! This library contains the configuration, instrument-session, retry,
//! sweep-controller, and result-storage building blocks for automated
//! LTE band/power characterization sweeps against a CMW500-class
//! signalling tester. It is used by the `lte-sweep` command-line binary
//! and by the integration tests.

pub mod config;
pub mod error;
pub mod instrument;
pub mod poller;
pub mod storage;
pub mod sweep;
