//! Timecard Backend Library
//!
//! Exposes core modules for use by the server binary and integration
//! tests: the auth engine, the time-entry ledger, record stores, and the
//! statistics aggregator.

pub mod api;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod stats;
pub mod store;
