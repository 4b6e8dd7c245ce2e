//! HTTP middleware layers

pub mod logging;

pub use logging::request_logging;
