//! Shared utilities for marketpulse
//!
//! This crate provides the ambient pieces shared by the workspace binaries:
//! tracing subscriber setup and the logging configuration that drives it.

pub mod config;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::init_tracing;
