//! Runtime wiring: configuration, lifecycle, and telemetry.

pub mod config;
pub mod runner;
pub mod telemetry;
