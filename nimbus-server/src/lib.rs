//! Aggregation server for the nimbus weather telemetry fabric.

pub mod server;

pub use server::{router, run_server, spawn_expiry_sweeper, AppState, DEFAULT_PORT};
