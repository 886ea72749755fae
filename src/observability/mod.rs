//! Observability and telemetry.
//!
//! Logging goes through the `tracing` facade; metrics through the `metrics`
//! facade. This module only wires up a subscriber; embedding applications
//! that install their own subscriber and metrics recorder can skip it.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Initializes a `tracing` subscriber filtered by `PROMPTCLUSTER_LOG`
/// (falling back to `RUST_LOG`, then `info`).
///
/// Idempotent: repeated calls, including from parallel tests, are no-ops
/// after the first. Does nothing if another subscriber is already installed.
pub fn init() {
    OBSERVABILITY_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("PROMPTCLUSTER_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
