// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and metrics infrastructure.
//!
//! - **Logging**: `tracing` events filtered through `RUST_LOG` or the CLI verbosity
//! - **Metrics**: operation timings and output counters, printed by `gen --stats`
//!
//! # Usage
//!
//! ```rust,ignore
//! use ddtrace_gen::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{
    Histogram, Metrics, MetricsSnapshot, OperationMetrics, PackageMetrics, GLOBAL_METRICS,
};
