// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Generation runs.
//!
//! [`run`] drives a config: expand patterns, drop packages whose output is
//! current, batch-load the rest and process them on a bounded worker pool.
//! [`run_single`] handles one package without a config. Both share the
//! per-package pipeline in [`process_package`].

mod batch;
mod incremental;
mod package;
mod report;
mod single;

pub use batch::run;
pub use incremental::{filter_stale, needs_regeneration, newest_output, newest_source};
pub use package::process_package;
pub use report::{ReportCounters, RunReport};
pub use single::run_single;

/// Knobs of a run that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Regenerate even when output is newer than sources and config.
    pub force: bool,
    /// Omit the `//go:generate` directive.
    pub no_generate: bool,
    /// Pipe output through `gofmt`.
    pub gofmt: bool,
    /// Import path of the tracing helper package, overriding the config.
    pub tracing_package: Option<String>,
    /// Worker limit; defaults to available parallelism.
    pub jobs: Option<usize>,
}
