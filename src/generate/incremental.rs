// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Modification-time based staleness check.
//!
//! Generated files double as the build cache: a package is current when its
//! newest `_trace.go` output is newer than every non-test source file and
//! than the config file.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::config::ResolvedPackageJob;
use crate::scanner::{is_scannable, TRACE_SUFFIX};

/// Newest modification time among generated files in `out_dir`.
pub fn newest_output(out_dir: &Path) -> Option<SystemTime> {
    newest(out_dir, |name| name.ends_with(TRACE_SUFFIX))
}

/// Newest modification time among the scannable sources of `dir`.
pub fn newest_source(dir: &Path) -> Option<SystemTime> {
    newest(dir, is_scannable)
}

fn newest(dir: &Path, include: impl Fn(&str) -> bool) -> Option<SystemTime> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| include(&e.file_name().to_string_lossy()))
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .filter_map(|m| m.modified().ok())
        .max()
}

/// Whether `job` must be regenerated given the config's modification time.
pub fn needs_regeneration(job: &ResolvedPackageJob, config_modified: Option<SystemTime>) -> bool {
    let Some(output) = newest_output(&job.config.output_dir(&job.dir)) else {
        return true;
    };
    let source_changed = newest_source(&job.dir).is_some_and(|s| s > output);
    let config_changed = config_modified.is_some_and(|c| c > output);
    source_changed || config_changed
}

/// Split `jobs` into those needing work, returning how many were current.
pub fn filter_stale(
    jobs: Vec<ResolvedPackageJob>,
    config_path: Option<&Path>,
) -> (Vec<ResolvedPackageJob>, usize) {
    let config_modified = config_path
        .and_then(|p| fs::metadata(p).ok())
        .and_then(|m| m.modified().ok());

    let total = jobs.len();
    let stale: Vec<ResolvedPackageJob> = jobs
        .into_iter()
        .filter(|job| {
            let stale = needs_regeneration(job, config_modified);
            if !stale {
                tracing::debug!("{} is up to date", job.import_path);
            }
            stale
        })
        .collect();
    let current = total - stale.len();
    (stale, current)
}
