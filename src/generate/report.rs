// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Run summary shared by all workers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::codegen::WriteOutcome;

/// Counters updated concurrently by package workers.
#[derive(Debug, Default)]
pub struct ReportCounters {
    packages_processed: AtomicU32,
    packages_up_to_date: AtomicU32,
    packages_failed: AtomicU32,
    files_written: AtomicU32,
    files_unchanged: AtomicU32,
    interfaces_generated: AtomicU32,
    interfaces_skipped: AtomicU32,
}

impl ReportCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package_processed(&self) {
        self.packages_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn packages_up_to_date(&self, count: usize) {
        self.packages_up_to_date
            .fetch_add(u32::try_from(count).unwrap_or(u32::MAX), Ordering::SeqCst);
    }

    pub fn package_failed(&self) {
        self.packages_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn file(&self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.files_written.fetch_add(1, Ordering::SeqCst),
            WriteOutcome::Unchanged => self.files_unchanged.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub fn interfaces(&self, generated: usize, skipped: usize) {
        self.interfaces_generated
            .fetch_add(u32::try_from(generated).unwrap_or(u32::MAX), Ordering::SeqCst);
        self.interfaces_skipped
            .fetch_add(u32::try_from(skipped).unwrap_or(u32::MAX), Ordering::SeqCst);
    }

    pub fn report(&self, duration: Duration) -> RunReport {
        RunReport {
            packages_processed: self.packages_processed.load(Ordering::SeqCst),
            packages_up_to_date: self.packages_up_to_date.load(Ordering::SeqCst),
            packages_failed: self.packages_failed.load(Ordering::SeqCst),
            files_written: self.files_written.load(Ordering::SeqCst),
            files_unchanged: self.files_unchanged.load(Ordering::SeqCst),
            interfaces_generated: self.interfaces_generated.load(Ordering::SeqCst),
            interfaces_skipped: self.interfaces_skipped.load(Ordering::SeqCst),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub packages_processed: u32,
    /// Skipped because their output was newer than sources and config.
    pub packages_up_to_date: u32,
    pub packages_failed: u32,
    pub files_written: u32,
    pub files_unchanged: u32,
    pub interfaces_generated: u32,
    pub interfaces_skipped: u32,
    pub duration_ms: u64,
}

impl RunReport {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} package(s) processed, {} file(s) written, {} unchanged, {} decorator(s)",
            self.packages_processed,
            self.files_written,
            self.files_unchanged,
            self.interfaces_generated
        );
        if self.packages_up_to_date > 0 {
            out.push_str(&format!(", {} package(s) up to date", self.packages_up_to_date));
        }
        if self.packages_failed > 0 {
            out.push_str(&format!(", {} failed", self.packages_failed));
        }
        out
    }
}
