// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metrics collection for `gen --stats`.
//!
//! Operation timings (loading, parsing, resolving, rendering), per-package
//! outcomes and output file counters, kept in process memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Generation outcome by package import path.
    packages: RwLock<HashMap<String, PackageMetrics>>,

    /// Timed operations by name.
    operations: RwLock<HashMap<String, OperationMetrics>>,

    files: FileCounters,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            packages: RwLock::new(HashMap::new()),
            operations: RwLock::new(HashMap::new()),
            files: FileCounters::new(),
            start_time: Instant::now(),
        }
    }

    /// Record one package job.
    pub fn record_package(&self, import_path: &str, duration: Duration, success: bool) {
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        let metrics = packages
            .entry(import_path.to_string())
            .or_insert_with(PackageMetrics::new);
        metrics.record(duration, success);
    }

    /// Record a timed operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        let mut ops = self.operations.write().unwrap_or_else(PoisonError::into_inner);
        let metrics = ops.entry(name.to_string()).or_insert_with(OperationMetrics::new);
        metrics.record(duration);
    }

    /// Record an output file; `written` is false when its content was unchanged.
    pub fn record_file(&self, written: bool) {
        if written {
            self.files.written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.files.unchanged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn package_metrics(&self, import_path: &str) -> Option<PackageMetrics> {
        self.packages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(import_path)
            .cloned()
    }

    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// (written, unchanged)
    pub fn file_counts(&self) -> (u64, u64) {
        (
            self.files.written.load(Ordering::Relaxed),
            self.files.unchanged.load(Ordering::Relaxed),
        )
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let packages = self.packages.read().unwrap_or_else(PoisonError::into_inner);
        let operations = self.operations.read().unwrap_or_else(PoisonError::into_inner);
        let (files_written, files_unchanged) = self.file_counts();

        MetricsSnapshot {
            packages: packages.clone(),
            operations: operations.clone(),
            files_written,
            files_unchanged,
            uptime: self.uptime(),
        }
    }

    pub fn reset(&self) {
        self.packages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.files.written.store(0, Ordering::Relaxed);
        self.files.unchanged.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the jobs run for one package.
#[derive(Debug, Clone)]
pub struct PackageMetrics {
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl PackageMetrics {
    pub fn new() -> Self {
        Self {
            runs: 0,
            successes: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, duration: Duration, success: bool) {
        self.runs += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }
}

impl Default for PackageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic operation metrics with histogram.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// Latency distribution.
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bucket upper bounds in microseconds.
    buckets: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_buckets(buckets: Vec<u64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        let idx = self
            .buckets
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Approximate percentile, reported as the bucket's upper bound.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let micros = match self.buckets.get(i) {
                    Some(bound) => *bound,
                    None => self.buckets.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_micros(micros);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 10us, 100us, 1ms, 10ms, 100ms, 1s
        Self::with_buckets(vec![10, 100, 1_000, 10_000, 100_000, 1_000_000])
    }
}

#[derive(Debug)]
struct FileCounters {
    written: AtomicU64,
    unchanged: AtomicU64,
}

impl FileCounters {
    fn new() -> Self {
        Self {
            written: AtomicU64::new(0),
            unchanged: AtomicU64::new(0),
        }
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub packages: HashMap<String, PackageMetrics>,
    pub operations: HashMap<String, OperationMetrics>,
    pub files_written: u64,
    pub files_unchanged: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report, sorted by name.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Generation Stats ===\n\n");
        report.push_str(&format!("Elapsed: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Files: {} written, {} unchanged\n\n",
            self.files_written, self.files_unchanged
        ));

        if !self.packages.is_empty() {
            let failed = self.packages.values().filter(|p| p.failures > 0).count();
            report.push_str(&format!(
                "Packages: {} processed, {} failed\n",
                self.packages.len(),
                failed
            ));
            let mut slowest: Vec<(&String, &PackageMetrics)> = self.packages.iter().collect();
            slowest.sort_by(|a, b| b.1.max_duration.cmp(&a.1.max_duration).then(a.0.cmp(b.0)));
            for (name, metrics) in slowest.into_iter().take(5) {
                report.push_str(&format!("  {}: {:.2?}\n", name, metrics.max_duration));
            }
            report.push('\n');
        }

        if !self.operations.is_empty() {
            report.push_str("Operations:\n");
            let mut names: Vec<&String> = self.operations.keys().collect();
            names.sort();
            for name in names {
                let metrics = &self.operations[name];
                report.push_str(&format!(
                    "  {}: {} ops, avg {:.2?}, p99 {:.2?}\n",
                    name,
                    metrics.count,
                    metrics.avg_duration(),
                    metrics.histogram.p99()
                ));
            }
        }

        report
    }
}

/// Record an operation to the global metrics.
pub fn record_operation(name: &str, duration: Duration) {
    GLOBAL_METRICS.record_operation(name, duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_metrics() {
        let mut metrics = PackageMetrics::new();
        metrics.record(Duration::from_millis(100), true);
        metrics.record(Duration::from_millis(300), false);

        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.successes, 1);
        assert_eq!(metrics.failures, 1);
        assert_eq!(metrics.max_duration, Duration::from_millis(300));
    }

    #[test]
    fn test_operation_metrics() {
        let mut metrics = OperationMetrics::new();
        metrics.record(Duration::from_millis(10));
        metrics.record(Duration::from_millis(20));
        metrics.record(Duration::from_millis(30));

        assert_eq!(metrics.count, 3);
        assert_eq!(metrics.avg_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..100 {
            hist.record(Duration::from_micros(500));
        }
        assert_eq!(hist.counts()[2], 100);
        assert_eq!(hist.p50(), Duration::from_micros(1_000));
        assert_eq!(hist.p99(), Duration::from_micros(1_000));
    }

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = Metrics::new();
        metrics.record_package("example.com/app/svc", Duration::from_millis(5), true);
        metrics.record_operation("resolver.resolve", Duration::from_micros(50));
        metrics.record_file(true);
        metrics.record_file(false);
        metrics.record_file(false);

        let snapshot = metrics.snapshot();
        assert!(snapshot.packages.contains_key("example.com/app/svc"));
        assert_eq!(snapshot.files_written, 1);
        assert_eq!(snapshot.files_unchanged, 2);
        let report = snapshot.format_report();
        assert!(report.contains("Files: 1 written, 2 unchanged"));
        assert!(report.contains("resolver.resolve: 1 ops"));

        metrics.reset();
        assert!(metrics.package_metrics("example.com/app/svc").is_none());
        assert!(metrics.operation_metrics("resolver.resolve").is_none());
        assert_eq!(metrics.file_counts(), (0, 0));
    }
}
