// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Output files: naming, package detection and change-aware writes.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::DEFAULT_OUTPUT;
use crate::error::GenerateError;
use crate::golang::{go_files, guess_package_name, is_identifier, package_clause_name};
use crate::scanner::TRACE_SUFFIX;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// `service.go` -> `service_trace.go`.
pub fn output_file_name(source_file_name: &str) -> String {
    let stem = source_file_name
        .strip_suffix(".go")
        .unwrap_or(source_file_name);
    format!("{stem}{TRACE_SUFFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Content was identical; only the modification time was refreshed.
    Unchanged,
}

/// Write `content` to `path` unless the file already holds exactly it.
///
/// An unchanged file still has its modification time bumped so the
/// incremental check sees it as newer than its sources.
pub fn write_if_changed(path: &Path, content: &[u8]) -> Result<WriteOutcome, GenerateError> {
    if let Ok(existing) = fs::read(path) {
        if existing == content {
            File::options()
                .write(true)
                .open(path)
                .and_then(|f| f.set_modified(SystemTime::now()))
                .map_err(|e| GenerateError::io(path, e))?;
            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_file(false);
            return Ok(WriteOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenerateError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| GenerateError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o664))
            .map_err(|e| GenerateError::io(path, e))?;
    }

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_file(true);
    Ok(WriteOutcome::Written)
}

/// Package clause to use for files written into `out_dir`.
///
/// The source package when both directories coincide, else the most common
/// package of Go files already in `out_dir`, else the directory name.
pub fn output_package_name(out_dir: &Path, source_dir: &Path, source_package: &str) -> String {
    if same_dir(out_dir, source_dir) {
        return source_package.to_string();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for file in go_files(out_dir).unwrap_or_default() {
        if let Some(name) = fs::read_to_string(&file)
            .ok()
            .and_then(|s| package_clause_name(&s))
        {
            *counts.entry(name).or_default() += 1;
        }
    }
    if let Some((name, _)) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
    {
        return name;
    }

    let base = out_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let guessed = guess_package_name(&base);
    if is_identifier(&guessed) {
        guessed
    } else {
        DEFAULT_OUTPUT.to_string()
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| PathBuf::from(p));
    a == b || canonical(a) == canonical(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("service.go"), "service_trace.go");
        assert_eq!(output_file_name("user_store.go"), "user_store_trace.go");
    }

    #[test]
    fn test_write_if_changed_touches_identical_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace/a_trace.go");

        assert_eq!(
            write_if_changed(&path, b"package trace\n").unwrap(),
            WriteOutcome::Written
        );

        let old = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        assert_eq!(
            write_if_changed(&path, b"package trace\n").unwrap(),
            WriteOutcome::Unchanged
        );
        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified > old + Duration::from_secs(60));
        assert_eq!(fs::read(&path).unwrap(), b"package trace\n");

        assert_eq!(
            write_if_changed(&path, b"package trace\n\n// changed\n").unwrap(),
            WriteOutcome::Written
        );
    }

    #[test]
    fn test_output_package_name() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("svc");
        fs::create_dir_all(&src).unwrap();

        assert_eq!(output_package_name(&src.join("."), &src, "svc"), "svc");
        assert_eq!(output_package_name(&src.join("trace"), &src, "svc"), "trace");
        assert_eq!(output_package_name(&src.join("go-otel"), &src, "svc"), "otel");

        let existing = src.join("wrappers");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("a.go"), "package wrap\n").unwrap();
        fs::write(existing.join("b.go"), "package wrap\n").unwrap();
        fs::write(existing.join("c.go"), "package other\n").unwrap();
        assert_eq!(output_package_name(&existing, &src, "svc"), "wrap");
    }
}
