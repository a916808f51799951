// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Single-package generation without a config file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;

use crate::config::{PackageSettings, ResolvedPackageJob};
use crate::error::{ConfigError, GenerateError};
use crate::golang::ModuleLoader;

use super::batch::{build_generator, execute};
use super::report::{ReportCounters, RunReport};
use super::GenerateOptions;

/// Generate decorators for one package.
///
/// `package` is an import path or a directory relative to `base_dir`;
/// `output` is relative to the package directory. Every run regenerates.
#[instrument(skip(base_dir, options))]
pub async fn run_single(
    base_dir: &Path,
    package: &str,
    output: &str,
    options: &GenerateOptions,
) -> Result<RunReport, GenerateError> {
    let start = Instant::now();
    let loader = ModuleLoader::new(base_dir)?;
    let (import_path, dir) =
        loader
            .resolve(package)
            .ok_or_else(|| ConfigError::PatternResolution {
                pattern: package.to_string(),
                message: "package not found".to_string(),
            })?;

    let job = ResolvedPackageJob {
        import_path,
        dir,
        config: PackageSettings {
            output: output.to_string(),
            interfaces: BTreeMap::new(),
        },
        explicit: true,
    };

    let counters = Arc::new(ReportCounters::new());
    let generator = build_generator(None, options);
    execute(
        loader,
        vec![job],
        generator,
        options.no_generate,
        Some(1),
        Arc::clone(&counters),
    )
    .await?;
    Ok(counters.report(start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn module() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("go.mod"), "module example.com/app\n").unwrap();
        fs::create_dir_all(root.join("store")).unwrap();
        fs::write(
            root.join("store/store.go"),
            "package store\n\nimport \"context\"\n\ntype Store interface {\n\tLoad(ctx context.Context, key string) ([]byte, error)\n}\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_run_single_into_subdirectory() {
        let dir = module();
        let options = GenerateOptions {
            no_generate: true,
            ..GenerateOptions::default()
        };
        let report = run_single(dir.path(), "./store", "./trace", &options)
            .await
            .unwrap();
        assert_eq!(report.files_written, 1);

        let content = fs::read_to_string(dir.path().join("store/trace/store_trace.go")).unwrap();
        assert!(content.contains("package trace\n"));
        assert!(content.contains("\"example.com/app/store\""));
        assert!(content.contains("Load(ctx context.Context, key string) (r0 []byte, err error)"));
        assert!(!content.contains("go:generate"));
    }

    #[tokio::test]
    async fn test_run_single_in_place() {
        let dir = module();
        run_single(dir.path(), "example.com/app/store", ".", &GenerateOptions::default())
            .await
            .unwrap();

        let content = fs::read_to_string(dir.path().join("store/store_trace.go")).unwrap();
        assert!(content.contains("package store\n"));
        assert!(content.contains("type StoreWithTracing struct {\n\tStore\n"));
        assert!(content.contains("//go:generate ddtrace gen -p example.com/app/store -o .\n"));

        // The generated file is not scanned on the next run.
        let report = run_single(dir.path(), "./store", ".", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(report.files_unchanged, 1);
        assert_eq!(report.interfaces_generated, 1);
    }

    #[tokio::test]
    async fn test_unknown_package() {
        let dir = module();
        let err = run_single(dir.path(), "./missing", "trace", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Config(ConfigError::PatternResolution { .. })
        ));
    }
}
