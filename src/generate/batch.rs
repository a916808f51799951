// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Config-driven batch generation.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::cache::PackageCache;
use crate::codegen::{Generator, GofmtFormatter};
use crate::config::{resolve_packages, Config, ResolvedPackageJob};
use crate::error::GenerateError;
use crate::golang::{ModuleLoader, PositionRegistry, SourceLoader};

use super::incremental::filter_stale;
use super::package::process_package;
use super::report::{ReportCounters, RunReport};
use super::GenerateOptions;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Generate decorators for every package a config names.
///
/// Patterns are resolved against the directory holding `config_path`. Unless
/// `options.force` is set, packages whose output is newer than their sources
/// and the config are skipped. Packages run concurrently; a failing package
/// does not stop the others and the first failure is returned once all
/// packages have finished.
#[instrument(skip_all, fields(config = %config_path.display()))]
pub async fn run(
    config: &Config,
    config_path: &Path,
    options: &GenerateOptions,
) -> Result<RunReport, GenerateError> {
    let start = Instant::now();
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let loader = ModuleLoader::new(base_dir)?;

    let jobs = resolve_packages(config, &loader)?;
    tracing::debug!("{} package(s) configured", jobs.len());

    let counters = Arc::new(ReportCounters::new());
    let jobs = if options.force {
        jobs
    } else {
        let (stale, current) = filter_stale(jobs, Some(config_path));
        counters.packages_up_to_date(current);
        stale
    };

    let generator = build_generator(config.tracing_package.as_deref(), options);
    let no_generate = config.no_generate || options.no_generate;
    execute(loader, jobs, generator, no_generate, options.jobs, Arc::clone(&counters)).await?;
    Ok(counters.report(start.elapsed()))
}

/// Generator honoring the tracing package override and `--gofmt`.
pub(crate) fn build_generator(
    config_tracing: Option<&str>,
    options: &GenerateOptions,
) -> Generator {
    let mut generator = Generator::new();
    if let Some(package) = options.tracing_package.as_deref().or(config_tracing) {
        generator = generator.with_tracing_import(package);
    }
    if options.gofmt {
        generator = generator.with_formatter(Box::new(GofmtFormatter::default()));
    }
    generator
}

/// Run `jobs` on a bounded pool of blocking workers sharing one cache.
#[instrument(skip_all, fields(jobs = jobs.len()))]
pub(crate) async fn execute(
    loader: ModuleLoader,
    jobs: Vec<ResolvedPackageJob>,
    generator: Generator,
    no_generate: bool,
    max_workers: Option<usize>,
    counters: Arc<ReportCounters>,
) -> Result<(), GenerateError> {
    if jobs.is_empty() {
        tracing::info!("nothing to generate");
        return Ok(());
    }

    let paths: Vec<String> = jobs.iter().map(|j| j.import_path.clone()).collect();
    let loaded = loader.load_all(&paths);
    tracing::debug!("loaded {} of {} package(s)", loaded.len(), paths.len());

    let cache = Arc::new(PackageCache::new(
        Arc::new(loader),
        Arc::new(PositionRegistry::new()),
    ));
    cache.seed(loaded);

    let workers = max_workers
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .clamp(1, jobs.len());
    tracing::debug!("running {} package(s) on {} worker(s)", jobs.len(), workers);

    let semaphore = Arc::new(Semaphore::new(workers));
    let generator = Arc::new(generator);
    let mut set = JoinSet::new();

    for job in jobs {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| GenerateError::Worker(e.to_string()))?;
        let cache = Arc::clone(&cache);
        let generator = Arc::clone(&generator);
        let counters = Arc::clone(&counters);

        set.spawn_blocking(move || {
            let _permit = permit;
            let start = Instant::now();
            let result = process_package(&job, &cache, &generator, no_generate, &counters)
                .map_err(|e| e.in_package(job.import_path.as_str()));

            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_package(&job.import_path, start.elapsed(), result.is_ok());
            #[cfg(not(feature = "telemetry"))]
            let _ = start;

            result
        });
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let result = joined
            .map_err(|e| GenerateError::Worker(e.to_string()))
            .and_then(|r| r);
        if let Err(e) = result {
            tracing::error!("{}", e);
            counters.package_failed();
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, PackageConfig};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn service(pkg: &str, iface: &str) -> String {
        format!(
            "package {pkg}\n\nimport \"context\"\n\ntype {iface} interface {{\n\tRun(ctx context.Context) error\n}}\n"
        )
    }

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/app\n");
        write(root, "a/a.go", &service("a", "Alpha"));
        write(root, "b/b.go", &service("b", "Beta"));
        write(root, "b/mock/mock.go", &service("mock", "Mocked"));
        write(root, "c/c.go", "package c\n\ntype Plain struct{}\n");
        write(
            root,
            ".ddtrace.yaml",
            "exclude: [mock]\npackages:\n  ./...: {}\n",
        );
        dir
    }

    #[tokio::test]
    async fn test_run_generates_every_package() {
        let dir = workspace();
        let config_path = dir.path().join(".ddtrace.yaml");
        let config = load_config(&config_path).unwrap();

        let report = run(&config, &config_path, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(report.packages_processed, 3);
        assert_eq!(report.files_written, 2);
        assert_eq!(report.interfaces_generated, 2);
        assert!(dir.path().join("a/trace/a_trace.go").exists());
        assert!(dir.path().join("b/trace/b_trace.go").exists());
        assert!(!dir.path().join("b/mock/trace").exists());
    }

    #[tokio::test]
    async fn test_second_run_is_incremental() {
        let dir = workspace();
        let config_path = dir.path().join(".ddtrace.yaml");
        let config = load_config(&config_path).unwrap();
        run(&config, &config_path, &GenerateOptions::default())
            .await
            .unwrap();

        let report = run(&config, &config_path, &GenerateOptions::default())
            .await
            .unwrap();
        // c never produces output, so it is always reconsidered.
        assert_eq!(report.packages_up_to_date, 2);
        assert_eq!(report.packages_processed, 1);
        assert_eq!(report.files_written, 0);

        let forced = GenerateOptions {
            force: true,
            ..GenerateOptions::default()
        };
        let report = run(&config, &config_path, &forced).await.unwrap();
        assert_eq!(report.packages_processed, 3);
        assert_eq!(report.files_unchanged, 2);
        assert_eq!(report.files_written, 0);
    }

    #[tokio::test]
    async fn test_failing_package_does_not_stop_others() {
        let dir = workspace();
        write(dir.path(), "a/broken.go", "package a\n\ntype X interface {\n");
        let config_path = dir.path().join(".ddtrace.yaml");
        let config = load_config(&config_path).unwrap();

        let err = run(&config, &config_path, &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Package { ref import_path, .. } if import_path == "example.com/app/a"));
        assert!(dir.path().join("b/trace/b_trace.go").exists());
    }

    #[tokio::test]
    async fn test_missing_pattern_is_fatal() {
        let dir = workspace();
        let config_path = dir.path().join(".ddtrace.yaml");
        let mut config = Config::default();
        config
            .packages
            .insert("./nope".to_string(), PackageConfig::default());
        let err = run(&config, &config_path, &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
    }

    #[test]
    fn test_build_generator_prefers_cli_tracing_package() {
        let options = GenerateOptions {
            tracing_package: Some("example.com/cli/tracing".to_string()),
            ..GenerateOptions::default()
        };
        let generator = build_generator(Some("example.com/config/tracing"), &options);
        assert_eq!(generator.tracing_import(), "example.com/cli/tracing");

        let generator = build_generator(Some("example.com/config/tracing"), &GenerateOptions::default());
        assert_eq!(generator.tracing_import(), "example.com/config/tracing");
    }
}
