// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! One package job: scan, resolve, render and write.

use std::path::Path;
use std::time::Instant;

use crate::cache::PackageCache;
use crate::codegen::{
    output_file_name, output_package_name, write_if_changed, GenerationUnit, Generator,
    GoGenerate, OutputTarget, RenderOptions, WriteOutcome,
};
use crate::config::ResolvedPackageJob;
use crate::error::GenerateError;
use crate::resolver::Resolver;
use crate::scanner::scan_package;

use super::report::ReportCounters;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Generate decorators for every interface of one package.
///
/// Interfaces that fail to resolve are logged and skipped. Load failures,
/// formatting failures and write failures end the job.
pub fn process_package(
    job: &ResolvedPackageJob,
    cache: &PackageCache,
    generator: &Generator,
    no_generate: bool,
    counters: &ReportCounters,
) -> Result<(), GenerateError> {
    let start = Instant::now();
    let ctx = cache.context(&job.import_path)?;

    let files = scan_package(&ctx.parsed);
    if files.is_empty() {
        tracing::debug!("{}: no interfaces", job.import_path);
        counters.package_processed();
        return Ok(());
    }

    let out_dir = job.config.output_dir(&job.dir);
    let target = OutputTarget {
        package_name: output_package_name(&out_dir, &job.dir, &ctx.parsed.name),
        import_path: output_import_path(&job.import_path, &job.dir, &out_dir),
    };
    let go_generate = GoGenerate {
        package: job.import_path.clone(),
        output: job.config.output.clone(),
    };

    let resolver = Resolver::new(cache);
    let mut directive_pending = !no_generate;

    for file in &files {
        let mut unit = GenerationUnit {
            source_file_name: file.file_name.clone(),
            interfaces: Vec::new(),
        };
        let mut skipped = 0;

        for decl in &file.interfaces {
            let options = RenderOptions::for_interface(&decl.name, job.config.interface(&decl.name));
            if options.ignore {
                tracing::debug!("{}: {} ignored by config", file.file_name, decl.name);
                skipped += 1;
                continue;
            }
            match resolver.resolve_declaration(&file.file_name, decl, &ctx) {
                Ok(iface) => unit.interfaces.push((iface, options)),
                Err(e) => {
                    tracing::warn!("{}: skipping {}: {}", file.file_name, decl.name, e);
                    skipped += 1;
                }
            }
        }

        let directive = directive_pending.then_some(&go_generate);
        let rendered = generator
            .render_file(&unit, &target, directive)
            .map_err(|source| GenerateError::File {
                file: file.file_name.clone(),
                source,
            })?;
        counters.interfaces(rendered.generated.len(), skipped + rendered.skipped);

        let Some(content) = rendered.content else {
            tracing::debug!("{}: nothing to generate", file.file_name);
            continue;
        };
        directive_pending = false;

        let path = out_dir.join(output_file_name(&file.file_name));
        let outcome = write_if_changed(&path, content.as_bytes())?;
        match outcome {
            WriteOutcome::Written => tracing::info!("wrote {}", path.display()),
            WriteOutcome::Unchanged => tracing::debug!("{} unchanged", path.display()),
        }
        counters.file(outcome);
    }

    counters.package_processed();

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("generate.package", start.elapsed());
    #[cfg(not(feature = "telemetry"))]
    let _ = start;

    Ok(())
}

/// Import path of `out_dir` when it lies under the package directory.
fn output_import_path(import_path: &str, dir: &Path, out_dir: &Path) -> Option<String> {
    let rel = out_dir.strip_prefix(dir).ok()?;
    let mut out = import_path.to_string();
    for component in rel.components() {
        match component {
            std::path::Component::Normal(part) => {
                out.push('/');
                out.push_str(&part.to_string_lossy());
            }
            std::path::Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterfaceConfig, PackageSettings};
    use crate::golang::{GoEnv, ModuleLoader, PositionRegistry};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    const SERVICE: &str = r#"package svc

import (
	"context"

	"example.com/app/model"
)

// UserService manages users.
type UserService interface {
	Get(ctx context.Context, id string) (*model.User, error)
	Create(ctx context.Context, u *model.User) error
	Delete(ctx context.Context, id string) error
	Ping() bool
}

type Empty interface{}

//ddtrace:ignore
type Skipped interface {
	Run(ctx context.Context) error
}

type Legacy interface {
	Do(ctx context.Context) error
}
"#;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> (TempDir, PackageCache, ResolvedPackageJob) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/app\n");
        write(root, "model/model.go", "package model\n\ntype User struct{}\n");
        write(root, "svc/svc.go", SERVICE);
        write(root, "svc/other.go", "package svc\n\ntype Clock interface{ Now() int }\n");

        let loader = ModuleLoader::with_env(root, GoEnv::default()).unwrap();
        let (import_path, pkg_dir) = loader.resolve("./svc").unwrap();
        let cache = PackageCache::new(Arc::new(loader), Arc::new(PositionRegistry::new()));

        let mut interfaces = BTreeMap::new();
        interfaces.insert(
            "Legacy".to_string(),
            InterfaceConfig {
                ignore: true,
                ..InterfaceConfig::default()
            },
        );
        let job = ResolvedPackageJob {
            import_path,
            dir: pkg_dir,
            config: PackageSettings {
                output: "trace".to_string(),
                interfaces,
            },
            explicit: true,
        };
        (dir, cache, job)
    }

    fn trace_dir(job: &ResolvedPackageJob) -> PathBuf {
        job.dir.join("trace")
    }

    #[test]
    fn test_process_package_writes_one_file_per_source() {
        let (_dir, cache, job) = fixture();
        let counters = ReportCounters::new();
        process_package(&job, &cache, &Generator::new(), false, &counters).unwrap();

        let out = trace_dir(&job);
        assert!(!out.join("other_trace.go").exists());
        let content = fs::read_to_string(out.join("svc_trace.go")).unwrap();
        assert!(content.contains("package trace\n"));
        assert!(content.contains("//go:generate ddtrace gen -p example.com/app/svc -o trace\n"));
        assert!(content.contains("type UserServiceWithTracing struct {\n\tsvc.UserService\n"));
        assert!(content.contains("(r0 *model.User, err error)"));
        assert!(!content.contains("Skipped"));
        assert!(!content.contains("LegacyWithTracing"));
        assert!(!content.contains("EmptyWithTracing"));

        let ping = &content[content.find("func (_d UserServiceWithTracing) Ping()").unwrap()..];
        assert!(ping.starts_with("func (_d UserServiceWithTracing) Ping() (r0 bool) {\n\treturn _d.UserService.Ping()\n}"));

        let report = counters.report(Default::default());
        assert_eq!(report.files_written, 1);
        assert_eq!(report.interfaces_generated, 1);
        // Empty, Legacy and Clock.
        assert_eq!(report.interfaces_skipped, 3);
    }

    #[test]
    fn test_second_run_is_unchanged() {
        let (_dir, cache, job) = fixture();
        let generator = Generator::new();
        let counters = ReportCounters::new();
        process_package(&job, &cache, &generator, true, &counters).unwrap();
        let path = trace_dir(&job).join("svc_trace.go");
        let first = fs::read(&path).unwrap();
        assert!(!String::from_utf8_lossy(&first).contains("go:generate"));

        process_package(&job, &cache, &generator, true, &counters).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);

        let report = counters.report(Default::default());
        assert_eq!(report.files_written, 1);
        assert_eq!(report.files_unchanged, 1);
    }

    #[test]
    fn test_unresolvable_interfaces_do_not_block_siblings() {
        let (dir, cache, job) = fixture();
        write(
            dir.path(),
            "svc/svc.go",
            r#"package svc

import "context"

type Good interface {
	Run(ctx context.Context) error
}

type Bad interface {
	nope.Thing
	Run(ctx context.Context) error
}

type LoopA interface {
	LoopB
}

type LoopB interface {
	LoopA
}

type Leaky interface {
	Run(ctx context.Context) error
	reset()
}
"#,
        );
        let counters = ReportCounters::new();
        process_package(&job, &cache, &Generator::new(), true, &counters).unwrap();

        let content = fs::read_to_string(trace_dir(&job).join("svc_trace.go")).unwrap();
        assert!(content.contains("type GoodWithTracing struct {"));
        for name in ["Bad", "LoopA", "LoopB", "Leaky"] {
            assert!(!content.contains(&format!("{name}WithTracing")), "{name}");
        }

        let report = counters.report(Default::default());
        assert_eq!(report.interfaces_generated, 1);
        // Bad, LoopA, LoopB, Leaky here and Clock in other.go.
        assert_eq!(report.interfaces_skipped, 5);
        assert_eq!(report.packages_failed, 0);
    }

    #[test]
    fn test_missing_package_fails() {
        let (_dir, cache, mut job) = fixture();
        job.import_path = "example.com/app/missing".to_string();
        let err = process_package(&job, &cache, &Generator::new(), false, &ReportCounters::new())
            .unwrap_err();
        assert!(matches!(err, GenerateError::Load(_)));
    }

    #[test]
    fn test_output_import_path() {
        let dir = Path::new("/src/app/svc");
        assert_eq!(
            output_import_path("example.com/app/svc", dir, &dir.join("trace")).as_deref(),
            Some("example.com/app/svc/trace")
        );
        assert_eq!(
            output_import_path("example.com/app/svc", dir, &dir.join(".")).as_deref(),
            Some("example.com/app/svc")
        );
        assert_eq!(
            output_import_path("example.com/app/svc", dir, Path::new("/elsewhere")),
            None
        );
    }

    #[test]
    fn test_referenced_packages_are_not_loaded() {
        let (_dir, cache, job) = fixture();
        process_package(&job, &cache, &Generator::new(), false, &ReportCounters::new()).unwrap();
        assert_eq!(cache.load_count(), 1);
    }
}
