// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Package pattern expansion.
//!
//! Entries ending in `/...` enumerate every package below a directory of the
//! module; other entries name one package. Recursive expansion skips the
//! configured output directory and the `exclude` list.

use std::collections::HashMap;
use std::path::{Component, Path};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::golang::{go_files, ModuleLoader, GO_MOD};

use super::types::{Config, PackageSettings, ResolvedPackageJob};

const RECURSIVE_SUFFIX: &str = "/...";

/// Exclusion rules of a config: path segments and globs over import paths.
pub struct ExcludeFilter {
    segments: Vec<String>,
    globs: GlobSet,
}

impl ExcludeFilter {
    pub fn new(entries: &[String]) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for entry in entries {
            let entry = entry.trim().trim_matches('/');
            if entry.contains(['*', '?', '[', '{']) {
                let glob = Glob::new(entry).map_err(|e| ConfigError::InvalidValue {
                    field: "exclude".to_string(),
                    message: e.to_string(),
                })?;
                builder.add(glob);
            } else {
                segments.push(entry.to_string());
            }
        }
        let globs = builder.build().map_err(|e| ConfigError::InvalidValue {
            field: "exclude".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { segments, globs })
    }

    /// Whether `import_path` lies in an excluded subtree.
    ///
    /// Segments match whole path elements: `mock` excludes `app/mock` and
    /// `app/mock/sub` but not `app/mockservice`.
    pub fn excludes(&self, import_path: &str) -> bool {
        self.segments
            .iter()
            .any(|seg| has_segment(import_path, seg))
            || self.globs.is_match(import_path)
    }
}

fn has_segment(import_path: &str, segment: &str) -> bool {
    let suffix = format!("/{segment}");
    import_path.ends_with(&suffix) || import_path.contains(&format!("{suffix}/"))
}

/// Expand every package entry of `config` into concrete jobs.
///
/// Relative entries are resolved against the loader's base directory. When
/// the same package is reached twice, an explicit entry replaces a recursive
/// one; otherwise the first entry in key order wins. Jobs come back sorted by
/// import path.
pub fn resolve_packages(
    config: &Config,
    loader: &ModuleLoader,
) -> Result<Vec<ResolvedPackageJob>, ConfigError> {
    if config.packages.is_empty() {
        return Err(ConfigError::NoPackages);
    }
    let filter = ExcludeFilter::new(&config.exclude)?;

    let mut jobs: Vec<ResolvedPackageJob> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut push = |job: ResolvedPackageJob| match seen.get(&job.import_path) {
        Some(&idx) if job.explicit && !jobs[idx].explicit => jobs[idx] = job,
        Some(_) => tracing::debug!("{} already configured", job.import_path),
        None => {
            seen.insert(job.import_path.clone(), jobs.len());
            jobs.push(job);
        }
    };

    for (pattern, package) in &config.packages {
        let settings = config.merge_package(package);
        match recursive_root(pattern) {
            Some(root) => {
                for job in expand(pattern, root, &settings, &filter, loader)? {
                    push(job);
                }
            }
            None => {
                let (import_path, dir) =
                    loader
                        .resolve(pattern)
                        .ok_or_else(|| ConfigError::PatternResolution {
                            pattern: pattern.clone(),
                            message: "package not found".to_string(),
                        })?;
                push(ResolvedPackageJob {
                    import_path,
                    dir,
                    config: settings,
                    explicit: true,
                });
            }
        }
    }

    jobs.sort_by(|a, b| a.import_path.cmp(&b.import_path));
    Ok(jobs)
}

fn recursive_root(pattern: &str) -> Option<&str> {
    if pattern == "..." {
        return Some(".");
    }
    pattern
        .strip_suffix(RECURSIVE_SUFFIX)
        .map(|root| if root.is_empty() { "/" } else { root })
}

fn expand(
    pattern: &str,
    root: &str,
    settings: &PackageSettings,
    filter: &ExcludeFilter,
    loader: &ModuleLoader,
) -> Result<Vec<ResolvedPackageJob>, ConfigError> {
    let resolution_error = |message: String| ConfigError::PatternResolution {
        pattern: pattern.to_string(),
        message,
    };

    let (root_import, root_dir) = loader
        .resolve(root)
        .ok_or_else(|| resolution_error("directory not found".to_string()))?;
    let module = loader.module();
    let output = output_segment(&settings.output);

    let mut jobs = Vec::new();
    let walker = WalkDir::new(&root_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (e.file_type().is_dir() && !skipped_dir(e.path())));

    for entry in walker {
        let entry = entry.map_err(|e| resolution_error(e.to_string()))?;
        let dir = entry.path();

        match go_files(dir) {
            Ok(files) if !files.is_empty() => {}
            _ => continue,
        }

        let import_path = match module.and_then(|m| m.import_path_for_dir(dir)) {
            Some(path) => path,
            None => join_import(&root_import, &root_dir, dir),
        };

        if output
            .as_deref()
            .is_some_and(|seg| has_segment(&import_path, seg))
        {
            tracing::debug!("skipping output package {}", import_path);
            continue;
        }
        if filter.excludes(&import_path) {
            tracing::debug!("excluding {}", import_path);
            continue;
        }

        jobs.push(ResolvedPackageJob {
            import_path,
            dir: dir.to_path_buf(),
            config: settings.clone(),
            explicit: false,
        });
    }

    if jobs.is_empty() {
        tracing::warn!("pattern {} matched no packages", pattern);
    }
    Ok(jobs)
}

/// The output directory as slash-separated path elements, or `None` when
/// output goes into the package itself.
fn output_segment(output: &str) -> Option<String> {
    let parts: Vec<String> = Path::new(output)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Directories the Go tool never treats as part of a package pattern.
fn skipped_dir(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.starts_with('.')
        || name.starts_with('_')
        || name == "testdata"
        || name == "vendor"
        || path.join(GO_MOD).is_file()
}

fn join_import(root_import: &str, root_dir: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root_dir).unwrap_or(dir);
    let rel: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if rel.is_empty() {
        root_import.to_string()
    } else {
        format!("{}/{}", root_import, rel.join("/"))
    }
}
