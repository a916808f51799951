// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Source loading: import path to package metadata.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LoadError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::module::{GoEnv, GoModule};

/// Suffix of Go test files.
pub const TEST_SUFFIX: &str = "_test.go";

static PACKAGE_CLAUSE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)").ok());

static BUILD_IGNORE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^//(go:build|\s*\+build)\s+ignore\s*$").ok());

static IMPORT_PATHS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*(?:import\s+)?(?:[A-Za-z_.][A-Za-z0-9_]*\s+)?"([^"]+)"\s*$"#).ok());

/// A loaded package: where it lives and what it imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub import_path: String,
    pub dir: PathBuf,
    pub name: String,
    /// Non-test Go files, sorted.
    pub files: Vec<PathBuf>,
    /// Imported package paths mapped to their package names.
    pub deps: BTreeMap<String, String>,
}

impl PackageRef {
    /// Package name of an imported path, if this package imports it.
    pub fn dep_name(&self, import_path: &str) -> Option<&str> {
        self.deps.get(import_path).map(String::as_str)
    }
}

/// Capability to turn import paths into packages.
pub trait SourceLoader: Send + Sync {
    /// Load one package by import path or filesystem path.
    fn load(&self, path: &str) -> Result<PackageRef, LoadError>;

    /// Load many packages in one pass. Packages that fail to load are omitted.
    fn load_all(&self, paths: &[String]) -> Vec<PackageRef>;
}

/// Loader backed by the enclosing Go module and the Go toolchain layout.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    base_dir: PathBuf,
    module: Option<GoModule>,
    env: GoEnv,
}

impl ModuleLoader {
    /// Create a loader rooted at `base_dir`, discovering go.mod above it.
    pub fn new(base_dir: &Path) -> Result<Self, LoadError> {
        Self::with_env(base_dir, GoEnv::detect())
    }

    pub fn with_env(base_dir: &Path, env: GoEnv) -> Result<Self, LoadError> {
        let base_dir = base_dir
            .canonicalize()
            .map_err(|e| LoadError::io(base_dir, e))?;
        let module = GoModule::find(&base_dir)?;
        if module.is_none() {
            tracing::debug!("no go.mod above {}", base_dir.display());
        }
        Ok(Self {
            base_dir,
            module,
            env,
        })
    }

    pub fn module(&self) -> Option<&GoModule> {
        self.module.as_ref()
    }

    /// Resolve a path argument to (import path, directory).
    ///
    /// Accepts relative paths (`.`, `./x`, `../x`), absolute directories and
    /// import paths.
    pub fn resolve(&self, path: &str) -> Option<(String, PathBuf)> {
        let fs_path = Path::new(path);
        let is_fs = path == "."
            || path == ".."
            || path.starts_with("./")
            || path.starts_with("../")
            || fs_path.is_absolute();

        if is_fs {
            let dir = if fs_path.is_absolute() {
                fs_path.to_path_buf()
            } else {
                self.base_dir.join(fs_path)
            };
            let dir = dir.canonicalize().ok()?;
            let import_path = self
                .module
                .as_ref()
                .and_then(|m| m.import_path_for_dir(&dir))
                .unwrap_or_else(|| dir.display().to_string());
            return Some((import_path, dir));
        }

        let dir = match &self.module {
            Some(module) => module.dir_for_import(path, &self.env),
            None => self.env.std_dir(path),
        }?;
        Some((path.to_string(), dir))
    }

    fn load_with(
        &self,
        path: &str,
        names: &mut HashMap<String, String>,
    ) -> Result<PackageRef, LoadError> {
        let (import_path, dir) = self
            .resolve(path)
            .ok_or_else(|| LoadError::PackageNotFound(path.to_string()))?;
        if !dir.is_dir() {
            return Err(LoadError::PackageNotFound(path.to_string()));
        }

        let files = go_files(&dir)?;
        if files.is_empty() {
            return Err(LoadError::NoGoFiles(dir.display().to_string()));
        }

        let mut clause_counts: Vec<(String, usize)> = Vec::new();
        let mut imports: Vec<String> = Vec::new();
        for file in &files {
            let source = std::fs::read_to_string(file).map_err(|e| LoadError::io(file, e))?;
            if let Some(name) = package_clause_name(&source) {
                match clause_counts.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, count)) => *count += 1,
                    None => clause_counts.push((name, 1)),
                }
            }
            imports.extend(import_paths(&source));
        }

        // Most common clause wins; first seen on ties.
        let name = clause_counts
            .iter()
            .fold(None::<&(String, usize)>, |best, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| guess_package_name(&import_path));

        let mut deps = BTreeMap::new();
        for dep in imports {
            if deps.contains_key(&dep) {
                continue;
            }
            let dep_name = match names.get(&dep) {
                Some(n) => n.clone(),
                None => {
                    let n = self.package_name_of(&dep);
                    names.insert(dep.clone(), n.clone());
                    n
                }
            };
            deps.insert(dep, dep_name);
        }

        Ok(PackageRef {
            import_path,
            dir,
            name,
            files,
            deps,
        })
    }

    /// Package name of an import path, read from its first Go file.
    fn package_name_of(&self, import_path: &str) -> String {
        self.resolve(import_path)
            .and_then(|(_, dir)| go_files(&dir).ok())
            .and_then(|files| {
                files.iter().find_map(|f| {
                    std::fs::read_to_string(f)
                        .ok()
                        .and_then(|s| package_clause_name(&s))
                })
            })
            .unwrap_or_else(|| guess_package_name(import_path))
    }
}

impl SourceLoader for ModuleLoader {
    fn load(&self, path: &str) -> Result<PackageRef, LoadError> {
        let start = Instant::now();
        let mut names = HashMap::new();
        let result = self.load_with(path, &mut names);

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("golang.loader.load", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        result
    }

    fn load_all(&self, paths: &[String]) -> Vec<PackageRef> {
        let start = Instant::now();
        // Dependency names are shared across the batch.
        let mut names = HashMap::new();
        let mut packages = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load_with(path, &mut names) {
                Ok(pkg) => packages.push(pkg),
                Err(e) => tracing::debug!("omitting {}: {}", path, e),
            }
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("golang.loader.load_all", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        packages
    }
}

/// Non-test, buildable Go files of a directory, sorted by name.
pub fn go_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !path.is_file() || !name.ends_with(".go") || name.ends_with(TEST_SUFFIX) {
            continue;
        }
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        let source = std::fs::read_to_string(&path).map_err(|e| LoadError::io(&path, e))?;
        if is_build_ignored(&source) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Package name from the package clause of a Go source file.
pub fn package_clause_name(source: &str) -> Option<String> {
    let re = PACKAGE_CLAUSE.as_ref()?;
    let mut in_block_comment = false;
    for line in source.lines() {
        let trimmed = line.trim();
        if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if trimmed.starts_with("/*") && !trimmed.contains("*/") {
            in_block_comment = true;
            continue;
        }
        if let Some(caps) = re.captures(line) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

fn is_build_ignored(source: &str) -> bool {
    BUILD_IGNORE
        .as_ref()
        .map(|re| re.is_match(source))
        .unwrap_or(false)
}

/// Import paths declared in a file's import section.
fn import_paths(source: &str) -> Vec<String> {
    let Some(re) = IMPORT_PATHS.as_ref() else {
        return Vec::new();
    };
    let mut paths = Vec::new();
    let mut in_block = false;
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("func ") || trimmed.starts_with("type ") {
            break;
        }
        if trimmed.starts_with("import (") {
            in_block = true;
            continue;
        }
        if in_block && trimmed.starts_with(')') {
            in_block = false;
            continue;
        }
        if !(in_block || trimmed.starts_with("import ")) {
            continue;
        }
        let code = trimmed.split("//").next().unwrap_or("");
        if let Some(caps) = re.captures(code) {
            if let Some(m) = caps.get(1) {
                paths.push(m.as_str().to_string());
            }
        }
    }
    paths
}

/// Last import path element with a major-version suffix removed.
pub fn path_base(import_path: &str) -> &str {
    let mut segments = import_path.rsplit('/');
    let last = segments.next().unwrap_or(import_path);
    let is_major = |s: &str| {
        s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit())
    };
    if is_major(last) {
        if let Some(prev) = segments.next() {
            return prev;
        }
    }
    if let Some((head, tail)) = last.rsplit_once('.') {
        if is_major(tail) {
            return head;
        }
    }
    last
}

/// Best-effort package name for a path whose sources are unavailable.
pub fn guess_package_name(import_path: &str) -> String {
    let base = path_base(import_path);
    let base = base.strip_prefix("go-").unwrap_or(base);
    let base = base.strip_suffix("-go").unwrap_or(base);
    base.replace(['-', '.'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn module() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", "module example.com/app\n\ngo 1.22\n");
        write(
            dir.path(),
            "service/service.go",
            r#"package service

import (
	"context"

	m "example.com/app/model"
)

type Service interface {
	Get(ctx context.Context) (*m.User, error)
}
"#,
        );
        write(dir.path(), "service/service_test.go", "package service_test\n");
        write(dir.path(), "service/gen.go", "//go:build ignore\n\npackage main\n");
        write(dir.path(), "model/model.go", "package models\n\ntype User struct{}\n");
        dir
    }

    fn loader(dir: &TempDir) -> ModuleLoader {
        ModuleLoader::with_env(dir.path(), GoEnv::default()).unwrap()
    }

    #[test]
    fn test_load_by_import_path() {
        let dir = module();
        let pkg = loader(&dir).load("example.com/app/service").unwrap();
        assert_eq!(pkg.import_path, "example.com/app/service");
        assert_eq!(pkg.name, "service");
        assert_eq!(pkg.files.len(), 1);
        assert_eq!(pkg.dep_name("example.com/app/model"), Some("models"));
        assert_eq!(pkg.dep_name("context"), Some("context"));
    }

    #[test]
    fn test_load_relative_path() {
        let dir = module();
        let pkg = loader(&dir).load("./service").unwrap();
        assert_eq!(pkg.import_path, "example.com/app/service");
    }

    #[test]
    fn test_load_missing_package() {
        let dir = module();
        let err = loader(&dir).load("example.com/app/missing").unwrap_err();
        assert!(matches!(err, LoadError::PackageNotFound(_)));
    }

    #[test]
    fn test_load_all_omits_failures() {
        let dir = module();
        let packages = loader(&dir).load_all(&[
            "example.com/app/service".to_string(),
            "example.com/app/nope".to_string(),
            "example.com/app/model".to_string(),
        ]);
        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["service", "models"]);
    }

    #[test]
    fn test_std_package_from_goroot() {
        let dir = module();
        let goroot = TempDir::new().unwrap();
        write(goroot.path(), "src/io/io.go", "package io\n");
        let loader = ModuleLoader::with_env(
            dir.path(),
            GoEnv {
                goroot: Some(goroot.path().to_path_buf()),
                mod_cache: None,
            },
        )
        .unwrap();
        let pkg = loader.load("io").unwrap();
        assert_eq!(pkg.name, "io");
    }

    #[test]
    fn test_package_clause_name() {
        assert_eq!(
            package_clause_name("// Package x does things.\n/*\npackage nope\n*/\npackage real\n"),
            Some("real".to_string())
        );
        assert_eq!(package_clause_name("no clause here"), None);
    }

    #[test]
    fn test_path_base() {
        assert_eq!(path_base("example.com/app/service"), "service");
        assert_eq!(path_base("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(path_base("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(path_base("context"), "context");
        assert_eq!(guess_package_name("github.com/mattn/go-sqlite3"), "sqlite3");
    }

    #[test]
    fn test_import_paths() {
        let paths = import_paths(
            "package a\n\nimport \"fmt\"\nimport (\n\t\"context\" // ctx\n\tx \"example.com/x\"\n\t_ \"embed\"\n)\n\nfunc main() {}\n",
        );
        assert_eq!(paths, vec!["fmt", "context", "example.com/x", "embed"]);
    }
}
