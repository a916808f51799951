// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Go module discovery and import path to directory mapping.

use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;

use crate::error::LoadError;

/// Name of the module definition file.
pub const GO_MOD: &str = "go.mod";

/// A `replace` directive from go.mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old_path: String,
    pub new_path: String,
    pub new_version: Option<String>,
}

impl Replace {
    /// Whether the replacement points at a directory rather than a module.
    pub fn is_local(&self) -> bool {
        self.new_path.starts_with("./")
            || self.new_path.starts_with("../")
            || Path::new(&self.new_path).is_absolute()
    }
}

/// The main module of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Directory containing go.mod.
    pub root: PathBuf,
    /// Declared module path.
    pub path: String,
    /// Required modules as (path, version).
    pub requires: Vec<(String, String)>,
    pub replaces: Vec<Replace>,
}

impl GoModule {
    /// Walk up from `start` to the nearest go.mod and parse it.
    pub fn find(start: &Path) -> Result<Option<Self>, LoadError> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(GO_MOD);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .map_err(|e| LoadError::io(&candidate, e))?;
                return Self::parse(&current, &content).map(Some);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Parse go.mod contents for a module rooted at `root`.
    pub fn parse(root: &Path, content: &str) -> Result<Self, LoadError> {
        let mut path = None;
        let mut requires = Vec::new();
        let mut replaces = Vec::new();
        let mut block: Option<&str> = None;

        for raw in content.lines() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(kind) = block {
                if line == ")" {
                    block = None;
                    continue;
                }
                match kind {
                    "require" => requires.extend(parse_require(line)),
                    "replace" => replaces.extend(parse_replace(line)),
                    _ => {}
                }
                continue;
            }

            let (directive, rest) = match line.split_once(char::is_whitespace) {
                Some((d, r)) => (d, r.trim()),
                None => (line, ""),
            };
            match directive {
                "module" => path = Some(unquote(rest).to_string()),
                "require" | "replace" | "exclude" | "retract" | "tool" | "godebug"
                    if rest == "(" =>
                {
                    block = Some(directive);
                }
                "require" => requires.extend(parse_require(rest)),
                "replace" => replaces.extend(parse_replace(rest)),
                _ => {}
            }
        }

        let path = path.filter(|p| !p.is_empty()).ok_or_else(|| LoadError::InvalidModule {
            path: root.join(GO_MOD).display().to_string(),
            message: "missing module directive".to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            path,
            requires,
            replaces,
        })
    }

    /// Import path of a directory inside this module.
    pub fn import_path_for_dir(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        let mut import_path = self.path.clone();
        for component in rel.components() {
            import_path.push('/');
            import_path.push_str(&component.as_os_str().to_string_lossy());
        }
        Some(import_path)
    }

    /// Directory of an import path that lives inside this module.
    pub fn local_dir(&self, import_path: &str) -> Option<PathBuf> {
        let rest = strip_path_prefix(import_path, &self.path)?;
        Some(join_slash(&self.root, rest))
    }

    /// Map an import path to a directory, looking at the module itself,
    /// vendor, replace directives, the module cache and finally GOROOT.
    pub fn dir_for_import(&self, import_path: &str, env: &GoEnv) -> Option<PathBuf> {
        if let Some(dir) = self.local_dir(import_path) {
            return Some(dir);
        }

        let vendored = join_slash(&self.root.join("vendor"), import_path);
        if vendored.is_dir() {
            return Some(vendored);
        }

        let replaced = self
            .replaces
            .iter()
            .filter_map(|r| strip_path_prefix(import_path, &r.old_path).map(|rest| (r, rest)))
            .max_by_key(|(r, _)| r.old_path.len());
        if let Some((replace, rest)) = replaced {
            if replace.is_local() {
                return Some(join_slash(&self.root.join(&replace.new_path), rest));
            }
            if let (Some(cache), Some(version)) = (&env.mod_cache, &replace.new_version) {
                let module_dir = cache.join(format!("{}@{}", escape_path(&replace.new_path), version));
                return Some(join_slash(&module_dir, rest));
            }
        }

        let required = self
            .requires
            .iter()
            .filter_map(|(path, version)| {
                strip_path_prefix(import_path, path).map(|rest| (path, version, rest))
            })
            .max_by_key(|(path, _, _)| path.len());
        if let (Some((path, version, rest)), Some(cache)) = (required, &env.mod_cache) {
            let module_dir = cache.join(format!("{}@{}", escape_path(path), version));
            return Some(join_slash(&module_dir, rest));
        }

        env.std_dir(import_path)
    }
}

/// Locations of the Go toolchain's standard library and module cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoEnv {
    pub goroot: Option<PathBuf>,
    pub mod_cache: Option<PathBuf>,
}

static DETECTED_ENV: Lazy<GoEnv> = Lazy::new(GoEnv::probe);

impl GoEnv {
    /// Detect the environment once per process.
    pub fn detect() -> Self {
        DETECTED_ENV.clone()
    }

    fn probe() -> Self {
        let goroot = std::env::var_os("GOROOT")
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| go_env("GOROOT"));

        let mod_cache = std::env::var_os("GOMODCACHE")
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| {
                std::env::var_os("GOPATH")
                    .and_then(|p| std::env::split_paths(&p).next())
                    .map(|p| p.join("pkg").join("mod"))
            })
            .or_else(|| dirs::home_dir().map(|h| h.join("go").join("pkg").join("mod")));

        tracing::debug!(?goroot, ?mod_cache, "detected Go environment");
        Self { goroot, mod_cache }
    }

    /// Directory of a standard library package, if it exists.
    pub fn std_dir(&self, import_path: &str) -> Option<PathBuf> {
        let dir = join_slash(&self.goroot.as_ref()?.join("src"), import_path);
        dir.is_dir().then_some(dir)
    }
}

fn go_env(key: &str) -> Option<PathBuf> {
    let output = Command::new("go").args(["env", key]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

/// Module cache escaping: uppercase letters become `!` + lowercase.
pub fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Remainder of `path` below `prefix` ("" when equal), if `prefix` is an
/// import path prefix of `path`.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path == prefix {
        return Some("");
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}

fn join_slash(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, seg| acc.join(seg))
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('`')
}

fn parse_require(spec: &str) -> Option<(String, String)> {
    let mut parts = spec.split_whitespace();
    let path = unquote(parts.next()?).to_string();
    let version = parts.next()?.to_string();
    Some((path, version))
}

fn parse_replace(spec: &str) -> Option<Replace> {
    let (old, new) = spec.split_once("=>")?;
    let old_path = unquote(old.split_whitespace().next()?).to_string();
    let mut new_parts = new.split_whitespace();
    let new_path = unquote(new_parts.next()?).to_string();
    let new_version = new_parts.next().map(str::to_string);
    Some(Replace {
        old_path,
        new_path,
        new_version,
    })
}
