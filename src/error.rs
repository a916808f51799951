// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for ddtrace-gen.
//!
//! This module provides strongly-typed errors for each stage of the pipeline,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation
//! at the binary boundary.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while locating or parsing Go packages.
///
/// Payloads are plain strings so the package cache can memoize failed loads
/// and hand the same error to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("no Go files in {0}")]
    NoGoFiles(String),

    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("syntax error at {position}: {message}")]
    Syntax { position: String, message: String },

    #[error("invalid go.mod at {path}: {message}")]
    InvalidModule { path: String, message: String },

    #[error("parser setup failed: {0}")]
    Parser(String),
}

impl LoadError {
    /// Create an IO error tagged with the offending path.
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors that can occur while computing an interface's method set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("target {name} not found in package {package}")]
    TargetNotFound { name: String, package: String },

    #[error("{name} is not an interface (found {kind})")]
    NotAnInterface { name: String, kind: String },

    #[error("unknown selector {selector} in package {package}")]
    UnresolvedSelector { selector: String, package: String },

    #[error("interface {interface} has unexported method {method}")]
    UnexportedMethod { interface: String, method: String },

    #[error("interface {0} is unexported and cannot be decorated from another package")]
    UnexportedInterface(String),

    #[error("cyclic interface embedding: {0}")]
    CyclicEmbedding(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors that can occur while rendering generated source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("template {template} failed: {message}")]
    Template { template: String, message: String },

    #[error("failed to format generated code: {0}")]
    Format(String),
}

impl RenderError {
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("no packages defined in config")]
    NoPackages,

    #[error("failed to resolve pattern {pattern:?}: {message}")]
    PatternResolution { pattern: String, message: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Errors that can occur while generating decorators for packages.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load source package: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to generate for {file}: {source}")]
    File { file: String, source: RenderError },

    #[error("failed to generate for package {import_path}: {source}")]
    Package {
        import_path: String,
        source: Box<GenerateError>,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

impl GenerateError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap an error with the import path of the package it occurred in.
    pub fn in_package(self, import_path: impl Into<String>) -> Self {
        Self::Package {
            import_path: import_path.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
