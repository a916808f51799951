// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions for `.ddtrace.yaml`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Default output subdirectory, relative to each source package.
pub const DEFAULT_OUTPUT: &str = "trace";

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Output subdirectory used when a package does not override it.
    #[serde(default = "default_output")]
    pub output: String,

    /// Suppress the `//go:generate` directive in generated files.
    #[serde(default)]
    pub no_generate: bool,

    /// Path segments (or globs) excluded when expanding `/...` patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Import path of the tracing helper package used by generated code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing_package: Option<String>,

    /// Package import paths or patterns (`./...`) to per-package settings.
    #[serde(default, deserialize_with = "null_as_default")]
    pub packages: BTreeMap<String, PackageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: default_output(),
            no_generate: false,
            exclude: Vec::new(),
            tracing_package: None,
            packages: BTreeMap::new(),
        }
    }
}

/// Per-package settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Overrides by interface name. Interfaces not listed use defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "null_as_default")]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
}

/// Per-interface settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterfaceConfig {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_prefix: Option<String>,
}

/// Package settings after applying the global defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSettings {
    pub output: String,
    pub interfaces: BTreeMap<String, InterfaceConfig>,
}

impl PackageSettings {
    pub fn interface(&self, name: &str) -> Option<&InterfaceConfig> {
        self.interfaces.get(name)
    }

    /// Output directory for a package living in `source_dir`.
    pub fn output_dir(&self, source_dir: &Path) -> PathBuf {
        let output = Path::new(&self.output);
        if output.is_absolute() {
            output.to_path_buf()
        } else {
            source_dir.join(output)
        }
    }
}

/// One concrete package to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackageJob {
    pub import_path: String,
    pub dir: PathBuf,
    pub config: PackageSettings,
    /// Came from an explicit entry rather than a `/...` expansion.
    pub explicit: bool,
}

impl Config {
    /// Merge the global defaults into a package entry.
    pub fn merge_package(&self, package: &PackageConfig) -> PackageSettings {
        PackageSettings {
            output: package
                .output
                .clone()
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| self.output.clone()),
            interfaces: package.interfaces.clone(),
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_output("output", &self.output)?;
        for (pattern, package) in &self.packages {
            if let Some(output) = &package.output {
                validate_output(&format!("packages.{pattern}.output"), output)?;
            }
            for (name, iface) in &package.interfaces {
                if let Some(decorator) = &iface.decorator_name {
                    if !crate::golang::is_identifier(decorator) {
                        return Err(ConfigError::InvalidValue {
                            field: format!("packages.{pattern}.interfaces.{name}.decorator-name"),
                            message: format!("{decorator:?} is not a Go identifier"),
                        });
                    }
                }
            }
        }
        if self.exclude.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "exclude".to_string(),
                message: "entries must not be empty".to_string(),
            });
        }
        if let Some(pkg) = &self.tracing_package {
            if pkg.trim().is_empty() || pkg.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    field: "tracing-package".to_string(),
                    message: format!("{pkg:?} is not an import path"),
                });
            }
        }
        Ok(())
    }
}

/// Output directories are relative and stay below the package.
fn validate_output(field: &str, output: &str) -> Result<(), ConfigError> {
    let path = Path::new(output);
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if output.is_empty() || escapes {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("{output:?} must be a relative path below the package"),
        });
    }
    Ok(())
}

/// Treat an explicit YAML `null` like a missing value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
