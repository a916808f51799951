// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration discovery and loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{Config, InterfaceConfig, PackageConfig};

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[".ddtrace.yaml", ".ddtrace.yml"];

/// Find the nearest config file, walking up from `start`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        for filename in CONFIG_FILES {
            let candidate = current.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&content)?;
    if config.output.is_empty() {
        config.output = super::types::DEFAULT_OUTPUT.to_string();
    }
    config.validate()?;
    tracing::debug!(
        "loaded {} with {} package entries",
        path.display(),
        config.packages.len()
    );
    Ok(config)
}

/// An example configuration, written by `init`.
pub fn example_config() -> Config {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(
        "UserService".to_string(),
        InterfaceConfig {
            decorator_name: Some("UserServiceWithTracing".to_string()),
            span_prefix: Some("users".to_string()),
            ..InterfaceConfig::default()
        },
    );
    interfaces.insert(
        "Internal".to_string(),
        InterfaceConfig {
            ignore: true,
            ..InterfaceConfig::default()
        },
    );

    let mut packages = BTreeMap::new();
    packages.insert("./...".to_string(), PackageConfig::default());
    packages.insert(
        "./service".to_string(),
        PackageConfig {
            output: None,
            interfaces,
        },
    );

    Config {
        exclude: vec!["mock".to_string(), "testdata".to_string()],
        packages,
        ..Config::default()
    }
}

/// Write the example config into `dir`.
///
/// An existing file is only replaced when `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILES[0]);
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            field: "path".to_string(),
            message: format!("{} already exists", path.display()),
        });
    }

    let body = serde_yaml::to_string(&example_config())?;
    let content = format!("# ddtrace-gen configuration\n{body}");
    std::fs::write(&path, content)?;
    Ok(path)
}
