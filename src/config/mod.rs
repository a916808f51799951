// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration for batch generation.
//!
//! A `.ddtrace.yaml` file, found by walking up from the working directory,
//! lists packages (or `/...` patterns) with optional per-package and
//! per-interface overrides. Relative patterns are resolved against the
//! directory holding the config file.

mod loader;
mod patterns;
mod types;

pub use loader::{example_config, find_config, init_config, load_config, CONFIG_FILES};
pub use patterns::{resolve_packages, ExcludeFilter};
pub use types::{
    Config, InterfaceConfig, PackageConfig, PackageSettings, ResolvedPackageJob, DEFAULT_OUTPUT,
};
