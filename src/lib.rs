// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ddtrace-gen - Datadog tracing decorators for Go interfaces.
//!
//! Reads Go packages, computes the full method set of every interface they
//! declare and writes a decorator per interface that opens a span around
//! each context-taking method.
//!
//! # Architecture
//!
//! - [`golang`] - go.mod discovery, source loading and tree-sitter parsing
//! - [`scanner`] - interface declarations per file
//! - [`resolver`] - flattened method sets across embeds, aliases and packages
//! - [`cache`] - concurrency-safe package cache shared by workers
//! - [`codegen`] - templates, import handling, formatting and output files
//! - [`generate`] - batch and single-package runs, incremental checks
//! - [`config`] - `.ddtrace.yaml` loading and package pattern expansion
//! - [`telemetry`] - logging setup and operation metrics
//! - [`error`] - error types and result aliases
//!
//! # Example
//!
//! ```rust,ignore
//! use ddtrace_gen::config::{find_config, load_config};
//! use ddtrace_gen::generate::{run, GenerateOptions};
//!
//! let path = find_config(&std::env::current_dir()?).expect("no .ddtrace.yaml");
//! let config = load_config(&path)?;
//! let report = run(&config, &path, &GenerateOptions::default()).await?;
//! println!("{}", report.summary());
//! ```

pub mod cache;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generate;
pub mod golang;
pub mod resolver;
pub mod scanner;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use error::{ConfigError, GenerateError, LoadError, RenderError, ResolveError, Result};
pub use generate::{run, run_single, GenerateOptions, RunReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
