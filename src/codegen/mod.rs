// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Code generation for tracing decorators.
//!
//! - [`generator`] - resolved interfaces to formatted source files
//! - [`template`] - the versioned template context and the Datadog template
//! - [`imports`] - per-file import set with collision-free qualifiers
//! - [`format`] - syntax validation and import normalization
//! - [`output`] - output naming and change-aware writes
//! - [`defaults`] - process-wide generator defaults

pub mod defaults;
pub mod format;
pub mod generator;
pub mod imports;
pub mod output;
pub mod template;

pub use defaults::{defaults, init_defaults, GeneratorDefaults, DEFAULT_TRACING_IMPORT};
pub use format::{Formatter, GofmtFormatter, SourceFormatter};
pub use generator::{
    FileRender, GenerationUnit, Generator, GoGenerate, OutputTarget, RenderOptions,
};
pub use imports::{ImportSet, RESERVED_IDENTS};
pub use output::{output_file_name, output_package_name, write_if_changed, WriteOutcome};
pub use template::{
    DatadogTemplate, InterfaceView, MethodView, Template, TemplateContext,
    TEMPLATE_CONTEXT_VERSION,
};
