// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decorator generation.
//!
//! The generator turns resolved interfaces into a [`TemplateContext`], runs the
//! template for every interface of a source file and assembles the results
//! under a single header. The whole file then goes through the [`Formatter`]
//! once, which leaves one deduplicated import block no matter how many
//! interfaces contributed to it.

use std::collections::HashSet;
use std::time::Instant;

use crate::config::InterfaceConfig;
use crate::error::{RenderError, ResolveError};
use crate::golang::{guess_package_name, is_exported, is_identifier};
use crate::resolver::{MethodSignature, Param, ResolvedInterface, TypeString};

use super::defaults::defaults;
use super::format::{Formatter, SourceFormatter};
use super::imports::{ImportSet, RESERVED_IDENTS};
use super::template::{
    DatadogTemplate, InterfaceView, MethodView, Template, TemplateContext,
    TEMPLATE_CONTEXT_VERSION,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Per-interface naming and selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub decorator_name: String,
    pub span_name_prefix: String,
    pub ignore: bool,
}

impl RenderOptions {
    /// Options for interface `name`, applying overrides from the config.
    pub fn for_interface(name: &str, config: Option<&InterfaceConfig>) -> Self {
        let config = config.cloned().unwrap_or_default();
        Self {
            decorator_name: config
                .decorator_name
                .unwrap_or_else(|| format!("{name}WithTracing")),
            span_name_prefix: config.span_prefix.unwrap_or_else(|| name.to_string()),
            ignore: config.ignore,
        }
    }
}

/// The package generated code is written into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub package_name: String,
    /// Import path of the output directory, when it lies inside a module.
    /// Types declared there are written without a qualifier.
    pub import_path: Option<String>,
}

impl OutputTarget {
    fn is_package(&self, import_path: &str) -> bool {
        self.import_path.as_deref() == Some(import_path)
    }
}

/// Arguments of the `//go:generate` directive that reproduces a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoGenerate {
    pub package: String,
    pub output: String,
}

/// Interfaces of one source file, in source order.
#[derive(Debug, Clone)]
pub struct GenerationUnit {
    pub source_file_name: String,
    pub interfaces: Vec<(ResolvedInterface, RenderOptions)>,
}

/// Result of rendering one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRender {
    /// Formatted file, or `None` when no interface produced a decorator.
    pub content: Option<String>,
    pub generated: Vec<String>,
    pub skipped: usize,
}

/// Renders decorators with a template and a formatter.
pub struct Generator {
    template: Box<dyn Template>,
    formatter: Box<dyn Formatter>,
    tracing_import: String,
    tool_name: String,
    tool_url: String,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Datadog template and the built-in formatter, using the process defaults.
    pub fn new() -> Self {
        let d = defaults();
        Self {
            template: Box::new(DatadogTemplate),
            formatter: Box::new(SourceFormatter),
            tracing_import: d.tracing_import.clone(),
            tool_name: d.tool_name.clone(),
            tool_url: d.tool_url.clone(),
        }
    }

    pub fn with_template(mut self, template: Box<dyn Template>) -> Self {
        self.template = template;
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_tracing_import(mut self, tracing_import: impl Into<String>) -> Self {
        self.tracing_import = tracing_import.into();
        self
    }

    pub fn tracing_import(&self) -> &str {
        &self.tracing_import
    }

    /// Render a complete file holding the decorator of a single interface
    /// declared in `source_file_name`.
    ///
    /// Unlike [`Generator::render_file`], every failure is returned.
    pub fn render(
        &self,
        source_file_name: &str,
        iface: &ResolvedInterface,
        options: &RenderOptions,
        target: &OutputTarget,
    ) -> Result<String, RenderError> {
        let mut imports = ImportSet::new();
        let body = self.body(iface, options, target, &mut imports)?;
        let source = self.assemble(source_file_name, target, None, &imports, &[body]);
        self.formatter.format(&source)
    }

    /// Render every interface of a source file into one output file.
    ///
    /// Interfaces that are ignored, have nothing to trace, cannot be referenced
    /// from the output package or fail in the template are skipped and logged.
    /// A formatting failure of the assembled file is returned.
    pub fn render_file(
        &self,
        unit: &GenerationUnit,
        target: &OutputTarget,
        go_generate: Option<&GoGenerate>,
    ) -> Result<FileRender, RenderError> {
        let start = Instant::now();
        let mut result = FileRender::default();
        let mut imports = ImportSet::new();
        let mut bodies = Vec::new();

        for (iface, options) in &unit.interfaces {
            if options.ignore {
                tracing::debug!("{}: {} is ignored by config", unit.source_file_name, iface.name);
                result.skipped += 1;
                continue;
            }
            if !target.is_package(&iface.import_path) && !is_exported(&iface.name) {
                tracing::warn!(
                    "{}: {}",
                    unit.source_file_name,
                    ResolveError::UnexportedInterface(iface.name.clone())
                );
                result.skipped += 1;
                continue;
            }
            if iface.traced_method_count() == 0 {
                tracing::debug!(
                    "{}: {} has no context methods, skipping",
                    unit.source_file_name,
                    iface.name
                );
                result.skipped += 1;
                continue;
            }

            // Imports are committed only once the template succeeds.
            let mut attempt = imports.clone();
            match self.body(iface, options, target, &mut attempt) {
                Ok(body) => {
                    imports = attempt;
                    bodies.push(body);
                    result.generated.push(iface.name.clone());
                }
                Err(e) => {
                    tracing::warn!("{}: skipping {}: {}", unit.source_file_name, iface.name, e);
                    result.skipped += 1;
                }
            }
        }

        if !bodies.is_empty() {
            let source = self.assemble(
                &unit.source_file_name,
                target,
                go_generate,
                &imports,
                &bodies,
            );
            result.content = Some(self.formatter.format(&source)?);
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("codegen.render_file", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(result)
    }

    fn assemble(
        &self,
        source: &str,
        target: &OutputTarget,
        go_generate: Option<&GoGenerate>,
        imports: &ImportSet,
        bodies: &[String],
    ) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "// Code generated by {}. DO NOT EDIT.\n",
            self.tool_name
        ));
        out.push_str(&format!("// source: {source}\n"));
        out.push_str(&format!("// {}: {}\n\n", self.tool_name, self.tool_url));
        out.push_str(&format!("package {}\n\n", target.package_name));
        if let Some(g) = go_generate {
            out.push_str(&format!(
                "//go:generate {} gen -p {} -o {}\n\n",
                self.tool_name, g.package, g.output
            ));
        }
        let block = imports.render();
        if !block.is_empty() {
            out.push_str(&block);
            out.push('\n');
        }
        out.push_str(&bodies.join("\n"));
        out
    }

    /// Template output for one interface. New imports go into `imports`.
    fn body(
        &self,
        iface: &ResolvedInterface,
        options: &RenderOptions,
        target: &OutputTarget,
        imports: &mut ImportSet,
    ) -> Result<String, RenderError> {
        let param_names: Vec<&str> = iface
            .type_params
            .iter()
            .flat_map(|p| p.names.iter().map(String::as_str))
            .collect();
        for name in &param_names {
            imports.reserve(name);
        }

        let tracing = imports.add(&self.tracing_import, &guess_package_name(&self.tracing_import));

        let (type_params, type_args) = if iface.is_generic() {
            let params: Vec<String> = iface
                .type_params
                .iter()
                .map(|p| {
                    let constraint = qualify(&p.constraint, target, imports);
                    format!("{} {}", p.names.join(", "), constraint)
                })
                .collect();
            (
                format!("[{}]", params.join(", ")),
                format!("[{}]", param_names.join(", ")),
            )
        } else {
            (String::new(), String::new())
        };

        let interface_type = if target.is_package(&iface.import_path) {
            iface.name.clone()
        } else {
            let qualifier = imports.add(&iface.import_path, &iface.package_name);
            format!("{}.{}", qualifier, iface.name)
        };

        let methods = iface
            .methods
            .sorted()
            .into_iter()
            .map(|m| method_view(m, &param_names, target, imports))
            .collect();

        let ctx = TemplateContext {
            version: TEMPLATE_CONTEXT_VERSION,
            decorator_name: options.decorator_name.clone(),
            span_name_prefix: options.span_name_prefix.clone(),
            tracing,
            interface: InterfaceView {
                name: iface.name.clone(),
                qualified_type: format!("{interface_type}{type_args}"),
                field_name: iface.name.clone(),
                type_params,
                type_args,
                methods,
            },
        };
        self.template.render(&ctx)
    }
}

/// Spell `ty` for the output package, importing what it references.
fn qualify(ty: &TypeString, target: &OutputTarget, imports: &mut ImportSet) -> String {
    ty.render(|import_path, package_name, name| {
        if target.is_package(import_path) {
            name.to_string()
        } else {
            format!("{}.{}", imports.add(import_path, package_name), name)
        }
    })
}

fn method_view(
    method: &MethodSignature,
    type_params: &[&str],
    target: &OutputTarget,
    imports: &mut ImportSet,
) -> MethodView {
    let mut taken: HashSet<String> = RESERVED_IDENTS
        .iter()
        .chain(type_params.iter())
        .map(|s| s.to_string())
        .collect();

    let params: Vec<String> = method
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == 0 && method.accepts_leading_context {
                "ctx".to_string()
            } else {
                local_name(p, &format!("p{i}"), &mut taken)
            }
        })
        .collect();

    let last = method.results.len().saturating_sub(1);
    let results: Vec<String> = method
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if i == last && method.returns_trailing_error {
                "err".to_string()
            } else {
                local_name(r, &format!("r{i}"), &mut taken)
            }
        })
        .collect();

    let param_decls: Vec<String> = method
        .params
        .iter()
        .zip(&params)
        .map(|(p, name)| {
            let dots = if p.variadic { "..." } else { "" };
            format!("{name} {dots}{}", qualify(&p.ty, target, imports))
        })
        .collect();
    let result_decls: Vec<String> = method
        .results
        .iter()
        .zip(&results)
        .map(|(r, name)| format!("{name} {}", qualify(&r.ty, target, imports)))
        .collect();

    let mut declaration = format!("{}({})", method.name, param_decls.join(", "));
    if !result_decls.is_empty() {
        declaration.push_str(&format!(" ({})", result_decls.join(", ")));
    }

    let args: Vec<String> = method
        .params
        .iter()
        .zip(&params)
        .map(|(p, name)| {
            if p.variadic {
                format!("{name}...")
            } else {
                name.clone()
            }
        })
        .collect();

    let skip_ctx = usize::from(method.accepts_leading_context);
    let traced_results = if method.returns_trailing_error {
        &results[..last]
    } else {
        &results[..]
    };

    MethodView {
        name: method.name.clone(),
        declaration,
        call: format!("{}({})", method.name, args.join(", ")),
        has_results: !method.results.is_empty(),
        accepts_context: method.accepts_leading_context,
        returns_error: method.returns_trailing_error,
        params_map: value_map(&params[skip_ctx..]),
        results_map: value_map(traced_results),
    }
}

/// The declared name when usable, else `fallback` made unique.
fn local_name(param: &Param, fallback: &str, taken: &mut HashSet<String>) -> String {
    let name = if is_identifier(&param.name) && param.name != "_" && !taken.contains(&param.name)
    {
        param.name.clone()
    } else {
        let mut name = fallback.to_string();
        while taken.contains(&name) {
            name.push('_');
        }
        name
    };
    taken.insert(name.clone());
    name
}

fn value_map(names: &[String]) -> String {
    let entries: Vec<String> = names.iter().map(|n| format!("\"{n}\": {n}")).collect();
    format!("map[string]interface{{}}{{{}}}", entries.join(", "))
}
