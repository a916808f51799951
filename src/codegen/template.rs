// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decorator body templates.
//!
//! A template only sees a [`TemplateContext`]: plain strings prepared by the
//! generator. The field set is versioned by [`TEMPLATE_CONTEXT_VERSION`];
//! adding a field is compatible, renaming or removing one bumps the version.

use crate::error::RenderError;
use crate::golang::is_identifier;

pub const TEMPLATE_CONTEXT_VERSION: u32 = 1;

/// Everything a template may reference for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub version: u32,
    pub decorator_name: String,
    pub span_name_prefix: String,
    /// Qualifier of the tracing helper package in this file.
    pub tracing: String,
    pub interface: InterfaceView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceView {
    pub name: String,
    /// Interface type as written in the output file, type arguments included.
    pub qualified_type: String,
    /// Name of the embedded field holding the wrapped value.
    pub field_name: String,
    /// `[K comparable, V any]`, or empty.
    pub type_params: String,
    /// `[K, V]`, or empty.
    pub type_args: String,
    /// Sorted by name.
    pub methods: Vec<MethodView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodView {
    pub name: String,
    /// `Get(ctx context.Context, id string) (r0 *model.User, err error)`
    pub declaration: String,
    /// `Get(ctx, id)`
    pub call: String,
    pub has_results: bool,
    pub accepts_context: bool,
    pub returns_error: bool,
    /// Argument names to values, context excluded.
    pub params_map: String,
    /// Result names to values, trailing error excluded.
    pub results_map: String,
}

/// Renders the body of one decorator.
pub trait Template: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError>;
}

/// Decorator that opens a span around every context-taking method.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatadogTemplate;

impl DatadogTemplate {
    fn check(&self, ctx: &TemplateContext) -> Result<(), RenderError> {
        if ctx.version != TEMPLATE_CONTEXT_VERSION {
            return Err(RenderError::template(
                self.name(),
                format!("unsupported context version {}", ctx.version),
            ));
        }
        if !is_identifier(&ctx.decorator_name) {
            return Err(RenderError::template(
                self.name(),
                format!("decorator name {:?} is not an identifier", ctx.decorator_name),
            ));
        }
        if ctx
            .span_name_prefix
            .contains(|c: char| c == '"' || c == '\\' || c.is_control())
        {
            return Err(RenderError::template(
                self.name(),
                format!("span prefix {:?} cannot be quoted", ctx.span_name_prefix),
            ));
        }
        if let Some(bad) = ctx
            .interface
            .methods
            .iter()
            .find(|m| !is_identifier(&m.name))
        {
            return Err(RenderError::template(
                self.name(),
                format!("method name {:?} is not an identifier", bad.name),
            ));
        }
        Ok(())
    }
}

impl Template for DatadogTemplate {
    fn name(&self) -> &str {
        "datadog"
    }

    fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError> {
        self.check(ctx)?;

        let d = &ctx.decorator_name;
        let iface = &ctx.interface;
        let tp = &iface.type_params;
        let ta = &iface.type_args;
        let tracing = &ctx.tracing;
        let mut out = String::new();

        out.push_str(&format!(
            "// {d} implements {} interface instrumented with Datadog tracing\n",
            iface.name
        ));
        out.push_str(&format!("type {d}{tp} struct {{\n"));
        out.push_str(&format!("\t{}\n", iface.qualified_type));
        out.push_str(&format!("\t_cfg {tracing}.TracingConfig\n"));
        out.push_str("}\n\n");

        out.push_str(&format!("// New{d} returns {d}\n"));
        out.push_str(&format!(
            "func New{d}{tp}(base {}, opts ...{tracing}.TracingOption) {d}{ta} {{\n",
            iface.qualified_type
        ));
        out.push_str(&format!("\treturn {d}{ta}{{\n"));
        let fields = [
            (iface.field_name.as_str(), "base".to_string()),
            ("_cfg", format!("{tracing}.NewTracingConfig(opts...)")),
        ];
        out.push_str(&key_values(&fields, "\t\t"));
        out.push_str("\t}\n}\n");

        for method in &iface.methods {
            out.push('\n');
            out.push_str(&format!("// {} implements {}\n", method.name, iface.name));
            out.push_str(&format!("func (_d {d}{ta}) {} {{\n", method.declaration));
            if method.accepts_context {
                out.push_str(&format!(
                    "\tspan, ctx := _d._cfg.StartSpan(ctx, \"{}.{}\")\n",
                    ctx.span_name_prefix, method.name
                ));
                out.push_str("\tdefer func() {\n");
                out.push_str(&format!(
                    "\t\t_d._cfg.FinishSpan(span, {}, {}, {})\n",
                    if method.returns_error { "err" } else { "nil" },
                    method.params_map,
                    method.results_map
                ));
                out.push_str("\t}()\n");
            }
            let ret = if method.has_results { "return " } else { "" };
            out.push_str(&format!("\t{ret}_d.{}.{}\n", iface.field_name, method.call));
            out.push_str("}\n");
        }

        Ok(out)
    }
}

/// Keys longer than this end gofmt's column alignment of key/value lines.
const GOFMT_SMALL_KEY: usize = 40;

/// Composite literal lines laid out the way gofmt aligns them.
fn key_values(fields: &[(&str, String)], indent: &str) -> String {
    let aligned = fields.iter().all(|(k, _)| k.len() <= GOFMT_SMALL_KEY);
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in fields {
        let pad = if aligned { width - key.len() } else { 0 };
        out.push_str(&format!("{indent}{key}: {}{value},\n", " ".repeat(pad)));
    }
    out
}
