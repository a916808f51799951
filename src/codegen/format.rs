// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Formatting and import normalization of generated source.

use std::collections::HashSet;
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use tree_sitter::{Node, Tree};

use crate::error::RenderError;
use crate::golang::syntax::{first_error, parse_tree};
use crate::golang::{is_identifier, path_base};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Turns assembled source into its final form, or rejects it.
pub trait Formatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String, RenderError>;
}

/// Syntax-checking formatter that merges imports into one block.
///
/// Unused and duplicate imports are dropped, standard library imports are
/// grouped before the rest, runs of blank lines collapse to one, trailing
/// whitespace is removed and the file ends with a single newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceFormatter;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ImportLine {
    alias: Option<String>,
    path: String,
}

impl ImportLine {
    fn is_std(&self) -> bool {
        !self.path.split('/').next().unwrap_or("").contains('.')
    }

    fn is_used(&self, used: &HashSet<String>) -> bool {
        match self.alias.as_deref() {
            Some("_") | Some(".") => true,
            Some(alias) => used.contains(alias),
            None => {
                let local = path_base(&self.path);
                !is_identifier(local) || used.contains(local)
            }
        }
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("\t{} \"{}\"\n", alias, self.path),
            None => format!("\t\"{}\"\n", self.path),
        }
    }
}

impl Formatter for SourceFormatter {
    fn format(&self, source: &str) -> Result<String, RenderError> {
        let start = Instant::now();

        let tree = parse_checked(source)?;
        let root = tree.root_node();
        let src = source.as_bytes();

        let mut decls: Vec<Range<usize>> = Vec::new();
        let mut imports: Vec<ImportLine> = Vec::new();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if node.kind() == "import_declaration" {
                decls.push(node.start_byte()..node.end_byte());
                collect_imports(&node, src, &mut imports);
            }
        }

        let used = used_qualifiers(&root, src);
        let mut seen = HashSet::new();
        imports.retain(|i| i.is_used(&used) && seen.insert(i.clone()));

        let block = import_block(&imports);
        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for (i, range) in decls.iter().enumerate() {
            out.push_str(&source[last..range.start]);
            if i == 0 {
                out.push_str(&block);
            }
            last = range.end;
        }
        out.push_str(&source[last..]);

        let out = normalize_whitespace(&out);
        parse_checked(&out)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("codegen.format", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(out)
    }
}

/// Runs [`SourceFormatter`], then pipes the result through `gofmt`.
#[derive(Debug, Clone)]
pub struct GofmtFormatter {
    binary: PathBuf,
}

impl Default for GofmtFormatter {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("gofmt"),
        }
    }
}

impl GofmtFormatter {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Formatter for GofmtFormatter {
    fn format(&self, source: &str) -> Result<String, RenderError> {
        let normalized = SourceFormatter.format(source)?;

        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RenderError::Format(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(normalized.as_bytes())
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| RenderError::Format(e.to_string()))?;

        if !output.status.success() {
            return Err(RenderError::Format(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| RenderError::Format(e.to_string()))
    }
}

fn parse_checked(source: &str) -> Result<Tree, RenderError> {
    let tree = parse_tree(source).map_err(|e| RenderError::Format(e.to_string()))?;
    if let Some(bad) = first_error(&tree.root_node()) {
        let pos = bad.start_position();
        let what = if bad.is_missing() {
            format!("missing {}", bad.kind())
        } else {
            "unexpected syntax".to_string()
        };
        return Err(RenderError::Format(format!(
            "{}:{}: {}",
            pos.row + 1,
            pos.column + 1,
            what
        )));
    }
    Ok(tree)
}

fn collect_imports(decl: &Node, src: &[u8], imports: &mut Vec<ImportLine>) {
    let mut stack = vec![*decl];
    while let Some(node) = stack.pop() {
        if node.kind() == "import_spec" {
            if let Some(path) = node.child_by_field_name("path") {
                imports.push(ImportLine {
                    alias: node
                        .child_by_field_name("name")
                        .map(|n| text(&n, src).to_string()),
                    path: text(&path, src).trim_matches(['"', '`']).to_string(),
                });
            }
            continue;
        }
        // Reverse so specs come out in source order.
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

/// Identifiers used as package qualifiers anywhere in the file.
fn used_qualifiers(root: &Node, src: &[u8]) -> HashSet<String> {
    let mut used = HashSet::new();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_declaration" => continue,
            "qualified_type" => {
                if let Some(pkg) = node.child_by_field_name("package") {
                    used.insert(text(&pkg, src).to_string());
                }
            }
            "selector_expression" => {
                if let Some(operand) = node.child_by_field_name("operand") {
                    if operand.kind() == "identifier" {
                        used.insert(text(&operand, src).to_string());
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    used
}

fn import_block(imports: &[ImportLine]) -> String {
    if imports.is_empty() {
        return String::new();
    }
    let (mut std, mut other): (Vec<&ImportLine>, Vec<&ImportLine>) =
        imports.iter().partition(|i| i.is_std());
    std.sort_by(|a, b| a.path.cmp(&b.path));
    other.sort_by(|a, b| a.path.cmp(&b.path));

    let mut block = String::from("import (\n");
    for line in &std {
        block.push_str(&line.render());
    }
    if !std.is_empty() && !other.is_empty() {
        block.push('\n');
    }
    for line in &other {
        block.push_str(&line.render());
    }
    block.push(')');
    block
}

fn normalize_whitespace(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut blank_run = 0;
    for line in source.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn text<'s>(node: &Node, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_dedupes_and_prunes_imports() {
        let source = r#"package trace

import (
	"example.com/app/svc"
	"context"
)

import "context"

import (
	"unused/pkg"
	tr "github.com/acme/tracing"
	_ "embed"
)



type T struct {
	svc.Service
	cfg tr.Config
}

func (t T) Do(ctx context.Context) {}
"#;
        let out = SourceFormatter.format(source).unwrap();
        let expected = r#"package trace

import (
	"context"
	_ "embed"

	"example.com/app/svc"
	tr "github.com/acme/tracing"
)

type T struct {
	svc.Service
	cfg tr.Config
}

func (t T) Do(ctx context.Context) {}
"#;
        assert_eq!(out, expected);
    }

    #[test]
    fn test_no_imports_left() {
        let out = SourceFormatter
            .format("package a\n\nimport \"fmt\"\n\ntype A struct{}\n\n\n")
            .unwrap();
        assert_eq!(out, "package a\n\ntype A struct{}\n");
    }

    #[test]
    fn test_invalid_source_is_a_format_error() {
        let err = SourceFormatter
            .format("package a\n\nfunc (\n")
            .unwrap_err();
        assert!(matches!(err, RenderError::Format(_)));
        assert!(err.to_string().starts_with("failed to format generated code"));
    }

    #[test]
    fn test_missing_gofmt_binary() {
        let formatter = GofmtFormatter::with_binary("/nonexistent/gofmt");
        let err = formatter.format("package a\n").unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }
}
