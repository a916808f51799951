// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tree-sitter based Go syntax model.
//!
//! Only the parts of a Go file the generator cares about are extracted:
//! the package clause, imports and type declarations. Interface bodies are
//! kept structurally (method elements and embedded type references), while
//! parameter and result types are kept as source text plus the spans of every
//! named type they mention, so they can be re-qualified for another package.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

use tree_sitter::{Node, Parser, Tree};

use crate::error::LoadError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::loader::PackageRef;
use super::position::{FileId, PositionRegistry};

/// A single import spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit name (`foo`, `_` or `.`), if any.
    pub alias: Option<String>,
    pub path: String,
}

/// A named type mentioned inside a type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamedRef {
    /// Unqualified identifier, resolved in the declaring package scope.
    Local(String),
    /// `package.Name` selector.
    Qualified { package: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpan {
    /// Byte range within [`GoType::text`].
    pub range: Range<usize>,
    pub target: NamedRef,
}

/// A type expression as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoType {
    pub text: String,
    pub refs: Vec<RefSpan>,
}

impl GoType {
    /// A type with no named references (used for synthesized signatures).
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            refs: Vec::new(),
        }
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Reference to a named type, as found in an embedding or a type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `Name`
    Ident(String),
    /// `pkg.Name`
    Selector { package: String, name: String },
    /// `Name[A, B]` or `pkg.Name[A]`
    Instantiation { base: Box<TypeRef>, args: Vec<GoType> },
}

impl TypeRef {
    /// The reference with any instantiation arguments stripped.
    pub fn base(&self) -> &TypeRef {
        match self {
            TypeRef::Instantiation { base, .. } => base.base(),
            other => other,
        }
    }

    /// Name of the referenced type, without package or arguments.
    pub fn name(&self) -> &str {
        match self.base() {
            TypeRef::Ident(name) | TypeRef::Selector { name, .. } => name,
            TypeRef::Instantiation { .. } => "",
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Ident(name) => f.write_str(name),
            TypeRef::Selector { package, name } => write!(f, "{package}.{name}"),
            TypeRef::Instantiation { base, args } => {
                let args: Vec<&str> = args.iter().map(|a| a.text.as_str()).collect();
                write!(f, "{}[{}]", base, args.join(", "))
            }
        }
    }
}

/// A parameter or result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: GoType,
    pub variadic: bool,
}

/// A method element of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceElem {
    Method(MethodSpec),
    Embed(TypeRef),
    /// Union or approximation constraint (`~int | string`), contributes no methods.
    TypeSet(String),
}

/// An `interface { ... }` literal, elements in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceType {
    pub elems: Vec<InterfaceElem>,
}

impl InterfaceType {
    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.elems.iter().filter_map(|e| match e {
            InterfaceElem::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn embeds(&self) -> impl Iterator<Item = &TypeRef> {
        self.elems.iter().filter_map(|e| match e {
            InterfaceElem::Embed(r) => Some(r),
            _ => None,
        })
    }
}

/// Right-hand side of a type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Interface(InterfaceType),
    Reference(TypeRef),
    /// Any other type; carries the syntax kind (`struct_type`, `slice_type`, ...).
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub names: Vec<String>,
    pub constraint: GoType,
}

/// A single `type` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    /// Comments directly above the spec (or above `type` when ungrouped).
    pub doc: Vec<String>,
    /// Comments above a parenthesized `type ( ... )` group.
    pub group_doc: Vec<String>,
    pub type_params: Vec<TypeParam>,
    pub expr: TypeExpr,
}

/// One parsed Go file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name without directory.
    pub name: String,
    pub file_id: FileId,
    pub package_name: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<TypeDecl>,
}

/// All parsed files of one package.
#[derive(Debug, Clone)]
pub struct ParsedPackage {
    pub import_path: String,
    pub name: String,
    pub files: Vec<SourceFile>,
}

impl ParsedPackage {
    /// Find a top-level type declaration by name.
    pub fn find_decl(&self, name: &str) -> Option<(&SourceFile, &TypeDecl)> {
        self.files
            .iter()
            .find_map(|f| f.decls.iter().find(|d| d.name == name).map(|d| (f, d)))
    }

    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

thread_local! {
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// Parse Go source with this thread's parser.
pub fn parse_tree(source: &str) -> Result<Tree, LoadError> {
    PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(&tree_sitter_go::LANGUAGE.into())
                .map_err(|e| LoadError::Parser(format!("Failed to set Go language: {}", e)))?;
            *slot = Some(parser);
        }
        let Some(parser) = slot.as_mut() else {
            return Err(LoadError::Parser("parser unavailable".to_string()));
        };
        parser
            .parse(source, None)
            .ok_or_else(|| LoadError::Parser("parse was cancelled".to_string()))
    })
}

/// First error or missing node in a tree, depth-first.
pub fn first_error<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.iter().find_map(first_error)
}

/// Parse one Go file into the syntax model.
pub fn parse_source(
    path: &Path,
    source: &str,
    registry: &PositionRegistry,
) -> Result<SourceFile, LoadError> {
    let start = Instant::now();

    let tree = parse_tree(source)?;
    let root = tree.root_node();
    let file_id = registry.add_file(path, source);

    if let Some(bad) = first_error(&root) {
        let position = registry
            .position(file_id, bad.start_byte())
            .map(|p| p.to_string())
            .unwrap_or_else(|| path.display().to_string());
        let message = if bad.is_missing() {
            format!("missing {}", bad.kind())
        } else {
            "unexpected syntax".to_string()
        };
        return Err(LoadError::Syntax { position, message });
    }

    let src = source.as_bytes();
    let mut file = SourceFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_id,
        package_name: String::new(),
        imports: Vec::new(),
        decls: Vec::new(),
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "package_clause" => {
                if let Some(ident) = named_child_of_kind(&node, "package_identifier") {
                    file.package_name = node_text(&ident, src);
                }
            }
            "import_declaration" => collect_imports(&node, src, &mut file.imports),
            "type_declaration" => collect_type_decls(&node, src, &mut file.decls),
            _ => {}
        }
    }

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("golang.syntax.parse_source", start.elapsed());
    #[cfg(not(feature = "telemetry"))]
    let _ = start;

    Ok(file)
}

/// Read and parse every file of a loaded package.
pub fn parse_package(
    package: &PackageRef,
    registry: &PositionRegistry,
) -> Result<ParsedPackage, LoadError> {
    let mut files = Vec::with_capacity(package.files.len());
    for path in &package.files {
        let source = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        files.push(parse_source(path, &source, registry)?);
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ParsedPackage {
        import_path: package.import_path.clone(),
        name: package.name.clone(),
        files,
    })
}

fn collect_imports(node: &Node, src: &[u8], imports: &mut Vec<ImportSpec>) {
    walk_tree(node, &mut |n| {
        if n.kind() != "import_spec" {
            return;
        }
        let Some(path) = n.child_by_field_name("path") else {
            return;
        };
        let path = node_text(&path, src)
            .trim_matches('"')
            .trim_matches('`')
            .to_string();
        let alias = get_child_by_field(n, "name", src);
        imports.push(ImportSpec { alias, path });
    });
}

fn collect_type_decls(node: &Node, src: &[u8], decls: &mut Vec<TypeDecl>) {
    let decl_doc = doc_comments(node, src);
    let grouped = {
        let mut cursor = node.walk();
        let is_grouped = node.children(&mut cursor).any(|c| c.kind() == "(");
        is_grouped
    };

    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if !matches!(spec.kind(), "type_spec" | "type_alias") {
            continue;
        }
        let Some(name) = get_child_by_field(&spec, "name", src) else {
            continue;
        };
        let Some(ty) = spec.child_by_field_name("type") else {
            continue;
        };
        let (doc, group_doc) = if grouped {
            (doc_comments(&spec, src), decl_doc.clone())
        } else {
            (decl_doc.clone(), Vec::new())
        };

        decls.push(TypeDecl {
            name,
            doc,
            group_doc,
            type_params: spec
                .child_by_field_name("type_parameters")
                .map(|list| type_params(&list, src))
                .unwrap_or_default(),
            expr: type_expr(&ty, src),
        });
    }
}

fn type_params(list: &Node, src: &[u8]) -> Vec<TypeParam> {
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        if decl.kind() != "type_parameter_declaration" {
            continue;
        }
        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| node_text(&n, src))
            .collect();
        let constraint = decl
            .child_by_field_name("type")
            .map(|t| go_type(&t, src))
            .unwrap_or_else(|| GoType::plain("any"));
        params.push(TypeParam { names, constraint });
    }
    params
}

fn type_expr(node: &Node, src: &[u8]) -> TypeExpr {
    match node.kind() {
        "interface_type" => TypeExpr::Interface(interface_type(node, src)),
        "parenthesized_type" => match node.named_child(0) {
            Some(inner) => type_expr(&inner, src),
            None => TypeExpr::Other(node.kind().to_string()),
        },
        kind => match type_ref(node, src) {
            Some(r) => TypeExpr::Reference(r),
            None => TypeExpr::Other(kind.to_string()),
        },
    }
}

fn interface_type(node: &Node, src: &[u8]) -> InterfaceType {
    let mut iface = InterfaceType::default();
    let mut cursor = node.walk();
    for elem in node.named_children(&mut cursor) {
        match elem.kind() {
            "method_elem" | "method_spec" => {
                if let Some(method) = method_spec(&elem, src) {
                    iface.elems.push(InterfaceElem::Method(method));
                }
            }
            "comment" => {}
            _ => match type_ref(&elem, src) {
                Some(r) => iface.elems.push(InterfaceElem::Embed(r)),
                None => iface
                    .elems
                    .push(InterfaceElem::TypeSet(node_text(&elem, src))),
            },
        }
    }
    iface
}

fn type_ref(node: &Node, src: &[u8]) -> Option<TypeRef> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(TypeRef::Ident(node_text(node, src))),
        "qualified_type" => Some(TypeRef::Selector {
            package: get_child_by_field(node, "package", src)?,
            name: get_child_by_field(node, "name", src)?,
        }),
        "generic_type" => {
            let base = type_ref(&node.child_by_field_name("type")?, src)?;
            let args = node
                .child_by_field_name("type_arguments")
                .map(|list| {
                    let mut cursor = list.walk();
                    let args: Vec<GoType> = list
                        .named_children(&mut cursor)
                        .filter(|a| a.kind() != "comment")
                        .map(|a| go_type(&a, src))
                        .collect();
                    args
                })
                .unwrap_or_default();
            Some(TypeRef::Instantiation {
                base: Box::new(base),
                args,
            })
        }
        // Embedded elements wrap a single type; unions have several.
        "parenthesized_type" | "type_elem" | "constraint_elem" | "interface_type_name" => {
            let mut cursor = node.walk();
            let inner: Vec<Node> = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect();
            match inner.as_slice() {
                [single] => type_ref(single, src),
                _ => None,
            }
        }
        _ => None,
    }
}

fn method_spec(node: &Node, src: &[u8]) -> Option<MethodSpec> {
    let name = get_child_by_field(node, "name", src)?;
    let params = node
        .child_by_field_name("parameters")
        .map(|p| parameter_list(&p, src))
        .unwrap_or_default();
    let results = match node.child_by_field_name("result") {
        Some(r) if r.kind() == "parameter_list" => parameter_list(&r, src),
        Some(r) => vec![Field {
            name: None,
            ty: go_type(&r, src),
            variadic: false,
        }],
        None => Vec::new(),
    };
    Some(MethodSpec {
        name,
        params,
        results,
        doc: doc_comments(node, src),
    })
}

fn parameter_list(node: &Node, src: &[u8]) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut cursor = node.walk();
    for decl in node.named_children(&mut cursor) {
        let variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let Some(ty) = decl.child_by_field_name("type") else {
            continue;
        };
        let ty = go_type(&ty, src);

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| node_text(&n, src))
            .collect();

        if names.is_empty() {
            fields.push(Field {
                name: None,
                ty,
                variadic,
            });
        } else {
            for name in names {
                fields.push(Field {
                    name: Some(name),
                    ty: ty.clone(),
                    variadic,
                });
            }
        }
    }
    fields
}

fn go_type(node: &Node, src: &[u8]) -> GoType {
    let base = node.start_byte();
    let mut refs = Vec::new();
    collect_refs(node, src, base, &mut refs);
    GoType {
        text: node_text(node, src),
        refs,
    }
}

fn collect_refs(node: &Node, src: &[u8], base: usize, refs: &mut Vec<RefSpan>) {
    let range = node.start_byte() - base..node.end_byte() - base;
    match node.kind() {
        "type_identifier" => refs.push(RefSpan {
            range,
            target: NamedRef::Local(node_text(node, src)),
        }),
        "qualified_type" => {
            if let (Some(package), Some(name)) = (
                get_child_by_field(node, "package", src),
                get_child_by_field(node, "name", src),
            ) {
                refs.push(RefSpan {
                    range,
                    target: NamedRef::Qualified { package, name },
                });
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_refs(&child, src, base, refs);
            }
        }
    }
}

/// Comment lines directly above `node`, in source order.
///
/// A comment counts when it sits on its own line and the block ends on the
/// line right before the node.
fn doc_comments(node: &Node, src: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut current = node.prev_sibling();

    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row + 1 != expected_row {
            break;
        }
        // Trailing comment of a previous element on the same line.
        if let Some(before) = prev.prev_sibling() {
            if before.kind() != "comment"
                && before.kind() != "\n"
                && before.end_position().row == prev.start_position().row
            {
                break;
            }
        }
        lines.push(node_text(&prev, src));
        expected_row = prev.start_position().row;
        current = prev.prev_sibling();
    }

    lines.reverse();
    lines
}

// Helper functions

/// Walk the tree depth-first, calling the callback for each node.
fn walk_tree<F>(node: &Node, callback: &mut F)
where
    F: FnMut(&Node),
{
    callback(node);
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            walk_tree(&child, callback);
        }
    }
}

fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

fn get_child_by_field(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

fn named_child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}
