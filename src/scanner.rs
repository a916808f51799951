// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Declaration scanner.
//!
//! Lists the interface declarations of a parsed package, grouped by file.

use crate::golang::{
    MethodSpec, ParsedPackage, SourceFile, TypeDecl, TypeExpr, TypeParam, TypeRef, TEST_SUFFIX,
};

/// Comment line that excludes a declaration from generation.
pub const IGNORE_DIRECTIVE: &str = "//ddtrace:ignore";

/// Suffix of generated files.
pub const TRACE_SUFFIX: &str = "_trace.go";

/// One interface type found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDeclaration {
    pub name: String,
    pub doc_comments: Vec<String>,
    pub type_params: Vec<TypeParam>,
    pub embedded_refs: Vec<TypeRef>,
    pub direct_methods: Vec<MethodSpec>,
}

/// Interfaces of a single source file, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInterfaces {
    pub file_name: String,
    pub interfaces: Vec<InterfaceDeclaration>,
}

/// Whether a file takes part in scanning.
pub fn is_scannable(file_name: &str) -> bool {
    file_name.ends_with(".go")
        && !file_name.ends_with(TEST_SUFFIX)
        && !file_name.ends_with(TRACE_SUFFIX)
}

/// Scan a package for interface declarations.
///
/// Files come back in lexicographic order and files without any surviving
/// declaration are omitted. An empty result is not an error.
pub fn scan_package(package: &ParsedPackage) -> Vec<FileInterfaces> {
    let mut files: Vec<&SourceFile> = package
        .files
        .iter()
        .filter(|f| is_scannable(&f.name))
        .collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    files
        .into_iter()
        .filter_map(|file| {
            let interfaces: Vec<InterfaceDeclaration> =
                file.decls.iter().filter_map(declaration).collect();
            if interfaces.is_empty() {
                None
            } else {
                Some(FileInterfaces {
                    file_name: file.name.clone(),
                    interfaces,
                })
            }
        })
        .collect()
}

fn declaration(decl: &TypeDecl) -> Option<InterfaceDeclaration> {
    let TypeExpr::Interface(iface) = &decl.expr else {
        return None;
    };
    if has_ignore_directive(&decl.doc) || has_ignore_directive(&decl.group_doc) {
        tracing::debug!("{} is marked {}", decl.name, IGNORE_DIRECTIVE);
        return None;
    }

    Some(InterfaceDeclaration {
        name: decl.name.clone(),
        doc_comments: decl.doc.clone(),
        type_params: decl.type_params.clone(),
        embedded_refs: iface.embeds().cloned().collect(),
        direct_methods: iface.methods().cloned().collect(),
    })
}

fn has_ignore_directive(comments: &[String]) -> bool {
    comments
        .iter()
        .flat_map(|c| c.lines())
        .any(|line| line.trim() == IGNORE_DIRECTIVE)
}
