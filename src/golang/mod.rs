// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Go source model.
//!
//! - [`module`] - go.mod parsing and import path to directory mapping
//! - [`loader`] - the [`SourceLoader`] capability and its module-backed implementation
//! - [`syntax`] - tree-sitter parsing into a small declaration model
//! - [`position`] - shared, thread-safe file/offset registry

pub mod loader;
pub mod module;
pub mod position;
pub mod syntax;

pub use loader::{
    go_files, guess_package_name, package_clause_name, path_base, ModuleLoader, PackageRef,
    SourceLoader, TEST_SUFFIX,
};
pub use module::{GoEnv, GoModule, Replace, GO_MOD};
pub use position::{FileId, Position, PositionRegistry};
pub use syntax::{
    parse_package, parse_source, Field, GoType, ImportSpec, InterfaceElem, InterfaceType,
    MethodSpec, NamedRef, ParsedPackage, RefSpan, SourceFile, TypeDecl, TypeExpr, TypeParam,
    TypeRef,
};

/// Predeclared Go type identifiers.
pub const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32", "float64",
    "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr",
];

pub fn is_predeclared(name: &str) -> bool {
    PREDECLARED_TYPES.contains(&name)
}

/// Whether a Go identifier is exported.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Whether a string is a valid Go identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_helpers() {
        assert!(is_exported("Service"));
        assert!(!is_exported("service"));
        assert!(!is_exported(""));

        assert!(is_identifier("_d"));
        assert!(is_identifier("UserServiceWithTracing"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("with-dash"));

        assert!(is_predeclared("error"));
        assert!(!is_predeclared("Context"));
    }
}
