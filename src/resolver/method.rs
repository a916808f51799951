// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolved method signatures and method sets.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Package a named type was bound to during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBinding {
    /// Kept as written: predeclared types, type parameters, unknown selectors.
    Verbatim,
    /// Declared in the given package.
    Package {
        import_path: String,
        package_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRef {
    pub range: Range<usize>,
    pub name: String,
    pub binding: TypeBinding,
}

/// A type as written in source, with each named type bound to its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeString {
    text: String,
    refs: Vec<BoundRef>,
}

impl TypeString {
    pub fn new(text: impl Into<String>, refs: Vec<BoundRef>) -> Self {
        Self {
            text: text.into(),
            refs,
        }
    }

    /// A type without named references to other packages.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn refs(&self) -> &[BoundRef] {
        &self.refs
    }

    /// Whether the whole type is exactly `name` from `import_path`.
    pub fn is_named(&self, import_path: &str, name: &str) -> bool {
        match self.refs.as_slice() {
            [only] => {
                only.range == (0..self.text.len())
                    && only.name == name
                    && matches!(&only.binding, TypeBinding::Package { import_path: p, .. } if p == import_path)
            }
            _ => false,
        }
    }

    /// Whether the type is the predeclared `error`.
    pub fn is_error(&self) -> bool {
        self.text == "error"
            && self
                .refs
                .iter()
                .all(|r| matches!(r.binding, TypeBinding::Verbatim))
    }

    /// Render the type, letting `qualify` choose the spelling of every
    /// package-bound name. Verbatim references keep their source text.
    pub fn render<F>(&self, mut qualify: F) -> String
    where
        F: FnMut(&str, &str, &str) -> String,
    {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for r in &self.refs {
            if let TypeBinding::Package {
                import_path,
                package_name,
            } = &r.binding
            {
                out.push_str(&self.text[last..r.range.start]);
                out.push_str(&qualify(import_path, package_name, &r.name));
                last = r.range.end;
            }
        }
        out.push_str(&self.text[last..]);
        out
    }
}

impl fmt::Display for TypeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A parameter or result of a resolved method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Declared name; empty when unnamed.
    pub name: String,
    pub ty: TypeString,
    pub variadic: bool,
}

/// A fully resolved method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// First parameter is `context.Context`.
    pub accepts_leading_context: bool,
    /// Last result is `error`.
    pub returns_trailing_error: bool,
    pub doc_comments: Vec<String>,
}

impl MethodSignature {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        results: Vec<Param>,
        doc_comments: Vec<String>,
    ) -> Self {
        let accepts_leading_context = params
            .first()
            .map(|p| !p.variadic && p.ty.is_named("context", "Context"))
            .unwrap_or(false);
        let returns_trailing_error = results.last().map(|r| r.ty.is_error()).unwrap_or(false);
        Self {
            name: name.into(),
            params,
            results,
            accepts_leading_context,
            returns_trailing_error,
            doc_comments,
        }
    }
}

/// Flattened method set of an interface, keyed by method name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    methods: HashMap<String, MethodSignature>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name)
    }

    /// Add an embedded set; methods already present are kept.
    pub fn absorb(&mut self, other: MethodSet) {
        for (name, method) in other.methods {
            self.methods.entry(name).or_insert(method);
        }
    }

    /// Add a directly declared method, replacing any embedded one.
    pub fn overlay(&mut self, method: MethodSignature) {
        self.methods.insert(method.name.clone(), method);
    }

    /// Methods ordered by name.
    pub fn sorted(&self) -> Vec<&MethodSignature> {
        let mut methods: Vec<&MethodSignature> = self.methods.values().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_type(text: &str) -> TypeString {
        TypeString::new(
            text,
            vec![BoundRef {
                range: 0..text.len(),
                name: "Context".to_string(),
                binding: TypeBinding::Package {
                    import_path: "context".to_string(),
                    package_name: "context".to_string(),
                },
            }],
        )
    }

    fn param(name: &str, ty: TypeString) -> Param {
        Param {
            name: name.to_string(),
            ty,
            variadic: false,
        }
    }

    #[test]
    fn test_flags() {
        let m = MethodSignature::new(
            "Get",
            vec![param("c", context_type("stdctx.Context"))],
            vec![param("", TypeString::plain("int")), param("", TypeString::plain("error"))],
            Vec::new(),
        );
        assert!(m.accepts_leading_context);
        assert!(m.returns_trailing_error);

        // The reference must cover the whole type.
        let mut ty = context_type("*context.Context");
        ty.refs[0].range = 1..16;
        let ptr = MethodSignature::new("Ptr", vec![param("c", ty)], Vec::new(), Vec::new());
        assert!(!ptr.accepts_leading_context);
        assert!(!ptr.returns_trailing_error);
    }

    #[test]
    fn test_absorb_keeps_first_and_overlay_replaces() {
        let sig = |name: &str, ty: &str| {
            MethodSignature::new(name, vec![param("x", TypeString::plain(ty))], Vec::new(), Vec::new())
        };

        let mut first = MethodSet::new();
        first.overlay(sig("M", "int"));
        let mut second = MethodSet::new();
        second.overlay(sig("M", "string"));
        second.overlay(sig("N", "bool"));

        let mut set = MethodSet::new();
        set.absorb(first);
        set.absorb(second);
        assert_eq!(set.get("M").unwrap().params[0].ty.as_str(), "int");
        assert_eq!(set.len(), 2);

        set.overlay(sig("M", "float64"));
        assert_eq!(set.get("M").unwrap().params[0].ty.as_str(), "float64");

        let names: Vec<&str> = set.sorted().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["M", "N"]);
    }

    #[test]
    fn test_render_qualifies_package_refs() {
        let text = "map[string]*model.User";
        let ty = TypeString::new(
            text,
            vec![BoundRef {
                range: 12..text.len(),
                name: "User".to_string(),
                binding: TypeBinding::Package {
                    import_path: "example.com/app/model".to_string(),
                    package_name: "model".to_string(),
                },
            }],
        );
        let rendered = ty.render(|_, pkg, name| format!("{pkg}2.{name}"));
        assert_eq!(rendered, "map[string]*model2.User");
    }
}
