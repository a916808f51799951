// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interface resolver.
//!
//! Computes the flattened method set of a named interface. Embedded references
//! are followed through aliases, defined types, other packages (loaded through
//! the [`PackageCache`]) and generic instantiations, to arbitrary depth.
//!
//! Merge order: embedded sets are absorbed in declaration order (the first
//! embed wins among peers), then direct methods overlay everything embedded.
//! Because every level applies the same rule, the signature declared closest
//! to the root always wins.

mod method;

pub use method::{BoundRef, MethodSet, MethodSignature, Param, TypeBinding, TypeString};

use std::time::Instant;

use crate::cache::{PackageCache, PackageContext};
use crate::error::ResolveError;
use crate::golang::{
    guess_package_name, is_exported, is_predeclared, path_base, Field, GoType, MethodSpec,
    NamedRef, PackageRef, SourceFile, TypeExpr, TypeParam, TypeRef,
};
use crate::scanner::InterfaceDeclaration;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// A type parameter of a generic target interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTypeParam {
    pub names: Vec<String>,
    pub constraint: TypeString,
}

/// A target interface and its flattened method set.
#[derive(Debug, Clone)]
pub struct ResolvedInterface {
    pub name: String,
    pub import_path: String,
    pub package_name: String,
    pub type_params: Vec<ResolvedTypeParam>,
    pub doc_comments: Vec<String>,
    pub methods: MethodSet,
}

impl ResolvedInterface {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Methods whose first parameter is a context.
    pub fn traced_method_count(&self) -> usize {
        self.methods
            .iter()
            .filter(|m| m.accepts_leading_context)
            .count()
    }
}

/// Resolves interfaces against packages held in a shared cache.
pub struct Resolver<'a> {
    cache: &'a PackageCache,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a PackageCache) -> Self {
        Self { cache }
    }

    /// Resolve `target` declared in the package of `ctx`.
    pub fn resolve(
        &self,
        target: &str,
        ctx: &PackageContext,
    ) -> Result<ResolvedInterface, ResolveError> {
        let start = Instant::now();

        let (file, decl) =
            ctx.parsed
                .find_decl(target)
                .ok_or_else(|| ResolveError::TargetNotFound {
                    name: target.to_string(),
                    package: ctx.import_path().to_string(),
                })?;

        let mut visiting = Vec::new();
        let methods = self.named(ctx, target, true, &mut visiting)?;
        finish(ctx, file, target, &decl.type_params, &decl.doc, methods, start)
    }

    /// Resolve an interface found by the scanner in `file_name`.
    ///
    /// The declaration's own elements are used as scanned; only embedded
    /// references are looked up.
    pub fn resolve_declaration(
        &self,
        file_name: &str,
        decl: &InterfaceDeclaration,
        ctx: &PackageContext,
    ) -> Result<ResolvedInterface, ResolveError> {
        let start = Instant::now();

        let file = ctx
            .parsed
            .file(file_name)
            .ok_or_else(|| ResolveError::TargetNotFound {
                name: decl.name.clone(),
                package: ctx.import_path().to_string(),
            })?;

        let mut visiting = vec![format!("{}.{}", ctx.import_path(), decl.name)];
        let methods = self.members(
            ctx,
            file,
            &decl.type_params,
            &decl.embedded_refs,
            &decl.direct_methods,
            &mut visiting,
        )?;
        finish(
            ctx,
            file,
            &decl.name,
            &decl.type_params,
            &decl.doc_comments,
            methods,
            start,
        )
    }

    /// Method set of the type `name` declared in `ctx`.
    ///
    /// `required` is set when the caller needs an interface; embedded elements
    /// that are not interfaces (constraint terms) contribute nothing instead.
    fn named(
        &self,
        ctx: &PackageContext,
        name: &str,
        required: bool,
        visiting: &mut Vec<String>,
    ) -> Result<MethodSet, ResolveError> {
        let key = format!("{}.{}", ctx.import_path(), name);
        if visiting.contains(&key) {
            let mut chain = visiting.join(" -> ");
            chain.push_str(" -> ");
            chain.push_str(&key);
            return Err(ResolveError::CyclicEmbedding(chain));
        }

        let (file, decl) =
            ctx.parsed
                .find_decl(name)
                .ok_or_else(|| ResolveError::TargetNotFound {
                    name: name.to_string(),
                    package: ctx.import_path().to_string(),
                })?;

        visiting.push(key);
        let result = match &decl.expr {
            TypeExpr::Interface(iface) => self.members(
                ctx,
                file,
                &decl.type_params,
                iface.embeds(),
                iface.methods(),
                visiting,
            ),
            TypeExpr::Reference(r) => self.reference(ctx, file, r, required, visiting),
            TypeExpr::Other(kind) if required => Err(ResolveError::NotAnInterface {
                name: name.to_string(),
                kind: kind.clone(),
            }),
            TypeExpr::Other(_) => Ok(MethodSet::new()),
        };
        visiting.pop();
        result
    }

    /// Method set of an interface body: embeds first, then direct methods.
    fn members<'e, 'm>(
        &self,
        ctx: &PackageContext,
        file: &SourceFile,
        type_params: &[TypeParam],
        embeds: impl IntoIterator<Item = &'e TypeRef>,
        methods: impl IntoIterator<Item = &'m MethodSpec>,
        visiting: &mut Vec<String>,
    ) -> Result<MethodSet, ResolveError> {
        let mut set = MethodSet::new();
        for embed in embeds {
            // A bare type parameter in a constraint.
            if let TypeRef::Ident(name) = embed {
                if is_type_param(type_params, name) {
                    continue;
                }
            }
            set.absorb(self.reference(ctx, file, embed, false, visiting)?);
        }
        for method in methods {
            set.overlay(signature(ctx, file, type_params, method));
        }
        Ok(set)
    }

    fn reference(
        &self,
        ctx: &PackageContext,
        file: &SourceFile,
        reference: &TypeRef,
        required: bool,
        visiting: &mut Vec<String>,
    ) -> Result<MethodSet, ResolveError> {
        match reference.base() {
            TypeRef::Ident(name) if is_predeclared(name) => predeclared(name, required),
            TypeRef::Ident(name) => self.named(ctx, name, required, visiting),
            TypeRef::Selector { package, name } => {
                let (import_path, _) =
                    import_for(file, &ctx.package, package).ok_or_else(|| {
                        ResolveError::UnresolvedSelector {
                            selector: format!("{package}.{name}"),
                            package: ctx.import_path().to_string(),
                        }
                    })?;
                let other = self.cache.context(&import_path)?;
                self.named(&other, name, required, visiting)
            }
            // base() never returns an instantiation
            TypeRef::Instantiation { .. } => Ok(MethodSet::new()),
        }
    }
}

/// Validate a flattened method set and bind the target's type parameters.
fn finish(
    ctx: &PackageContext,
    file: &SourceFile,
    target: &str,
    type_params: &[TypeParam],
    doc: &[String],
    methods: MethodSet,
    start: Instant,
) -> Result<ResolvedInterface, ResolveError> {
    if let Some(hidden) = methods.sorted().into_iter().find(|m| !is_exported(&m.name)) {
        return Err(ResolveError::UnexportedMethod {
            interface: target.to_string(),
            method: hidden.name.clone(),
        });
    }

    let type_params = type_params
        .iter()
        .map(|p| ResolvedTypeParam {
            names: p.names.clone(),
            constraint: bind(ctx, file, type_params, &p.constraint),
        })
        .collect();

    tracing::debug!(
        "resolved {}.{} with {} methods",
        ctx.import_path(),
        target,
        methods.len()
    );

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("resolver.resolve", start.elapsed());
    #[cfg(not(feature = "telemetry"))]
    let _ = start;

    Ok(ResolvedInterface {
        name: target.to_string(),
        import_path: ctx.import_path().to_string(),
        package_name: ctx.parsed.name.clone(),
        type_params,
        doc_comments: doc.to_vec(),
        methods,
    })
}

fn is_type_param(type_params: &[TypeParam], name: &str) -> bool {
    type_params.iter().any(|p| p.names.iter().any(|n| n == name))
}

fn predeclared(name: &str, required: bool) -> Result<MethodSet, ResolveError> {
    let mut set = MethodSet::new();
    match name {
        "error" => set.overlay(MethodSignature::new(
            "Error",
            Vec::new(),
            vec![Param {
                name: String::new(),
                ty: TypeString::plain("string"),
                variadic: false,
            }],
            Vec::new(),
        )),
        "any" | "comparable" => {}
        _ if required => {
            return Err(ResolveError::NotAnInterface {
                name: name.to_string(),
                kind: "predeclared type".to_string(),
            })
        }
        _ => {}
    }
    Ok(set)
}

fn signature(
    ctx: &PackageContext,
    file: &SourceFile,
    type_params: &[TypeParam],
    method: &MethodSpec,
) -> MethodSignature {
    let bind_fields = |fields: &[Field]| -> Vec<Param> {
        fields
            .iter()
            .map(|f| Param {
                name: f.name.clone().unwrap_or_default(),
                ty: bind(ctx, file, type_params, &f.ty),
                variadic: f.variadic,
            })
            .collect()
    };
    MethodSignature::new(
        method.name.clone(),
        bind_fields(&method.params),
        bind_fields(&method.results),
        method.doc.clone(),
    )
}

/// Bind every named reference of a type to the package declaring it.
fn bind(
    ctx: &PackageContext,
    file: &SourceFile,
    type_params: &[TypeParam],
    ty: &GoType,
) -> TypeString {
    let refs = ty
        .refs
        .iter()
        .map(|span| {
            let (name, binding) = match &span.target {
                NamedRef::Local(name) => {
                    let is_param = is_type_param(type_params, name);
                    let binding = if is_predeclared(name) || is_param {
                        TypeBinding::Verbatim
                    } else {
                        TypeBinding::Package {
                            import_path: ctx.import_path().to_string(),
                            package_name: ctx.parsed.name.clone(),
                        }
                    };
                    (name.clone(), binding)
                }
                NamedRef::Qualified { package, name } => {
                    let binding = match import_for(file, &ctx.package, package) {
                        Some((import_path, package_name)) => TypeBinding::Package {
                            import_path,
                            package_name,
                        },
                        None => {
                            tracing::debug!("leaving {}.{} unqualified", package, name);
                            TypeBinding::Verbatim
                        }
                    };
                    (name.clone(), binding)
                }
            };
            BoundRef {
                range: span.range.clone(),
                name,
                binding,
            }
        })
        .collect();
    TypeString::new(ty.text.clone(), refs)
}

/// Map a package qualifier to (import path, package name).
///
/// The imports of the referencing file are consulted first, then the
/// dependencies of its package.
fn import_for(file: &SourceFile, package: &PackageRef, qualifier: &str) -> Option<(String, String)> {
    let name_of = |path: &str| {
        package
            .dep_name(path)
            .map(str::to_string)
            .unwrap_or_else(|| guess_package_name(path))
    };

    for spec in &file.imports {
        match spec.alias.as_deref() {
            Some(alias) if alias == qualifier => {
                return Some((spec.path.clone(), name_of(&spec.path)));
            }
            Some(_) => {}
            None => {
                let name = name_of(&spec.path);
                let unresolved_base = package.dep_name(&spec.path).is_none()
                    && path_base(&spec.path) == qualifier;
                if name == qualifier || unresolved_base {
                    return Some((spec.path.clone(), name));
                }
            }
        }
    }

    package
        .deps
        .iter()
        .find(|(_, name)| name.as_str() == qualifier)
        .map(|(path, name)| (path.clone(), name.clone()))
}
