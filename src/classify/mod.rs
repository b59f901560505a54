//
//  mod.rs
//  Atlas
//

//! DependencyClassifier: turns one class's AST into classified dependency edges.
//!
//! Each rule family lives in its own module and appends to a shared
//! [`Emitter`]. Literal name lists are kept in [`rules`] and evaluated by
//! its small matching engine, which the `usage` pass drives over call sites
//! and declared variable types.

pub mod members;
pub mod rules;

mod concerns;
mod layering;
mod security;
mod spring;
mod structure;
mod usage;

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::kind::DependencyKind;
use crate::parser::ast::{simple_name, Body, CompilationUnit, Param, TypeDecl, TypeRef};
use crate::registry::{class_key, ClassId};
use crate::resolver::{FileScope, ResolutionContext};
use crate::store::Member;

/// One classified dependency of the class being analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub target: String,
    pub kind: DependencyKind,
}

/// Everything phase two derives for one registered class.
#[derive(Debug, Clone)]
pub struct ClassFindings {
    pub class: ClassId,
    pub edges: Vec<Classification>,
    pub members: Vec<Member>,
}

/// Primitive names and boxed `java.lang` types never recorded as type dependencies.
pub fn is_basic_type(name: &str) -> bool {
    const SIMPLE: &[&str] = &[
        "string", "int", "integer", "long", "double", "float", "boolean", "char", "byte", "short",
        "void", "object",
    ];
    const QUALIFIED: &[&str] = &[
        "java.lang.String",
        "java.lang.Integer",
        "java.lang.Long",
        "java.lang.Double",
        "java.lang.Float",
        "java.lang.Boolean",
        "java.lang.Character",
        "java.lang.Byte",
        "java.lang.Short",
        "java.lang.Object",
    ];
    let lower = name.to_ascii_lowercase();
    SIMPLE.contains(&lower.as_str()) || QUALIFIED.contains(&name)
}

/// Collects classifications for one class.
#[derive(Debug, Default)]
pub struct Emitter {
    out: Vec<Classification>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a descriptor or identifier target. Blank targets are dropped.
    pub fn emit(&mut self, target: impl Into<String>, kind: DependencyKind) {
        let target = target.into();
        if target.trim().is_empty() {
            return;
        }
        self.out.push(Classification { target, kind });
    }

    /// Record a resolved type target, skipping primitives and basic types.
    pub fn emit_type(&mut self, resolved: Option<String>, kind: DependencyKind) {
        if let Some(name) = resolved {
            if !is_basic_type(&name) {
                self.emit(name, kind);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn into_vec(self) -> Vec<Classification> {
        self.out
    }
}

/// Read-only view of one top-level class during phase two.
pub struct ClassContext<'a> {
    pub decl: &'a TypeDecl,
    /// Registry key of the class.
    pub fqn: &'a str,
    pub file: &'a FileScope,
    pub resolver: ResolutionContext<'a>,
    type_vars: HashSet<&'a str>,
}

impl<'a> ClassContext<'a> {
    pub fn new(
        decl: &'a TypeDecl,
        fqn: &'a str,
        file: &'a FileScope,
        resolver: ResolutionContext<'a>,
    ) -> Self {
        let mut type_vars = HashSet::new();
        for d in decl.self_and_nested() {
            type_vars.extend(d.type_params.iter().map(|p| p.name.as_str()));
            for m in &d.methods {
                type_vars.extend(m.type_params.iter().map(|p| p.name.as_str()));
            }
        }
        Self {
            decl,
            fqn,
            file,
            resolver,
            type_vars,
        }
    }

    pub fn simple_name(&self) -> &'a str {
        &self.decl.name
    }

    pub fn package(&self) -> &str {
        self.file.package().unwrap_or("")
    }

    /// The class itself plus nested declarations whose members count toward it.
    pub fn declarations(&self) -> Vec<&'a TypeDecl> {
        self.decl.self_and_nested()
    }

    pub fn resolve(&self, name: &str) -> String {
        self.resolver.resolve(name, self.file)
    }

    /// Resolve a class type; type variables, primitives and arrays yield `None`.
    pub fn resolve_type(&self, ty: &TypeRef) -> Option<String> {
        let name = ty.class_name()?;
        if self.type_vars.contains(name) {
            return None;
        }
        Some(self.resolve(name))
    }

    /// Resolves to this class.
    pub fn is_self(&self, resolved: &str) -> bool {
        resolved == self.fqn || resolved == self.simple_name()
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.decl.has_annotation(name)
    }

    /// Carries a `*Controller` stereotype annotation.
    pub fn is_controller(&self) -> bool {
        self.decl
            .annotations
            .iter()
            .any(|a| a.simple_name().ends_with("Controller"))
    }

    pub fn is_service(&self) -> bool {
        self.has_annotation("Service")
    }

    pub fn is_configuration(&self) -> bool {
        self.has_annotation("Configuration")
            || self.has_annotation("AutoConfiguration")
            || self.has_annotation("TestConfiguration")
    }

    pub fn is_repository(&self) -> bool {
        self.has_annotation("Repository")
            || self.simple_name().ends_with("Repository")
            || self
                .decl
                .extends
                .iter()
                .filter_map(|t| t.class_name())
                .any(|n| n.contains("JpaRepository"))
    }

    /// Spring-managed bean by stereotype.
    pub fn is_component(&self) -> bool {
        self.is_controller()
            || self.is_service()
            || self.is_configuration()
            || self.has_annotation("Component")
            || self.has_annotation("Repository")
    }

    /// `*Test`, `*Tests` and `*IT` classes, or anything under a `test` package segment.
    pub fn is_test_class(&self) -> bool {
        let name = self.simple_name();
        ["Test", "Tests", "IT"].iter().any(|suffix| name.ends_with(suffix))
            || self
                .package()
                .to_ascii_lowercase()
                .split('.')
                .any(|segment| segment == "test")
    }
}

/// Variables visible inside one executable body: locals and parameters shadow fields.
pub struct Vars<'a> {
    locals: HashMap<&'a str, &'a TypeRef>,
    owner: &'a TypeDecl,
    outer: &'a TypeDecl,
}

impl<'a> Vars<'a> {
    pub fn new(owner: &'a TypeDecl, outer: &'a TypeDecl) -> Self {
        Self {
            locals: HashMap::new(),
            owner,
            outer,
        }
    }

    pub fn with_params(mut self, params: &'a [Param]) -> Self {
        for p in params {
            self.locals.insert(p.name.as_str(), &p.ty);
        }
        self
    }

    pub fn with_body(mut self, body: &'a Body) -> Self {
        for local in &body.locals {
            for name in &local.names {
                self.locals.insert(name.as_str(), &local.ty);
            }
        }
        self
    }

    /// Declared type of a variable name, if it names one.
    pub fn lookup(&self, name: &str) -> Option<&'a TypeRef> {
        self.locals
            .get(name)
            .copied()
            .or_else(|| self.field(name))
    }

    pub fn field(&self, name: &str) -> Option<&'a TypeRef> {
        self.owner
            .field_type(name)
            .or_else(|| self.outer.field_type(name))
    }
}

/// Stateless entry point for phase two.
pub struct DependencyClassifier;

impl DependencyClassifier {
    /// Classify one class, family by family, in a fixed order.
    pub fn classify(ctx: &ClassContext) -> Vec<Classification> {
        let mut out = Emitter::new();
        structure::classify(ctx, &mut out);
        spring::classify(ctx, &mut out);
        concerns::classify(ctx, &mut out);
        security::classify(ctx, &mut out);
        usage::classify(ctx, &mut out);
        layering::classify(ctx, &mut out);
        out.into_vec()
    }

    /// Classify every top-level type of a parsed file that made it into the registry.
    pub fn classify_unit(unit: &CompilationUnit, resolver: ResolutionContext) -> Vec<ClassFindings> {
        let file = FileScope::from_unit(unit);
        let package = unit.package.as_deref().unwrap_or("");
        unit.types
            .iter()
            .filter_map(|decl| {
                let key = class_key(package, &decl.name);
                let class = resolver.registry().lookup(&key)?;
                let ctx = ClassContext::new(decl, &key, &file, resolver);
                Some(ClassFindings {
                    class,
                    edges: Self::classify(&ctx),
                    members: members::extract(&ctx, class),
                })
            })
            .collect()
    }
}

/// Written simple name of a type, for descriptor strings.
pub(crate) fn written_name(ty: &TypeRef) -> String {
    match ty.element().class_name() {
        Some(name) => simple_name(name).to_string(),
        None => ty.display(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::parser::parse_java;
    use crate::registry::{ClassRegistry, RegistryBuilder};
    use std::path::{Path, PathBuf};

    /// Parse sources, register them, and classify the first type of the last file.
    pub fn classify_sources(sources: &[&str]) -> Vec<Classification> {
        let units: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| parse_java(&PathBuf::from(format!("F{}.java", i)), s).unwrap())
            .collect();
        let registry = register(&units);
        let resolver = ResolutionContext::new(&registry);
        let last = units.last().unwrap();
        DependencyClassifier::classify_unit(last, resolver)
            .into_iter()
            .next()
            .map(|f| f.edges)
            .unwrap_or_default()
    }

    pub fn register(units: &[CompilationUnit]) -> ClassRegistry {
        let mut builder = RegistryBuilder::new();
        for unit in units {
            builder.register_unit(unit, Path::new(""));
        }
        builder.freeze()
    }

    pub fn has(edges: &[Classification], target: &str, kind: DependencyKind) -> bool {
        edges.iter().any(|e| e.target == target && e.kind == kind)
    }

    pub fn targets(edges: &[Classification], kind: DependencyKind) -> Vec<String> {
        edges
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.target.clone())
            .collect()
    }
}
