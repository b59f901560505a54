//
//  resolver.rs
//  Atlas
//

//! SymbolResolver: best-effort mapping from written type names to canonical identifiers.
//!
//! Resolution never fails. When nothing better is known the written name is
//! returned unchanged and the edge is stored with that identifier.

use std::collections::HashMap;
use tracing::trace;

use crate::parser::ast::{CompilationUnit, TypeRef};
use crate::registry::ClassRegistry;

/// Simple names resolved implicitly from `java.lang`.
const JAVA_LANG: &[&str] = &[
    "String",
    "Integer",
    "Long",
    "Double",
    "Float",
    "Boolean",
    "Character",
    "Byte",
    "Short",
    "Object",
    "Number",
    "Void",
    "Exception",
    "RuntimeException",
    "Error",
    "Throwable",
    "IllegalArgumentException",
    "IllegalStateException",
    "NullPointerException",
    "UnsupportedOperationException",
    "Comparable",
    "Cloneable",
    "Iterable",
    "Runnable",
    "AutoCloseable",
    "CharSequence",
    "StringBuilder",
    "Math",
    "System",
    "Thread",
    "Class",
    "Enum",
    "Record",
];

/// Hook for a classpath-aware resolver. Consulted before any heuristic.
pub trait SemanticResolver: Send + Sync {
    /// Fully-qualified name for `reference` as written in `file`, if known.
    fn resolve(&self, reference: &str, file: &FileScope) -> Option<String>;
}

/// Import and package facts of one source file.
#[derive(Debug, Clone, Default)]
pub struct FileScope {
    package: Option<String>,
    /// Simple name -> imported FQN, explicit single-type imports only.
    explicit: HashMap<String, String>,
    /// Wildcard-imported packages, in declaration order.
    wildcards: Vec<String>,
}

impl FileScope {
    pub fn new(package: Option<&str>) -> Self {
        Self {
            package: package.filter(|p| !p.is_empty()).map(|p| p.to_string()),
            ..Default::default()
        }
    }

    pub fn from_unit(unit: &CompilationUnit) -> Self {
        let mut scope = Self::new(unit.package.as_deref());
        for import in &unit.imports {
            if import.is_static {
                continue;
            }
            if import.is_wildcard {
                scope.wildcards.push(import.path.clone());
            } else {
                scope
                    .explicit
                    .entry(import.simple_name().to_string())
                    .or_insert_with(|| import.path.clone());
            }
        }
        scope
    }

    pub fn with_import(mut self, path: &str) -> Self {
        let simple = path.rsplit('.').next().unwrap_or(path).to_string();
        self.explicit.entry(simple).or_insert_with(|| path.to_string());
        self
    }

    pub fn with_wildcard(mut self, package: &str) -> Self {
        self.wildcards.push(package.to_string());
        self
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn explicit_import(&self, simple: &str) -> Option<&str> {
        self.explicit.get(simple).map(String::as_str)
    }
}

/// Per-run resolution state: the frozen registry plus the optional semantic hook.
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    registry: &'a ClassRegistry,
    semantic: Option<&'a dyn SemanticResolver>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        Self {
            registry,
            semantic: None,
        }
    }

    pub fn with_semantic(mut self, semantic: &'a dyn SemanticResolver) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    /// Resolve a simple or partially-qualified type name written in `file`.
    pub fn resolve(&self, reference: &str, file: &FileScope) -> String {
        let reference = reference.trim();
        if reference.is_empty() {
            return String::new();
        }

        if let Some(semantic) = self.semantic {
            if let Some(fqn) = semantic.resolve(reference, file) {
                return fqn;
            }
        }

        match reference.split_once('.') {
            None => self.resolve_simple(reference, file),
            Some((head, rest)) => {
                if let Some(imported) = file.explicit_import(head) {
                    format!("{}.{}", imported, rest)
                } else if starts_upper(head) {
                    // Outer.Inner: qualify the outer type
                    format!("{}.{}", self.resolve_simple(head, file), rest)
                } else {
                    reference.to_string()
                }
            }
        }
    }

    fn resolve_simple(&self, name: &str, file: &FileScope) -> String {
        if let Some(imported) = file.explicit_import(name) {
            return imported.to_string();
        }
        if JAVA_LANG.contains(&name) {
            return format!("java.lang.{}", name);
        }
        for package in &file.wildcards {
            if let Some(id) = self.registry.find_under_package(name, package) {
                if let Some(record) = self.registry.class(id) {
                    return record.fqn.clone();
                }
            }
        }
        if let Some(package) = file.package() {
            return format!("{}.{}", package, name);
        }
        trace!(name, "unresolved type reference");
        name.to_string()
    }

    /// Resolve the class type of a written type; primitives, void and arrays yield `None`.
    pub fn resolve_type(&self, ty: &TypeRef, file: &FileScope) -> Option<String> {
        ty.class_name().map(|name| self.resolve(name, file))
    }

    /// Resolve a selector chain naming a type (`Foo`, `Outer.Inner`, `a.b.Codes`).
    ///
    /// Segments after the type are accepted while they still look like
    /// nested type names; constants and members end the chain. A chain with
    /// no type-like segment yields `None`.
    pub fn resolve_type_path(&self, segments: &[String], file: &FileScope) -> Option<String> {
        let head = segments.first()?;
        let (mut path, consumed) = if starts_upper(head) {
            (self.resolve(head, file), 1)
        } else {
            let type_at = segments.iter().position(|s| starts_upper(s))?;
            (segments[..=type_at].join("."), type_at + 1)
        };
        for segment in &segments[consumed..] {
            if !looks_like_type(segment) {
                break;
            }
            path.push('.');
            path.push_str(segment);
        }
        Some(path)
    }
}

pub fn starts_upper(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Upper-camel identifier, as opposed to a constant like `MAX_SIZE`.
pub fn looks_like_type(name: &str) -> bool {
    starts_upper(name) && name.chars().any(|c| c.is_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::TypeKind;
    use crate::registry::RegistryBuilder;

    fn registry() -> ClassRegistry {
        let mut builder = RegistryBuilder::new();
        builder.register("com.shop.model", "Order", TypeKind::Class, None);
        builder.register("com.shop.model.line", "OrderLine", TypeKind::Class, None);
        builder.register("com.shop.web", "OrderController", TypeKind::Class, None);
        builder.register("", "Loose", TypeKind::Class, None);
        builder.freeze()
    }

    #[test]
    fn test_explicit_import_wins() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("a.b")).with_import("a.b.Bar");
        assert_eq!(ctx.resolve("Bar", &file), "a.b.Bar");
    }

    #[test]
    fn test_java_lang_before_wildcard() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("com.shop.web")).with_wildcard("com.shop.model");
        assert_eq!(ctx.resolve("String", &file), "java.lang.String");
        assert_eq!(ctx.resolve("Order", &file), "com.shop.model.Order");
    }

    #[test]
    fn test_wildcard_matches_sub_packages() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("com.shop.web")).with_wildcard("com.shop.model");
        assert_eq!(ctx.resolve("OrderLine", &file), "com.shop.model.line.OrderLine");
    }

    #[test]
    fn test_same_package_guess_and_passthrough() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let in_package = FileScope::new(Some("com.shop.web"));
        assert_eq!(ctx.resolve("Widget", &in_package), "com.shop.web.Widget");

        let no_package = FileScope::new(None);
        assert_eq!(ctx.resolve("Widget", &no_package), "Widget");
    }

    #[test]
    fn test_partially_qualified_names() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("x")).with_import("java.util.Map");
        assert_eq!(ctx.resolve("Map.Entry", &file), "java.util.Map.Entry");
        assert_eq!(ctx.resolve("java.util.List", &file), "java.util.List");
        assert_eq!(ctx.resolve("Outer.Inner", &file), "x.Outer.Inner");
    }

    #[test]
    fn test_semantic_resolver_first() {
        struct Fixed;
        impl SemanticResolver for Fixed {
            fn resolve(&self, reference: &str, _file: &FileScope) -> Option<String> {
                (reference == "Bar").then(|| "lib.Bar".to_string())
            }
        }
        let registry = registry();
        let fixed = Fixed;
        let ctx = ResolutionContext::new(&registry).with_semantic(&fixed);
        let file = FileScope::new(Some("a.b")).with_import("a.b.Bar");
        assert_eq!(ctx.resolve("Bar", &file), "lib.Bar");
        assert_eq!(ctx.resolve("Baz", &file), "a.b.Baz");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("com.shop.web"))
            .with_wildcard("com.shop.model")
            .with_import("java.util.List");
        let names = ["Order", "OrderLine", "List", "Widget", "Map.Entry", "Loose"];
        let first: Vec<_> = names.iter().map(|n| ctx.resolve(n, &file)).collect();
        for _ in 0..5 {
            let again: Vec<_> = names.iter().map(|n| ctx.resolve(n, &file)).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_type_path() {
        let registry = registry();
        let ctx = ResolutionContext::new(&registry);
        let file = FileScope::new(Some("p")).with_import("q.Limits");
        let seg = |s: &str| s.split('.').map(|x| x.to_string()).collect::<Vec<_>>();

        assert_eq!(ctx.resolve_type_path(&seg("Limits"), &file), Some("q.Limits".to_string()));
        assert_eq!(ctx.resolve_type_path(&seg("Outer.Inner"), &file), Some("p.Outer.Inner".to_string()));
        assert_eq!(ctx.resolve_type_path(&seg("Holder.INSTANCE"), &file), Some("p.Holder".to_string()));
        assert_eq!(ctx.resolve_type_path(&seg("a.b.Codes"), &file), Some("a.b.Codes".to_string()));
        assert_eq!(ctx.resolve_type_path(&seg("order.items"), &file), None);
    }
}
