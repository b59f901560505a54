//
//  registry.rs
//  Atlas
//

//! ClassRegistry: the phase-one table of every top-level class in a project.
//!
//! [`RegistryBuilder`] accumulates packages and classes while files are
//! registered; [`RegistryBuilder::freeze`] turns it into an immutable
//! [`ClassRegistry`] that resolution and classification share read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::parser::ast::{simple_name, CompilationUnit, TypeKind};

/// Package name used for classes without a package declaration.
pub const DEFAULT_PACKAGE: &str = "<default>";

/// Index of a class inside its project's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Index of a package inside its project's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    /// Dotted name, or [`DEFAULT_PACKAGE`].
    pub name: String,
    pub simple_name: String,
    /// Nearest registered ancestor package.
    pub parent: Option<PackageId>,
}

impl Package {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PACKAGE
    }
}

/// A top-level class, interface, enum, record or annotation type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    /// Registry key: `pkg.Simple`, or `<default>.Simple` for the unnamed package.
    pub fqn: String,
    pub simple_name: String,
    pub package: PackageId,
    pub kind: TypeKind,
    /// Source file relative to the project root.
    pub source_path: Option<PathBuf>,
}

impl PartialEq for ClassRecord {
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}

impl Eq for ClassRecord {}

impl Hash for ClassRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fqn.hash(state);
    }
}

/// Registry key for a class in `package` (empty for the unnamed package).
pub fn class_key(package: &str, simple: &str) -> String {
    if package.is_empty() || package == DEFAULT_PACKAGE {
        format!("{}.{}", DEFAULT_PACKAGE, simple)
    } else {
        format!("{}.{}", package, simple)
    }
}

/// Mutable phase-one accumulator.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    packages: Vec<Package>,
    package_index: HashMap<String, PackageId>,
    classes: Vec<ClassRecord>,
    class_index: HashMap<String, ClassId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a package by dotted name (empty means the unnamed package).
    pub fn package(&mut self, name: &str) -> PackageId {
        let name = if name.is_empty() { DEFAULT_PACKAGE } else { name };
        if let Some(&id) = self.package_index.get(name) {
            return id;
        }
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(Package {
            id,
            name: name.to_string(),
            simple_name: simple_name(name).to_string(),
            parent: None,
        });
        self.package_index.insert(name.to_string(), id);
        id
    }

    /// Get or create a class. A repeated key keeps its id; later metadata wins.
    pub fn register(
        &mut self,
        package: &str,
        simple: &str,
        kind: TypeKind,
        source_path: Option<PathBuf>,
    ) -> ClassId {
        let package_id = self.package(package);
        let key = class_key(package, simple);
        if let Some(&id) = self.class_index.get(&key) {
            let record = &mut self.classes[id.0 as usize];
            record.kind = kind;
            if source_path.is_some() {
                record.source_path = source_path;
            }
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassRecord {
            id,
            fqn: key.clone(),
            simple_name: simple.to_string(),
            package: package_id,
            kind,
            source_path,
        });
        self.class_index.insert(key, id);
        id
    }

    /// Register every top-level type of a parsed file.
    pub fn register_unit(&mut self, unit: &CompilationUnit, root: &Path) -> Vec<ClassId> {
        let package = unit.package.as_deref().unwrap_or("");
        let relative = unit
            .path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| unit.path.clone());
        self.package(package);
        unit.types
            .iter()
            .map(|decl| self.register(package, &decl.name, decl.kind, Some(relative.clone())))
            .collect()
    }

    /// Finish phase one. Package parents are linked to their nearest registered ancestor.
    pub fn freeze(mut self) -> ClassRegistry {
        for index in 0..self.packages.len() {
            let name = self.packages[index].name.clone();
            let mut parent = None;
            let mut prefix = name.as_str();
            while let Some(pos) = prefix.rfind('.') {
                prefix = &prefix[..pos];
                if let Some(&id) = self.package_index.get(prefix) {
                    parent = Some(id);
                    break;
                }
            }
            self.packages[index].parent = parent;
        }

        let mut by_simple_name: HashMap<String, Vec<ClassId>> = HashMap::new();
        for record in &self.classes {
            by_simple_name
                .entry(record.simple_name.clone())
                .or_default()
                .push(record.id);
        }
        for ids in by_simple_name.values_mut() {
            ids.sort_by(|a, b| {
                self.classes[a.0 as usize]
                    .fqn
                    .cmp(&self.classes[b.0 as usize].fqn)
            });
        }

        ClassRegistry {
            packages: self.packages,
            package_index: self.package_index,
            classes: self.classes,
            class_index: self.class_index,
            by_simple_name,
        }
    }
}

/// Frozen class table for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassRegistry {
    packages: Vec<Package>,
    package_index: HashMap<String, PackageId>,
    classes: Vec<ClassRecord>,
    class_index: HashMap<String, ClassId>,
    by_simple_name: HashMap<String, Vec<ClassId>>,
}

impl ClassRegistry {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[ClassRecord] {
        &self.classes
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassRecord> {
        self.classes.get(id.0 as usize)
    }

    pub fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.0 as usize)
    }

    pub fn package_by_name(&self, name: &str) -> Option<&Package> {
        self.package_index.get(name).and_then(|&id| self.package(id))
    }

    pub fn package_of(&self, class: ClassId) -> Option<&Package> {
        self.class(class).and_then(|c| self.package(c.package))
    }

    /// Exact registry-key lookup.
    pub fn lookup(&self, fqn: &str) -> Option<ClassId> {
        self.class_index.get(fqn).copied()
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.class_index.contains_key(fqn)
    }

    /// All registry keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.class_index.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Match an edge target against the registry: exact key first, then the
    /// unnamed package by simple name.
    pub fn resolve_target(&self, identifier: &str) -> Option<ClassId> {
        self.lookup(identifier)
            .or_else(|| self.lookup(&class_key("", simple_name(identifier))))
    }

    /// A class named `simple` in `package` or one of its sub-packages.
    /// The package itself wins, otherwise the lexically first key.
    pub fn find_under_package(&self, simple: &str, package: &str) -> Option<ClassId> {
        if let Some(id) = self.lookup(&class_key(package, simple)) {
            return Some(id);
        }
        let nested_prefix = format!("{}.", package);
        self.by_simple_name.get(simple)?.iter().copied().find(|&id| {
            self.package_of(id)
                .is_some_and(|p| !p.is_default() && p.name.starts_with(&nested_prefix))
        })
    }

    /// Classes declared with the given simple name, ordered by key.
    pub fn by_simple_name(&self, simple: &str) -> &[ClassId] {
        self.by_simple_name
            .get(simple)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::TypeDecl;

    fn unit(package: Option<&str>, names: &[&str], path: &str) -> CompilationUnit {
        CompilationUnit {
            path: PathBuf::from(path),
            package: package.map(|p| p.to_string()),
            imports: Vec::new(),
            types: names.iter().map(|n| TypeDecl::new(*n, TypeKind::Class)).collect(),
            has_syntax_errors: false,
        }
    }

    fn sample_units() -> Vec<CompilationUnit> {
        vec![
            unit(Some("com.shop"), &["App"], "/p/src/main/java/com/shop/App.java"),
            unit(Some("com.shop.order"), &["Order", "OrderLine"], "/p/src/main/java/com/shop/order/Order.java"),
            unit(None, &["Loose"], "/p/Loose.java"),
        ]
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = RegistryBuilder::new();
        for u in sample_units() {
            builder.register_unit(&u, Path::new("/p"));
        }
        let registry = builder.freeze();

        assert_eq!(registry.len(), 4);
        let order = registry.lookup("com.shop.order.Order").unwrap();
        let record = registry.class(order).unwrap();
        assert_eq!(record.simple_name, "Order");
        assert_eq!(
            record.source_path.as_deref(),
            Some(Path::new("src/main/java/com/shop/order/Order.java"))
        );
        assert_eq!(registry.package_of(order).unwrap().name, "com.shop.order");

        assert!(registry.lookup("<default>.Loose").is_some());
        assert_eq!(registry.package_by_name(DEFAULT_PACKAGE).unwrap().simple_name, "<default>");
    }

    #[test]
    fn test_package_parent_links() {
        let mut builder = RegistryBuilder::new();
        for u in sample_units() {
            builder.register_unit(&u, Path::new("/p"));
        }
        let registry = builder.freeze();
        let child = registry.package_by_name("com.shop.order").unwrap();
        let parent = registry.package(child.parent.unwrap()).unwrap();
        assert_eq!(parent.name, "com.shop");
        assert!(parent.parent.is_none());
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut once = RegistryBuilder::new();
        for u in sample_units() {
            once.register_unit(&u, Path::new("/p"));
        }
        let mut twice = RegistryBuilder::new();
        for _ in 0..2 {
            for u in sample_units() {
                twice.register_unit(&u, Path::new("/p"));
            }
        }
        assert_eq!(once.freeze().keys(), twice.freeze().keys());
    }

    #[test]
    fn test_resolve_target_default_package_fallback() {
        let mut builder = RegistryBuilder::new();
        builder.register("", "Loose", TypeKind::Class, None);
        builder.register("a.b", "Foo", TypeKind::Class, None);
        let registry = builder.freeze();

        assert!(registry.resolve_target("a.b.Foo").is_some());
        assert_eq!(registry.resolve_target("Loose"), registry.lookup("<default>.Loose"));
        assert_eq!(registry.resolve_target("x.y.Loose"), registry.lookup("<default>.Loose"));
        assert!(registry.resolve_target("kafka:topic:orders").is_none());
    }

    #[test]
    fn test_find_under_package() {
        let mut builder = RegistryBuilder::new();
        builder.register("com.shop.model.sub", "Item", TypeKind::Class, None);
        builder.register("com.shopping", "Item", TypeKind::Class, None);
        let registry = builder.freeze();

        let found = registry.find_under_package("Item", "com.shop").unwrap();
        assert_eq!(registry.class(found).unwrap().fqn, "com.shop.model.sub.Item");
        assert!(registry.find_under_package("Item", "org").is_none());
    }
}
