//
//  diagram.rs
//  Atlas
//

//! Mermaid class-diagram rendering for the classes reachable from an endpoint.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use tracing::info;

use crate::error::{AtlasError, Result};
use crate::kind::DependencyKind;
use crate::parser::ast::{simple_name, Visibility};
use crate::registry::{ClassId, DEFAULT_PACKAGE};
use crate::store::{Endpoint, MemberKind, ProjectData};

use super::engine::DependencyGraph;
use super::traversal::reachable;

/// Placeholder for names that sanitize to nothing.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Keep `[A-Za-z0-9_]`, map everything else to `_`, collapse and trim underscores.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Make free text safe inside a Mermaid label.
pub fn escape_label(label: &str) -> String {
    label
        .replace('|', "\\|")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub id: ClassId,
    pub fqn: String,
    pub simple_name: String,
}

/// A member as shown in the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub type_name: Option<String>,
    pub visibility: Visibility,
    pub kind: MemberKind,
}

impl MemberInfo {
    /// `+name() : Type`, `-name : Type`, `+Name()`.
    pub fn render(&self) -> String {
        let mut line = String::new();
        line.push(self.visibility.symbol());
        line.push_str(&sanitize_name(&self.name));
        if self.kind.is_callable() {
            line.push_str("()");
        }
        if let Some(ty) = self.type_name.as_deref().filter(|t| !t.is_empty()) {
            line.push_str(" : ");
            line.push_str(&sanitize_name(simple_name(ty)));
        }
        line
    }
}

/// Diagram text plus the structured data it was rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDiagram {
    pub diagram_text: String,
    pub classes: Vec<ClassInfo>,
    /// Class FQN -> members.
    pub class_member_map: BTreeMap<String, Vec<MemberInfo>>,
    /// Source FQN -> target FQN -> `"<code>_<description>"` labels.
    pub dependency_map: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Class FQN -> source file relative to the project root, `/`-separated.
    pub class_file_paths: BTreeMap<String, String>,
}

/// Builds the scoped diagram for one endpoint of one project.
pub struct DiagramBuilder<'a> {
    data: &'a ProjectData,
    graph: DependencyGraph,
    max_depth: usize,
}

impl<'a> DiagramBuilder<'a> {
    pub fn new(data: &'a ProjectData, max_depth: usize) -> Self {
        Self {
            data,
            graph: DependencyGraph::build(data),
            max_depth,
        }
    }

    pub fn generate(&self, endpoint: &Endpoint) -> Result<ClassDiagram> {
        let seed = endpoint.class;
        let seed_record = self
            .data
            .class(seed)
            .ok_or_else(|| AtlasError::ClassNotFound(format!("class #{} of endpoint {}", seed.0, endpoint.id)))?;

        let order = reachable(&self.graph, &self.data.registry, seed, self.max_depth);
        let selected: HashSet<ClassId> = order.iter().copied().collect();

        let classes: Vec<ClassInfo> = order
            .iter()
            .filter_map(|id| self.data.class(*id))
            .map(|r| ClassInfo {
                id: r.id,
                fqn: r.fqn.clone(),
                simple_name: r.simple_name.clone(),
            })
            .collect();

        let interfaces: HashSet<ClassId> = order
            .iter()
            .copied()
            .filter(|class| {
                self.graph.dependents(*class).iter().any(|(source, kinds)| {
                    selected.contains(source) && kinds.contains(DependencyKind::Implements)
                })
            })
            .collect();

        let mut class_member_map = BTreeMap::new();
        let mut dependency_map = BTreeMap::new();
        let mut class_file_paths = BTreeMap::new();
        let mut text = String::from("classDiagram\n");

        for info in &classes {
            let members = self.members(info.id, &selected);
            let _ = writeln!(text, "    class {} {{", sanitize_name(&info.simple_name));
            if info.id == seed {
                let label = format!("{}({})", endpoint.uri, endpoint.method);
                let _ = writeln!(text, "        <<\"{}\">>", escape_label(&label));
            }
            if interfaces.contains(&info.id) {
                text.push_str("        <<interface>>\n");
            }
            let mut rendered = HashSet::new();
            for member in &members {
                let line = member.render();
                if rendered.insert(line.clone()) {
                    let _ = writeln!(text, "        {}", line);
                }
            }
            text.push_str("    }\n");

            class_member_map.insert(info.fqn.clone(), members);
            let path = match self.data.class(info.id).and_then(|r| r.source_path.as_ref()) {
                Some(recorded) => recorded.to_string_lossy().replace('\\', "/"),
                None => conventional_path(&info.fqn, "main"),
            };
            class_file_paths.insert(info.fqn.clone(), path);
        }

        for info in &classes {
            let mut targets = BTreeMap::new();
            for (target, kinds) in self.graph.dependencies(info.id) {
                if !selected.contains(&target) {
                    continue;
                }
                let Some(target_record) = self.data.class(target) else {
                    continue;
                };
                let labels: Vec<String> = kinds.kinds.iter().map(|k| k.label()).collect();
                let source_name = sanitize_name(&info.simple_name);
                let target_name = sanitize_name(&target_record.simple_name);
                if labels.is_empty() {
                    let _ = writeln!(text, "    {} --> {}", source_name, target_name);
                } else {
                    let _ = writeln!(
                        text,
                        "    {} --> {} : {}",
                        source_name,
                        target_name,
                        escape_label(&labels.join(",<br>"))
                    );
                }
                targets.insert(target_record.fqn.clone(), labels);
            }
            dependency_map.insert(info.fqn.clone(), targets);
        }

        info!(
            endpoint = %endpoint.id,
            seed = %seed_record.fqn,
            classes = classes.len(),
            "class diagram generated"
        );

        Ok(ClassDiagram {
            diagram_text: text,
            classes,
            class_member_map,
            dependency_map,
            class_file_paths,
        })
    }

    /// Captured members, or members inferred from dependencies when none were captured.
    fn members(&self, class: ClassId, selected: &HashSet<ClassId>) -> Vec<MemberInfo> {
        if self.data.has_members(class) {
            let mut seen = HashSet::new();
            return self
                .data
                .members_of(class)
                .into_iter()
                .map(|m| MemberInfo {
                    name: m.name.clone(),
                    type_name: m.type_name.clone(),
                    visibility: m.visibility,
                    kind: m.kind,
                })
                .filter(|m| seen.insert(m.clone()))
                .collect();
        }

        let mut inferred = Vec::new();
        let mut seen_targets = HashSet::new();
        for edge in self.data.edges_from(class) {
            let Some(target) = edge.target_class else {
                continue;
            };
            if target == class || !selected.contains(&target) || !seen_targets.insert(target) {
                continue;
            }
            let Some(record) = self.data.class(target) else {
                continue;
            };
            let simple = &record.simple_name;
            let (name, kind) = match edge.kind {
                DependencyKind::ConstructorInjection => (simple.clone(), MemberKind::Constructor),
                DependencyKind::SetterInjection => (format!("set{}", simple), MemberKind::Method),
                _ => (lower_first(simple), MemberKind::Field),
            };
            inferred.push(MemberInfo {
                name,
                type_name: Some(record.fqn.clone()),
                visibility: Visibility::Private,
                kind,
            });
        }
        inferred
    }
}

/// `src/<set>/java/<package path>/<Simple>.java` for a class FQN.
pub fn conventional_path(fqn: &str, source_set: &str) -> String {
    let (package, simple) = fqn.rsplit_once('.').unwrap_or(("", fqn));
    if package.is_empty() || package == DEFAULT_PACKAGE {
        format!("src/{}/java/{}.java", source_set, simple)
    } else {
        format!("src/{}/java/{}/{}.java", source_set, package.replace('.', "/"), simple)
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::engine::fixtures::project;
    use super::*;
    use crate::store::Member;
    use DependencyKind as K;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Order"), "Order");
        assert_eq!(sanitize_name("List<Order>"), "List_Order");
        assert_eq!(sanitize_name("__a--b__"), "a_b");
        assert_eq!(sanitize_name("<>"), UNKNOWN_NAME);
        assert_eq!(sanitize_name(""), UNKNOWN_NAME);
    }

    #[test]
    fn test_sanitize_name_is_idempotent() {
        let inputs = [
            "List<Map<K,V>>",
            "__a--b__",
            "<>",
            "",
            "a$b",
            "_",
            "Outer.Inner[]",
            "\"/api/orders(GET)\"",
            UNKNOWN_NAME,
        ];
        for input in inputs {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once, "{:?}", input);
        }
    }

    #[test]
    fn test_conventional_path() {
        assert_eq!(conventional_path("a.b.Foo", "main"), "src/main/java/a/b/Foo.java");
        assert_eq!(conventional_path("Foo", "test"), "src/test/java/Foo.java");
        assert_eq!(conventional_path("<default>.Foo", "main"), "src/main/java/Foo.java");
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("a|b\nc "), "a\\|b c");
    }

    #[test]
    fn test_member_rendering() {
        let method = MemberInfo {
            name: "findAll".to_string(),
            type_name: Some("java.util.List".to_string()),
            visibility: Visibility::Public,
            kind: MemberKind::Method,
        };
        assert_eq!(method.render(), "+findAll() : List");
        let field = MemberInfo {
            name: "count".to_string(),
            type_name: Some("int[]".to_string()),
            visibility: Visibility::Private,
            kind: MemberKind::Field,
        };
        assert_eq!(field.render(), "-count : int");
        let ctor = MemberInfo {
            name: "Order".to_string(),
            type_name: None,
            visibility: Visibility::PackagePrivate,
            kind: MemberKind::Constructor,
        };
        assert_eq!(ctor.render(), "~Order()");
    }

    #[test]
    fn test_diagram_for_endpoint() {
        let data = project(
            &[
                ("shop.web", "OrderController"),
                ("shop.service", "OrderService"),
                ("shop.service", "OrderServiceImpl"),
            ],
            &[
                ("shop.web.OrderController", "shop.service.OrderService", K::FieldInjection),
                ("shop.web.OrderController", "shop.service.OrderService", K::Composition),
                ("shop.web.OrderController", "shop.service.OrderService", K::FieldInjection),
                ("shop.service.OrderServiceImpl", "shop.service.OrderService", K::Implements),
            ],
            |id| {
                vec![Member {
                    class: id("shop.web.OrderController"),
                    name: "list".to_string(),
                    type_name: Some("java.util.List".to_string()),
                    visibility: Visibility::Public,
                    kind: MemberKind::Method,
                    annotations: Vec::new(),
                }]
            },
        );
        let endpoint = data.endpoints[0].clone();
        let diagram = DiagramBuilder::new(&data, 10).generate(&endpoint).unwrap();

        assert_eq!(
            diagram.diagram_text,
            "classDiagram
    class OrderController {
        <<\"/api/orders(GET)\">>
        +list() : List
    }
    class OrderService {
        <<interface>>
    }
    class OrderServiceImpl {
        -orderService : OrderService
    }
    OrderController --> OrderService : 002_004_field injection,<br>001_009_composition
    OrderServiceImpl --> OrderService : 001_002_implements
"
        );
        assert_eq!(diagram.classes.len(), 3);
        assert_eq!(
            diagram.dependency_map["shop.service.OrderServiceImpl"]["shop.service.OrderService"],
            vec!["001_002_implements"]
        );
        assert_eq!(
            diagram.class_file_paths["shop.web.OrderController"],
            "shop/web/OrderController.java"
        );
    }

    #[test]
    fn test_inferred_members_skip_self_targets() {
        let data = project(
            &[("shop", "Checkout"), ("shop", "Payments")],
            &[
                ("shop.Checkout", "shop.Checkout", K::Dto),
                ("shop.Checkout", "shop.Payments", K::ConstructorInjection),
                ("shop.Checkout", "shop.Payments", K::Composition),
            ],
            |_| Vec::new(),
        );
        let endpoint = data.endpoints[0].clone();
        let diagram = DiagramBuilder::new(&data, 10).generate(&endpoint).unwrap();
        let members = &diagram.class_member_map["shop.Checkout"];
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].render(), "-Payments() : Payments");
    }
}
