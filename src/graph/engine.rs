//
//  engine.rs
//  Atlas
//

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use crate::kind::DependencyKind;
use crate::registry::ClassId;
use crate::store::ProjectData;

/// Aggregated kinds between one (source, target) class pair, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EdgeKinds {
    pub kinds: Vec<DependencyKind>,
}

impl EdgeKinds {
    fn add(&mut self, kind: DependencyKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub fn contains(&self, kind: DependencyKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Class-level dependency graph of one project: a node per registered class,
/// one edge per class pair that has at least one resolved dependency edge.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub(crate) graph: DiGraph<ClassId, EdgeKinds>,
    index: HashMap<ClassId, NodeIndex>,
}

impl DependencyGraph {
    pub fn build(data: &ProjectData) -> Self {
        let mut graph = DiGraph::with_capacity(data.registry.len(), data.edges.len());
        let mut index = HashMap::with_capacity(data.registry.len());
        for record in data.registry.classes() {
            index.insert(record.id, graph.add_node(record.id));
        }

        let mut pairs: HashMap<(NodeIndex, NodeIndex), petgraph::graph::EdgeIndex> = HashMap::new();
        for edge in &data.edges {
            let Some(target) = edge.target_class else {
                continue;
            };
            let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&target)) else {
                continue;
            };
            let id = *pairs
                .entry((from, to))
                .or_insert_with(|| graph.add_edge(from, to, EdgeKinds::default()));
            if let Some(weight) = graph.edge_weight_mut(id) {
                weight.add(edge.kind);
            }
        }

        Self { graph, index }
    }

    pub fn node(&self, class: ClassId) -> Option<NodeIndex> {
        self.index.get(&class).copied()
    }

    pub fn class(&self, node: NodeIndex) -> Option<ClassId> {
        self.graph.node_weight(node).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing (target, kinds) pairs, in insertion order.
    pub fn dependencies(&self, class: ClassId) -> Vec<(ClassId, &EdgeKinds)> {
        self.neighbours(class, Direction::Outgoing)
    }

    /// Incoming (source, kinds) pairs, in insertion order.
    pub fn dependents(&self, class: ClassId) -> Vec<(ClassId, &EdgeKinds)> {
        self.neighbours(class, Direction::Incoming)
    }

    fn neighbours(&self, class: ClassId, direction: Direction) -> Vec<(ClassId, &EdgeKinds)> {
        let Some(node) = self.node(class) else {
            return Vec::new();
        };
        let mut out: Vec<_> = self
            .graph
            .edges_directed(node, direction)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                Some((e.id(), self.class(other)?, e.weight()))
            })
            .collect();
        // petgraph walks adjacency lists newest-first
        out.sort_by_key(|(id, _, _)| id.index());
        out.into_iter().map(|(_, c, w)| (c, w)).collect()
    }

    pub fn kinds_between(&self, source: ClassId, target: ClassId) -> Option<&EdgeKinds> {
        let edge = self.graph.find_edge(self.node(source)?, self.node(target)?)?;
        self.graph.edge_weight(edge)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use std::path::PathBuf;
    use uuid::Uuid;

    use crate::kind::DependencyKind;
    use crate::parser::ast::TypeKind;
    use crate::registry::{ClassId, RegistryBuilder};
    use crate::store::{DependencyEdge, Endpoint, HttpMethod, Member, Project, ProjectData};

    /// Project with the given `(package, name)` classes and `(source, target, kind)` edges.
    pub fn project(
        classes: &[(&str, &str)],
        edges: &[(&str, &str, DependencyKind)],
        members: impl FnOnce(&dyn Fn(&str) -> ClassId) -> Vec<Member>,
    ) -> ProjectData {
        let mut builder = RegistryBuilder::new();
        for (package, name) in classes {
            builder.register(
                package,
                name,
                TypeKind::Class,
                Some(PathBuf::from(format!("{}/{}.java", package.replace('.', "/"), name))),
            );
        }
        let registry = builder.freeze();
        let batch = Uuid::new_v4();
        let id = |fqn: &str| registry.lookup(fqn).unwrap();
        let edges: Vec<_> = edges
            .iter()
            .map(|(source, target, kind)| DependencyEdge {
                source: id(source),
                source_fqn: source.to_string(),
                target: target.to_string(),
                target_class: registry.resolve_target(target),
                kind: *kind,
                detected_at: Utc::now(),
                batch_id: batch,
            })
            .collect();
        let members = members(&id);
        let seed = id(&format!("{}.{}", classes[0].0, classes[0].1));
        let endpoints = vec![Endpoint {
            id: Uuid::new_v4(),
            class: seed,
            uri: "/api/orders".to_string(),
            method: HttpMethod::Get,
            detected_at: Utc::now(),
        }];
        ProjectData::new(
            Project::new(PathBuf::from("/work/shop")),
            registry,
            members,
            edges,
            endpoints,
            batch,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::project;
    use super::*;
    use DependencyKind as K;

    #[test]
    fn test_pairs_aggregate_kinds() {
        let data = project(
            &[("shop", "A"), ("shop", "B")],
            &[
                ("shop.A", "shop.B", K::Composition),
                ("shop.A", "shop.B", K::MethodCall),
                ("shop.A", "shop.B", K::Composition),
                ("shop.A", "java.util.List", K::Composition),
            ],
            |_| Vec::new(),
        );
        let graph = DependencyGraph::build(&data);
        let a = data.registry.lookup("shop.A").unwrap();
        let b = data.registry.lookup("shop.B").unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let kinds = graph.kinds_between(a, b).unwrap();
        assert_eq!(kinds.kinds, vec![K::Composition, K::MethodCall]);
        assert_eq!(graph.dependents(b).len(), 1);
        assert!(graph.dependencies(b).is_empty());
    }

    #[test]
    fn test_neighbour_order_is_insertion_order() {
        let data = project(
            &[("shop", "A"), ("shop", "B"), ("shop", "C")],
            &[
                ("shop.A", "shop.C", K::Composition),
                ("shop.A", "shop.B", K::Composition),
            ],
            |_| Vec::new(),
        );
        let graph = DependencyGraph::build(&data);
        let a = data.registry.lookup("shop.A").unwrap();
        let order: Vec<_> = graph
            .dependencies(a)
            .into_iter()
            .map(|(c, _)| data.registry.class(c).unwrap().simple_name.clone())
            .collect();
        assert_eq!(order, vec!["C", "B"]);
    }
}
