//
//  project.rs
//  Atlas
//

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use super::model::{DependencyEdge, Endpoint, Member, Project};
use crate::registry::{ClassId, ClassRecord, ClassRegistry};

/// Everything one analysis batch produced for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub project: Project,
    pub registry: ClassRegistry,
    pub members: Vec<Member>,
    pub edges: Vec<DependencyEdge>,
    pub endpoints: Vec<Endpoint>,
    pub batch_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    #[serde(skip)]
    index: EdgeIndex,
}

/// Position lists into `edges` and `members`, rebuilt after load.
#[derive(Debug, Clone, Default)]
struct EdgeIndex {
    by_source: HashMap<ClassId, Vec<usize>>,
    by_target: HashMap<ClassId, Vec<usize>>,
    members: HashMap<ClassId, Vec<usize>>,
}

/// Per-package rollup returned by an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub package: String,
    pub class_count: usize,
    /// Sorted, distinct simple names.
    pub classes: Vec<String>,
    /// Kind code -> number of edges whose source lies in this package.
    pub kind_counts: BTreeMap<String, usize>,
}

impl ProjectData {
    pub fn new(
        project: Project,
        registry: ClassRegistry,
        members: Vec<Member>,
        edges: Vec<DependencyEdge>,
        endpoints: Vec<Endpoint>,
        batch_id: Uuid,
    ) -> Self {
        let mut data = Self {
            project,
            registry,
            members,
            edges,
            endpoints,
            batch_id,
            analyzed_at: Utc::now(),
            index: EdgeIndex::default(),
        };
        data.rebuild_index();
        data
    }

    pub(crate) fn rebuild_index(&mut self) {
        let mut index = EdgeIndex::default();
        for (i, edge) in self.edges.iter().enumerate() {
            index.by_source.entry(edge.source).or_default().push(i);
            if let Some(target) = edge.target_class {
                index.by_target.entry(target).or_default().push(i);
            }
        }
        for (i, member) in self.members.iter().enumerate() {
            index.members.entry(member.class).or_default().push(i);
        }
        self.index = index;
    }

    pub fn id(&self) -> Uuid {
        self.project.id
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassRecord> {
        self.registry.class(id)
    }

    /// Edges whose source is `class`, in insertion order.
    pub fn edges_from(&self, class: ClassId) -> impl Iterator<Item = &DependencyEdge> + '_ {
        self.indexed(self.index.by_source.get(&class))
    }

    /// Edges whose resolved target is `class`, in insertion order.
    pub fn edges_to(&self, class: ClassId) -> impl Iterator<Item = &DependencyEdge> + '_ {
        self.indexed(self.index.by_target.get(&class))
    }

    pub fn edges_in_batch(&self, batch: Uuid) -> impl Iterator<Item = &DependencyEdge> + '_ {
        self.edges.iter().filter(move |e| e.batch_id == batch)
    }

    fn indexed<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        positions
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.edges.get(i))
    }

    pub fn members_of(&self, class: ClassId) -> Vec<&Member> {
        self.index
            .members
            .get(&class)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.members.get(i))
            .collect()
    }

    /// Whether member data was captured for the class at all.
    pub fn has_members(&self, class: ClassId) -> bool {
        self.index.members.contains_key(&class)
    }

    pub fn endpoint(&self, id: Uuid) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    /// Class count, names and kind histogram per package, sorted by package name.
    pub fn package_summaries(&self) -> Vec<PackageSummary> {
        let mut by_package: BTreeMap<&str, PackageSummary> = BTreeMap::new();
        let mut names: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for record in self.registry.classes() {
            let Some(package) = self.registry.package(record.package) else {
                continue;
            };
            let summary = by_package
                .entry(package.name.as_str())
                .or_insert_with(|| PackageSummary {
                    package: package.name.clone(),
                    class_count: 0,
                    classes: Vec::new(),
                    kind_counts: BTreeMap::new(),
                });
            summary.class_count += 1;
            for edge in self.edges_from(record.id) {
                *summary
                    .kind_counts
                    .entry(edge.kind.code().to_string())
                    .or_insert(0) += 1;
            }
            names
                .entry(package.name.as_str())
                .or_default()
                .insert(record.simple_name.as_str());
        }
        by_package
            .into_iter()
            .map(|(package, mut summary)| {
                summary.classes = names
                    .remove(package)
                    .unwrap_or_default()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                summary
            })
            .collect()
    }
}
