//
//  traversal.rs
//  Atlas
//

//! Bounded breadth-first walk from a seed class.

use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::kind::DependencyKind;
use crate::registry::{ClassId, ClassRecord, ClassRegistry};

use super::engine::DependencyGraph;

/// Test code: a `*Test` class, or any class under a `test` package segment.
pub fn is_test_class(record: &ClassRecord) -> bool {
    record.simple_name.ends_with("Test")
        || record
            .fqn
            .to_ascii_lowercase()
            .split('.')
            .rev()
            .skip(1)
            .any(|segment| segment == "test")
}

/// Classes reachable from `seed`, in visit order, the seed first.
///
/// Forward edges are followed to any non-test class; backward edges only
/// when they carry `implements`, which pulls in implementations of visited
/// interfaces. Levels at `max_depth` are collected but not expanded.
pub fn reachable(
    graph: &DependencyGraph,
    registry: &ClassRegistry,
    seed: ClassId,
    max_depth: usize,
) -> Vec<ClassId> {
    let admissible = |class: ClassId| registry.class(class).is_some_and(|r| !is_test_class(r));

    let mut visited: HashSet<ClassId> = HashSet::new();
    let mut order = vec![seed];
    let mut queue: VecDeque<(ClassId, usize)> = VecDeque::new();
    visited.insert(seed);
    queue.push_back((seed, 0));

    while let Some((class, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let forward = graph.dependencies(class).into_iter().map(|(c, _)| c);
        let backward = graph
            .dependents(class)
            .into_iter()
            .filter(|(_, kinds)| kinds.contains(DependencyKind::Implements))
            .map(|(c, _)| c);
        for next in forward.chain(backward) {
            if admissible(next) && visited.insert(next) {
                order.push(next);
                queue.push_back((next, depth + 1));
            }
        }
    }

    debug!(seed = seed.0, classes = order.len(), max_depth, "traversal finished");
    order
}
