//
//  mod.rs
//  Atlas
//

//! Class-level dependency graph, endpoint-scoped traversal and diagram rendering.

pub mod diagram;
pub mod engine;
pub mod traversal;

pub use diagram::{
    conventional_path, escape_label, sanitize_name, ClassDiagram, ClassInfo, DiagramBuilder, MemberInfo,
};
pub use engine::{DependencyGraph, EdgeKinds};
pub use traversal::{is_test_class, reachable};
