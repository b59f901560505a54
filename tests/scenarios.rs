//! End-to-end scenarios over small Spring-style source trees.

use atlas::{Atlas, AtlasConfig, AtlasError, CancelFlag, DependencyKind, HttpMethod};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (relative, source) in files {
        let path = dir.path().join("src/main/java").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
    dir
}

fn edges_of(atlas: &Atlas, project: uuid::Uuid, fqn: &str) -> Vec<(String, DependencyKind)> {
    let data = atlas.store().project(project).unwrap();
    let class = data.registry.lookup(fqn).unwrap();
    data.edges_from(class).map(|e| (e.target.clone(), e.kind)).collect()
}

#[test]
fn test_extends_through_explicit_import() {
    let dir = tree(&[
        ("a/b/Foo.java", "package a.b;\nimport a.b.Bar;\nclass Foo extends Bar {}\n"),
        ("a/b/Bar.java", "package a.b;\nclass Bar {}\n"),
    ]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let report = atlas.execute_analysis(dir.path(), "**").unwrap();

    assert_eq!(
        edges_of(&atlas, report.project_id, "a.b.Foo"),
        vec![("a.b.Bar".to_string(), DependencyKind::Extends)]
    );
    let data = atlas.store().project(report.project_id).unwrap();
    assert_eq!(data.edges[0].target_class, data.registry.lookup("a.b.Bar"));
}

#[test]
fn test_field_in_same_package_is_composition() {
    let dir = tree(&[
        ("pkg/Foo.java", "package pkg;\nclass Foo { private Widget w; }\n"),
        ("pkg/Widget.java", "package pkg;\nclass Widget {}\n"),
    ]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let report = atlas.execute_analysis(dir.path(), "").unwrap();

    assert_eq!(
        edges_of(&atlas, report.project_id, "pkg.Foo"),
        vec![("pkg.Widget".to_string(), DependencyKind::Composition)]
    );
    let pkg = &report.packages[0];
    assert_eq!(pkg.package, "pkg");
    assert_eq!(pkg.classes, vec!["Foo", "Widget"]);
    assert_eq!(pkg.kind_counts.get("001_009"), Some(&1));
}

#[test]
fn test_implemented_interface_joins_the_diagram() {
    let dir = tree(&[
        (
            "shop/web/OrderController.java",
            r#"
package shop.web;
import shop.service.ServiceImpl;
@RestController
public class OrderController {
    private ServiceImpl service;
    @GetMapping("/orders")
    public String list() { return null; }
}
"#,
        ),
        ("shop/service/Service.java", "package shop.service;\ninterface Service {}\n"),
        (
            "shop/service/ServiceImpl.java",
            "package shop.service;\nclass ServiceImpl implements Service {}\n",
        ),
    ]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let endpoints = atlas.extract_endpoints(dir.path(), "**").unwrap();
    let diagram = atlas
        .generate_class_diagram(endpoints[0].id, endpoints[0].project_id)
        .unwrap();

    let names: Vec<_> = diagram.classes.iter().map(|c| c.simple_name.as_str()).collect();
    assert_eq!(names, vec!["OrderController", "ServiceImpl", "Service"]);
    assert!(diagram
        .diagram_text
        .contains("    class Service {\n        <<interface>>\n    }\n"));
    assert!(diagram
        .diagram_text
        .contains("    ServiceImpl --> Service : 001_002_implements\n"));
}

#[test]
fn test_endpoint_uri_and_stereotype() {
    let dir = tree(&[(
        "shop/web/OrderController.java",
        r#"
package shop.web;
@RestController
@RequestMapping("/api")
public class OrderController {
    @GetMapping("/orders")
    public String list() { return null; }
}
"#,
    )]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let endpoints = atlas.extract_endpoints(dir.path(), "**").unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].uri, "/api/orders");
    assert_eq!(endpoints[0].method, HttpMethod::Get);
    assert_eq!(endpoints[0].method_id, 1);

    let diagram = atlas
        .generate_class_diagram(endpoints[0].id, endpoints[0].project_id)
        .unwrap();
    assert!(diagram.diagram_text.starts_with(
        "classDiagram\n    class OrderController {\n        <<\"/api/orders(GET)\">>\n"
    ));
}

#[test]
fn test_chain_is_cut_at_max_depth() {
    let names: Vec<String> = (b'A'..=b'L').map(|c| (c as char).to_string()).collect();
    let sources: Vec<(String, String)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let field = names
                .get(i + 1)
                .map(|next| format!("    private {} next;\n", next))
                .unwrap_or_default();
            let head = if i == 0 { "@RestController\n" } else { "" };
            let mapping = if i == 0 {
                "    @GetMapping(\"/chain\")\n    public void go() {}\n"
            } else {
                ""
            };
            (
                format!("chain/{}.java", name),
                format!("package chain;\n{}public class {} {{\n{}{}}}\n", head, name, field, mapping),
            )
        })
        .collect();
    let files: Vec<(&str, &str)> = sources
        .iter()
        .map(|(p, s)| (p.as_str(), s.as_str()))
        .collect();
    let dir = tree(&files);

    let mut atlas = Atlas::new(AtlasConfig::default());
    let endpoints = atlas.extract_endpoints(dir.path(), "**").unwrap();
    let diagram = atlas
        .generate_class_diagram(endpoints[0].id, endpoints[0].project_id)
        .unwrap();

    let visited: Vec<_> = diagram.classes.iter().map(|c| c.simple_name.clone()).collect();
    assert_eq!(visited, names[..11].to_vec());
    assert!(!diagram.diagram_text.contains("class L {"));

    let again = atlas
        .generate_class_diagram(endpoints[0].id, endpoints[0].project_id)
        .unwrap();
    assert_eq!(diagram.diagram_text, again.diagram_text);
}

#[test]
fn test_reanalysis_keeps_project_and_replaces_batch() {
    let dir = tree(&[("pkg/Foo.java", "package pkg;\nclass Foo { private Widget w; }\n")]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let first = atlas.execute_analysis(dir.path(), "**").unwrap();

    fs::write(
        dir.path().join("src/main/java/pkg/Widget.java"),
        "package pkg;\nclass Widget {}\n",
    )
    .unwrap();
    let second = atlas.execute_analysis(dir.path(), "**").unwrap();

    assert_eq!(first.project_id, second.project_id);
    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(atlas.store().projects().len(), 1);
    let data = atlas.store().project(second.project_id).unwrap();
    assert!(data.edges.iter().all(|e| e.batch_id == second.batch_id));
    assert_eq!(data.registry.len(), 2);
}

#[test]
fn test_failed_run_leaves_previous_data() {
    let dir = tree(&[("pkg/Foo.java", "package pkg;\nclass Foo {}\n")]);
    let mut atlas = Atlas::new(AtlasConfig::default());
    let report = atlas.execute_analysis(dir.path(), "**").unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let cancelled = atlas.execute_analysis_with(dir.path(), "**", cancel);
    assert!(matches!(cancelled, Err(AtlasError::Cancelled)));
    assert_eq!(atlas.store().project(report.project_id).unwrap().batch_id, report.batch_id);

    let missing = atlas.execute_analysis(Path::new("/definitely/not/here"), "**");
    assert!(matches!(missing, Err(AtlasError::InputValidation(_))));
}
