//
//  engine.rs
//  Atlas
//

//! Analysis pipeline for one project root.
//!
//! Files are parsed in parallel, registered into a frozen [`ClassRegistry`],
//! then classified alongside endpoint extraction. The result is a complete
//! [`ProjectData`] under a fresh batch id; nothing is installed on failure.

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{ClassFindings, DependencyClassifier};
use crate::config::AtlasConfig;
use crate::endpoint::EndpointExtractor;
use crate::error::{AtlasError, Result};
use crate::parser::{parse_file, CompilationUnit};
use crate::registry::{ClassRegistry, RegistryBuilder};
use crate::resolver::{ResolutionContext, SemanticResolver};
use crate::scanner::{PackageFilter, SourceScanner};
use crate::store::{DependencyEdge, Endpoint, PackageSummary, Project, ProjectData};

/// Shared cancellation signal, checked before each file is parsed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A file skipped during the run.
#[derive(Debug, Clone, Serialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub project_id: Uuid,
    pub root: PathBuf,
    pub batch_id: Uuid,
    pub files_scanned: usize,
    pub files_parsed: usize,
    pub parse_errors: Vec<ParseFailure>,
    pub classes: usize,
    pub edges: usize,
    /// Edges whose target names no project class.
    pub unresolved_targets: usize,
    pub endpoints: usize,
    pub packages: Vec<PackageSummary>,
}

impl AnalysisReport {
    fn new(data: &ProjectData, files_scanned: usize, parse_errors: Vec<ParseFailure>) -> Self {
        Self {
            project_id: data.id(),
            root: data.project.root.clone(),
            batch_id: data.batch_id,
            files_scanned,
            files_parsed: files_scanned - parse_errors.len(),
            parse_errors,
            classes: data.registry.len(),
            edges: data.edges.len(),
            unresolved_targets: data.edges.iter().filter(|e| e.target_class.is_none()).count(),
            endpoints: data.endpoints.len(),
            packages: data.package_summaries(),
        }
    }
}

/// Canonical form of a project root. Missing roots and non-directories are rejected.
pub fn project_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(AtlasError::InputValidation(format!(
            "project root is missing or not a directory: {}",
            root.display()
        )));
    }
    Ok(root.canonicalize()?)
}

pub struct AnalysisEngine<'a> {
    config: &'a AtlasConfig,
    semantic: Option<&'a dyn SemanticResolver>,
    cancel: CancelFlag,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(config: &'a AtlasConfig) -> Self {
        Self {
            config,
            semantic: None,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_semantic(mut self, semantic: &'a dyn SemanticResolver) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Analyse `root`, reusing `previous`'s project identity when it is the same root.
    pub fn run(
        &self,
        root: &Path,
        pattern: &str,
        previous: Option<&Project>,
    ) -> Result<(ProjectData, AnalysisReport)> {
        let root = project_root(root)?;
        let filter = PackageFilter::new(pattern)?;
        let files = SourceScanner::new(self.config.scan.clone()).scan(&root, &filter)?;
        if files.is_empty() {
            return Err(AtlasError::InputValidation(format!(
                "no .{} source files found under {}",
                self.config.scan.extension,
                root.display()
            )));
        }
        info!(root = %root.display(), files = files.len(), "analysis started");

        let (units, parse_errors) = self.parse_all(&files)?;

        let registry = register(&units, &root);
        info!(classes = registry.len(), packages = registry.packages().len(), "registry frozen");

        if self.cancel.is_cancelled() {
            return Err(AtlasError::Cancelled);
        }

        let batch_id = Uuid::new_v4();
        let (findings, endpoints) = self.classify_all(&units, &registry);
        let (members, edges) = assemble(findings, &registry, batch_id);

        let project = match previous {
            Some(project) if project.root == root => project.clone(),
            _ => Project::new(root),
        };
        let data = ProjectData::new(project, registry, members, edges, endpoints, batch_id);
        let report = AnalysisReport::new(&data, files.len(), parse_errors);
        info!(
            project = %report.project_id,
            batch = %batch_id,
            edges = report.edges,
            endpoints = report.endpoints,
            skipped = report.parse_errors.len(),
            "analysis finished"
        );
        Ok((data, report))
    }

    /// Parse every file, keeping successes in scan order and recording skips.
    fn parse_all(&self, files: &[PathBuf]) -> Result<(Vec<CompilationUnit>, Vec<ParseFailure>)> {
        let tolerate = self.config.analysis.tolerate_syntax_errors;
        let parse = |path: &PathBuf| -> Result<CompilationUnit> {
            if self.cancel.is_cancelled() {
                return Err(AtlasError::Cancelled);
            }
            let unit = parse_file(path)?;
            if unit.has_syntax_errors && !tolerate {
                return Err(AtlasError::Parse {
                    path: path.clone(),
                    message: "syntax errors in source".to_string(),
                });
            }
            debug!(path = %path.display(), types = unit.types.len(), "parsed");
            Ok(unit)
        };

        let results: Vec<Result<CompilationUnit>> = if self.config.analysis.parallel {
            files.par_iter().map(parse).collect()
        } else {
            files.iter().map(parse).collect()
        };

        let mut units = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(unit) => units.push(unit),
                Err(AtlasError::Parse { path, message }) => {
                    warn!(path = %path.display(), %message, "skipping file");
                    failures.push(ParseFailure { path, message });
                }
                Err(e) => return Err(e),
            }
        }
        Ok((units, failures))
    }

    /// Classification and endpoint extraction over the frozen registry.
    fn classify_all(
        &self,
        units: &[CompilationUnit],
        registry: &ClassRegistry,
    ) -> (Vec<ClassFindings>, Vec<Endpoint>) {
        let mut resolver = ResolutionContext::new(registry);
        if let Some(semantic) = self.semantic {
            resolver = resolver.with_semantic(semantic);
        }

        let classify = |unit: &CompilationUnit| DependencyClassifier::classify_unit(unit, resolver);
        let extract = |unit: &CompilationUnit| EndpointExtractor::extract_unit(unit, registry);

        if self.config.analysis.parallel {
            rayon::join(
                || units.par_iter().flat_map_iter(classify).collect(),
                || units.par_iter().flat_map_iter(extract).collect(),
            )
        } else {
            (
                units.iter().flat_map(classify).collect(),
                units.iter().flat_map(extract).collect(),
            )
        }
    }
}

/// Phase one: every top-level type of every parsed file.
fn register(units: &[CompilationUnit], root: &Path) -> ClassRegistry {
    let mut builder = RegistryBuilder::new();
    for unit in units {
        builder.register_unit(unit, root);
    }
    builder.freeze()
}

/// Stamp classifications into edges and gather members, in file order.
fn assemble(
    findings: Vec<ClassFindings>,
    registry: &ClassRegistry,
    batch_id: Uuid,
) -> (Vec<crate::store::Member>, Vec<DependencyEdge>) {
    let detected_at = Utc::now();
    let mut members = Vec::new();
    let mut edges = Vec::new();
    for finding in findings {
        let source_fqn = registry
            .class(finding.class)
            .map(|r| r.fqn.clone())
            .unwrap_or_default();
        for classification in finding.edges {
            edges.push(DependencyEdge {
                source: finding.class,
                source_fqn: source_fqn.clone(),
                target_class: registry.resolve_target(&classification.target),
                target: classification.target,
                kind: classification.kind,
                detected_at,
                batch_id,
            });
        }
        members.extend(finding.members);
    }
    (members, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::DependencyKind;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, source: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    fn shop(root: &Path) {
        write(
            root,
            "src/main/java/com/shop/web/OrderController.java",
            r#"
package com.shop.web;
import com.shop.service.OrderService;
@RestController
@RequestMapping("/api")
public class OrderController {
    private final OrderService orderService;
    public OrderController(OrderService orderService) { this.orderService = orderService; }
    @GetMapping("/orders")
    public String list() { return orderService.describe(); }
}
"#,
        );
        write(
            root,
            "src/main/java/com/shop/service/OrderService.java",
            r#"
package com.shop.service;
@Service
public class OrderService {
    public String describe() { return "orders"; }
}
"#,
        );
    }

    #[test]
    fn test_run_produces_edges_and_endpoints() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        let config = AtlasConfig::default();
        let (data, report) = AnalysisEngine::new(&config).run(dir.path(), "**", None).unwrap();

        assert_eq!(report.files_scanned, 2);
        assert!(report.parse_errors.is_empty());
        assert_eq!(report.classes, 2);
        assert_eq!(data.endpoints.len(), 1);
        assert_eq!(data.endpoints[0].uri, "/api/orders");

        let controller = data.registry.lookup("com.shop.web.OrderController").unwrap();
        let service = data.registry.lookup("com.shop.service.OrderService").unwrap();
        assert!(data
            .edges_from(controller)
            .any(|e| e.target_class == Some(service) && e.kind == DependencyKind::ConstructorInjection));
        assert!(data.edges.iter().all(|e| e.batch_id == data.batch_id));
        assert_eq!(report.packages.len(), 2);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        let parallel = AtlasConfig::default();
        let mut sequential = AtlasConfig::default();
        sequential.analysis.parallel = false;

        let (a, _) = AnalysisEngine::new(&parallel).run(dir.path(), "", None).unwrap();
        let (b, _) = AnalysisEngine::new(&sequential).run(dir.path(), "", None).unwrap();
        let edges = |d: &ProjectData| -> Vec<(String, String, DependencyKind)> {
            d.edges
                .iter()
                .map(|e| (e.source_fqn.clone(), e.target.clone(), e.kind))
                .collect()
        };
        assert_eq!(edges(&a), edges(&b));
    }

    #[test]
    fn test_broken_files_are_skipped() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        write(dir.path(), "src/main/java/com/shop/Broken.java", "package com.shop; class {");
        let config = AtlasConfig::default();
        let (data, report) = AnalysisEngine::new(&config).run(dir.path(), "**", None).unwrap();
        assert_eq!(report.parse_errors.len(), 1);
        assert!(report.parse_errors[0].path.ends_with("Broken.java"));
        assert_eq!(report.files_parsed, 2);
        assert_eq!(data.registry.len(), 2);
    }

    #[test]
    fn test_package_pattern_limits_files() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        let config = AtlasConfig::default();
        let (data, _) = AnalysisEngine::new(&config)
            .run(dir.path(), "com.shop.service.**", None)
            .unwrap();
        assert_eq!(data.registry.len(), 1);
        assert!(data.endpoints.is_empty());
    }

    #[test]
    fn test_invalid_roots_and_empty_trees() {
        let dir = tempdir().unwrap();
        let config = AtlasConfig::default();
        let engine = AnalysisEngine::new(&config);
        assert!(matches!(
            engine.run(&dir.path().join("missing"), "**", None),
            Err(AtlasError::InputValidation(_))
        ));
        assert!(matches!(
            engine.run(dir.path(), "**", None),
            Err(AtlasError::InputValidation(_))
        ));
    }

    #[test]
    fn test_cancelled_run() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        let config = AtlasConfig::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = AnalysisEngine::new(&config).with_cancel(cancel).run(dir.path(), "**", None);
        assert!(matches!(result, Err(AtlasError::Cancelled)));
    }

    #[test]
    fn test_previous_project_identity_is_kept() {
        let dir = tempdir().unwrap();
        shop(dir.path());
        let config = AtlasConfig::default();
        let engine = AnalysisEngine::new(&config);
        let (first, _) = engine.run(dir.path(), "**", None).unwrap();
        let (second, _) = engine.run(dir.path(), "**", Some(&first.project)).unwrap();
        assert_eq!(first.id(), second.id());
        assert_ne!(first.batch_id, second.batch_id);
    }
}
