//! # Atlas
//!
//! Static structure analysis for Java/Spring source trees.
//!
//! Atlas parses a project without compiling it, registers every top-level
//! class, classifies the dependencies between them against a fixed taxonomy
//! of structural and Spring-specific relationship kinds, and extracts the
//! HTTP endpoints declared on controllers. For any endpoint it renders a
//! Mermaid class diagram of the classes reachable from the controller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atlas::{Atlas, AtlasConfig};
//!
//! let mut atlas = Atlas::new(AtlasConfig::default());
//! let report = atlas.execute_analysis("path/to/project".as_ref(), "**").unwrap();
//!
//! let endpoints = atlas.extract_endpoints("path/to/project".as_ref(), "**").unwrap();
//! let diagram = atlas
//!     .generate_class_diagram(endpoints[0].id, report.project_id)
//!     .unwrap();
//! println!("{}", diagram.diagram_text);
//! ```

pub mod classify;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod kind;
pub mod locator;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod store;

// Re-exports for convenience
pub use config::AtlasConfig;
pub use engine::{AnalysisEngine, AnalysisReport, CancelFlag, ParseFailure};
pub use error::{AtlasError, Result};
pub use graph::ClassDiagram;
pub use kind::DependencyKind;
pub use locator::{LocatedSource, SourceLocator};
pub use store::{Endpoint, HttpMethod, ProjectData, Store};

use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use graph::DiagramBuilder;
use registry::ClassId;

/// An endpoint as listed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub class_id: ClassId,
    /// Registry key of the controller, e.g. `com.shop.web.OrderController`.
    pub class_fqn: String,
    pub simple_name: String,
    pub uri: String,
    pub method_id: u8,
    pub method: HttpMethod,
}

/// The main Atlas instance: configuration plus the analysis store.
pub struct Atlas {
    config: AtlasConfig,
    store: Store,
    /// Where the store is persisted, when it is.
    snapshot: Option<PathBuf>,
}

impl Atlas {
    /// In-memory instance.
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            store: Store::new(),
            snapshot: None,
        }
    }

    /// Instance backed by a store snapshot. A missing snapshot starts empty.
    pub fn open<P: Into<PathBuf>>(config: AtlasConfig, snapshot: P) -> Result<Self> {
        let snapshot = snapshot.into();
        let store = Store::load(&snapshot)?;
        Ok(Self {
            config,
            store,
            snapshot: Some(snapshot),
        })
    }

    /// Persist the store if this instance has a snapshot path.
    pub fn save(&self) -> Result<()> {
        match &self.snapshot {
            Some(path) => self.store.save(path),
            None => Ok(()),
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Analyse a project root and replace its stored data.
    ///
    /// `package_pattern` of `"**"` or empty selects every package.
    pub fn execute_analysis(&mut self, root: &Path, package_pattern: &str) -> Result<AnalysisReport> {
        self.execute_analysis_with(root, package_pattern, CancelFlag::default())
    }

    /// [`Atlas::execute_analysis`] with a caller-held cancellation flag.
    /// A cancelled or failed run leaves the previous data untouched.
    pub fn execute_analysis_with(
        &mut self,
        root: &Path,
        package_pattern: &str,
        cancel: CancelFlag,
    ) -> Result<AnalysisReport> {
        let canonical = engine::project_root(root)?;
        let previous = self.store.project_by_root(&canonical).map(|d| d.project.clone());
        let (data, report) = AnalysisEngine::new(&self.config)
            .with_cancel(cancel)
            .run(&canonical, package_pattern, previous.as_ref())?;
        self.store.replace(data);
        Ok(report)
    }

    /// Re-analyse the project and list its endpoints in extraction order.
    pub fn extract_endpoints(&mut self, root: &Path, package_pattern: &str) -> Result<Vec<EndpointSummary>> {
        let report = self.execute_analysis(root, package_pattern)?;
        self.endpoints(report.project_id)
    }

    /// Stored endpoints of a project.
    pub fn endpoints(&self, project_id: Uuid) -> Result<Vec<EndpointSummary>> {
        let data = self.store.project(project_id)?;
        Ok(data
            .endpoints
            .iter()
            .map(|e| {
                let record = data.class(e.class);
                EndpointSummary {
                    id: e.id,
                    project_id,
                    class_id: e.class,
                    class_fqn: record.map(|r| r.fqn.clone()).unwrap_or_default(),
                    simple_name: record.map(|r| r.simple_name.clone()).unwrap_or_default(),
                    uri: e.uri.clone(),
                    method_id: e.method.id(),
                    method: e.method,
                }
            })
            .collect())
    }

    /// Diagram of the classes reachable from the endpoint's controller.
    pub fn generate_class_diagram(&self, endpoint_id: Uuid, project_id: Uuid) -> Result<ClassDiagram> {
        let data = self.store.project(project_id)?;
        let endpoint = data
            .endpoint(endpoint_id)
            .ok_or_else(|| AtlasError::EndpointNotFound(endpoint_id.to_string()))?;
        DiagramBuilder::new(data, self.config.diagram.max_depth).generate(endpoint)
    }

    /// Source file of a class in a stored project.
    pub fn locate_sources(&self, project_id: Uuid, fqn: &str) -> Result<LocatedSource> {
        let data = self.store.project(project_id)?;
        let recorded = data
            .registry
            .lookup(fqn)
            .and_then(|id| data.class(id))
            .and_then(|r| r.source_path.as_ref())
            .map(|p| p.to_string_lossy().replace('\\', "/"));
        self.locator(data)
            .locate(fqn, recorded.as_deref())
            .ok_or_else(|| AtlasError::ClassNotFound(fqn.to_string()))
    }

    /// Concatenated sources of every class in a diagram.
    pub fn export_sources(&self, project_id: Uuid, diagram: &ClassDiagram) -> Result<String> {
        let data = self.store.project(project_id)?;
        Ok(self.locator(data).export(&diagram.class_file_paths))
    }

    fn locator(&self, data: &ProjectData) -> SourceLocator {
        SourceLocator::new(data.project.root.clone(), self.config.scan.clone())
    }
}
