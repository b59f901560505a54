//
//  mod.rs
//  Atlas
//

//! Analysis store: one [`ProjectData`] per project root, with bincode snapshots.

mod model;
mod project;

pub use model::{
    DependencyEdge, Endpoint, HttpMethod, Member, MemberAnnotation, MemberKind, Project,
};
pub use project::{PackageSummary, ProjectData};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AtlasError, Result};

/// All analysed projects.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Store {
    projects: Vec<ProjectData>,
}

/// On-disk envelope.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    format_version: u32,
    store: Store,
}

impl Store {
    const FORMAT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn projects(&self) -> &[ProjectData] {
        &self.projects
    }

    pub fn project(&self, id: Uuid) -> Result<&ProjectData> {
        self.projects
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| AtlasError::ProjectNotFound(id.to_string()))
    }

    pub fn project_by_root(&self, root: &Path) -> Option<&ProjectData> {
        self.projects.iter().find(|p| p.project.root == root)
    }

    /// Install a finished batch, replacing whatever the project held before.
    pub fn replace(&mut self, data: ProjectData) {
        match self.projects.iter_mut().find(|p| p.id() == data.id()) {
            Some(slot) => {
                debug!(project = %data.id(), batch = %data.batch_id, "replacing project data");
                *slot = data;
            }
            None => self.projects.push(data),
        }
    }

    /// Drop a project and everything it owns.
    pub fn remove(&mut self, id: Uuid) -> Result<ProjectData> {
        let pos = self
            .projects
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| AtlasError::ProjectNotFound(id.to_string()))?;
        Ok(self.projects.remove(pos))
    }

    /// Find an endpoint in any project.
    pub fn find_endpoint(&self, id: Uuid) -> Result<(&ProjectData, &Endpoint)> {
        self.projects
            .iter()
            .find_map(|p| p.endpoint(id).map(|e| (p, e)))
            .ok_or_else(|| AtlasError::EndpointNotFound(id.to_string()))
    }

    /// Write the whole store. The file is replaced atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            format_version: u32,
            store: &'a Store,
        }

        let bytes = bincode::serialize(&SnapshotRef {
            format_version: Self::FORMAT_VERSION,
            store: self,
        })?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, path)?;
        info!(path = %path.display(), projects = self.projects.len(), "store saved");
        Ok(())
    }

    /// Read a snapshot; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no store snapshot, starting empty");
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;
        if snapshot.format_version != Self::FORMAT_VERSION {
            return Err(AtlasError::InputValidation(format!(
                "store snapshot version {} is not supported (expected {})",
                snapshot.format_version,
                Self::FORMAT_VERSION
            )));
        }
        let mut store = snapshot.store;
        for project in &mut store.projects {
            project.rebuild_index();
        }
        Ok(store)
    }
}
