//
//  config.rs
//  Atlas
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level Atlas configuration (`atlas.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub diagram: DiagramConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Source discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Source file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Directory names never descended into (build output, VCS metadata).
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Honour .gitignore files while walking.
    #[serde(default)]
    pub respect_gitignore: bool,
    #[serde(default)]
    pub follow_links: bool,
}

/// Analysis pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Run parsing and classification on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Keep files whose syntax tree contains error nodes instead of skipping them.
    #[serde(default)]
    pub tolerate_syntax_errors: bool,
}

/// Diagram traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Maximum number of BFS levels expanded from the seed class.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Store persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the bincode store snapshot used by the CLI.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_extension() -> String {
    "java".to_string()
}

fn default_exclude_dirs() -> Vec<String> {
    [
        "target",
        "build",
        "out",
        "bin",
        ".git",
        ".svn",
        ".hg",
        ".idea",
        ".gradle",
        "node_modules",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    10
}

fn default_snapshot_path() -> String {
    ".atlas/store.bin".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            exclude_dirs: default_exclude_dirs(),
            respect_gitignore: false,
            follow_links: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: default_true(),
            tolerate_syntax_errors: false,
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl AtlasConfig {
    /// Load config from a TOML file. A missing file yields defaults,
    /// a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the snapshot path relative to a base directory.
    pub fn resolve_snapshot_path(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.store.snapshot_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AtlasConfig::load(&dir.path().join("atlas.toml")).unwrap();
        assert_eq!(config.scan.extension, "java");
        assert_eq!(config.diagram.max_depth, 10);
        assert!(config.analysis.parallel);
        assert!(config.scan.exclude_dirs.iter().any(|d| d == "target"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atlas.toml");
        std::fs::write(&path, "[diagram]\nmax_depth = 4\n").unwrap();

        let config = AtlasConfig::load(&path).unwrap();
        assert_eq!(config.diagram.max_depth, 4);
        assert_eq!(config.store.snapshot_path, ".atlas/store.bin");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atlas.toml");
        std::fs::write(&path, "[diagram\nmax_depth = ").unwrap();
        assert!(AtlasConfig::load(&path).is_err());
    }
}
