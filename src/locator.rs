//
//  locator.rs
//  Atlas
//

//! Finds the source file behind a class and concatenates diagram sources
//! into a single text export.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::graph::conventional_path;
use crate::parser::parse_file;
use crate::registry::class_key;
use crate::scanner::{PackageFilter, SourceScanner};

/// A class's file, as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSource {
    /// Root-relative, `/`-separated.
    pub relative: String,
    pub path: PathBuf,
}

pub struct SourceLocator {
    root: PathBuf,
    scan: ScanConfig,
    files: OnceLock<Vec<PathBuf>>,
}

impl SourceLocator {
    pub fn new(root: impl Into<PathBuf>, scan: ScanConfig) -> Self {
        Self {
            root: root.into(),
            scan,
            files: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recorded path first, then the conventional source-set layouts, then a
    /// tree scan by file name with the declared FQN checked by re-parsing.
    pub fn locate(&self, fqn: &str, recorded: Option<&str>) -> Option<LocatedSource> {
        let candidates = recorded
            .into_iter()
            .map(str::to_string)
            .chain(["main", "test"].iter().map(|set| conventional_path(fqn, set)));
        for relative in candidates {
            let path = self.root.join(&relative);
            if path.is_file() {
                return Some(LocatedSource { relative, path });
            }
        }
        self.search(fqn)
    }

    fn search(&self, fqn: &str) -> Option<LocatedSource> {
        let simple = fqn.rsplit('.').next().unwrap_or(fqn);
        let file_name = format!("{}.{}", simple, self.scan.extension);
        self.files()
            .iter()
            .filter(|path| path.file_name().is_some_and(|n| n == file_name.as_str()))
            .find(|path| declares(path, fqn))
            .map(|path| LocatedSource {
                relative: self.relative(path),
                path: path.clone(),
            })
    }

    fn files(&self) -> &[PathBuf] {
        self.files.get_or_init(|| {
            SourceScanner::new(self.scan.clone())
                .scan(&self.root, &PackageFilter::match_all())
                .unwrap_or_else(|e| {
                    warn!(root = %self.root.display(), error = %e, "source search unavailable");
                    Vec::new()
                })
        })
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Concatenate the files of `class_file_paths` (FQN -> recorded path).
    ///
    /// Each entry starts with `===== FILE: <path> =====`; a missing file is
    /// marked with `// File not found`.
    pub fn export(&self, class_file_paths: &BTreeMap<String, String>) -> String {
        let mut out = String::new();
        for (fqn, recorded) in class_file_paths {
            let found = self.locate(fqn, Some(recorded));
            let shown = found.as_ref().map_or(recorded.as_str(), |f| f.relative.as_str());
            let _ = writeln!(out, "===== FILE: {} =====", shown);
            match found {
                Some(source) => match fs::read_to_string(&source.path) {
                    Ok(content) => {
                        out.push_str(&content);
                        if !content.ends_with('\n') {
                            out.push('\n');
                        }
                        out.push('\n');
                    }
                    Err(e) => {
                        let _ = writeln!(out, "// Error reading file: {}\n", e);
                    }
                },
                None => {
                    debug!(%fqn, "source file not found");
                    out.push_str("// File not found\n\n");
                }
            }
        }
        out
    }
}

/// Whether the file at `path` declares a top-level type named `fqn`.
fn declares(path: &Path, fqn: &str) -> bool {
    let Ok(unit) = parse_file(path) else {
        return false;
    };
    let package = unit.package.as_deref().unwrap_or("");
    unit.types.iter().any(|decl| {
        let declared = class_key(package, &decl.name);
        declared == fqn || (package.is_empty() && decl.name == fqn)
    })
}

/// Download name for an endpoint export: `api_orders(GET).txt`.
pub fn export_file_name(uri: &str, method: &str) -> String {
    let safe: String = uri
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let safe = safe.trim_start_matches('_');
    let safe = if safe.is_empty() { "root" } else { safe };
    format!("{}({}).txt", safe, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, source: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    #[test]
    fn test_locate_by_recorded_and_conventional_paths() {
        let dir = tempdir().unwrap();
        write(dir.path(), "svc/Billing.java", "package a; class Billing {}");
        write(dir.path(), "src/test/java/a/BillingTest.java", "package a; class BillingTest {}");
        let locator = SourceLocator::new(dir.path(), ScanConfig::default());

        let found = locator.locate("a.Billing", Some("svc/Billing.java")).unwrap();
        assert_eq!(found.relative, "svc/Billing.java");
        let found = locator.locate("a.BillingTest", None).unwrap();
        assert_eq!(found.relative, "src/test/java/a/BillingTest.java");
    }

    #[test]
    fn test_locate_by_scan_checks_declared_package() {
        let dir = tempdir().unwrap();
        write(dir.path(), "one/Order.java", "package x; class Order {}");
        write(dir.path(), "two/Order.java", "package shop; class Order {}");
        let locator = SourceLocator::new(dir.path(), ScanConfig::default());

        let found = locator.locate("shop.Order", Some("gone/Order.java")).unwrap();
        assert_eq!(found.relative, "two/Order.java");
        assert!(locator.locate("shop.Missing", None).is_none());
    }

    #[test]
    fn test_export_concatenates_with_placeholders() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/main/java/a/Foo.java", "package a;\nclass Foo {}");
        let locator = SourceLocator::new(dir.path(), ScanConfig::default());
        let mut paths = BTreeMap::new();
        paths.insert("a.Foo".to_string(), "src/main/java/a/Foo.java".to_string());
        paths.insert("a.Gone".to_string(), "src/main/java/a/Gone.java".to_string());

        let export = locator.export(&paths);
        assert_eq!(
            export,
            "===== FILE: src/main/java/a/Foo.java =====\npackage a;\nclass Foo {}\n\n\
             ===== FILE: src/main/java/a/Gone.java =====\n// File not found\n\n"
        );
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("/api/orders", "GET"), "api_orders(GET).txt");
        assert_eq!(export_file_name("/", "POST"), "root(POST).txt");
        assert_eq!(export_file_name("/a/{id}", "PUT"), "a_{id}(PUT).txt");
    }
}
