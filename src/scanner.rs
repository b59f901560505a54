//
//  scanner.rs
//  Atlas
//

use ignore::WalkBuilder;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::config::ScanConfig;
use crate::error::{AtlasError, Result};

/// Source roots under which the directory layout mirrors the package path.
const SOURCE_ROOTS: &[&[&str]] = &[&["src", "main", "java"], &["src", "test", "java"]];

/// Package-path filter built from an Ant-style wildcard pattern.
///
/// `**` matches any run of characters (including dots), `*` matches within a
/// single package segment. An empty pattern or `**` matches everything.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    regex: Option<Regex>,
}

impl PackageFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "**" {
            return Ok(Self::match_all());
        }
        let source = format!("^{}$", pattern_to_regex(pattern));
        let regex = Regex::new(&source).map_err(|e| AtlasError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn match_all() -> Self {
        Self { regex: None }
    }

    pub fn is_match_all(&self) -> bool {
        self.regex.is_none()
    }

    /// Test a dotted package name.
    pub fn matches_package(&self, package: &str) -> bool {
        match &self.regex {
            None => true,
            Some(re) => re.is_match(package),
        }
    }

    /// Test a source file by the package path implied by its location.
    /// Files outside a recognised source root never match a real pattern.
    pub fn matches_file(&self, root: &Path, file: &Path) -> bool {
        if self.is_match_all() {
            return true;
        }
        match package_of_path(root, file) {
            Some(package) => self.matches_package(&package),
            None => false,
        }
    }
}

/// Translate a package wildcard pattern into regex source (without anchors).
fn pattern_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' if chars.get(i + 1) == Some(&'*')
                && chars.get(i + 2) == Some(&'*')
                && i + 3 == chars.len() =>
            {
                // trailing `.**` also matches the package itself
                out.push_str(r"(\..*)?");
                i += 3;
                continue;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
                continue;
            }
            '*' => out.push_str("[^.]*"),
            '.' => out.push_str(r"\."),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out
}

/// Derive the dotted package of a file from its directory beneath a source root.
pub fn package_of_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let parts: Vec<String> = relative
        .parent()?
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    for source_root in SOURCE_ROOTS {
        let width = source_root.len();
        if parts.len() < width {
            continue;
        }
        for start in 0..=(parts.len() - width) {
            let window = &parts[start..start + width];
            if window.iter().zip(source_root.iter()).all(|(a, b)| a == b) {
                return Some(parts[start + width..].join("."));
            }
        }
    }
    None
}

/// Walks a project root and returns candidate Java source files.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    config: ScanConfig,
}

impl SourceScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Check if a path passes through an excluded directory.
    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative.components().any(|c| {
            if let Component::Normal(name) = c {
                let name = name.to_str().unwrap_or("");
                self.config.exclude_dirs.iter().any(|d| d == name)
            } else {
                false
            }
        })
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.config.extension)
    }

    /// Collect source files under `root`, sorted by path.
    pub fn scan(&self, root: &Path, filter: &PackageFilter) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(AtlasError::InputValidation(format!(
                "project root does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(AtlasError::InputValidation(format!(
                "project root is not a directory: {}",
                root.display()
            )));
        }

        let respect_gitignore = self.config.respect_gitignore;
        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .follow_links(self.config.follow_links)
            .add_custom_ignore_filename(".atlasignore")
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| !self.is_excluded(root, entry.path()))
            .filter(|entry| self.has_source_extension(entry.path()))
            .filter(|entry| filter.matches_file(root, entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        debug!(root = %root.display(), files = files.len(), "scanned source tree");
        Ok(files)
    }
}

impl Default for SourceScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    #[test]
    fn test_pattern_translation() {
        let filter = PackageFilter::new("com.example.*").unwrap();
        assert!(filter.matches_package("com.example.web"));
        assert!(!filter.matches_package("com.example.web.api"));
        assert!(!filter.matches_package("com.other"));

        let deep = PackageFilter::new("com.example.**").unwrap();
        assert!(deep.matches_package("com.example"));
        assert!(deep.matches_package("com.example.web.api"));
        assert!(!deep.matches_package("com.examples"));

        let inner = PackageFilter::new("com.**.service").unwrap();
        assert!(inner.matches_package("com.shop.order.service"));
        assert!(!inner.matches_package("com.shop.order.repo"));
    }

    #[test]
    fn test_match_all_patterns() {
        assert!(PackageFilter::new("").unwrap().is_match_all());
        assert!(PackageFilter::new("**").unwrap().is_match_all());
        assert!(PackageFilter::new("  ").unwrap().is_match_all());
    }

    #[test]
    fn test_package_of_path() {
        let root = Path::new("/proj");
        assert_eq!(
            package_of_path(root, Path::new("/proj/src/main/java/com/example/Foo.java")),
            Some("com.example".to_string())
        );
        assert_eq!(
            package_of_path(root, Path::new("/proj/module-a/src/test/java/a/b/FooTest.java")),
            Some("a.b".to_string())
        );
        assert_eq!(
            package_of_path(root, Path::new("/proj/src/main/java/Foo.java")),
            Some(String::new())
        );
        assert_eq!(package_of_path(root, Path::new("/proj/scripts/Foo.java")), None);
    }

    #[test]
    fn test_scan_excludes_build_output() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/main/java/com/example/Foo.java");
        touch(dir.path(), "src/main/java/com/example/web/Bar.java");
        touch(dir.path(), "target/generated/com/example/Gen.java");
        touch(dir.path(), ".git/objects/Weird.java");
        touch(dir.path(), "src/main/resources/application.yml");

        let scanner = SourceScanner::default();
        let files = scanner.scan(dir.path(), &PackageFilter::match_all()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Foo.java", "Bar.java"]);
    }

    #[test]
    fn test_scan_with_pattern() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/main/java/com/example/Foo.java");
        touch(dir.path(), "src/main/java/com/example/web/Bar.java");
        touch(dir.path(), "tools/Loose.java");

        let scanner = SourceScanner::default();
        let filter = PackageFilter::new("com.example.web").unwrap();
        let files = scanner.scan(dir.path(), &filter).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("web/Bar.java"));
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let scanner = SourceScanner::default();
        let missing = dir.path().join("nope");
        let err = scanner.scan(&missing, &PackageFilter::match_all()).unwrap_err();
        assert!(matches!(err, AtlasError::InputValidation(_)));

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let err = scanner.scan(&file, &PackageFilter::match_all()).unwrap_err();
        assert!(matches!(err, AtlasError::InputValidation(_)));
    }
}
