//! Documentation file discovery.
//!
//! Walks each configured search root under the docs checkout and yields the
//! markdown files, skipping excluded directories by name or glob.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::config::SearchRoot;
use crate::constants::scan::DOC_EXTENSION;

/// A documentation file found under a search root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocFile {
    /// Absolute (or docs-root-joined) path for reading
    pub path: PathBuf,
    /// Path relative to the docs checkout, `/`-separated
    pub relative: String,
}

/// Directory exclusion rule.
///
/// A plain pattern is lower-cased and stripped of `/`; it excludes a directory
/// when it equals the directory name, occurs in its path, or ends it. Patterns
/// containing `*` are matched as globs against the relative path.
#[derive(Debug, Clone)]
pub struct ExcludeRule {
    patterns: Vec<String>,
}

impl ExcludeRule {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| p.to_lowercase().trim_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn excludes(&self, relative_dir: &str, name: &str) -> bool {
        let path = relative_dir.to_lowercase();
        let name = name.to_lowercase();

        self.patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                return glob::Pattern::new(pattern)
                    .map(|p| p.matches(&path))
                    .unwrap_or(false);
            }
            *pattern == name || path.contains(pattern.as_str()) || path.ends_with(pattern.as_str())
        })
    }
}

/// Finds markdown documents under the configured search roots
pub struct DocWalker {
    docs_root: PathBuf,
    exclude: ExcludeRule,
}

impl DocWalker {
    pub fn new<P: AsRef<Path>>(docs_root: P, exclude_dirs: &[String]) -> Self {
        Self {
            docs_root: docs_root.as_ref().to_path_buf(),
            exclude: ExcludeRule::new(exclude_dirs),
        }
    }

    /// Documents under every root, sorted by relative path. Missing roots and
    /// unreadable entries are logged and skipped.
    pub fn discover(&self, roots: &[SearchRoot]) -> Vec<DocFile> {
        let mut files: Vec<DocFile> = roots.iter().flat_map(|root| self.walk(root)).collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files.dedup_by(|a, b| a.relative == b.relative);
        files
    }

    fn walk(&self, root: &SearchRoot) -> Vec<DocFile> {
        let start = self.docs_root.join(&root.path);
        if !start.is_dir() {
            warn!(path = %start.display(), "Search path not found, skipping");
            return Vec::new();
        }

        let docs_root = self.docs_root.clone();
        let exclude = self.exclude.clone();

        let walker = WalkBuilder::new(&start)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .max_depth(if root.recursive { None } else { Some(1) })
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let relative = relative_path(&docs_root, entry.path());
                let name = entry.file_name().to_string_lossy();
                !exclude.excludes(&relative, &name)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !is_document(path) {
                continue;
            }

            files.push(DocFile {
                path: path.to_path_buf(),
                relative: relative_path(&self.docs_root, path),
            });
        }

        debug!(root = %root.path, count = files.len(), "Discovered documents");
        files
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOC_EXTENSION))
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rule(patterns: &[&str]) -> ExcludeRule {
        ExcludeRule::new(&patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_exclude_rule_cases() {
        let rule = rule(&["media", "/ai-foundry/openai/"]);
        assert!(rule.excludes("articles/ai-foundry/openai", "openai"));
        assert!(rule.excludes("articles/ai-foundry/openai/subfolder", "subfolder"));
        assert!(!rule.excludes("articles/ai-foundry/tutorials", "tutorials"));
        assert!(rule.excludes("articles/machine-learning/media", "media"));
        assert!(!rule.excludes("articles/ai-foundry/includes", "includes"));
        assert!(!rule.excludes("articles/ai-foundry", "ai-foundry"));
    }

    #[test]
    fn test_exclude_rule_glob() {
        let rule = rule(&["articles/*/archive"]);
        assert!(rule.excludes("articles/machine-learning/archive", "archive"));
        assert!(!rule.excludes("articles/machine-learning/current", "current"));
    }

    fn docs_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in [
            "articles/machine-learning/includes",
            "articles/machine-learning/media",
            "articles/ai-foundry/includes",
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "articles/machine-learning/top.md",
            "articles/machine-learning/image.png",
            "articles/machine-learning/includes/nested.md",
            "articles/machine-learning/media/skip.md",
            "articles/ai-foundry/a.md",
            "articles/ai-foundry/includes/b.md",
        ] {
            fs::write(root.join(file), "# doc\n").unwrap();
        }
        temp
    }

    #[test]
    fn test_discover_recursive_and_top_level() {
        let temp = docs_tree();
        let walker = DocWalker::new(temp.path(), &["media".to_string()]);
        let roots = vec![
            SearchRoot {
                path: "articles/ai-foundry".into(),
                recursive: true,
            },
            SearchRoot {
                path: "articles/machine-learning".into(),
                recursive: false,
            },
        ];

        let found: Vec<_> = walker
            .discover(&roots)
            .into_iter()
            .map(|f| f.relative)
            .collect();
        assert_eq!(
            found,
            vec![
                "articles/ai-foundry/a.md",
                "articles/ai-foundry/includes/b.md",
                "articles/machine-learning/top.md",
            ]
        );
    }

    #[test]
    fn test_discover_applies_excludes() {
        let temp = docs_tree();
        let walker = DocWalker::new(temp.path(), &["media".to_string()]);
        let roots = vec![SearchRoot {
            path: "articles/machine-learning".into(),
            recursive: true,
        }];

        let found: Vec<_> = walker
            .discover(&roots)
            .into_iter()
            .map(|f| f.relative)
            .collect();
        assert!(found.contains(&"articles/machine-learning/includes/nested.md".to_string()));
        assert!(!found.iter().any(|f| f.contains("media")));
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let temp = TempDir::new().unwrap();
        let walker = DocWalker::new(temp.path(), &[]);
        let roots = vec![SearchRoot {
            path: "nope".into(),
            recursive: true,
        }];
        assert!(walker.discover(&roots).is_empty());
    }
}
