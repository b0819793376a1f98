//! Reference Index
//!
//! Aggregates reference records from a documentation scan into a sorted,
//! deduplicated collection with keyed lookup by `ref_file`. The index is
//! rebuilt in full, never updated in place; [`IndexHandle`] publishes a new
//! build by swapping an `Arc`, so readers keep whichever snapshot they took.

pub mod codeowners;
pub mod store;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::{DocsConfig, SearchRoot};
use crate::scanner::{BranchUsage, DocWalker, ReferenceExtractor, scan_document};
use crate::types::{CodeBlock, ReferenceRecord};

/// Immutable, sorted and deduplicated set of references
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    records: Vec<ReferenceRecord>,
    by_ref_file: HashMap<String, Vec<ReferenceRecord>>,
}

impl ReferenceIndex {
    /// Build from records in any order. Exact duplicates are removed.
    pub fn from_records(mut records: Vec<ReferenceRecord>) -> Self {
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        records.dedup();

        let mut by_ref_file: HashMap<String, Vec<ReferenceRecord>> = HashMap::new();
        for record in &records {
            by_ref_file
                .entry(record.ref_file.clone())
                .or_default()
                .push(record.clone());
        }

        Self {
            records,
            by_ref_file,
        }
    }

    /// Records citing `ref_file` (empty if none)
    pub fn lookup(&self, ref_file: &str) -> &[ReferenceRecord] {
        self.by_ref_file
            .get(ref_file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_referenced(&self, ref_file: &str) -> bool {
        self.by_ref_file.contains_key(ref_file)
    }

    /// Citing documents for `ref_file` as `<from_file_dir>/<from_file>`
    pub fn citing_paths(&self, ref_file: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lookup(ref_file)
            .iter()
            .map(ReferenceRecord::citing_path)
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// All records in (repo_name, ref_file) order
    pub fn all(&self) -> &[ReferenceRecord] {
        &self.records
    }

    /// Records pointing into one repository
    pub fn for_repo<'a>(&'a self, repo_name: &'a str) -> impl Iterator<Item = &'a ReferenceRecord> {
        self.records.iter().filter(move |r| r.repo_name == repo_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Atomic publication
// =============================================================================

/// Shared slot holding the current index.
///
/// Readers take a snapshot; a rebuild publishes a whole new index at once.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Arc<ReferenceIndex>>,
}

impl IndexHandle {
    pub fn new(index: ReferenceIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn snapshot(&self) -> Arc<ReferenceIndex> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn publish(&self, index: ReferenceIndex) {
        let index = Arc::new(index);
        match self.current.write() {
            Ok(mut guard) => *guard = index,
            Err(poisoned) => *poisoned.into_inner() = index,
        }
    }
}

// =============================================================================
// Build
// =============================================================================

/// Everything a documentation scan produces
#[derive(Debug, Default)]
pub struct IndexBuild {
    pub index: ReferenceIndex,
    pub code_blocks: Vec<CodeBlock>,
    /// Branches seen per repository token, including non-main ones
    pub branch_usage: BranchUsage,
    pub documents_scanned: usize,
    pub unterminated_blocks: usize,
}

/// Where and what to scan
pub struct ScanSettings<'a> {
    /// Root of the documentation checkout
    pub docs_root: &'a Path,
    /// Repository tokens to look for
    pub tokens: &'a [String],
    pub docs: &'a DocsConfig,
}

/// Scan every document under `search_roots` and build the index.
///
/// Per-file problems (unreadable, non-UTF-8, unterminated blocks) are logged
/// and the scan continues.
pub fn build_reference_index(
    search_roots: &[SearchRoot],
    exclude_dirs: &[String],
    settings: &ScanSettings<'_>,
) -> IndexBuild {
    let walker = DocWalker::new(settings.docs_root, exclude_dirs);
    let extractor = ReferenceExtractor::new(settings.tokens, settings.docs);

    let mut build = IndexBuild::default();
    let mut records = Vec::new();

    for doc in walker.discover(search_roots) {
        let content = match fs::read_to_string(&doc.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %doc.relative, error = %e, "Skipping unreadable document");
                continue;
            }
        };

        build.documents_scanned += 1;
        let (file_name, _) = crate::scanner::document_location(&doc.relative, settings.docs);
        let category = settings.docs.category_for(&doc.relative).to_string();

        let fences = scan_document(&doc.relative, &content);
        build.unterminated_blocks += fences.warnings.len();
        build
            .code_blocks
            .extend(fences.blocks.into_iter().map(|block| CodeBlock {
                file: file_name.clone(),
                language_tag: block.language_tag,
                line_count: block.line_count,
                path_category: category.clone(),
            }));

        let found = extractor.extract(&doc.relative, &content, &mut build.branch_usage);
        if !found.is_empty() {
            debug!(file = %doc.relative, count = found.len(), "References found");
        }
        records.extend(found);
    }

    for (token, branches) in &build.branch_usage {
        for (branch, count) in branches {
            debug!(token = %token, branch = %branch, count, "Branch usage");
        }
    }

    build.index = ReferenceIndex::from_records(records);
    info!(
        documents = build.documents_scanned,
        references = build.index.len(),
        code_blocks = build.code_blocks.len(),
        "Reference index built"
    );
    build
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(repo: &str, ref_file: &str, from_file: &str) -> ReferenceRecord {
        ReferenceRecord {
            ref_file: ref_file.into(),
            from_file: from_file.into(),
            repo_name: repo.into(),
            from_file_dir: "machine-learning".into(),
        }
    }

    #[test]
    fn test_from_records_sorts_and_dedups() {
        let index = ReferenceIndex::from_records(vec![
            record("b", "x.py", "1.md"),
            record("a", "z.py", "1.md"),
            record("a", "y.py", "1.md"),
            record("a", "y.py", "1.md"),
        ]);

        let keys: Vec<_> = index
            .all()
            .iter()
            .map(|r| (r.repo_name.as_str(), r.ref_file.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "y.py"), ("a", "z.py"), ("b", "x.py")]);
    }

    #[test]
    fn test_lookup() {
        let index = ReferenceIndex::from_records(vec![
            record("a", "y.py", "1.md"),
            record("a", "y.py", "2.md"),
        ]);
        assert_eq!(index.lookup("y.py").len(), 2);
        assert!(index.lookup("missing.py").is_empty());
        assert_eq!(
            index.citing_paths("y.py"),
            vec!["machine-learning/1.md", "machine-learning/2.md"]
        );
    }

    #[test]
    fn test_handle_publish_swaps_whole_index() {
        let handle = IndexHandle::new(ReferenceIndex::from_records(vec![record("a", "old.py", "1.md")]));
        let before = handle.snapshot();

        handle.publish(ReferenceIndex::from_records(vec![record("a", "new.py", "1.md")]));
        let after = handle.snapshot();

        assert!(before.is_referenced("old.py"));
        assert!(!after.is_referenced("old.py"));
        assert!(after.is_referenced("new.py"));
    }

    #[test]
    fn test_build_reference_index() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("articles/machine-learning");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("how-to.md"),
            "```python\n[!code-python[](~/azureml-examples-main/sdk/train.py)]\n```\n\
             (~/azureml-examples-v2/sdk/old.py)\n```bash\nunterminated\n",
        )
        .unwrap();

        let docs = DocsConfig::default();
        let tokens = vec!["azureml-examples".to_string()];
        let settings = ScanSettings {
            docs_root: temp.path(),
            tokens: &tokens,
            docs: &docs,
        };
        let roots = vec![SearchRoot {
            path: "articles/machine-learning".into(),
            recursive: false,
        }];

        let build = build_reference_index(&roots, &[], &settings);

        assert_eq!(build.documents_scanned, 1);
        assert_eq!(build.index.len(), 1);
        assert_eq!(build.index.all()[0].ref_file, "sdk/train.py");
        assert_eq!(build.index.all()[0].from_file, "how-to.md");
        assert_eq!(build.code_blocks.len(), 1);
        assert_eq!(build.code_blocks[0].language_tag, "python");
        assert_eq!(build.code_blocks[0].path_category, "machine-learning");
        assert_eq!(build.unterminated_blocks, 1);
        assert_eq!(build.branch_usage["azureml-examples"].len(), 2);
    }
}
