//! PR Change Classifier
//!
//! Maps host file entries onto [`ChangeStatus`] and checks them against the
//! reference index. Added files never matter; deleted and renamed files are
//! matched directly (renames by their old path); modified files are matched
//! and handed on for cell diffing.

use tracing::warn;

use crate::github::{HostApi, RawFileChange};
use crate::index::ReferenceIndex;
use crate::types::{ChangeStatus, PrFileChange, ReferencedFile, RepoRef, Result};

/// Map host entries, treating unknown statuses as modified
pub fn normalize_changes(raw: Vec<RawFileChange>) -> Vec<PrFileChange> {
    raw.into_iter()
        .map(|entry| {
            let status = ChangeStatus::from_host(&entry.status).unwrap_or_else(|| {
                warn!(
                    file = %entry.filename,
                    status = %entry.status,
                    "Unknown change status, treating as modified"
                );
                ChangeStatus::Modified
            });
            PrFileChange {
                filename: entry.filename,
                status,
                blob_ref: entry.blob_url,
                previous_filename: entry.previous_filename,
            }
        })
        .collect()
}

/// Fetch and normalize a PR's file list
pub async fn fetch_changes(host: &dyn HostApi, repo: &RepoRef, number: u64) -> Result<Vec<PrFileChange>> {
    let raw = host.list_pr_files(repo, number).await?;
    Ok(normalize_changes(raw))
}

/// A modified file with the documents citing it (possibly none)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedFile {
    pub change: PrFileChange,
    pub referenced_in: Vec<String>,
}

impl ModifiedFile {
    pub fn is_referenced(&self) -> bool {
        !self.referenced_in.is_empty()
    }
}

/// A PR's changes bucketed by status, in file-list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeClassification {
    pub added: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub deleted_referenced: Vec<ReferencedFile>,
    pub renamed_referenced: Vec<ReferencedFile>,
    pub modified: Vec<ModifiedFile>,
}

impl ChangeClassification {
    pub fn modified_referenced(&self) -> impl Iterator<Item = &ModifiedFile> {
        self.modified.iter().filter(|m| m.is_referenced())
    }
}

pub fn classify(changes: &[PrFileChange], index: &ReferenceIndex) -> ChangeClassification {
    let mut result = ChangeClassification::default();

    for change in changes {
        match change.status {
            ChangeStatus::Added => result.added += 1,
            ChangeStatus::Deleted => {
                result.deleted += 1;
                if let Some(hit) = referenced(index, change.lookup_path()) {
                    result.deleted_referenced.push(hit);
                }
            }
            ChangeStatus::Renamed => {
                result.renamed += 1;
                if let Some(hit) = referenced(index, change.lookup_path()) {
                    result.renamed_referenced.push(hit);
                }
            }
            ChangeStatus::Modified => result.modified.push(ModifiedFile {
                change: change.clone(),
                referenced_in: index.citing_paths(&change.filename),
            }),
        }
    }

    result
}

fn referenced(index: &ReferenceIndex, path: &str) -> Option<ReferencedFile> {
    let referenced_in = index.citing_paths(path);
    (!referenced_in.is_empty()).then(|| ReferencedFile {
        file: path.to_string(),
        referenced_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceRecord;

    fn raw(filename: &str, status: &str, previous: Option<&str>) -> RawFileChange {
        RawFileChange {
            filename: filename.into(),
            status: status.into(),
            blob_url: Some(format!("https://github.com/o/r/blob/sha/{}", filename)),
            previous_filename: previous.map(String::from),
        }
    }

    fn index(files: &[&str]) -> ReferenceIndex {
        ReferenceIndex::from_records(
            files
                .iter()
                .map(|f| ReferenceRecord {
                    ref_file: f.to_string(),
                    from_file: "how-to.md".into(),
                    repo_name: "azureml-examples".into(),
                    from_file_dir: "machine-learning".into(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_normalize_unknown_status_as_modified() {
        let changes = normalize_changes(vec![
            raw("a.py", "removed", None),
            raw("b.py", "copied", None),
        ]);
        assert_eq!(changes[0].status, ChangeStatus::Deleted);
        assert_eq!(changes[1].status, ChangeStatus::Modified);
        assert!(changes[0].blob_ref.is_some());
    }

    #[test]
    fn test_added_files_never_flagged() {
        let changes = normalize_changes(vec![raw("sdk/train.py", "added", None)]);
        let result = classify(&changes, &index(&["sdk/train.py"]));
        assert_eq!(result.added, 1);
        assert!(result.deleted_referenced.is_empty());
        assert!(result.modified.is_empty());
    }

    #[test]
    fn test_deleted_and_renamed_matched_by_path() {
        let changes = normalize_changes(vec![
            raw("legacy/sample.py", "removed", None),
            raw("new/place.py", "renamed", Some("old/place.py")),
            raw("unreferenced.py", "removed", None),
        ]);
        let result = classify(&changes, &index(&["legacy/sample.py", "old/place.py"]));

        assert_eq!(result.deleted, 2);
        assert_eq!(result.deleted_referenced.len(), 1);
        assert_eq!(result.deleted_referenced[0].file, "legacy/sample.py");
        assert_eq!(
            result.deleted_referenced[0].referenced_in,
            vec!["machine-learning/how-to.md"]
        );
        assert_eq!(result.renamed_referenced[0].file, "old/place.py");
    }

    #[test]
    fn test_modified_keeps_unreferenced_files() {
        let changes = normalize_changes(vec![
            raw("a.ipynb", "modified", None),
            raw("b.py", "modified", None),
        ]);
        let result = classify(&changes, &index(&["b.py"]));

        assert_eq!(result.modified.len(), 2);
        let referenced: Vec<_> = result
            .modified_referenced()
            .map(|m| m.change.filename.as_str())
            .collect();
        assert_eq!(referenced, vec!["b.py"]);
    }
}
