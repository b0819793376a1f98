//! Pull request file changes and cell units.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Four-way change status of a file in a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeStatus {
    /// Map a host status string. Returns `None` for statuses outside the
    /// known vocabulary so the caller can decide how to treat them.
    pub fn from_host(status: &str) -> Option<Self> {
        match status {
            "added" => Some(Self::Added),
            "modified" => Some(Self::Modified),
            "removed" | "deleted" => Some(Self::Deleted),
            "renamed" => Some(Self::Renamed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Renamed => write!(f, "renamed"),
        }
    }
}

/// One entry of a pull request's file list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrFileChange {
    pub filename: String,
    pub status: ChangeStatus,
    /// Browser link to the file at the PR head
    pub blob_ref: Option<String>,
    /// Path before the rename (renamed entries only)
    pub previous_filename: Option<String>,
}

impl PrFileChange {
    /// The path to look up in the reference index: renamed entries are
    /// looked up by their old path since that is what docs cite.
    pub fn lookup_path(&self) -> &str {
        match self.status {
            ChangeStatus::Renamed => self
                .previous_filename
                .as_deref()
                .unwrap_or(&self.filename),
            _ => &self.filename,
        }
    }

    pub fn is_notebook(&self) -> bool {
        FileKind::of(&self.filename) == FileKind::Notebook
    }
}

/// How cell units are extracted from a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Notebook,
    Code,
}

impl FileKind {
    pub fn of(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".ipynb") {
            Self::Notebook
        } else {
            Self::Code
        }
    }
}

/// Kind of a named, addressable region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    NotebookCell,
    TaggedRegion,
}

/// A named region of one file version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellUnit {
    pub id: String,
    pub kind: CellKind,
}

/// Set difference of cell ids between two versions of a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDiffResult {
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl CellDiffResult {
    /// Units removed and not reintroduced under the same id
    pub fn true_deletions(&self) -> Vec<String> {
        self.deleted.difference(&self.added).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_host() {
        assert_eq!(ChangeStatus::from_host("added"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_host("removed"), Some(ChangeStatus::Deleted));
        assert_eq!(ChangeStatus::from_host("renamed"), Some(ChangeStatus::Renamed));
        assert_eq!(ChangeStatus::from_host("copied"), None);
    }

    #[test]
    fn test_lookup_path_uses_previous_name_for_renames() {
        let change = PrFileChange {
            filename: "new/place.py".into(),
            status: ChangeStatus::Renamed,
            blob_ref: None,
            previous_filename: Some("old/place.py".into()),
        };
        assert_eq!(change.lookup_path(), "old/place.py");
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::of("tutorials/model.ipynb"), FileKind::Notebook);
        assert_eq!(FileKind::of("Train.IPYNB"), FileKind::Notebook);
        assert_eq!(FileKind::of("cli/train.py"), FileKind::Code);
    }

    #[test]
    fn test_true_deletions_ignore_reintroduced_ids() {
        let diff = CellDiffResult {
            added: ["b".to_string()].into(),
            deleted: ["a".to_string(), "b".to_string()].into(),
        };
        assert_eq!(diff.true_deletions(), vec!["a".to_string()]);
    }
}
