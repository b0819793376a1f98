//! Cell Diff Analyzer
//!
//! Compares the named units of a file at the PR base and head. Only exact id
//! matching is used: a unit whose surrounding content changed heavily but
//! kept its id is not a deletion.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::cells::{extract_units, validate_notebook};
use crate::github::HostApi;
use crate::types::{CellDiffResult, CellUnit, FileKind, GuardError, PrFileChange, RepoRef, Result};

/// Set difference of unit ids between two versions
pub fn diff_units(before: &[CellUnit], after: &[CellUnit]) -> CellDiffResult {
    let before: BTreeSet<&str> = before.iter().map(|u| u.id.as_str()).collect();
    let after: BTreeSet<&str> = after.iter().map(|u| u.id.as_str()).collect();

    CellDiffResult {
        added: after.difference(&before).map(|s| s.to_string()).collect(),
        deleted: before.difference(&after).map(|s| s.to_string()).collect(),
    }
}

/// Content of a modified file at both ends of the PR
#[derive(Debug, Clone)]
pub struct FileVersions {
    pub before: String,
    pub after: String,
}

/// Outcome of examining one modified file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedFileReport {
    /// Head version failed notebook validation
    pub malformed: Option<String>,
    /// Unit diff, when one was computed
    pub diff: Option<CellDiffResult>,
    /// Either version contained named units
    pub had_units: bool,
}

impl ModifiedFileReport {
    pub fn true_deletions(&self) -> Vec<String> {
        self.diff
            .as_ref()
            .map(CellDiffResult::true_deletions)
            .unwrap_or_default()
    }
}

/// Validate and diff already-fetched content. `before` is `None` when the
/// file is not referenced and only the head needs checking.
pub fn examine(path: &str, after: &str, before: Option<&str>) -> ModifiedFileReport {
    let mut report = ModifiedFileReport::default();

    if FileKind::of(path) == FileKind::Notebook
        && let Err(e) = validate_notebook(path, after)
    {
        report.malformed = Some(malformed_message(e));
    }

    let Some(before) = before else {
        return report;
    };
    if report.malformed.is_some() {
        return report;
    }

    let after_units = match extract_units(path, after) {
        Ok(units) => units,
        Err(e) => {
            report.malformed = Some(malformed_message(e));
            return report;
        }
    };
    let before_units = extract_units(path, before).unwrap_or_else(|e| {
        warn!(file = path, error = %e, "Base version has no readable units");
        Vec::new()
    });

    report.had_units = !before_units.is_empty() || !after_units.is_empty();
    let diff = diff_units(&before_units, &after_units);
    debug!(
        file = path,
        added = diff.added.len(),
        deleted = diff.deleted.len(),
        "Cell diff"
    );
    report.diff = Some(diff);
    report
}

/// Fetch what `examine` needs for one modified file.
///
/// The head is needed for notebooks (validation) and for referenced files;
/// the base only for referenced files.
pub async fn fetch_versions(
    host: &dyn HostApi,
    repo: &RepoRef,
    change: &PrFileChange,
    base_sha: &str,
    head_sha: &str,
    referenced: bool,
) -> Result<Option<FileVersions>> {
    if !referenced && !change.is_notebook() {
        return Ok(None);
    }

    let after = host.get_file_content(repo, &change.filename, head_sha).await?;
    let before = if referenced {
        host.get_file_content(repo, &change.filename, base_sha).await?
    } else {
        String::new()
    };

    Ok(Some(FileVersions { before, after }))
}

fn malformed_message(err: GuardError) -> String {
    match err {
        GuardError::MalformedContent { message, .. } => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellKind;
    use serde_json::json;

    fn unit(id: &str) -> CellUnit {
        CellUnit {
            id: id.into(),
            kind: CellKind::TaggedRegion,
        }
    }

    fn notebook(names: &[&str]) -> String {
        let cells: Vec<_> = names
            .iter()
            .map(|n| json!({ "cell_type": "code", "metadata": { "name": n }, "source": [] }))
            .collect();
        json!({ "metadata": {}, "nbformat": 4, "cells": cells }).to_string()
    }

    #[test]
    fn test_diff_units() {
        let diff = diff_units(&[unit("a"), unit("b")], &[unit("b"), unit("c")]);
        assert_eq!(diff.added, BTreeSet::from(["c".to_string()]));
        assert_eq!(diff.deleted, BTreeSet::from(["a".to_string()]));
        assert_eq!(diff.true_deletions(), vec!["a"]);
    }

    #[test]
    fn test_examine_detects_deleted_notebook_cell() {
        let before = notebook(&["setup", "train-step"]);
        let after = notebook(&["setup"]);
        let report = examine("tutorials/model.ipynb", &after, Some(&before));

        assert!(report.malformed.is_none());
        assert!(report.had_units);
        assert_eq!(report.true_deletions(), vec!["train-step"]);
    }

    #[test]
    fn test_examine_malformed_head_skips_diff() {
        let before = notebook(&["train-step"]);
        let report = examine("model.ipynb", r#"{"metadata": {}}"#, Some(&before));

        assert!(report.malformed.is_some());
        assert!(report.diff.is_none());
    }

    #[test]
    fn test_examine_unreferenced_notebook_only_validates() {
        let report = examine("model.ipynb", &notebook(&["a"]), None);
        assert_eq!(report, ModifiedFileReport::default());
    }

    #[test]
    fn test_examine_code_regions() {
        let before = "# <a>\nx\n# </a>\n# <b>\n";
        let after = "# <b>\n# <c>\n";
        let report = examine("cli/run.py", after, Some(before));
        assert_eq!(report.true_deletions(), vec!["a"]);
    }

    #[test]
    fn test_examine_malformed_base_counts_as_empty() {
        let report = examine("model.ipynb", &notebook(&["a"]), Some("garbage"));
        assert!(report.malformed.is_none());
        assert!(report.true_deletions().is_empty());
    }
}
