//! Safety Decision Engine
//!
//! `decide` is a pure function from classified changes and per-file findings
//! to a [`SafetyVerdict`]. `PrAnalyzer` gathers those inputs from the host and
//! never fails: any fetch error ends up as an `AnalysisError` issue.

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::classifier::{ChangeClassification, ModifiedFile, classify, fetch_changes};
use super::diff::{ModifiedFileReport, examine, fetch_versions};
use crate::constants::api::MAX_CONCURRENCY;
use crate::github::{HostApi, PullRequest, SharedHost};
use crate::index::ReferenceIndex;
use crate::types::{
    DeletedCells, Issue, IssueKind, NotebookError, ReferencedFile, RepoRef, Result,
    SafetyVerdict,
};

/// What happened when one modified file was examined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFinding {
    /// Not referenced and not a notebook, nothing to fetch
    Skipped,
    Examined(ModifiedFileReport),
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedOutcome {
    pub file: ModifiedFile,
    pub finding: FileFinding,
}

/// Build the verdict. Issues are grouped by kind in precedence order,
/// each group in file-list order.
pub fn decide(classification: &ChangeClassification, outcomes: &[ModifiedOutcome]) -> SafetyVerdict {
    let mut verdict = SafetyVerdict::default();
    let mut malformed = Vec::new();
    let mut cell_deletions = Vec::new();
    let mut fetch_failures = Vec::new();

    for outcome in outcomes {
        let change = &outcome.file.change;
        let is_notebook = change.is_notebook();

        match &outcome.finding {
            FileFinding::Skipped => {}
            FileFinding::FetchFailed(message) => {
                fetch_failures.push(Issue::new(
                    IssueKind::AnalysisError,
                    &change.filename,
                    message,
                ));
            }
            FileFinding::Examined(report) => {
                if let Some(message) = &report.malformed {
                    malformed.push(Issue::new(
                        IssueKind::MalformedContent,
                        &change.filename,
                        message,
                    ));
                    verdict.notebook_errors.push(NotebookError {
                        file: change.filename.clone(),
                        message: message.clone(),
                    });
                }

                let deleted = report.true_deletions();
                if !deleted.is_empty() {
                    cell_deletions.push(Issue::new(
                        IssueKind::DeletedCells,
                        &change.filename,
                        deleted.join(", "),
                    ));
                    verdict.deleted_cells.push(DeletedCells {
                        file: change.filename.clone(),
                        cells: deleted,
                        referenced_in: outcome.file.referenced_in.clone(),
                    });
                }

                if !is_notebook && report.had_units && outcome.file.is_referenced() {
                    verdict.notebooks_to_review.push(review_link(&outcome.file));
                }
            }
        }

        if is_notebook {
            verdict.notebooks_to_review.push(review_link(&outcome.file));
        }
    }

    verdict.issues.extend(malformed);
    verdict.issues.extend(cell_deletions);
    verdict
        .issues
        .extend(referenced_issues(IssueKind::DeletedReferencedFile, &classification.deleted_referenced));
    verdict
        .issues
        .extend(referenced_issues(IssueKind::RenamedReferencedFile, &classification.renamed_referenced));
    verdict.issues.extend(fetch_failures);

    verdict.deleted_referenced = classification.deleted_referenced.clone();
    verdict.renamed_referenced = classification.renamed_referenced.clone();
    verdict.safe = verdict.issues.is_empty();
    verdict
}

fn referenced_issues(kind: IssueKind, files: &[ReferencedFile]) -> impl Iterator<Item = Issue> + '_ {
    files
        .iter()
        .map(move |f| Issue::new(kind, &f.file, f.referenced_in.join(", ")))
}

fn review_link(file: &ModifiedFile) -> String {
    file.change
        .blob_ref
        .clone()
        .unwrap_or_else(|| file.change.filename.clone())
}

// =============================================================================
// PR Analyzer
// =============================================================================

/// Analyzes pull requests against a reference index.
///
/// Modified files of one PR are fetched with bounded concurrency; results
/// keep file-list order.
pub struct PrAnalyzer {
    host: SharedHost,
    concurrency: usize,
}

impl PrAnalyzer {
    pub fn new(host: SharedHost) -> Self {
        Self {
            host,
            concurrency: MAX_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub async fn analyze(&self, repo: &RepoRef, number: u64, index: &ReferenceIndex) -> SafetyVerdict {
        match self.try_analyze(repo, number, index).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(repo = %repo, pr = number, error = %e, "PR analysis failed");
                SafetyVerdict::analysis_failed(format!("{}#{}", repo, number), e)
            }
        }
    }

    async fn try_analyze(
        &self,
        repo: &RepoRef,
        number: u64,
        index: &ReferenceIndex,
    ) -> Result<SafetyVerdict> {
        let pr = self.host.get_pull_request(repo, number).await?;
        let changes = fetch_changes(self.host.as_ref(), repo, number).await?;
        let classification = classify(&changes, index);
        debug!(
            repo = %repo,
            pr = number,
            files = changes.len(),
            added = classification.added,
            deleted = classification.deleted,
            renamed = classification.renamed,
            modified = classification.modified.len(),
            "Classified PR changes"
        );

        let outcomes = self.examine_modified(repo, &pr, &classification.modified).await;
        let verdict = decide(&classification, &outcomes);

        info!(
            repo = %repo,
            pr = number,
            safe = verdict.safe,
            issues = verdict.issues.len(),
            "PR analyzed"
        );
        Ok(verdict)
    }

    async fn examine_modified(
        &self,
        repo: &RepoRef,
        pr: &PullRequest,
        modified: &[ModifiedFile],
    ) -> Vec<ModifiedOutcome> {
        let host: &dyn HostApi = self.host.as_ref();

        futures::stream::iter(modified.iter().cloned())
            .map(|file| async move {
                let referenced = file.is_referenced();
                let fetched = fetch_versions(
                    host,
                    repo,
                    &file.change,
                    &pr.base_sha,
                    &pr.head_sha,
                    referenced,
                )
                .await;

                let finding = match fetched {
                    Ok(None) => FileFinding::Skipped,
                    Ok(Some(versions)) => FileFinding::Examined(examine(
                        &file.change.filename,
                        &versions.after,
                        referenced.then_some(versions.before.as_str()),
                    )),
                    Err(e) => {
                        warn!(file = %file.change.filename, error = %e, "Failed to fetch file versions");
                        FileFinding::FetchFailed(e.to_string())
                    }
                };
                ModifiedOutcome { file, finding }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Analyze one PR with default concurrency
pub async fn analyze_pr(
    host: SharedHost,
    repo: &RepoRef,
    number: u64,
    index: &ReferenceIndex,
) -> SafetyVerdict {
    PrAnalyzer::new(host).analyze(repo, number, index).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{FakeHost, change, pull};
    use crate::types::ReferenceRecord;
    use serde_json::json;
    use std::sync::Arc;

    fn repo() -> RepoRef {
        RepoRef::new("Azure", "azureml-examples")
    }

    fn index(files: &[&str]) -> ReferenceIndex {
        ReferenceIndex::from_records(
            files
                .iter()
                .map(|f| ReferenceRecord {
                    ref_file: f.to_string(),
                    from_file: "how-to-train.md".into(),
                    repo_name: "azureml-examples".into(),
                    from_file_dir: "machine-learning".into(),
                })
                .collect(),
        )
    }

    fn notebook(names: &[&str]) -> String {
        let cells: Vec<_> = names
            .iter()
            .map(|n| json!({ "cell_type": "code", "metadata": { "name": n }, "source": [] }))
            .collect();
        json!({ "metadata": {}, "nbformat": 4, "cells": cells }).to_string()
    }

    async fn run(host: FakeHost, idx: &ReferenceIndex) -> SafetyVerdict {
        analyze_pr(Arc::new(host), &repo(), 7, idx).await
    }

    #[tokio::test]
    async fn test_deleted_notebook_cell_blocks() {
        let path = "tutorials/model.ipynb";
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(&repo(), 7, vec![change(path, "modified")])
            .with_content(path, "base", notebook(&["setup", "train-step"]))
            .with_content(path, "head", notebook(&["setup"]));

        let verdict = run(host, &index(&[path])).await;

        assert!(!verdict.safe);
        assert_eq!(verdict.issues.len(), 1);
        assert_eq!(
            verdict.issues[0].summary(),
            "Modified file has deleted cells: tutorials/model.ipynb"
        );
        assert!(verdict.issues[0].detail.contains("train-step"));
        assert_eq!(verdict.deleted_cells[0].cells, vec!["train-step"]);
        assert_eq!(
            verdict.deleted_cells[0].referenced_in,
            vec!["machine-learning/how-to-train.md"]
        );
    }

    #[tokio::test]
    async fn test_only_added_files_is_safe() {
        let host = FakeHost::new().with_pull(&repo(), pull(7, 1)).with_files(
            &repo(),
            7,
            vec![change("new/a.py", "added"), change("new/b.ipynb", "added")],
        );

        let verdict = run(host, &index(&["new/a.py"])).await;

        assert!(verdict.safe);
        assert!(verdict.issues.is_empty());
        assert!(verdict.notebooks_to_review.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_referenced_file_blocks() {
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(&repo(), 7, vec![change("legacy/sample.py", "removed")]);

        let verdict = run(host, &index(&["legacy/sample.py"])).await;

        assert!(!verdict.safe);
        assert_eq!(
            verdict.issue_summaries(),
            vec!["Deleted file is referenced: legacy/sample.py"]
        );
        assert_eq!(verdict.deleted_referenced[0].file, "legacy/sample.py");
    }

    #[tokio::test]
    async fn test_malformed_notebook_blocks_without_reference() {
        let path = "tutorials/broken.ipynb";
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(&repo(), 7, vec![change(path, "modified")])
            .with_content(path, "head", r#"{"metadata": {}, "nbformat": 4}"#);

        let verdict = run(host, &index(&[])).await;

        assert!(!verdict.safe);
        assert_eq!(verdict.issues[0].kind, IssueKind::MalformedContent);
        assert_eq!(verdict.issues[0].kind.to_string(), "MalformedContentError");
        assert_eq!(verdict.notebook_errors.len(), 1);
        assert_eq!(
            verdict.notebooks_to_review,
            vec!["https://github.com/o/r/blob/head/tutorials/broken.ipynb"]
        );
    }

    #[tokio::test]
    async fn test_valid_modified_notebook_is_review_only() {
        let path = "tutorials/ok.ipynb";
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(&repo(), 7, vec![change(path, "modified")])
            .with_content(path, "head", notebook(&["a"]));

        let verdict = run(host, &index(&[])).await;

        assert!(verdict.safe);
        assert_eq!(verdict.notebooks_to_review.len(), 1);
    }

    #[tokio::test]
    async fn test_unreferenced_code_file_not_fetched() {
        // no content registered: fetching would fail
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(&repo(), 7, vec![change("cli/run.py", "modified")]);

        let verdict = run(host, &index(&[])).await;
        assert!(verdict.safe);
    }

    #[tokio::test]
    async fn test_file_fetch_failure_is_analysis_error() {
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(
                &repo(),
                7,
                vec![
                    change("cli/run.py", "modified"),
                    change("legacy/sample.py", "removed"),
                ],
            )
            .failing_path("cli/run.py");

        let verdict = run(host, &index(&["cli/run.py", "legacy/sample.py"])).await;

        assert!(!verdict.safe);
        let kinds: Vec<_> = verdict.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::DeletedReferencedFile, IssueKind::AnalysisError]
        );
        assert_eq!(verdict.issues[1].file, "cli/run.py");
    }

    #[tokio::test]
    async fn test_file_list_failure_yields_verdict() {
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .failing_file_list(7);

        let verdict = run(host, &index(&[])).await;

        assert!(!verdict.safe);
        assert_eq!(verdict.issues.len(), 1);
        assert_eq!(verdict.issues[0].kind, IssueKind::AnalysisError);
        assert_eq!(verdict.issues[0].file, "Azure/azureml-examples#7");
    }

    #[tokio::test]
    async fn test_issue_precedence_order() {
        let mut renamed = change("renamed/new.py", "renamed");
        renamed.previous_filename = Some("renamed/old.py".into());
        let host = FakeHost::new()
            .with_pull(&repo(), pull(7, 1))
            .with_files(
                &repo(),
                7,
                vec![
                    renamed,
                    change("gone.py", "removed"),
                    change("cli/run.py", "modified"),
                    change("bad.ipynb", "modified"),
                ],
            )
            .with_content("cli/run.py", "base", "# <a>\n# <b>\n")
            .with_content("cli/run.py", "head", "# <b>\n")
            .with_content("bad.ipynb", "head", "not json");

        let verdict = run(host, &index(&["renamed/old.py", "gone.py", "cli/run.py"])).await;

        let kinds: Vec<_> = verdict.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::MalformedContent,
                IssueKind::DeletedCells,
                IssueKind::DeletedReferencedFile,
                IssueKind::RenamedReferencedFile,
            ]
        );
        assert_eq!(verdict.issues[1].detail, "a");
        assert_eq!(verdict.issues[3].file, "renamed/old.py");
        // referenced code file with regions is listed for review too
        assert!(
            verdict
                .notebooks_to_review
                .iter()
                .any(|l| l.ends_with("cli/run.py"))
        );
    }

    #[test]
    fn test_decide_empty_is_safe() {
        let verdict = decide(&ChangeClassification::default(), &[]);
        assert!(verdict.safe);
    }

}
