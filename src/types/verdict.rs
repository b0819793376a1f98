//! Safety verdict and the issues it is built from.

use serde::{Deserialize, Serialize};

/// Issue kinds, declared in report precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Notebook failed structural validation
    MalformedContent,
    /// A modified, referenced file lost named cells
    DeletedCells,
    /// A deleted file is referenced by documentation
    DeletedReferencedFile,
    /// A renamed file is referenced by documentation under its old path
    RenamedReferencedFile,
    /// Remote data for a file (or the whole PR) could not be fetched
    AnalysisError,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedContent => write!(f, "MalformedContentError"),
            Self::DeletedCells => write!(f, "DeletedCells"),
            Self::DeletedReferencedFile => write!(f, "DeletedReferencedFile"),
            Self::RenamedReferencedFile => write!(f, "RenamedReferencedFile"),
            Self::AnalysisError => write!(f, "AnalysisError"),
        }
    }
}

/// One problem found while analyzing a PR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub file: String,
    pub detail: String,
}

impl Issue {
    pub fn new(kind: IssueKind, file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
            detail: detail.into(),
        }
    }

    /// Headline used in comments and reports
    pub fn summary(&self) -> String {
        match self.kind {
            IssueKind::MalformedContent => format!("Notebook failed validation: {}", self.file),
            IssueKind::DeletedCells => format!("Modified file has deleted cells: {}", self.file),
            IssueKind::DeletedReferencedFile => format!("Deleted file is referenced: {}", self.file),
            IssueKind::RenamedReferencedFile => format!("Renamed file is referenced: {}", self.file),
            IssueKind::AnalysisError => format!("Analysis failed for {}", self.file),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.summary())
        } else {
            write!(f, "{} ({})", self.summary(), self.detail)
        }
    }
}

/// A changed file together with the documents citing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedFile {
    pub file: String,
    /// `<from_file_dir>/<from_file>` of every citing document
    pub referenced_in: Vec<String>,
}

/// Cells removed from a modified, referenced file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedCells {
    pub file: String,
    pub cells: Vec<String>,
    pub referenced_in: Vec<String>,
}

/// A modified notebook that failed structural validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookError {
    pub file: String,
    pub message: String,
}

/// Result of analyzing one PR. Built once by the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    pub issues: Vec<Issue>,
    pub deleted_referenced: Vec<ReferencedFile>,
    pub renamed_referenced: Vec<ReferencedFile>,
    pub notebook_errors: Vec<NotebookError>,
    pub deleted_cells: Vec<DeletedCells>,
    /// Non-blocking: modified notebooks whose links a human should check
    pub notebooks_to_review: Vec<String>,
}

impl SafetyVerdict {
    /// Verdict for a PR whose data could not be fetched at all
    pub fn analysis_failed(subject: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            safe: false,
            issues: vec![Issue::new(
                IssueKind::AnalysisError,
                subject,
                error.to_string(),
            )],
            ..Self::default()
        }
    }

    /// True when the verdict is the whole-PR failure built by
    /// [`SafetyVerdict::analysis_failed`] for `subject`
    pub fn is_analysis_failure(&self, subject: &str) -> bool {
        matches!(
            self.issues.as_slice(),
            [issue] if issue.kind == IssueKind::AnalysisError && issue.file == subject
        )
    }

    pub fn issue_summaries(&self) -> Vec<String> {
        self.issues.iter().map(Issue::summary).collect()
    }
}
