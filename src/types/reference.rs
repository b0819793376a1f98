//! Reference and code-block records produced by the documentation scan.

use serde::{Deserialize, Serialize};

/// A documentation file citing a file in a code repository.
///
/// Field order is the persisted column order and the tie-break order used when
/// sorting beyond (repo_name, ref_file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Path of the referenced file inside the code repository
    pub ref_file: String,
    /// File name of the citing document
    pub from_file: String,
    /// Repository token the reference points into
    pub repo_name: String,
    /// Directory of the citing document, relative to the docs root prefix
    pub from_file_dir: String,
}

impl ReferenceRecord {
    /// `<from_file_dir>/<from_file>`, the form used when listing citing documents
    pub fn citing_path(&self) -> String {
        if self.from_file_dir.is_empty() {
            return self.from_file.clone();
        }
        format!("{}/{}", self.from_file_dir, self.from_file)
    }

    /// Deterministic ordering key: (repo_name, ref_file) first
    pub fn sort_key(&self) -> (&str, &str, &str, &str) {
        (
            &self.repo_name,
            &self.ref_file,
            &self.from_file,
            &self.from_file_dir,
        )
    }
}

/// A closed fenced code block found in a documentation file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// File name of the document
    pub file: String,
    /// Language tag from the opening fence (may be empty)
    pub language_tag: String,
    /// Number of lines between the fences
    pub line_count: usize,
    /// Coarse documentation area the file belongs to
    pub path_category: String,
}
