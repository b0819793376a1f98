//! Snippet reference matcher.
//!
//! Recognizes two reference forms rooted at a repository token:
//!
//! - `(~/<token>...)`: a parenthesized include, ended by the first `)`
//! - `source="~/<token>..."`: a quoted attribute, ended by the next `"`
//!
//! The text after `~/` is `<branch>/<ref_file>[?query][#fragment]`. Only
//! references on the `<token>-main` branch become records; every branch seen
//! is counted for diagnostics.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::DocsConfig;
use crate::constants::scan::MAIN_BRANCH_SUFFIX;
use crate::types::ReferenceRecord;

/// Which of the two reference forms matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Include,
    SourceAttribute,
}

impl PatternKind {
    fn opener(self) -> &'static str {
        match self {
            Self::Include => "(~/",
            Self::SourceAttribute => "source=\"~/",
        }
    }

    fn terminator(self) -> char {
        match self {
            Self::Include => ')',
            Self::SourceAttribute => '"',
        }
    }
}

/// One reference found on a line, before branch filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetMatch<'a> {
    pub kind: PatternKind,
    /// Full matched text, including opener and terminator
    pub raw: &'a str,
    pub branch: &'a str,
    pub ref_file: String,
    /// `name=` / `id=` query value naming a cell inside the file
    pub cell_name: Option<String>,
}

/// Branch name → number of references seen, per repository token
pub type BranchUsage = BTreeMap<String, BTreeMap<String, usize>>;

/// Find every reference to `token` on `line`, left to right.
pub fn find_matches<'a>(line: &'a str, token: &str) -> Vec<SnippetMatch<'a>> {
    let include = format!("{}{}", PatternKind::Include.opener(), token);
    let source = format!("{}{}", PatternKind::SourceAttribute.opener(), token);

    let mut matches = Vec::new();
    let mut pos = 0;

    while pos < line.len() {
        let rest = &line[pos..];
        let next = [
            (PatternKind::Include, rest.find(&include)),
            (PatternKind::SourceAttribute, rest.find(&source)),
        ]
        .into_iter()
        .filter_map(|(kind, idx)| idx.map(|i| (i, kind)))
        .min_by_key(|(i, _)| *i);

        let Some((offset, kind)) = next else {
            break;
        };

        let start = pos + offset;
        let body_start = start + kind.opener().len();
        let opener_len = kind.opener().len() + token.len();

        match line[start + opener_len..].find(kind.terminator()) {
            Some(end_offset) => {
                let end = start + opener_len + end_offset;
                if let Some(m) = split_match(kind, &line[start..=end], &line[body_start..end]) {
                    matches.push(m);
                }
                pos = end + 1;
            }
            // Unterminated candidate: not a match, keep looking past its first byte
            None => pos = start + 1,
        }
    }

    matches
}

fn split_match<'a>(kind: PatternKind, raw: &'a str, inner: &'a str) -> Option<SnippetMatch<'a>> {
    let (branch, path) = inner.split_once('/')?;
    let (file_part, query) = match path.find(['?', '#']) {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (path, ""),
    };

    let mut ref_file = file_part.trim().to_string();
    if let Some(paren) = ref_file.find('(') {
        warn!(raw, "Snippet reference contains '(', truncating");
        ref_file.truncate(paren);
        ref_file = ref_file.trim().to_string();
    }

    if ref_file.is_empty() {
        return None;
    }

    Some(SnippetMatch {
        kind,
        raw,
        branch,
        ref_file,
        cell_name: cell_name(query),
    })
}

fn cell_name(query: &str) -> Option<String> {
    query
        .split(['&', '#'])
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| matches!(*key, "name" | "id"))
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Document-level extraction
// =============================================================================

/// Split a document path into (`from_file`, `from_file_dir`).
///
/// The directory is the path with the docs root prefix and the file name
/// removed. When the prefix is absent the directory falls back to a coarse
/// category chosen by path substring, which can misclassify.
pub fn document_location(path: &str, docs: &DocsConfig) -> (String, String) {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    };

    let from_file_dir = match path.find(docs.root_prefix.as_str()) {
        Some(idx) if !docs.root_prefix.is_empty() => {
            let after = idx + docs.root_prefix.len();
            dir.get(after..).unwrap_or("").to_string()
        }
        _ => docs.category_for(path).to_string(),
    };

    (file.to_string(), from_file_dir)
}

/// Extracts reference records from documents for a fixed set of tokens
pub struct ReferenceExtractor<'a> {
    tokens: &'a [String],
    docs: &'a DocsConfig,
}

impl<'a> ReferenceExtractor<'a> {
    pub fn new(tokens: &'a [String], docs: &'a DocsConfig) -> Self {
        Self { tokens, docs }
    }

    /// Records for one document. `path` is relative to the docs checkout.
    pub fn extract(&self, path: &str, content: &str, usage: &mut BranchUsage) -> Vec<ReferenceRecord> {
        let (from_file, from_file_dir) = document_location(path, self.docs);
        let mut records = Vec::new();

        for line in content.lines() {
            for token in self.tokens {
                let main_branch = format!("{}{}", token, MAIN_BRANCH_SUFFIX);
                for m in find_matches(line, token) {
                    *usage
                        .entry(token.clone())
                        .or_default()
                        .entry(m.branch.to_string())
                        .or_insert(0) += 1;

                    if m.branch == main_branch {
                        if let Some(cell) = &m.cell_name {
                            debug!(file = %path, ref_file = %m.ref_file, cell = %cell, "Cell reference");
                        }
                        records.push(ReferenceRecord {
                            ref_file: m.ref_file,
                            from_file: from_file.clone(),
                            repo_name: token.clone(),
                            from_file_dir: from_file_dir.clone(),
                        });
                    }
                }
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "azureml-examples";

    #[test]
    fn test_include_pattern() {
        let line = "[!notebook-python[] (~/azureml-examples-main/tutorials/model.ipynb?name=train-step)]";
        let matches = find_matches(line, TOKEN);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, PatternKind::Include);
        assert_eq!(matches[0].branch, "azureml-examples-main");
        assert_eq!(matches[0].ref_file, "tutorials/model.ipynb");
        assert_eq!(matches[0].cell_name.as_deref(), Some("train-step"));
    }

    #[test]
    fn test_source_attribute_pattern() {
        let line = r#":::code language="python" source="~/azureml-examples-main/sdk/train.py" id="load":::"#;
        let matches = find_matches(line, TOKEN);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, PatternKind::SourceAttribute);
        assert_eq!(matches[0].ref_file, "sdk/train.py");
        assert_eq!(matches[0].raw, r#"source="~/azureml-examples-main/sdk/train.py""#);
    }

    #[test]
    fn test_multiple_matches_left_to_right() {
        let line = "(~/azureml-examples-main/a.py) and (~/azureml-examples-v1/b.py)";
        let matches = find_matches(line, TOKEN);
        let files: Vec<_> = matches.iter().map(|m| m.ref_file.as_str()).collect();
        assert_eq!(files, vec!["a.py", "b.py"]);
        assert_eq!(matches[1].branch, "azureml-examples-v1");
    }

    #[test]
    fn test_unterminated_candidate_is_not_a_match() {
        let line = "(~/azureml-examples-main/a.py and source=\"~/azureml-examples-main/b.py\"";
        let matches = find_matches(line, TOKEN);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].ref_file, "b.py");
    }

    #[test]
    fn test_open_paren_is_truncated() {
        let line = r#"source="~/azureml-examples-main/cli/run(old).sh""#;
        let matches = find_matches(line, TOKEN);
        assert_eq!(matches[0].ref_file, "cli/run");
    }

    #[test]
    fn test_empty_ref_file_is_dropped() {
        assert!(find_matches("(~/azureml-examples-main/)", TOKEN).is_empty());
        assert!(find_matches("(~/azureml-examples-main)", TOKEN).is_empty());
    }

    #[test]
    fn test_other_tokens_ignored() {
        assert!(find_matches("(~/other-repo-main/a.py)", TOKEN).is_empty());
    }

    #[test]
    fn test_document_location_with_prefix() {
        let docs = DocsConfig::default();
        let (file, dir) = document_location("articles/ai-foundry/includes/create.md", &docs);
        assert_eq!(file, "create.md");
        assert_eq!(dir, "ai-foundry/includes");
    }

    #[test]
    fn test_document_directly_under_prefix_has_empty_dir() {
        let docs = DocsConfig::default();
        let (file, dir) = document_location("articles/overview.md", &docs);
        assert_eq!(file, "overview.md");
        assert_eq!(dir, "");
    }

    #[test]
    fn test_document_location_category_fallback() {
        let docs = DocsConfig::default();
        assert_eq!(document_location("docs/ai-foundry/x.md", &docs).1, "ai-foundry");
        assert_eq!(document_location("docs/other/x.md", &docs).1, "machine-learning");
    }

    #[test]
    fn test_extract_keeps_only_main_branch() {
        let docs = DocsConfig::default();
        let tokens = vec![TOKEN.to_string()];
        let extractor = ReferenceExtractor::new(&tokens, &docs);
        let content = "(~/azureml-examples-main/a.py)\n(~/azureml-examples-v1/b.py)\n(~/azureml-examples-main/c.py)";

        let mut usage = BranchUsage::new();
        let records = extractor.extract("articles/machine-learning/how-to.md", content, &mut usage);

        let files: Vec<_> = records.iter().map(|r| r.ref_file.as_str()).collect();
        assert_eq!(files, vec!["a.py", "c.py"]);
        assert!(records.iter().all(|r| r.repo_name == TOKEN));
        assert_eq!(records[0].from_file_dir, "machine-learning");
        assert_eq!(usage[TOKEN]["azureml-examples-main"], 2);
        assert_eq!(usage[TOKEN]["azureml-examples-v1"], 1);
    }
}
