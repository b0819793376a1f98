//! Cell unit extraction.
//!
//! Notebooks are parsed as JSON: a cell's unit id is its `metadata.name`, or
//! its `id` when unnamed. Every other file is scanned for tagged region
//! markers: a comment leader followed by `<name>` on its own line.

use serde_json::Value;

use crate::types::{CellKind, CellUnit, FileKind, GuardError, Result};

/// Comment leaders that may introduce a region marker, longest first
const COMMENT_LEADERS: &[&str] = &["<!--", "REM", "//", "/*", "--", "#", ";", "%", "'"];

/// Units of one file version, chosen by file kind
pub fn extract_units(path: &str, content: &str) -> Result<Vec<CellUnit>> {
    match FileKind::of(path) {
        FileKind::Notebook => notebook_units(path, content),
        FileKind::Code => Ok(tagged_regions(content)),
    }
}

/// Check the notebook's top-level structure and return the parsed document
pub fn validate_notebook(path: &str, content: &str) -> Result<Value> {
    let doc: Value = serde_json::from_str(content)
        .map_err(|e| GuardError::malformed(path, format!("Invalid JSON: {}", e)))?;

    let Some(obj) = doc.as_object() else {
        return Err(GuardError::malformed(path, "Notebook is not a JSON object"));
    };
    if !obj.contains_key("cells") || !obj.contains_key("metadata") {
        return Err(GuardError::malformed(
            path,
            "Missing required notebook structure (cells/metadata)",
        ));
    }
    if !obj["cells"].is_array() {
        return Err(GuardError::malformed(path, "Notebook `cells` is not an array"));
    }

    Ok(doc)
}

pub fn notebook_units(path: &str, content: &str) -> Result<Vec<CellUnit>> {
    let doc = validate_notebook(path, content)?;
    let cells = doc["cells"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    Ok(cells
        .iter()
        .filter_map(|cell| {
            cell.pointer("/metadata/name")
                .and_then(Value::as_str)
                .or_else(|| cell.get("id").and_then(Value::as_str))
        })
        .filter(|id| !id.is_empty())
        .map(|id| CellUnit {
            id: id.to_string(),
            kind: CellKind::NotebookCell,
        })
        .collect())
}

pub fn tagged_regions(content: &str) -> Vec<CellUnit> {
    content
        .lines()
        .filter_map(region_marker)
        .map(|name| CellUnit {
            id: name.to_string(),
            kind: CellKind::TaggedRegion,
        })
        .collect()
}

/// Name of an opening region marker on this line, if any
fn region_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = COMMENT_LEADERS
        .iter()
        .find_map(|leader| trimmed.strip_prefix(leader))?;

    let rest = rest.trim_start().strip_prefix('<')?;
    let end = rest.find('>')?;
    let name = &rest[..end];

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    valid.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(units: &[CellUnit]) -> Vec<&str> {
        units.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_notebook_units_prefer_metadata_name() {
        let nb = json!({
            "metadata": {},
            "cells": [
                { "id": "abc123", "metadata": { "name": "train-step" } },
                { "id": "def456", "metadata": {} },
                { "metadata": {} }
            ]
        })
        .to_string();

        let units = notebook_units("model.ipynb", &nb).unwrap();
        assert_eq!(ids(&units), vec!["train-step", "def456"]);
        assert!(units.iter().all(|u| u.kind == CellKind::NotebookCell));
    }

    #[test]
    fn test_notebook_missing_cells_is_malformed() {
        let err = validate_notebook("model.ipynb", r#"{"metadata": {}}"#).unwrap_err();
        assert!(matches!(err, GuardError::MalformedContent { .. }));
    }

    #[test]
    fn test_notebook_invalid_json_is_malformed() {
        let err = extract_units("model.ipynb", "{ not json").unwrap_err();
        assert!(matches!(err, GuardError::MalformedContent { .. }));
    }

    #[test]
    fn test_notebook_non_object_is_malformed() {
        assert!(validate_notebook("a.ipynb", "[1, 2]").is_err());
    }

    #[test]
    fn test_tagged_regions() {
        let code = "\
import os
# <load_data>
df = load()
# </load_data>
    // <build.client>
// not a marker
REM <setup-env>
<!-- <yaml_block> -->
# <bad name>
";
        let units = tagged_regions(code);
        assert_eq!(
            ids(&units),
            vec!["load_data", "build.client", "setup-env", "yaml_block"]
        );
        assert!(units.iter().all(|u| u.kind == CellKind::TaggedRegion));
    }

    #[test]
    fn test_extract_units_selects_by_kind() {
        let units = extract_units("cli/train.sh", "# <create_job>\naz ml job create\n").unwrap();
        assert_eq!(ids(&units), vec!["create_job"]);
    }
}
