//! Persisted forms of the index: the flat reference table and per-category
//! code-block counts.
//!
//! Both are comma-separated with a header row. Fields containing a comma,
//! quote, CR or LF are quoted, with embedded quotes doubled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::ReferenceIndex;
use crate::constants::output::CODE_COUNTS_PREFIX;
use crate::types::{CodeBlock, GuardError, ReferenceRecord, Result, ResultExt};

pub const REFS_HEADER: [&str; 4] = ["ref_file", "from_file", "repo_name", "from_file_dir"];
pub const CODE_COUNTS_HEADER: [&str; 4] = ["file", "type", "lines", "path"];

// =============================================================================
// Reference table
// =============================================================================

/// Serialize the index to its table form
pub fn render_index(index: &ReferenceIndex) -> String {
    let mut out = render_row(&REFS_HEADER);
    for r in index.all() {
        out.push_str(&render_row(&[
            r.ref_file.as_str(),
            r.from_file.as_str(),
            r.repo_name.as_str(),
            r.from_file_dir.as_str(),
        ]));
    }
    out
}

/// Write the index, replacing any existing file atomically
pub fn write_index(path: &Path, index: &ReferenceIndex) -> Result<()> {
    write_atomic(path, &render_index(index))?;
    info!(path = %path.display(), references = index.len(), "Wrote reference index");
    Ok(())
}

/// Load a persisted index. A missing file means the index was never built,
/// which is a configuration problem rather than an I/O failure.
pub fn read_index(path: &Path) -> Result<ReferenceIndex> {
    if !path.exists() {
        return Err(GuardError::Config(format!(
            "Reference index not found at {} (run `docguard index` first)",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .with_context(format!("Failed to read {}", path.display()))?;
    parse_index(&content)
}

pub fn parse_index(content: &str) -> Result<ReferenceIndex> {
    let mut rows = parse_rows(content)?.into_iter();

    let header = rows
        .next()
        .ok_or_else(|| GuardError::Index("Reference table is empty".to_string()))?;
    if header != REFS_HEADER {
        return Err(GuardError::Index(format!(
            "Unexpected reference table header: {}",
            header.join(",")
        )));
    }

    let mut records = Vec::new();
    for (line, row) in rows.enumerate() {
        let [ref_file, from_file, repo_name, from_file_dir]: [String; 4] =
            row.try_into().map_err(|row: Vec<String>| {
                GuardError::Index(format!(
                    "Row {} has {} fields, expected 4",
                    line + 2,
                    row.len()
                ))
            })?;
        records.push(ReferenceRecord {
            ref_file,
            from_file,
            repo_name,
            from_file_dir,
        });
    }

    Ok(ReferenceIndex::from_records(records))
}

// =============================================================================
// Code counts
// =============================================================================

/// Write one `code-counts-<category>.csv` per category that has blocks
pub fn write_code_counts(directory: &Path, blocks: &[CodeBlock]) -> Result<Vec<PathBuf>> {
    let mut by_category: BTreeMap<&str, Vec<&CodeBlock>> = BTreeMap::new();
    for block in blocks {
        by_category
            .entry(block.path_category.as_str())
            .or_default()
            .push(block);
    }

    let mut written = Vec::new();
    for (category, blocks) in by_category {
        let mut out = render_row(&CODE_COUNTS_HEADER);
        for b in blocks {
            let lines = b.line_count.to_string();
            out.push_str(&render_row(&[
                b.file.as_str(),
                b.language_tag.as_str(),
                lines.as_str(),
                b.path_category.as_str(),
            ]));
        }

        let path = directory.join(format!("{}{}.csv", CODE_COUNTS_PREFIX, category));
        write_atomic(&path, &out)?;
        info!(path = %path.display(), "Wrote code counts");
        written.push(path);
    }

    Ok(written)
}

// =============================================================================
// Internal
// =============================================================================

pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| GuardError::Index(format!("Invalid output path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn render_row(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote_field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split table text into rows of fields, honoring quoted fields
fn parse_rows(content: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(GuardError::Index("Unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}
