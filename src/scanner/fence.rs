//! Fenced code block scanner.
//!
//! A two-state machine over the lines of one document. Any line whose trimmed
//! text starts with a triple backtick is a fence line: outside a block it opens
//! one (capturing the language tag), inside a block it closes it. A block still
//! open at end of input is reported as a [`ScanWarning`] and not counted.

use tracing::warn;

use crate::constants::scan::FENCE;

/// A closed fenced block: language tag and number of enclosed lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub language_tag: String,
    pub line_count: usize,
}

/// Non-fatal problem found while scanning a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    /// Input ended inside a code block; the partial block was discarded
    UnterminatedBlock {
        language_tag: String,
        line_count: usize,
    },
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedBlock {
                language_tag,
                line_count,
            } => write!(
                f,
                "unterminated code block (type '{}', {} lines)",
                language_tag, line_count
            ),
        }
    }
}

/// Blocks and warnings for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceScan {
    pub blocks: Vec<FencedBlock>,
    pub warnings: Vec<ScanWarning>,
}

#[derive(Debug)]
enum State {
    Outside,
    Inside { language_tag: String, line_count: usize },
}

/// Scan lines for fenced code blocks. Never fails.
pub fn scan_blocks<'a, I>(lines: I) -> FenceScan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scan = FenceScan::default();
    let mut state = State::Outside;

    for line in lines {
        let fence_tag = fence_language(line);
        state = match (state, fence_tag) {
            (State::Outside, Some(tag)) => State::Inside {
                language_tag: tag.to_string(),
                line_count: 0,
            },
            (State::Outside, None) => State::Outside,
            (
                State::Inside {
                    language_tag,
                    line_count,
                },
                Some(_),
            ) => {
                scan.blocks.push(FencedBlock {
                    language_tag,
                    line_count,
                });
                State::Outside
            }
            (
                State::Inside {
                    language_tag,
                    line_count,
                },
                None,
            ) => State::Inside {
                language_tag,
                line_count: line_count + 1,
            },
        };
    }

    if let State::Inside {
        language_tag,
        line_count,
    } = state
    {
        scan.warnings.push(ScanWarning::UnterminatedBlock {
            language_tag,
            line_count,
        });
    }

    scan
}

/// Scan a whole document, logging warnings against `file`
pub fn scan_document(file: &str, content: &str) -> FenceScan {
    let scan = scan_blocks(content.lines());
    for warning in &scan.warnings {
        warn!(file, "{}", warning);
    }
    scan
}

/// Language tag of a fence line (possibly empty), or `None` for other lines
fn fence_language(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(FENCE)?;
    Some(rest.split_whitespace().next().unwrap_or(""))
}
