//! Documentation scanning: file discovery, fenced code blocks and snippet
//! references.

pub mod fence;
pub mod reference;
pub mod walker;

pub use fence::{FenceScan, FencedBlock, ScanWarning, scan_blocks, scan_document};
pub use reference::{BranchUsage, ReferenceExtractor, SnippetMatch, document_location, find_matches};
pub use walker::{DocFile, DocWalker, ExcludeRule};
