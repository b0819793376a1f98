//! PR Analysis
//!
//! Decides whether a pull request can break documentation that cites files
//! from its repository.
//!
//! ## Pipeline
//!
//! 1. `classifier`: bucket the PR file list by status and match against the index
//! 2. `diff`: fetch modified files and diff their cell units
//! 3. `engine`: fold everything into a `SafetyVerdict`
//!
//! `impact` reuses the classifier to find merged PRs that touched cited files.

pub mod cells;
pub mod classifier;
pub mod diff;
pub mod engine;
pub mod impact;

pub use classifier::{ChangeClassification, ModifiedFile, classify, fetch_changes, normalize_changes};
pub use diff::{FileVersions, ModifiedFileReport, diff_units, examine};
pub use engine::{FileFinding, ModifiedOutcome, PrAnalyzer, analyze_pr, decide};
pub use impact::{ImpactWindow, PrImpact, find_impact_across, find_prs_with_reference_impact};
