//! Index Command
//!
//! Scan the documentation checkout and write the reference index, ownership
//! files and code-count reports.
//!
//! Usage:
//!   docguard index --docs-root <dir>

use std::path::{Path, PathBuf};

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::constants::scan::MAIN_BRANCH_SUFFIX;
use crate::index::{ScanSettings, build_reference_index, codeowners, store};
use crate::types::Result;

pub fn run(ctx: &CommandContext, docs_root: &Path) -> Result<()> {
    let config = &ctx.config;
    let out = Output::new();

    let tokens: Vec<String> = config.repositories.iter().map(|r| r.repo.clone()).collect();
    let roots = config.search_roots();
    out.info(format!(
        "Scanning {} search roots under {}",
        roots.len(),
        docs_root.display()
    ));

    let settings = ScanSettings {
        docs_root,
        tokens: &tokens,
        docs: &config.docs,
    };
    let build = build_reference_index(&roots, &config.docs.exclude_directories, &settings);

    let out_dir = PathBuf::from(&config.output.directory);
    let refs_path = config.output.refs_path();
    store::write_index(&refs_path, &build.index)?;
    let owner_files = codeowners::write_codeowners(&out_dir, &build.index, &config.repositories)?;
    let count_files = store::write_code_counts(&out_dir, &build.code_blocks)?;

    out.section("Reference Index");
    out.field("Documents scanned", build.documents_scanned);
    out.field("References", build.index.len());
    out.field("Code blocks", build.code_blocks.len());
    if build.unterminated_blocks > 0 {
        out.warning(format!(
            "{} unterminated code blocks skipped",
            build.unterminated_blocks
        ));
    }

    for (token, branches) in &build.branch_usage {
        let main = format!("{}{}", token, MAIN_BRANCH_SUFFIX);
        let other: usize = branches
            .iter()
            .filter(|(branch, _)| **branch != main)
            .map(|(_, count)| count)
            .sum();
        if other > 0 {
            out.warning(format!(
                "{}: {} references on branches other than {}",
                token, other, main
            ));
        }
    }

    out.success(format!("Wrote {}", refs_path.display()));
    for path in owner_files.iter().chain(&count_files) {
        out.item(path.display());
    }
    Ok(())
}
