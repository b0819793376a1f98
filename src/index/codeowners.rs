//! Ownership file emission: one `CODEOWNERS-<token>.txt` per repository,
//! listing every referenced file with the owning team.

use std::path::{Path, PathBuf};

use tracing::info;

use super::ReferenceIndex;
use super::store::write_atomic;
use crate::config::RepositoryConfig;
use crate::constants::output::CODEOWNERS_PREFIX;
use crate::types::Result;

/// Ownership lines for one repository token, or `None` if nothing references it
pub fn render_codeowners(index: &ReferenceIndex, token: &str, owners: &str) -> Option<String> {
    let mut refs: Vec<&str> = index.for_repo(token).map(|r| r.ref_file.as_str()).collect();
    if refs.is_empty() {
        return None;
    }
    refs.sort_unstable();
    refs.dedup();

    Some(
        refs.into_iter()
            .map(|r| format!("/{} {}\n", r.replace(' ', "\\ "), owners))
            .collect(),
    )
}

/// Write ownership files for every repository with references
pub fn write_codeowners(
    directory: &Path,
    index: &ReferenceIndex,
    repositories: &[RepositoryConfig],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for repo in repositories {
        let Some(content) = render_codeowners(index, &repo.repo, &repo.team) else {
            info!(token = %repo.repo, "No references found, skipping ownership file");
            continue;
        };

        let path = directory.join(format!("{}{}.txt", CODEOWNERS_PREFIX, repo.repo));
        write_atomic(&path, &content)?;
        info!(path = %path.display(), owners = %repo.team, "Wrote ownership file");
        written.push(path);
    }

    Ok(written)
}
