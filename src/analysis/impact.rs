//! Merged PR impact.
//!
//! Finds recently merged PRs that modified files cited by documentation, so
//! writers can check whether the cited samples still match.

use chrono::{Duration, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classifier::{classify, fetch_changes};
use crate::github::{HostApi, PullQuery, PullState};
use crate::index::ReferenceIndex;
use crate::types::{GuardError, ReferencedFile, RepoRef, Result};

/// Bounds on the look-back window
#[derive(Debug, Clone, Copy)]
pub struct ImpactWindow {
    pub days: i64,
    /// Exclusive upper bound on `days`
    pub max_days: i64,
}

impl ImpactWindow {
    pub fn validate(&self) -> Result<()> {
        if self.days < 1 || self.days >= self.max_days {
            return Err(GuardError::Validation(format!(
                "days must be between 1 and {}, got {}",
                self.max_days - 1,
                self.days
            )));
        }
        Ok(())
    }
}

/// A merged PR and the referenced files it modified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrImpact {
    pub repo: RepoRef,
    pub pr_number: u64,
    pub title: String,
    pub html_url: String,
    pub referenced_files: Vec<ReferencedFile>,
}

pub async fn find_prs_with_reference_impact(
    host: &dyn HostApi,
    repo: &RepoRef,
    index: &ReferenceIndex,
    window: ImpactWindow,
    concurrency: usize,
) -> Result<Vec<PrImpact>> {
    window.validate()?;

    let cutoff = Utc::now() - Duration::days(window.days);
    let query = PullQuery {
        state: PullState::Closed,
        updated_since: cutoff,
    };
    let merged: Vec<_> = host
        .list_pull_requests(repo, &query)
        .await?
        .into_iter()
        .filter(|pr| pr.merged_at.is_some_and(|at| at > cutoff))
        .collect();
    debug!(repo = %repo, merged = merged.len(), days = window.days, "Merged PRs in window");

    let mut impacts: Vec<PrImpact> = futures::stream::iter(merged)
        .map(|pr| async move {
            match fetch_changes(host, repo, pr.number).await {
                Ok(changes) => Some((pr, changes)),
                Err(e) => {
                    warn!(repo = %repo, pr = pr.number, error = %e, "Failed to list PR files, skipping");
                    None
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|fetched| async move { fetched })
        .filter_map(|(pr, changes)| async move {
            let referenced_files: Vec<ReferencedFile> = classify(&changes, index)
                .modified_referenced()
                .map(|m| ReferencedFile {
                    file: m.change.filename.clone(),
                    referenced_in: m.referenced_in.clone(),
                })
                .collect();

            (!referenced_files.is_empty()).then(|| PrImpact {
                repo: repo.clone(),
                pr_number: pr.number,
                title: pr.title,
                html_url: pr.html_url,
                referenced_files,
            })
        })
        .collect()
        .await;

    impacts.sort_by_key(|i| i.pr_number);
    info!(repo = %repo, prs = impacts.len(), "Merged PRs with referenced changes");
    Ok(impacts)
}

/// Run the impact search over several repositories and merge the results
/// ordered by (owner, repo, PR number). A repository whose PR listing fails
/// is logged and left out.
pub async fn find_impact_across(
    host: &dyn HostApi,
    repos: &[RepoRef],
    index: &ReferenceIndex,
    window: ImpactWindow,
    concurrency: usize,
) -> Result<Vec<PrImpact>> {
    window.validate()?;

    let per_repo: Vec<Vec<PrImpact>> = futures::stream::iter(repos)
        .map(|repo| async move {
            find_prs_with_reference_impact(host, repo, index, window, concurrency)
                .await
                .unwrap_or_else(|e| {
                    warn!(repo = %repo, error = %e, "Impact search failed");
                    Vec::new()
                })
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut all: Vec<PrImpact> = per_repo.into_iter().flatten().collect();
    all.sort_by(|a, b| (&a.repo, a.pr_number).cmp(&(&b.repo, b.pr_number)));
    Ok(all)
}
