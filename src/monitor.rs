//! Review Monitor
//!
//! Finds open PRs waiting on a documentation team's review, analyzes each one
//! and either approves it or leaves a comment asking for manual review.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::analysis::PrAnalyzer;
use crate::config::{ApprovalConfig, RepositoryConfig};
use crate::github::{PullQuery, PullRequest, PullState};
use crate::index::ReferenceIndex;
use crate::types::{IssueKind, RepoRef, SafetyVerdict};

pub const APPROVAL_COMMENT: &str = "**Auto-approved by content maintenance automation**

This PR has been automatically validated and approved because:
- No deleted files are referenced in documentation
- No renamed files are referenced in documentation
- No deleted cells/snippets in modified files that are referenced in docs

If you notice any issues, please add a comment and we'll review.";

const APPROVAL_FAILED: &str = "Failed to auto-approve";

/// A PR that matched the team filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
}

impl ReviewCandidate {
    fn from_pull(repo: &RepoRef, pr: PullRequest) -> Self {
        Self {
            repo: repo.clone(),
            number: pr.number,
            title: pr.title,
            url: pr.html_url,
            author: pr.author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedPr {
    #[serde(flatten)]
    pub pr: ReviewCandidate,
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notebooks_to_review: Vec<String>,
}

/// Outcome of one monitor run, each list sorted by (repo, PR number)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub approved: Vec<ReviewedPr>,
    pub manual_review: Vec<ReviewedPr>,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

impl MonitorReport {
    pub fn total(&self) -> usize {
        self.approved.len() + self.manual_review.len()
    }

    fn sort(&mut self) {
        let key = |r: &ReviewedPr| (r.pr.repo.clone(), r.pr.number);
        self.approved.sort_by_key(key);
        self.manual_review.sort_by_key(key);
    }
}

/// What to do with an analyzed PR
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Approve,
    Comment(String),
    Nothing,
}

pub struct ReviewMonitor<'a> {
    analyzer: &'a PrAnalyzer,
    approval: &'a ApprovalConfig,
    dry_run: bool,
    concurrency: usize,
}

impl<'a> ReviewMonitor<'a> {
    pub fn new(analyzer: &'a PrAnalyzer, approval: &'a ApprovalConfig) -> Self {
        Self {
            analyzer,
            approval,
            dry_run: approval.dry_run,
            concurrency: 1,
        }
    }

    /// Force dry-run on top of the configured setting
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = self.dry_run || dry_run;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Open, non-draft PRs updated within `days` that request the team
    pub async fn find_candidates(
        &self,
        repos: &[RepositoryConfig],
        days: i64,
        errors: &mut Vec<String>,
    ) -> Vec<ReviewCandidate> {
        let query = PullQuery {
            state: PullState::Open,
            updated_since: Utc::now() - Duration::days(days),
        };
        let mut candidates = Vec::new();

        for repo_config in repos {
            let repo = repo_config.repo_ref();
            let slugs: HashSet<String> = repo_config
                .team_slugs(&self.approval.team_slug_aliases)
                .into_iter()
                .collect();

            match self.analyzer.host().list_pull_requests(&repo, &query).await {
                Ok(pulls) => {
                    let before = candidates.len();
                    candidates.extend(
                        pulls
                            .into_iter()
                            .filter(|pr| !pr.draft && requests_team(pr, &slugs))
                            .map(|pr| ReviewCandidate::from_pull(&repo, pr)),
                    );
                    info!(repo = %repo, found = candidates.len() - before, "PRs needing review");
                }
                Err(e) => {
                    error!(repo = %repo, error = %e, "Failed to list open PRs");
                    errors.push(format!("{}: {}", repo, e));
                }
            }
        }

        candidates
    }

    pub async fn run(&self, repos: &[RepositoryConfig], index: &ReferenceIndex, days: i64) -> MonitorReport {
        let mut report = MonitorReport {
            dry_run: self.dry_run,
            ..MonitorReport::default()
        };
        let candidates = self.find_candidates(repos, days, &mut report.errors).await;

        let analyzed: Vec<(ReviewCandidate, SafetyVerdict)> = futures::stream::iter(candidates)
            .map(|pr| async move {
                let verdict = self.analyzer.analyze(&pr.repo, pr.number, index).await;
                (pr, verdict)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (pr, verdict) in analyzed {
            self.settle(pr, verdict, &mut report).await;
        }

        report.sort();
        report.errors.sort();
        info!(
            approved = report.approved.len(),
            manual_review = report.manual_review.len(),
            errors = report.errors.len(),
            dry_run = self.dry_run,
            "Review cycle complete"
        );
        report
    }

    async fn settle(&self, pr: ReviewCandidate, verdict: SafetyVerdict, report: &mut MonitorReport) {
        for issue in verdict.issues.iter().filter(|i| i.kind == IssueKind::AnalysisError) {
            report
                .errors
                .push(format!("{}#{}: {}", pr.repo, pr.number, issue));
        }

        let reviewed = ReviewedPr {
            issues: verdict.issues.iter().map(ToString::to_string).collect(),
            notebooks_to_review: verdict.notebooks_to_review.clone(),
            pr,
        };
        let subject = format!("{}#{}", reviewed.pr.repo, reviewed.pr.number);
        let failed = verdict.is_analysis_failure(&subject);
        let action = plan(&verdict, self.approval.auto_approve_enabled, failed);

        match action {
            Action::Approve => match self.approve(&reviewed.pr).await {
                Ok(()) => report.approved.push(reviewed),
                Err(message) => {
                    error!(repo = %reviewed.pr.repo, pr = reviewed.pr.number, error = %message, "Failed to approve");
                    report.errors.push(format!(
                        "Failed to approve {}#{}: {}",
                        reviewed.pr.repo, reviewed.pr.number, message
                    ));
                    report.manual_review.push(ReviewedPr {
                        issues: vec![APPROVAL_FAILED.to_string()],
                        ..reviewed
                    });
                }
            },
            Action::Comment(body) => {
                info!(repo = %reviewed.pr.repo, pr = reviewed.pr.number, "PR requires manual review");
                if self.dry_run {
                    info!(pr = reviewed.pr.number, "Dry run: would comment");
                } else if let Err(e) = self
                    .analyzer
                    .host()
                    .comment_on_pull_request(&reviewed.pr.repo, reviewed.pr.number, &body)
                    .await
                {
                    warn!(pr = reviewed.pr.number, error = %e, "Failed to comment");
                }
                report.manual_review.push(reviewed);
            }
            Action::Nothing => report.manual_review.push(reviewed),
        }
    }

    async fn approve(&self, pr: &ReviewCandidate) -> std::result::Result<(), String> {
        if self.dry_run {
            info!(repo = %pr.repo, pr = pr.number, "Dry run: would approve");
            return Ok(());
        }
        self.analyzer
            .host()
            .approve_pull_request(&pr.repo, pr.number, APPROVAL_COMMENT)
            .await
            .map_err(|e| e.to_string())?;
        info!(repo = %pr.repo, pr = pr.number, "Auto-approved");
        Ok(())
    }
}

fn requests_team(pr: &PullRequest, slugs: &HashSet<String>) -> bool {
    pr.requested_teams
        .iter()
        .any(|t| slugs.contains(&t.to_lowercase()))
}

fn plan(verdict: &SafetyVerdict, auto_approve: bool, analysis_failed: bool) -> Action {
    if verdict.safe && auto_approve {
        Action::Approve
    } else if verdict.issues.is_empty() || analysis_failed {
        Action::Nothing
    } else {
        Action::Comment(manual_review_comment(verdict))
    }
}

pub fn manual_review_comment(verdict: &SafetyVerdict) -> String {
    let issues: Vec<String> = verdict.issues.iter().map(|i| format!("- {}", i)).collect();
    format!(
        "**Manual review required**\n\n\
         This PR requires manual review due to the following issues:\n{}\n\n\
         Please review and address these issues before merging.",
        issues.join("\n")
    )
}
