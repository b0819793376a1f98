//! Monitor Command
//!
//! Run one review cycle: analyze open PRs requesting the team's review and
//! approve or comment on each.
//!
//! Usage:
//!   docguard monitor [--days 14] [--dry-run] [-f json|yaml]

use std::sync::Arc;

use tracing::warn;

use crate::analysis::PrAnalyzer;
use crate::cli::ui::Output;
use crate::cli::{CommandContext, OutputFormat};
use crate::github::{GitHubClient, SharedHost};
use crate::monitor::{MonitorReport, ReviewMonitor};
use crate::types::Result;

pub async fn run(ctx: &CommandContext, days: Option<i64>, dry_run: bool, format: OutputFormat) -> Result<()> {
    let config = &ctx.config;
    let days = days.unwrap_or(config.approval.review_window_days);
    let client = GitHubClient::from_config(&config.api)?;
    let gate = Arc::clone(client.gate());
    let host: SharedHost = Arc::new(client);
    let index = ctx.load_index()?;

    let analyzer = PrAnalyzer::new(Arc::clone(&host)).with_concurrency(config.api.max_concurrency);
    let monitor = ReviewMonitor::new(&analyzer, &config.approval)
        .with_dry_run(dry_run)
        .with_concurrency(config.api.max_concurrency);
    let report = monitor.run(&config.repositories, &index, days).await;

    if let Some(rendered) = format.render(&report)? {
        println!("{}", rendered);
        return Ok(());
    }

    print_report(&report);
    match host.rate_limit_status().await {
        Ok(quota) => Output::new().field(
            "API quota",
            format!("{}/{} remaining", quota.remaining, quota.limit),
        ),
        Err(e) => warn!(error = %e, "Could not read API quota"),
    }
    Output::new().field("Rate-limit gate", gate.stats().await);
    Ok(())
}

fn print_report(report: &MonitorReport) {
    let out = Output::new();
    out.header("Review cycle");
    if report.dry_run {
        out.warning("Dry run: no approvals or comments were sent");
    }
    out.field("PRs analyzed", report.total());
    out.field("Auto-approved", report.approved.len());
    out.field("Manual review", report.manual_review.len());
    out.field("Errors", report.errors.len());

    if !report.approved.is_empty() {
        out.section("Auto-approved");
        for pr in &report.approved {
            out.item(format!("{}#{} {}", pr.pr.repo, pr.pr.number, pr.pr.title));
        }
    }

    if !report.manual_review.is_empty() {
        out.section("Manual review");
        for pr in &report.manual_review {
            out.item(format!("{}#{} {}", pr.pr.repo, pr.pr.number, pr.pr.title));
            for issue in &pr.issues {
                out.detail(issue);
            }
        }
    }

    for error in &report.errors {
        out.error(error);
    }
}
