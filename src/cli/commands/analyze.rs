//! Analyze Command
//!
//! Produce a safety verdict for one pull request.
//!
//! Usage:
//!   docguard analyze <repo-key> <pr> [-f json|yaml]

use serde::Serialize;

use crate::analysis::PrAnalyzer;
use crate::cli::ui::Output;
use crate::cli::{CommandContext, OutputFormat};
use crate::types::{RepoRef, Result, SafetyVerdict};

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    repo: &'a RepoRef,
    pr: u64,
    #[serde(flatten)]
    verdict: &'a SafetyVerdict,
}

pub async fn run(ctx: &CommandContext, repo_key: &str, number: u64, format: OutputFormat) -> Result<()> {
    let repo = ctx.require_repository(repo_key)?.repo_ref();
    let host = ctx.host()?;
    let index = ctx.load_index()?;

    let analyzer = PrAnalyzer::new(host).with_concurrency(ctx.config.api.max_concurrency);
    let verdict = analyzer.analyze(&repo, number, &index).await;

    let report = AnalyzeReport {
        repo: &repo,
        pr: number,
        verdict: &verdict,
    };
    if let Some(rendered) = format.render(&report)? {
        println!("{}", rendered);
        return Ok(());
    }

    print_verdict(&repo, number, &verdict);
    Ok(())
}

fn print_verdict(repo: &RepoRef, number: u64, verdict: &SafetyVerdict) {
    let out = Output::new();
    out.header(format!("{}#{}", repo, number));

    if verdict.safe {
        out.success("Safe to approve");
    } else {
        out.error(format!("{} blocking issue(s)", verdict.issues.len()));
        for issue in &verdict.issues {
            out.item(issue.summary());
            if !issue.detail.is_empty() {
                out.detail(&issue.detail);
            }
        }
    }

    if !verdict.notebooks_to_review.is_empty() {
        out.section("Modified notebooks (review links)");
        for link in &verdict.notebooks_to_review {
            out.item(link);
        }
    }
}
