//! Impact Command
//!
//! List recently merged PRs that modified files cited by documentation.
//!
//! Usage:
//!   docguard impact [--days 8] [--repo <key>] [-f json|yaml]

use crate::analysis::{ImpactWindow, find_impact_across};
use crate::cli::ui::Output;
use crate::cli::{CommandContext, OutputFormat};
use crate::types::{RepoRef, Result};

pub async fn run(
    ctx: &CommandContext,
    days: i64,
    repo_key: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let window = ImpactWindow {
        days,
        max_days: ctx.config.approval.max_merge_window_days,
    };
    window.validate()?;

    let repos: Vec<RepoRef> = ctx
        .select_repositories(repo_key)?
        .iter()
        .map(|r| r.repo_ref())
        .collect();
    let host = ctx.host()?;
    let index = ctx.load_index()?;

    let impacts = find_impact_across(
        host.as_ref(),
        &repos,
        &index,
        window,
        ctx.config.api.max_concurrency,
    )
    .await?;

    if let Some(rendered) = format.render(&impacts)? {
        println!("{}", rendered);
        return Ok(());
    }

    let out = Output::new();
    out.header(format!("Merged PRs in the last {} days", days));
    if impacts.is_empty() {
        out.info("No merged PRs modified referenced files");
        return Ok(());
    }

    for impact in &impacts {
        out.section(format!(
            "{}#{} {}",
            impact.repo, impact.pr_number, impact.title
        ));
        out.field("URL", &impact.html_url);
        for file in &impact.referenced_files {
            out.item(&file.file);
            for doc in &file.referenced_in {
                out.detail(doc);
            }
        }
    }
    Ok(())
}
