use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docguard::cli::{CommandContext, OutputFormat, commands};
use docguard::constants::review;

#[derive(Parser)]
#[command(name = "docguard")]
#[command(
    version,
    about = "Guard documentation snippet references against breaking pull requests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file (defaults to global + ./docguard.toml)")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan documentation and rebuild the reference index
    Index {
        #[arg(long, help = "Root of the documentation checkout")]
        docs_root: PathBuf,
    },

    /// Check one pull request for changes that break referenced snippets
    Analyze {
        #[arg(help = "Configured repository key")]
        repo: String,
        #[arg(help = "Pull request number")]
        pr: u64,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json, yaml")]
        format: OutputFormat,
    },

    /// List merged PRs that modified referenced files
    Impact {
        #[arg(short = 'd', long, default_value_t = review::MERGE_WINDOW_DAYS, help = "Look-back window in days")]
        days: i64,
        #[arg(long, help = "Only this repository key")]
        repo: Option<String>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json, yaml")]
        format: OutputFormat,
    },

    /// Analyze open PRs requesting team review and approve or comment
    Monitor {
        #[arg(short = 'd', long, help = "Look-back window in days (default from config)")]
        days: Option<i64>,
        #[arg(long = "dry-run", help = "Log approvals and comments without sending them")]
        dry_run: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json, yaml")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json, yaml")]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
    /// Write a starter project configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Index { docs_root } => {
            let ctx = CommandContext::load(config_path)?;
            commands::index::run(&ctx, &docs_root)?;
        }
        Commands::Analyze { repo, pr, format } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::analyze::run(&ctx, &repo, pr, format))?;
        }
        Commands::Impact { days, repo, format } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::impact::run(&ctx, days, repo.as_deref(), format))?;
        }
        Commands::Monitor {
            days,
            dry_run,
            format,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::monitor::run(&ctx, days, dry_run, format))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(config_path, format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { force } => commands::config::init(config_path, force)?,
        },
    }

    Ok(())
}
