//! Code-smell refactoring agent CLI.
//!
//! `smelter <owner> <repo> <path>` fetches one file from the hosted
//! repository, asks a language model for a code-smell fix, and opens a pull
//! request with the result. Pipeline failures are reported through the log
//! and do not change the exit status; only argument-usage errors exit
//! non-zero.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use smelter::config::{self, Credentials};
use smelter::core::types::{RunOutcome, Target};
use smelter::io::repo::GithubClient;
use smelter::io::suggest::OpenAiSuggester;
use smelter::{logging, retry};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "smelter",
    version,
    about = "Asks a language model to fix code smells in one repository file and opens a pull request"
)]
struct Cli {
    /// Repository owner (user or organization).
    owner: String,
    /// Repository name.
    repo: String,
    /// Path of the file to refactor, relative to the repository root.
    path: String,
    /// Log the suggestion without creating a branch, commit, or pull request.
    /// Also enabled by `DRY_RUN=true`.
    #[arg(long)]
    dry_run: bool,
    /// Optional TOML config file.
    #[arg(long, default_value = "smelter.toml")]
    config: PathBuf,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        // Failures are surfaced exclusively through the log; the process only
        // exits non-zero for argument-usage errors (handled by clap).
        error!("{err:#}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_config(&cli.config)?;
    let credentials = Credentials::from_env();
    let dry_run = cli.dry_run || config::dry_run_from_env();

    let repo = GithubClient::new(&cfg.github, &credentials.github_token)?;
    let suggester = OpenAiSuggester::new(&cfg.model, &credentials.model_api_key)?;
    let target = Target {
        owner: cli.owner,
        repo: cli.repo,
        path: cli.path,
    };

    let outcome = retry::run_with_retry(&repo, &suggester, &cfg, dry_run, &target)?;
    match outcome {
        RunOutcome::Published { url } => info!(url = %url, "done: pull request created"),
        RunOutcome::DryRun => info!("done: dry run, no writes performed"),
        RunOutcome::NoChange => info!("done: no refactoring needed"),
        RunOutcome::NotAFile => info!("done: target is not a file"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_three_positional_arguments() {
        let cli = Cli::parse_from(["smelter", "acme", "widgets", "src/agent.ts"]);
        assert_eq!(cli.owner, "acme");
        assert_eq!(cli.repo, "widgets");
        assert_eq!(cli.path, "src/agent.ts");
        assert!(!cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("smelter.toml"));
    }

    #[test]
    fn parse_dry_run_flag() {
        let cli = Cli::parse_from(["smelter", "acme", "widgets", "src/agent.ts", "--dry-run"]);
        assert!(cli.dry_run);
    }

    #[test]
    fn missing_positional_arguments_is_a_usage_error() {
        let err = Cli::try_parse_from(["smelter", "acme", "widgets"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn extra_positional_argument_is_a_usage_error() {
        let err = Cli::try_parse_from(["smelter", "acme", "widgets", "a.rs", "b.rs"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
