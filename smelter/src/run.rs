//! Orchestration for a single refactoring attempt.
//!
//! Control flow is strictly linear: fetch -> suggest -> decide -> publish, with
//! early exits for non-file targets, no-op suggestions, and dry-run. No step
//! begins before the previous one's result is known, and nothing is cached
//! across attempts.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::change::{ChangeRequest, branch_name, commit_message, pr_title, unix_millis};
use crate::core::types::{FileSnapshot, RunOutcome, Target};
use crate::io::prompt;
use crate::io::repo::{FileUpdate, PullRequestSpec, RepoClient, RepoFile, encode_content};
use crate::io::suggest::SuggestionService;

/// Execute one full attempt of the pipeline for `target`.
///
/// A rate-limit signal from the suggestion service propagates as a
/// [`SuggestError::RateLimited`](crate::io::suggest::SuggestError) inside the
/// returned error; the retry layer downcasts for it. Every other failure is
/// terminal for the run.
pub fn run_attempt<R: RepoClient, S: SuggestionService>(
    repo: &R,
    suggester: &S,
    dry_run: bool,
    target: &Target,
) -> Result<RunOutcome> {
    info!(
        owner = %target.owner,
        repo = %target.repo,
        path = %target.path,
        "starting refactoring run"
    );

    let snapshot = match repo.get_file(target).context("fetch target file")? {
        RepoFile::File(snapshot) => snapshot,
        RepoFile::NotAFile { kind } => {
            info!(path = %target.path, kind = %kind, "target is not a regular file, nothing to do");
            return Ok(RunOutcome::NotAFile);
        }
    };

    info!(bytes = snapshot.content.len(), "analyzing file for code smells");
    // The snapshot content is the sole input to the model, never pre-processed.
    let suggestion = match suggester.suggest(target, &snapshot.content) {
        Ok(suggestion) => suggestion,
        Err(err) => return Err(anyhow::Error::new(err).context("request suggestion")),
    };

    let Some(refactored) = suggestion.actionable_content(&snapshot.content) else {
        info!(path = %target.path, "model proposed no change, leaving file as is");
        return Ok(RunOutcome::NoChange);
    };

    if dry_run {
        info!("dry run: skipping branch, commit, and pull request");
        info!(explanation = %suggestion.explanation, "model explanation");
        return Ok(RunOutcome::DryRun);
    }

    let url = publish(repo, target, &snapshot, refactored, &suggestion.explanation)?;
    info!(url = %url, "created pull request");
    Ok(RunOutcome::Published { url })
}

/// Materialize the suggestion as a reviewable change.
///
/// Sub-steps run in a fixed order: default-branch lookup, ref lookup, branch
/// creation, file write, pull request. A failure halts the sequence where it
/// happened; already-created remote objects are not rolled back (the worst
/// outcome is a stray branch, which the log identifies).
fn publish<R: RepoClient>(
    repo: &R,
    target: &Target,
    snapshot: &FileSnapshot,
    refactored: &str,
    explanation: &str,
) -> Result<String> {
    info!("publishing refactored content as a pull request");

    let base_branch = repo
        .default_branch(target)
        .context("resolve default branch")?;
    let tip = repo
        .branch_tip(target, &base_branch)
        .with_context(|| format!("resolve tip of {base_branch}"))?;

    let change = ChangeRequest {
        branch_name: branch_name(&target.path, unix_millis()),
        base_branch,
        commit_message: commit_message(&target.path),
        title: pr_title(&target.path),
        body: prompt::pr_body(explanation).context("render pull request body")?,
    };

    repo.create_branch(target, &change.branch_name, &tip)
        .with_context(|| format!("create branch {}", change.branch_name))?;

    let update = FileUpdate {
        branch: change.branch_name.clone(),
        message: change.commit_message.clone(),
        content: encode_content(refactored),
        sha: snapshot.sha.clone(),
    };
    repo.put_file(target, &update)
        .inspect_err(|_| warn!(branch = %change.branch_name, "commit failed, branch may be orphaned"))
        .context("commit refactored content")?;

    repo.create_pull_request(
        target,
        &PullRequestSpec {
            title: change.title.clone(),
            body: change.body.clone(),
            head: change.branch_name.clone(),
            base: change.base_branch.clone(),
        },
    )
    .inspect_err(|_| warn!(branch = %change.branch_name, "pull request failed, branch may be orphaned"))
    .context("open pull request")
}
