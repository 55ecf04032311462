//! Bounded rate-limit recovery around the single-attempt pipeline.
//!
//! Rate limiting is the only recoverable failure class: each retry restarts
//! the whole attempt from the fetch, so the retried run always works from a
//! fresh remote read and nothing carries over between attempts. Transient
//! failures on the read or publish path stay terminal on purpose; widening
//! retry coverage would be a behavioral change, not a fix.

use std::fmt;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::config::AgentConfig;
use crate::core::types::{RunOutcome, Target};
use crate::io::repo::RepoClient;
use crate::io::suggest::{SuggestError, SuggestionService};
use crate::run::run_attempt;

/// Terminal error after exhausting all rate-limit retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitExhaustedError {
    pub attempts: u32,
}

impl fmt::Display for RateLimitExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "suggestion service still rate limited after {} attempts",
            self.attempts
        )
    }
}

impl std::error::Error for RateLimitExhaustedError {}

/// Run the pipeline, retrying on rate limiting with exponential backoff.
///
/// Attempts are bounded by `config.retry.max_attempts`; the backoff starts at
/// `config.retry.base_backoff_secs` and doubles per retry. Exhaustion
/// converts into a terminal [`RateLimitExhaustedError`].
pub fn run_with_retry<R: RepoClient, S: SuggestionService>(
    repo: &R,
    suggester: &S,
    config: &AgentConfig,
    dry_run: bool,
    target: &Target,
) -> Result<RunOutcome> {
    let max_attempts = config.retry.max_attempts;
    let mut backoff = Duration::from_secs(config.retry.base_backoff_secs);

    for attempt in 1..=max_attempts {
        let err = match run_attempt(repo, suggester, dry_run, target) {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };
        if !is_rate_limited(&err) {
            return Err(err);
        }
        if attempt == max_attempts {
            break;
        }
        warn!(
            attempt,
            max_attempts,
            backoff_secs = backoff.as_secs(),
            "rate limited, restarting run after backoff"
        );
        thread::sleep(backoff);
        backoff = backoff.saturating_mul(2);
    }

    Err(anyhow::Error::new(RateLimitExhaustedError {
        attempts: max_attempts,
    }))
}

fn is_rate_limited(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SuggestError>(),
        Some(SuggestError::RateLimited)
    )
}
