//! Shared types for one refactoring run.
//!
//! Everything here is request-scoped and transient: the repository host is
//! the system of record, and nothing is persisted between runs.

use serde::{Deserialize, Serialize};

/// The unit of work: one file in one hosted repository.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// File path relative to the repository root.
    pub path: String,
}

/// The exact state of the target file at fetch time.
///
/// `sha` is the host's opaque version token. It must be passed back unchanged
/// on the write so the host rejects the commit if the file changed
/// concurrently (host-enforced optimistic concurrency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub content: String,
    pub sha: String,
}

/// Structured result returned by the suggestion service.
///
/// `refactored_content` is the complete replacement file, never a diff. It
/// may be absent when the model proposes no change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub explanation: String,
    #[serde(
        rename = "refactoredContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refactored_content: Option<String>,
}

impl Suggestion {
    /// The replacement content, only when acting on it would change the file.
    ///
    /// Returns `None` when the content is absent, empty, or identical to
    /// `original`; those runs terminate as a no-op, not a failure.
    pub fn actionable_content(&self, original: &str) -> Option<&str> {
        let content = self.refactored_content.as_deref()?;
        if content.is_empty() || content == original {
            return None;
        }
        Some(content)
    }
}

/// Terminal outcome of a run.
///
/// Outcomes are authoritative only through their side effects (a PR exists,
/// or none does) and the log; callers get this value for reporting and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The path resolved to a directory or other non-regular-file entry.
    NotAFile,
    /// The model proposed no change (absent, empty, or identical content).
    NoChange,
    /// An actionable suggestion was produced but writes are suppressed.
    DryRun,
    /// A pull request was created.
    Published { url: String },
}
