//! Test-only scripted collaborators for pipeline tests.
//!
//! The scripted clients return predetermined results and record every call in
//! invocation order, so tests can assert on the exact publish sequence
//! without touching the network.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::types::{FileSnapshot, Suggestion, Target};
use crate::io::repo::{FileUpdate, PullRequestSpec, RepoClient, RepoFile};
use crate::io::suggest::{SuggestError, SuggestionService};

/// One recorded repository host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    GetFile,
    DefaultBranch,
    BranchTip { branch: String },
    CreateBranch { name: String, sha: String },
    PutFile(FileUpdate),
    CreatePullRequest(PullRequestSpec),
}

/// Publish sub-steps a [`ScriptedRepo`] can be told to fail at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOp {
    DefaultBranch,
    BranchTip,
    CreateBranch,
    PutFile,
    CreatePullRequest,
}

/// Scripted [`RepoClient`] that records every call.
pub struct ScriptedRepo {
    pub file: RepoFile,
    pub default_branch: String,
    pub tip_sha: String,
    pub pr_url: String,
    pub fail_at: Option<RepoOp>,
    pub calls: RefCell<Vec<RepoCall>>,
}

impl ScriptedRepo {
    /// Repo whose target path resolves to a regular file.
    pub fn with_file(content: &str, sha: &str) -> Self {
        Self {
            file: RepoFile::File(FileSnapshot {
                content: content.to_string(),
                sha: sha.to_string(),
            }),
            ..Self::base()
        }
    }

    /// Repo whose target path resolves to a non-file entry.
    pub fn not_a_file(kind: &str) -> Self {
        Self {
            file: RepoFile::NotAFile {
                kind: kind.to_string(),
            },
            ..Self::base()
        }
    }

    /// Inject a failure at one publish sub-step.
    pub fn failing_at(mut self, op: RepoOp) -> Self {
        self.fail_at = Some(op);
        self
    }

    /// Number of recorded calls that mutate remote state.
    pub fn write_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    RepoCall::CreateBranch { .. }
                        | RepoCall::PutFile(_)
                        | RepoCall::CreatePullRequest(_)
                )
            })
            .count()
    }

    fn base() -> Self {
        Self {
            file: RepoFile::NotAFile {
                kind: "dir".to_string(),
            },
            default_branch: "main".to_string(),
            tip_sha: "tipsha0".to_string(),
            pr_url: "https://example.test/acme/widgets/pull/1".to_string(),
            fail_at: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn check(&self, op: RepoOp) -> Result<()> {
        if self.fail_at == Some(op) {
            return Err(anyhow!("scripted {op:?} failure"));
        }
        Ok(())
    }
}

impl RepoClient for ScriptedRepo {
    fn get_file(&self, _target: &Target) -> Result<RepoFile> {
        self.calls.borrow_mut().push(RepoCall::GetFile);
        Ok(self.file.clone())
    }

    fn default_branch(&self, _target: &Target) -> Result<String> {
        self.calls.borrow_mut().push(RepoCall::DefaultBranch);
        self.check(RepoOp::DefaultBranch)?;
        Ok(self.default_branch.clone())
    }

    fn branch_tip(&self, _target: &Target, branch: &str) -> Result<String> {
        self.calls.borrow_mut().push(RepoCall::BranchTip {
            branch: branch.to_string(),
        });
        self.check(RepoOp::BranchTip)?;
        Ok(self.tip_sha.clone())
    }

    fn create_branch(&self, _target: &Target, name: &str, sha: &str) -> Result<()> {
        self.calls.borrow_mut().push(RepoCall::CreateBranch {
            name: name.to_string(),
            sha: sha.to_string(),
        });
        self.check(RepoOp::CreateBranch)
    }

    fn put_file(&self, _target: &Target, update: &FileUpdate) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(RepoCall::PutFile(update.clone()));
        self.check(RepoOp::PutFile)
    }

    fn create_pull_request(&self, _target: &Target, spec: &PullRequestSpec) -> Result<String> {
        self.calls
            .borrow_mut()
            .push(RepoCall::CreatePullRequest(spec.clone()));
        self.check(RepoOp::CreatePullRequest)?;
        Ok(self.pr_url.clone())
    }
}

/// Scripted [`SuggestionService`] replaying queued responses and recording
/// the content submitted per call.
pub struct ScriptedSuggester {
    responses: RefCell<VecDeque<Result<Suggestion, SuggestError>>>,
    pub requests: RefCell<Vec<String>>,
}

impl ScriptedSuggester {
    pub fn new(responses: Vec<Result<Suggestion, SuggestError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Number of suggestion requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl SuggestionService for ScriptedSuggester {
    fn suggest(&self, _target: &Target, content: &str) -> Result<Suggestion, SuggestError> {
        self.requests.borrow_mut().push(content.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(SuggestError::Malformed("script exhausted".to_string())))
    }
}

/// Shorthand for a [`Suggestion`] with optional replacement content.
pub fn suggestion(explanation: &str, refactored: Option<&str>) -> Suggestion {
    Suggestion {
        explanation: explanation.to_string(),
        refactored_content: refactored.map(str::to_string),
    }
}

/// Deterministic target for tests.
pub fn target() -> Target {
    Target {
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        path: "src/agent.ts".to_string(),
    }
}
