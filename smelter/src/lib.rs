//! Automated code-smell refactoring agent.
//!
//! Given one (owner, repository, path) target, the agent fetches the file from
//! the repository host, asks a language model to detect and fix code smells,
//! and opens a pull request with the replacement content. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (actionability, change-request
//!   derivation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (repository host, suggestion
//!   service). Behind traits to enable scripted fakes in tests.
//!
//! Orchestration modules ([`run`], [`retry`]) coordinate core logic with I/O
//! to implement the fetch -> suggest -> decide -> publish pipeline.

pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod retry;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
