//! Deterministic derivation of the branch/commit/PR descriptor.
//!
//! Everything the publish stage names is derived here from the target path
//! and a caller-supplied uniqueness token, so repeated runs on the same path
//! cannot collide and tests can pin the token.

use std::time::{SystemTime, UNIX_EPOCH};

/// Descriptor for the branch, commit, and pull request that materialize a
/// suggestion as a reviewable change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub branch_name: String,
    pub base_branch: String,
    pub commit_message: String,
    pub title: String,
    pub body: String,
}

/// Branch name for a refactoring of `path`.
///
/// Non-alphanumeric path characters are collapsed to `-`; `token` (typically
/// [`unix_millis`]) keeps repeated runs on the same path from colliding.
pub fn branch_name(path: &str, token: u64) -> String {
    use std::sync::LazyLock;
    static NON_ALNUM: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"[^a-zA-Z0-9]").unwrap());

    format!("refactor/{}-{}", NON_ALNUM.replace_all(path, "-"), token)
}

/// Commit message for the refactored file.
pub fn commit_message(path: &str) -> String {
    format!("refactor: optimize {path}")
}

/// Pull request title for the refactored file.
pub fn pr_title(path: &str) -> String {
    format!("Refactor {path} to reduce code smells")
}

/// Milliseconds since the Unix epoch, used as the branch uniqueness token.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_normalizes_path_separators() {
        assert_eq!(
            branch_name("src/lib.rs", 1700000000000),
            "refactor/src-lib-rs-1700000000000"
        );
    }

    #[test]
    fn branch_name_keeps_alphanumerics() {
        assert_eq!(branch_name("Agent2.ts", 7), "refactor/Agent2-ts-7");
    }

    #[test]
    fn commit_message_names_path() {
        assert_eq!(
            commit_message("src/agent.ts"),
            "refactor: optimize src/agent.ts"
        );
    }

    #[test]
    fn pr_title_names_path() {
        assert_eq!(
            pr_title("src/agent.ts"),
            "Refactor src/agent.ts to reduce code smells"
        );
    }
}
