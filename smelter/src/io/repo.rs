//! Repository host client.
//!
//! The [`RepoClient`] trait decouples the pipeline from the hosted-repository
//! API (currently GitHub's REST v3). Tests use scripted clients that record
//! calls without touching the network.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::config::GithubConfig;
use crate::core::types::{FileSnapshot, Target};

/// Result of resolving a target path on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoFile {
    /// The path is a regular file.
    File(FileSnapshot),
    /// The path resolved to a directory, symlink, or other non-file entry.
    /// A normal, non-fatal outcome: the run ends without an error.
    NotAFile { kind: String },
}

/// A commit of new content to one path on one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    /// Branch to commit to.
    pub branch: String,
    /// Commit message.
    pub message: String,
    /// Base64-encoded replacement content (see [`encode_content`]).
    pub content: String,
    /// Version token from the original [`FileSnapshot`]. The host rejects the
    /// write if the file changed since it was read.
    pub sha: String,
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    pub title: String,
    pub body: String,
    /// Branch carrying the refactored content.
    pub head: String,
    /// Branch the pull request merges into.
    pub base: String,
}

/// Read/write interface to the hosted repository.
pub trait RepoClient {
    /// Fetch the file at `target.path`.
    fn get_file(&self, target: &Target) -> Result<RepoFile>;

    /// Resolve the repository's default branch name.
    fn default_branch(&self, target: &Target) -> Result<String>;

    /// Resolve the tip commit sha of `branch`.
    fn branch_tip(&self, target: &Target, branch: &str) -> Result<String>;

    /// Create a branch named `name` pointing at `sha`.
    fn create_branch(&self, target: &Target, name: &str, sha: &str) -> Result<()>;

    /// Commit new content to `target.path` per `update`.
    fn put_file(&self, target: &Target, update: &FileUpdate) -> Result<()>;

    /// Open a pull request and return its URL.
    fn create_pull_request(&self, target: &Target, spec: &PullRequestSpec) -> Result<String>;
}

/// Base64-encode replacement content for the contents API.
pub fn encode_content(text: &str) -> String {
    BASE64.encode(text)
}

/// Reverse of [`encode_content`].
pub fn decode_content(encoded: &str) -> Result<String> {
    decode_base64_text(encoded)
}

/// [`RepoClient`] backed by the GitHub REST API.
pub struct GithubClient {
    http: Client,
    api_base: String,
    token: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig, token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn repo_url(&self, target: &Target, tail: &str) -> String {
        let mut url = format!("{}/repos/{}/{}", self.api_base, target.owner, target.repo);
        if !tail.is_empty() {
            url.push('/');
            url.push_str(tail);
        }
        url
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let request = request
            .header(USER_AGENT, "smelter")
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        // An absent token is not rejected here: unauthenticated reads may
        // still succeed, and the host reports the failure otherwise.
        let request = if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        };
        let response = request
            .send()
            .with_context(|| format!("{what}: send request"))?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, what, "host call succeeded");
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(anyhow!("{what} failed: {status}: {}", snippet(&body)))
    }
}

impl RepoClient for GithubClient {
    #[instrument(skip_all, fields(path = %target.path))]
    fn get_file(&self, target: &Target) -> Result<RepoFile> {
        let url = self.repo_url(target, &format!("contents/{}", target.path));
        let value: Value = self
            .send(self.http.get(url), "get file")?
            .json()
            .context("decode contents response")?;
        parse_contents(value)
    }

    #[instrument(skip_all, fields(owner = %target.owner, repo = %target.repo))]
    fn default_branch(&self, target: &Target) -> Result<String> {
        #[derive(Deserialize)]
        struct RepoInfo {
            default_branch: String,
        }

        let url = self.repo_url(target, "");
        let info: RepoInfo = self
            .send(self.http.get(url), "get repository")?
            .json()
            .context("decode repository response")?;
        Ok(info.default_branch)
    }

    #[instrument(skip_all, fields(branch))]
    fn branch_tip(&self, target: &Target, branch: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct RefObject {
            sha: String,
        }
        #[derive(Deserialize)]
        struct RefInfo {
            object: RefObject,
        }

        let url = self.repo_url(target, &format!("git/ref/heads/{branch}"));
        let info: RefInfo = self
            .send(self.http.get(url), "get ref")?
            .json()
            .context("decode ref response")?;
        Ok(info.object.sha)
    }

    #[instrument(skip_all, fields(name))]
    fn create_branch(&self, target: &Target, name: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(target, "git/refs");
        let body = json!({
            "ref": format!("refs/heads/{name}"),
            "sha": sha,
        });
        self.send(self.http.post(url).json(&body), "create ref")?;
        info!(branch = name, "created branch");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %target.path, branch = %update.branch))]
    fn put_file(&self, target: &Target, update: &FileUpdate) -> Result<()> {
        let url = self.repo_url(target, &format!("contents/{}", target.path));
        let body = json!({
            "message": update.message,
            "content": update.content,
            "sha": update.sha,
            "branch": update.branch,
        });
        self.send(self.http.put(url).json(&body), "update file contents")?;
        info!("committed refactored content");
        Ok(())
    }

    #[instrument(skip_all, fields(head = %spec.head, base = %spec.base))]
    fn create_pull_request(&self, target: &Target, spec: &PullRequestSpec) -> Result<String> {
        #[derive(Deserialize)]
        struct PrInfo {
            html_url: String,
        }

        let url = self.repo_url(target, "pulls");
        let body = json!({
            "title": spec.title,
            "body": spec.body,
            "head": spec.head,
            "base": spec.base,
        });
        let info: PrInfo = self
            .send(self.http.post(url).json(&body), "create pull request")?
            .json()
            .context("decode pull request response")?;
        Ok(info.html_url)
    }
}

#[derive(Deserialize)]
struct ContentsEntry {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    content: Option<String>,
}

/// Interpret a contents-API response.
///
/// A directory comes back as a JSON array; other non-file entries carry a
/// `type` other than `"file"`. Both map to [`RepoFile::NotAFile`].
fn parse_contents(value: Value) -> Result<RepoFile> {
    if value.is_array() {
        return Ok(RepoFile::NotAFile {
            kind: "dir".to_string(),
        });
    }
    let entry: ContentsEntry =
        serde_json::from_value(value).context("parse contents entry")?;
    if entry.kind != "file" {
        return Ok(RepoFile::NotAFile { kind: entry.kind });
    }
    let encoded = entry
        .content
        .ok_or_else(|| anyhow!("contents entry has no content"))?;
    let content = decode_base64_text(&encoded).context("decode file content")?;
    Ok(RepoFile::File(FileSnapshot {
        content,
        sha: entry.sha,
    }))
}

/// Decode base64 text as the host serves it: wrapped with newlines, UTF-8.
fn decode_base64_text(encoded: &str) -> Result<String> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64.decode(compact).context("base64 decode")?;
    String::from_utf8(bytes).context("content is not utf-8")
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_contents_decodes_wrapped_base64() {
        // "fn main() {}" encoded, split across lines as the API wraps it.
        let value = json!({
            "type": "file",
            "sha": "abc123",
            "content": "Zm4gbWFpbigp\nIHt9\n",
        });

        let parsed = parse_contents(value).expect("parse");
        assert_eq!(
            parsed,
            RepoFile::File(FileSnapshot {
                content: "fn main() {}".to_string(),
                sha: "abc123".to_string(),
            })
        );
    }

    #[test]
    fn parse_contents_maps_directory_listing_to_not_a_file() {
        let value = json!([{ "type": "file", "name": "a.rs" }]);
        let parsed = parse_contents(value).expect("parse");
        assert_eq!(
            parsed,
            RepoFile::NotAFile {
                kind: "dir".to_string()
            }
        );
    }

    #[test]
    fn parse_contents_maps_non_file_entry_to_not_a_file() {
        let value = json!({ "type": "symlink", "sha": "abc", "target": "x" });
        let parsed = parse_contents(value).expect("parse");
        assert_eq!(
            parsed,
            RepoFile::NotAFile {
                kind: "symlink".to_string()
            }
        );
    }

    #[test]
    fn parse_contents_rejects_file_without_content() {
        let value = json!({ "type": "file", "sha": "abc" });
        let err = parse_contents(value).unwrap_err();
        assert!(err.to_string().contains("no content"));
    }

    #[test]
    fn encode_decode_round_trips_exact_bytes() {
        let original = "fn main() {\n    println!(\"héllo\");\n}\n";
        let decoded = decode_content(&encode_content(original)).expect("decode");
        assert_eq!(decoded, original);
    }
}
