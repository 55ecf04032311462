//! Agent configuration: an optional `smelter.toml` for knobs, environment
//! variables for credentials and the dry-run toggle.
//!
//! The orchestrator never reads ambient state itself; `main` assembles an
//! explicit [`AgentConfig`] plus [`Credentials`] and passes them down, so the
//! pipeline stays testable with injected collaborators.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Agent configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values; credentials never
/// live here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub github: GithubConfig,
    pub model: ModelConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GithubConfig {
    /// Base URL of the repository host API.
    pub api_base: String,

    /// Per-request timeout for repository host calls, in seconds.
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the completion API (OpenAI-compatible).
    pub api_base: String,

    /// Model to request completions from.
    pub name: String,

    /// Per-request timeout for completion calls, in seconds.
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of full pipeline attempts when the suggestion service
    /// rate-limits the request. Rate limiting is the only retried condition.
    pub max_attempts: u32,

    /// Backoff before the first retry, in seconds. Doubles per retry.
    pub base_backoff_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            name: "gpt-4o".to_string(),
            http_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_secs: 5,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            github: GithubConfig::default(),
            model: ModelConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.github.api_base.trim().is_empty() {
            return Err(anyhow!("github.api_base must be non-empty"));
        }
        if self.github.http_timeout_secs == 0 {
            return Err(anyhow!("github.http_timeout_secs must be > 0"));
        }
        if self.model.api_base.trim().is_empty() {
            return Err(anyhow!("model.api_base must be non-empty"));
        }
        if self.model.name.trim().is_empty() {
            return Err(anyhow!("model.name must be non-empty"));
        }
        if self.model.http_timeout_secs == 0 {
            return Err(anyhow!("model.http_timeout_secs must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be > 0"));
        }
        if self.retry.base_backoff_secs == 0 {
            return Err(anyhow!("retry.base_backoff_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Opaque tokens for the two remote collaborators.
///
/// Absent credentials are not an error here: the first remote call fails and
/// is surfaced through the normal failure policy.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: String,
    pub model_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            github_token: env::var("GITHUB_TOKEN").unwrap_or_default(),
            model_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }
}

/// Whether the `DRY_RUN` environment toggle selects dry-run mode.
pub fn dry_run_from_env() -> bool {
    matches!(
        env::var("DRY_RUN").as_deref(),
        Ok("true") | Ok("TRUE") | Ok("1")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("smelter.toml");
        fs::write(&path, "[model]\nname = \"gpt-4o-mini\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model.name, "gpt-4o-mini");
        assert_eq!(cfg.retry, RetryConfig::default());
        assert_eq!(cfg.github, GithubConfig::default());
    }

    #[test]
    fn zero_retry_attempts_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("smelter.toml");
        fs::write(&path, "[retry]\nmax_attempts = 0\n").expect("write");

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn default_config_validates() {
        AgentConfig::default().validate().expect("valid");
    }
}
