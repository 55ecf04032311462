//! Suggestion service client.
//!
//! The [`SuggestionService`] trait decouples the pipeline from the completion
//! backend (currently an OpenAI-compatible chat API). The model's reply is
//! validated against an embedded JSON Schema before it is trusted, so a
//! malformed reply is reported distinctly from an unreachable service.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ModelConfig;
use crate::core::types::{Suggestion, Target};
use crate::io::prompt;

const SUGGESTION_SCHEMA: &str = include_str!("../../schemas/suggestion.schema.json");

/// Why a suggestion request produced no usable suggestion.
#[derive(Debug)]
pub enum SuggestError {
    /// The service signalled "too many requests". The only retryable class.
    RateLimited,
    /// The reply arrived but failed schema validation or decoding.
    Malformed(String),
    /// Transport failure, non-2xx status, or other generation failure.
    Failed(anyhow::Error),
}

impl fmt::Display for SuggestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestError::RateLimited => write!(f, "suggestion service rate limited the request"),
            SuggestError::Malformed(reason) => write!(f, "malformed suggestion reply: {reason}"),
            SuggestError::Failed(err) => write!(f, "suggestion request failed: {err:#}"),
        }
    }
}

impl std::error::Error for SuggestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SuggestError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Stateless request/response interface for obtaining a refactoring
/// suggestion for one file.
pub trait SuggestionService {
    fn suggest(&self, target: &Target, content: &str) -> Result<Suggestion, SuggestError>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatMessageReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageReply,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// [`SuggestionService`] backed by an OpenAI-compatible chat completion API.
pub struct OpenAiSuggester {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiSuggester {
    pub fn new(config: &ModelConfig, api_key: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.name.clone(),
        })
    }
}

impl SuggestionService for OpenAiSuggester {
    #[instrument(skip_all, fields(model = %self.model, path = %target.path))]
    fn suggest(&self, target: &Target, content: &str) -> Result<Suggestion, SuggestError> {
        let instruction = prompt::reviewer_instruction(&target.path).map_err(SuggestError::Failed)?;
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: instruction,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: content.to_string(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|err| {
                SuggestError::Failed(anyhow::Error::new(err).context("send completion request"))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SuggestError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SuggestError::Failed(anyhow!(
                "completion request failed: {status}: {}",
                snippet(&body)
            )));
        }

        let reply: ChatResponse = response.json().map_err(|err| {
            SuggestError::Malformed(format!("decode completion envelope: {err}"))
        })?;
        let message = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SuggestError::Malformed("completion has no message content".to_string()))?;
        debug!(bytes = message.len(), "received completion");
        parse_suggestion(&message)
    }
}

/// Validate a raw model reply against the suggestion schema and decode it.
fn parse_suggestion(raw: &str) -> Result<Suggestion, SuggestError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| SuggestError::Malformed(format!("reply is not json: {err}")))?;
    let schema: Value = serde_json::from_str(SUGGESTION_SCHEMA)
        .map_err(|err| SuggestError::Failed(anyhow!("parse suggestion schema: {err}")))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| SuggestError::Failed(anyhow!("compile suggestion schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(SuggestError::Malformed(format!(
            "schema validation failed: {}",
            messages.join("; ")
        )));
    }
    serde_json::from_value(value)
        .map_err(|err| SuggestError::Malformed(format!("decode suggestion: {err}")))
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_field_reply() {
        let suggestion =
            parse_suggestion(r#"{"explanation":"unused import","refactoredContent":"fn main() {}"}"#)
                .expect("parse");
        assert_eq!(suggestion.explanation, "unused import");
        assert_eq!(suggestion.refactored_content.as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn parses_reply_without_refactored_content() {
        let suggestion = parse_suggestion(r#"{"explanation":"nothing to fix"}"#).expect("parse");
        assert_eq!(suggestion.refactored_content, None);
    }

    #[test]
    fn missing_explanation_is_malformed() {
        let err = parse_suggestion(r#"{"refactoredContent":"x"}"#).unwrap_err();
        assert!(matches!(err, SuggestError::Malformed(_)));
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = parse_suggestion(r#"{"explanation":"e","refactoredContent":42}"#).unwrap_err();
        assert!(matches!(err, SuggestError::Malformed(_)));
    }

    #[test]
    fn extra_field_is_malformed() {
        let err =
            parse_suggestion(r#"{"explanation":"e","refactoredContent":"c","diff":"-"}"#)
                .unwrap_err();
        assert!(matches!(err, SuggestError::Malformed(_)));
    }

    #[test]
    fn non_json_reply_is_malformed() {
        let err = parse_suggestion("```json\n{}\n```").unwrap_err();
        assert!(matches!(err, SuggestError::Malformed(_)));
    }

    /// The retry layer downcasts through context added by the pipeline, so
    /// the rate-limit marker must survive wrapping.
    #[test]
    fn rate_limited_survives_context_wrapping() {
        let err = anyhow::Error::new(SuggestError::RateLimited).context("request suggestion");
        assert!(matches!(
            err.downcast_ref::<SuggestError>(),
            Some(SuggestError::RateLimited)
        ));
    }
}
