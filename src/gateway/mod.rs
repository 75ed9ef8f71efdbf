//! Text transform gateway.
//!
//! Wraps the generative backend behind two calls that always produce text:
//! - `transform`: soften and anonymize raw feedback
//! - `generate_reply`: write a short reaction to an opinion
//!
//! Transport errors, backend errors, timeouts and blank answers all collapse
//! into fixed fallback strings. Each call is a single attempt.

pub mod anthropic;
pub mod backend;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use crate::config::GatewaySettings;
use crate::error::{Error, Result};

pub use anthropic::AnthropicBackend;
pub use backend::{ChunkStream, Script, ScriptedBackend, TextBackend, UnavailableBackend};

/// Substituted when `transform` gets a blank answer.
pub const TRANSFORM_EMPTY_FALLBACK: &str = "I have some feedback I would like to share with you.";

/// Substituted when `transform` fails.
pub const TRANSFORM_ERROR_FALLBACK: &str = "This feedback could not be softened right now.";

/// Substituted when `generate_reply` gets a blank answer.
pub const REPLY_EMPTY_FALLBACK: &str = "Hmm... something to think about.";

/// Substituted when `generate_reply` fails.
pub const REPLY_ERROR_FALLBACK: &str = "Something went wrong while writing a comment.";

/// How a gateway answer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The backend produced the text.
    Generated,
    /// The backend answered with nothing; the empty fallback was used.
    Blank,
    /// The call failed or timed out; the error fallback was used.
    Failed,
}

/// Text returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub text: String,
    pub outcome: ReplyOutcome,
}

impl GatewayReply {
    pub fn is_failure(&self) -> bool {
        self.outcome == ReplyOutcome::Failed
    }
}

/// Never-failing client for the generative backend.
#[derive(Clone)]
pub struct TextGateway {
    backend: Arc<dyn TextBackend>,
    locale: String,
    timeout: Duration,
}

impl TextGateway {
    pub fn new(backend: Arc<dyn TextBackend>, locale: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            locale: locale.into(),
            timeout,
        }
    }

    /// Build a gateway for the configured backend.
    ///
    /// Without an API key the gateway still works and answers with fallbacks.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let backend: Arc<dyn TextBackend> = match AnthropicBackend::new(settings) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                log::warn!("Text backend unavailable, using fallbacks: {}", e);
                Arc::new(UnavailableBackend::new(e.to_string()))
            }
        };
        Self::new(backend, settings.locale.clone(), settings.timeout())
    }

    /// Soften and anonymize raw feedback.
    pub async fn transform(&self, raw: &str) -> String {
        self.transform_reply(raw).await.text
    }

    /// `transform`, also reporting whether a fallback was used.
    pub async fn transform_reply(&self, raw: &str) -> GatewayReply {
        let prompt = prompt::transform_prompt(raw, &self.locale);
        self.run("transform", &prompt, TRANSFORM_EMPTY_FALLBACK, TRANSFORM_ERROR_FALLBACK)
            .await
    }

    /// Write a short neutral-to-mildly-positive reaction.
    pub async fn generate_reply(&self, raw: &str) -> String {
        self.generate_reply_outcome(raw).await.text
    }

    /// `generate_reply`, also reporting whether a fallback was used.
    pub async fn generate_reply_outcome(&self, raw: &str) -> GatewayReply {
        let prompt = prompt::reply_prompt(raw, &self.locale);
        self.run("generate_reply", &prompt, REPLY_EMPTY_FALLBACK, REPLY_ERROR_FALLBACK)
            .await
    }

    async fn run(&self, op: &str, prompt: &str, empty: &str, failed: &str) -> GatewayReply {
        let result = match tokio::time::timeout(self.timeout, self.collect(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        };

        match result {
            Ok(text) if !text.trim().is_empty() => GatewayReply {
                text: text.trim().to_string(),
                outcome: ReplyOutcome::Generated,
            },
            Ok(_) => {
                log::warn!("{}: backend returned blank text, using fallback", op);
                GatewayReply {
                    text: empty.to_string(),
                    outcome: ReplyOutcome::Blank,
                }
            }
            Err(e) => {
                log::warn!("{}: backend call failed, using fallback: {}", op, e);
                GatewayReply {
                    text: failed.to_string(),
                    outcome: ReplyOutcome::Failed,
                }
            }
        }
    }

    /// Concatenate chunks in arrival order until the stream ends.
    async fn collect(&self, prompt: &str) -> Result<String> {
        let mut stream = self.backend.stream(prompt).await?;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}
