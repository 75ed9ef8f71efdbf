//! Anthropic Claude streaming backend.
//!
//! Calls the Messages API with `stream: true` and turns the server-sent
//! `content_block_delta` events into text chunks.

use std::collections::VecDeque;
use std::env;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GatewaySettings;
use crate::error::{Error, Result};
use crate::gateway::backend::{ChunkStream, TextBackend};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic streaming backend.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a backend from gateway settings.
    ///
    /// Reads API key from `ANTHROPIC_API_KEY` environment variable if not configured.
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY not set".to_string()))?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    fn request(&self, prompt: &str) -> StreamRequest {
        StreamRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            stream: true,
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[async_trait]
impl TextBackend for AnthropicBackend {
    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("API error {}: {}", status, body)));
        }

        Ok(text_stream(response.bytes_stream()))
    }
}

/// Splits a byte stream into server-sent-event `data:` payloads.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes, returning the data payloads of every completed line.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        payloads
    }
}

/// What one streamed event means for the caller.
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Stop,
    Ignore,
}

fn parse_event(data: &str) -> Result<StreamEvent> {
    let event: ApiEvent =
        serde_json::from_str(data).map_err(|e| Error::Api(format!("Failed to parse stream event: {} - {}", e, data)))?;

    match event {
        ApiEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } => Ok(StreamEvent::Text(text)),
        ApiEvent::MessageStop => Ok(StreamEvent::Stop),
        ApiEvent::Error { error } => Err(Error::Api(format!("{}: {}", error.kind, error.message))),
        _ => Ok(StreamEvent::Ignore),
    }
}

struct StreamState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<String>>,
    done: bool,
}

/// Turn a raw SSE body into text chunks, ending at `message_stop`.
fn text_stream<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = StreamState {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for data in st.decoder.push(bytes.as_ref()) {
                        match parse_event(&data) {
                            Ok(StreamEvent::Text(text)) => st.ready.push_back(Ok(text)),
                            Ok(StreamEvent::Ignore) => {}
                            Ok(StreamEvent::Stop) => {
                                st.done = true;
                                break;
                            }
                            Err(e) => {
                                st.ready.push_back(Err(e));
                                st.done = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    st.ready.push_back(Err(Error::Network(e.to_string())));
                    st.done = true;
                }
                None => st.done = true,
            }
        }
    })
    .boxed()
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct StreamRequest {
    model: String,
    max_tokens: u32,
    stream: bool,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiEvent {
    ContentBlockDelta {
        delta: Delta,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
