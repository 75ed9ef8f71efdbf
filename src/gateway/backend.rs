//! Generative text backend abstraction.
//!
//! A backend takes one prompt and answers with an ordered stream of text
//! chunks.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::error::{Error, Result};

/// Ordered text chunks from a backend.
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Trait for generative text backends.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Send a prompt and return the response chunks in arrival order.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream>;
}

/// Backend used when no real backend is configured. Every call fails.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl TextBackend for UnavailableBackend {
    async fn stream(&self, _prompt: &str) -> Result<ChunkStream> {
        Err(Error::Config(self.reason.clone()))
    }
}

/// One scripted backend answer.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these chunks, then end.
    Chunks(Vec<String>),
    /// Stream these chunks, then fail mid-stream.
    ChunksThenError(Vec<String>, String),
    /// Refuse the request.
    Fail(String),
    /// Accept the request and never produce a chunk.
    Stall,
}

impl Script {
    pub fn text(text: impl Into<String>) -> Self {
        Script::Chunks(vec![text.into()])
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::Chunks(chunks.into_iter().map(Into::into).collect())
    }
}

/// Backend that replays scripted answers and records every prompt.
///
/// Used for offline runs and tests.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Option<Script>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Replay `scripts` in order; once exhausted every call fails.
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same script.
    pub fn always(script: Script) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            fallback: Some(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_script(&self) -> Option<Script> {
        let queued = self.scripts.lock().ok().and_then(|mut s| s.pop_front());
        queued.or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match self.next_script() {
            Some(Script::Chunks(chunks)) => Ok(stream::iter(chunks.into_iter().map(Ok)).boxed()),
            Some(Script::ChunksThenError(chunks, error)) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(Error::Network(error))));
                Ok(stream::iter(items).boxed())
            }
            Some(Script::Fail(error)) => Err(Error::Api(error)),
            Some(Script::Stall) => Ok(stream::pending().boxed()),
            None => Err(Error::Api("no scripted response left".to_string())),
        }
    }
}
