//! Feedback flows built on the stores and the gateway.
//!
//! Sending touches two stores and the gateway with no transaction around
//! them: a failure part way through leaves whatever was already written.

use std::sync::{Arc, Mutex};

use crate::auth::AuthState;
use crate::error::{Error, Result};
use crate::gateway::TextGateway;
use crate::model::{Comment, Message, MessageStatus, Poll};
use crate::persona::PersonaAssigner;
use crate::store::{CommentStore, MessageStore};

/// Polls opened during this session. Not persisted.
#[derive(Debug, Default)]
pub struct PollBoard {
    polls: Mutex<Vec<Poll>>,
}

impl PollBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a poll on `message`, or return the one already open for it.
    pub fn create(&self, message: &Message) -> Poll {
        let mut polls = self.polls.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = polls.iter().find(|p| p.id == message.id.0) {
            return existing.clone();
        }
        let poll = Poll::from_message(message);
        polls.push(poll.clone());
        poll
    }

    pub fn get(&self, id: &str) -> Option<Poll> {
        let polls = self.polls.lock().unwrap_or_else(|e| e.into_inner());
        polls.iter().find(|p| p.id == id).cloned()
    }

    pub fn list(&self) -> Vec<Poll> {
        self.polls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct FeedbackService {
    messages: Arc<MessageStore>,
    comments: Arc<CommentStore>,
    gateway: TextGateway,
    personas: PersonaAssigner,
    auth: Arc<dyn AuthState>,
    polls: PollBoard,
}

impl FeedbackService {
    pub fn new(
        messages: Arc<MessageStore>,
        comments: Arc<CommentStore>,
        gateway: TextGateway,
        personas: PersonaAssigner,
        auth: Arc<dyn AuthState>,
    ) -> Self {
        Self {
            messages,
            comments,
            gateway,
            personas,
            auth,
            polls: PollBoard::new(),
        }
    }

    pub fn messages(&self) -> &Arc<MessageStore> {
        &self.messages
    }

    pub fn comments(&self) -> &Arc<CommentStore> {
        &self.comments
    }

    pub fn polls(&self) -> &PollBoard {
        &self.polls
    }

    /// Soften `content` and deliver it to `recipient`.
    ///
    /// The message is written to the sent and received stores as `Queued`,
    /// then resolved to `Sent`, or to `Failed` when the gateway could not
    /// transform it. If the received write fails, the sent copy is marked
    /// `Failed` and the write error is returned.
    pub async fn send_message(&self, recipient: &str, content: &str, sending_time: &str) -> Result<Message> {
        if !self.auth.is_signed_in() {
            return Err(Error::NotSignedIn);
        }

        let persona = self.personas.assign();
        let reply = self.gateway.transform_reply(content).await;
        let resolved = if reply.is_failure() {
            MessageStatus::Failed
        } else {
            MessageStatus::Sent
        };

        let message = Message::new(recipient, content, sending_time)
            .with_persona(persona)
            .with_transformed(reply.text);
        let id = message.id.0.clone();

        self.messages.add_sent(message.clone()).await?;
        if let Err(e) = self.messages.add_received(message.clone()).await {
            log::error!("Message {} stored as sent but not received: {}", id, e);
            if let Err(mark) = self.messages.update_status(&id, MessageStatus::Failed).await {
                log::warn!("Could not mark message {} as failed: {}", id, mark);
            }
            return Err(e);
        }

        self.messages.update_status(&id, resolved).await?;
        log::info!("Message {} to {} {}", id, recipient, resolved);
        Ok(message.with_status(resolved))
    }

    /// Post a comment typed by the user under a random persona.
    pub async fn add_comment(&self, text: &str) -> Result<Comment> {
        let comment = Comment::new(self.personas.assign(), text);
        self.comments.add(comment.clone()).await?;
        Ok(comment)
    }

    /// Post a gateway-written reaction to `input` under a random persona.
    pub async fn add_generated_reply(&self, input: &str) -> Result<Comment> {
        let author = self.personas.assign();
        let text = self.gateway.generate_reply(input).await;
        let comment = Comment::new(author, text);
        self.comments.add(comment.clone()).await?;
        Ok(comment)
    }

    pub fn create_poll(&self, message: &Message) -> Poll {
        self.polls.create(message)
    }
}
