//! Record types held by the stores.
//!
//! Field names serialize in camelCase so the on-disk files keep the layout
//! `id`, `anonymousName`, `transformedContent`, and so on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assets::ImageRef;

/// Reserved id of the singleton local-user profile.
pub const ME_ID: &str = "me";

/// Fallback asset shown when a profile has no image.
pub const DEFAULT_PLACEHOLDER: &str = "example_picture";

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new message ID using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Delivery status of a message.
///
/// `Queued` is the initial state; `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Created, persistence or transformation still pending
    Queued,
    /// Persisted and transformed
    Sent,
    /// Persistence or transformation did not complete
    Failed,
}

impl MessageStatus {
    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Failed)
    }

    /// Whether a message in this status may move to `next`.
    ///
    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        *self == next || matches!((self, next), (MessageStatus::Queued, MessageStatus::Sent | MessageStatus::Failed))
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Queued => write!(f, "queued"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A piece of feedback sent to a recipient.
///
/// Once stored, only `status` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// Recipient name.
    pub name: String,
    /// Persona shown in place of the sender.
    #[serde(default)]
    pub anonymous_name: String,
    /// Text as typed by the sender.
    pub content: String,
    /// Text after the gateway softened it.
    pub transformed_content: String,
    /// When the message was sent.
    pub time: DateTime<Utc>,
    /// Scheduled display time label, e.g. "20 : 00".
    pub sending_time: String,
    pub status: MessageStatus,
    #[serde(default = "default_true")]
    pub has_action_button: bool,
}

impl Message {
    /// Create a queued message stamped with the current time.
    pub fn new(name: impl Into<String>, content: impl Into<String>, sending_time: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            name: name.into(),
            anonymous_name: String::new(),
            content: content.into(),
            transformed_content: String::new(),
            time: Utc::now(),
            sending_time: sending_time.into(),
            status: MessageStatus::Queued,
            has_action_button: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = MessageId(id.into());
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.anonymous_name = persona.into();
        self
    }

    pub fn with_transformed(mut self, text: impl Into<String>) -> Self {
        self.transformed_content = text.into();
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }
}

/// A profile: the local user ("me") or a friend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default = "default_arrival_label")]
    pub arrival_time_label: String,
    #[serde(default = "default_arrival_time")]
    pub arrival_time: String,
    #[serde(default)]
    pub status_message: String,
    /// Local image, if any. Must point at an existing file.
    #[serde(default)]
    pub image_ref: Option<ImageRef>,
    #[serde(default = "default_placeholder")]
    pub placeholder_ref: String,
}

fn default_arrival_label() -> String {
    "Message arrival time".to_string()
}

fn default_arrival_time() -> String {
    "20 : 00".to_string()
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arrival_time_label: default_arrival_label(),
            arrival_time: default_arrival_time(),
            status_message: String::new(),
            image_ref: None,
            placeholder_ref: default_placeholder(),
        }
    }

    pub fn with_status_message(mut self, status: impl Into<String>) -> Self {
        self.status_message = status.into();
        self
    }

    pub fn is_me(&self) -> bool {
        self.id == ME_ID
    }

    /// The image to display: the local file when present, else the placeholder.
    pub fn display_image(&self) -> String {
        self.image_ref
            .as_ref()
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| self.placeholder_ref.clone())
    }

    /// Arrival time rendered as a 12-hour clock label.
    pub fn arrival_time_display(&self) -> String {
        crate::display::format_clock(&self.arrival_time)
    }
}

/// A discussion comment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Persona of the author.
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub pending: bool,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            pending: false,
        }
    }
}

/// A vote opened on a received message. Session-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

impl Poll {
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id.0.clone(),
            title: format!("Vote on {}'s feedback", message.anonymous_name),
            subtitle: "Tell us what you think about this feedback.".to_string(),
            content: message.transformed_content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(MessageStatus::Queued.can_transition_to(MessageStatus::Sent));
        assert!(MessageStatus::Queued.can_transition_to(MessageStatus::Failed));
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Sent));
        assert!(!MessageStatus::Sent.can_transition_to(MessageStatus::Queued));
        assert!(!MessageStatus::Failed.can_transition_to(MessageStatus::Sent));
        assert!(!MessageStatus::Queued.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
    }

    #[test]
    fn test_message_wire_format() {
        let msg = Message::new("Alex", "listen more", "20 : 00")
            .with_id("m1")
            .with_status(MessageStatus::Sent);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["id"], "m1");
        assert_eq!(json["status"], "sent");
        assert_eq!(json["sendingTime"], "20 : 00");
        assert!(json.get("transformedContent").is_some());
        assert!(json.get("hasActionButton").is_some());
    }

    #[test]
    fn test_message_ignores_unknown_fields() {
        let json = r#"{
            "id": "m7",
            "name": "Sam",
            "avatarRes": 12345,
            "content": "hi",
            "transformedContent": "hello",
            "time": "2025-01-02T03:04:05Z",
            "sendingTime": "20 : 00",
            "status": "sent"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId::from("m7"));
        assert_eq!(msg.anonymous_name, "");
        assert!(msg.has_action_button);
    }

    #[test]
    fn test_profile_defaults_on_decode() {
        let profile: Profile = serde_json::from_str(r#"{"id": "0101", "name": "Kim"}"#).unwrap();
        assert_eq!(profile.arrival_time, "20 : 00");
        assert_eq!(profile.placeholder_ref, DEFAULT_PLACEHOLDER);
        assert!(profile.image_ref.is_none());
        assert_eq!(profile.display_image(), DEFAULT_PLACEHOLDER);
        assert!(!profile.is_me());
    }

    #[test]
    fn test_poll_from_message() {
        let msg = Message::new("Alex", "raw", "20 : 00")
            .with_id("m2")
            .with_persona("Curious Fox")
            .with_transformed("soft");
        let poll = Poll::from_message(&msg);
        assert_eq!(poll.id, "m2");
        assert!(poll.title.contains("Curious Fox"));
        assert_eq!(poll.content, "soft");
    }
}
