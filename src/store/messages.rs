//! Sent and received message stores.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::model::{Message, MessageStatus};
use crate::persona::PersonaAssigner;
use crate::store::codec::JsonListCodec;
use crate::store::combiner::CombinedView;
use crate::store::persistent::{Snapshot, Store};

fn seed_time(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, hour, minute, 0).earliest().unwrap_or_default()
}

/// Sample message shown before anything has been sent.
pub fn sent_seed() -> Vec<Message> {
    vec![
        Message::new("Park", "Your code reviews are way too harsh.", "20 : 00")
            .with_id("msg1")
            .with_persona("Curious Fox")
            .with_transformed("Code review comments could be a little gentler so the team can take them on board.")
            .with_time(seed_time(13, 33))
            .with_status(MessageStatus::Sent),
    ]
}

/// Sample message shown before anything has been received.
pub fn received_seed() -> Vec<Message> {
    vec![
        Message::new("Lee", "You always show up late to meetings.", "20 : 00")
            .with_id("msg2")
            .with_persona("Hungry Otter")
            .with_transformed("It would help the team if meetings could start on time.")
            .with_time(seed_time(14, 10))
            .with_status(MessageStatus::Sent),
    ]
}

/// The two message stores.
pub struct MessageStore {
    sent: Arc<Store<Vec<Message>>>,
    received: Arc<Store<Vec<Message>>>,
    personas: PersonaAssigner,
}

impl MessageStore {
    /// Open both stores.
    ///
    /// Received messages stored without a persona (older files) get one
    /// derived from their id, so every load of the same file agrees.
    pub async fn open(
        sent_path: impl Into<PathBuf>,
        received_path: impl Into<PathBuf>,
        personas: PersonaAssigner,
    ) -> Self {
        let sent = Store::open("sent", sent_path, JsonListCodec::seeded(sent_seed())).await;

        let legacy = personas.clone();
        let received_codec = JsonListCodec::seeded(received_seed()).with_fixup(move |message: Message| {
            if message.anonymous_name.is_empty() {
                let persona = legacy.assign_for(&message.id.0);
                message.with_persona(persona)
            } else {
                message
            }
        });
        let received = Store::open("received", received_path, received_codec).await;

        Self {
            sent: Arc::new(sent),
            received: Arc::new(received),
            personas,
        }
    }

    pub fn sent(&self) -> &Arc<Store<Vec<Message>>> {
        &self.sent
    }

    pub fn received(&self) -> &Arc<Store<Vec<Message>>> {
        &self.received
    }

    pub fn sent_messages(&self) -> Snapshot<Vec<Message>> {
        self.sent.snapshot()
    }

    pub fn received_messages(&self) -> Snapshot<Vec<Message>> {
        self.received.snapshot()
    }

    pub async fn add_sent(&self, message: Message) -> Result<()> {
        add(&self.sent, message).await
    }

    /// Store a received message, giving it a persona if it has none.
    pub async fn add_received(&self, mut message: Message) -> Result<()> {
        if message.anonymous_name.is_empty() {
            message.anonymous_name = self.personas.assign();
        }
        add(&self.received, message).await
    }

    pub fn sent_by_id(&self, id: &str) -> Option<Message> {
        find(&self.sent.snapshot(), id)
    }

    pub fn received_by_id(&self, id: &str) -> Option<Message> {
        find(&self.received.snapshot(), id)
    }

    /// Set the status of message `id` in every store that holds it.
    ///
    /// Transitions are validated against each stored copy before anything
    /// is written. Fails with `MessageNotFound` if neither store has it.
    pub async fn update_status(&self, id: &str, status: MessageStatus) -> Result<()> {
        for store in [&self.sent, &self.received] {
            if let Some(message) = find(&store.snapshot(), id)
                && !message.status.can_transition_to(status)
            {
                return Err(Error::InvalidStatusTransition {
                    from: message.status,
                    to: status,
                });
            }
        }

        let mut found = false;
        for store in [&self.sent, &self.received] {
            let mut present = false;
            store
                .mutate_if(|messages| {
                    let Some(index) = messages.iter().position(|m| m.id.0 == id) else {
                        return Ok(None);
                    };
                    present = true;
                    let current = messages[index].status;
                    if current == status {
                        return Ok(None);
                    }
                    if !current.can_transition_to(status) {
                        return Err(Error::InvalidStatusTransition { from: current, to: status });
                    }
                    let mut next = messages.clone();
                    next[index].status = status;
                    Ok(Some(next))
                })
                .await?;
            found |= present;
        }

        if found {
            log::debug!("Message {} status -> {}", id, status);
            Ok(())
        } else {
            Err(Error::MessageNotFound { id: id.to_string() })
        }
    }

    /// Reload both stores from disk.
    pub async fn refresh(&self) {
        self.sent.refresh().await;
        self.received.refresh().await;
    }

    /// Live view of sent and received messages, newest first.
    pub fn combined(&self) -> CombinedView<Message> {
        CombinedView::new(vec![Arc::clone(&self.sent), Arc::clone(&self.received)])
    }
}

async fn add(store: &Store<Vec<Message>>, message: Message) -> Result<()> {
    store
        .mutate(move |messages| {
            if messages.iter().any(|m| m.id == message.id) {
                return Err(Error::DuplicateMessage {
                    id: message.id.0.clone(),
                });
            }
            let mut next = messages.clone();
            next.push(message);
            Ok(next)
        })
        .await?;
    Ok(())
}

fn find(messages: &[Message], id: &str) -> Option<Message> {
    messages.iter().find(|m| m.id.0 == id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(temp: &TempDir) -> MessageStore {
        MessageStore::open(
            temp.path().join("sent.json"),
            temp.path().join("received.json"),
            PersonaAssigner::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_seeds_on_first_open() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;
        assert_eq!(store.sent_messages().len(), 1);
        assert!(store.sent_by_id("msg1").is_some());
        assert!(store.received_by_id("msg2").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;
        let message = Message::new("Kim", "hi", "20 : 00").with_id("dup");

        store.add_sent(message.clone()).await.unwrap();
        let err = store.add_sent(message).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateMessage { id } if id == "dup"));
        assert_eq!(store.sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_update_status_in_both_stores() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;
        let message = Message::new("Kim", "hi", "20 : 00").with_id("m1");
        store.add_sent(message.clone()).await.unwrap();
        store.add_received(message).await.unwrap();

        store.update_status("m1", MessageStatus::Sent).await.unwrap();
        assert_eq!(store.sent_by_id("m1").unwrap().status, MessageStatus::Sent);
        assert_eq!(store.received_by_id("m1").unwrap().status, MessageStatus::Sent);

        // Same status again is a no-op
        store.update_status("m1", MessageStatus::Sent).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_status_rejects_backwards() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;

        let err = store.update_status("msg1", MessageStatus::Queued).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStatusTransition { .. }));
        assert_eq!(store.sent_by_id("msg1").unwrap().status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;
        let err = store.update_status("nope", MessageStatus::Sent).await.unwrap_err();
        assert!(matches!(err, Error::MessageNotFound { .. }));
    }

    #[tokio::test]
    async fn test_received_added_without_persona_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp).await;
        for _ in 0..5 {
            store.add_received(Message::new("Kim", "x", "20 : 00")).await.unwrap();
        }

        let snapshot = store.received_messages();
        let personas = PersonaAssigner::new();
        assert!(snapshot.iter().all(|m| personas.is_persona(&m.anonymous_name)));

        assert_eq!(store.received().load().await, store.received().load().await);
        let reopened = open(&temp).await;
        assert_eq!(reopened.received_messages(), snapshot);
    }

    #[tokio::test]
    async fn test_legacy_received_persona_is_stable_across_loads() {
        let temp = TempDir::new().unwrap();
        let bare: Vec<_> = (0..5)
            .map(|i| Message::new("Kim", "hi", "20 : 00").with_id(format!("legacy-{i}")))
            .collect();
        std::fs::write(temp.path().join("received.json"), serde_json::to_string(&bare).unwrap()).unwrap();

        let first = open(&temp).await;
        let second = open(&temp).await;
        assert_eq!(first.received_messages(), second.received_messages());
        assert_eq!(first.received().load().await, first.received().load().await);
    }

    #[test]
    fn test_seed_personas_are_from_the_closed_set() {
        let personas = PersonaAssigner::new();
        for message in sent_seed().iter().chain(received_seed().iter()) {
            assert!(personas.is_persona(&message.anonymous_name), "{}", message.anonymous_name);
        }
    }

    #[tokio::test]
    async fn test_received_without_persona_gets_one() {
        let temp = TempDir::new().unwrap();
        let raw = Message::new("Kim", "hi", "20 : 00").with_id("bare");
        std::fs::write(
            temp.path().join("received.json"),
            serde_json::to_string(&vec![raw]).unwrap(),
        )
        .unwrap();

        let store = open(&temp).await;
        let loaded = store.received_by_id("bare").unwrap();
        assert!(PersonaAssigner::new().is_persona(&loaded.anonymous_name));
    }
}
