//! Integration tests for the feedback flows with a scripted backend.

use std::sync::Arc;
use std::time::Duration;

use sendback::auth::StaticAuth;
use sendback::gateway::{
    REPLY_ERROR_FALLBACK, Script, ScriptedBackend, TRANSFORM_EMPTY_FALLBACK, TRANSFORM_ERROR_FALLBACK, TextGateway,
};
use sendback::store::{CommentStore, MessageStore};
use sendback::{Error, FeedbackService, MessageStatus, PersonaAssigner};
use tempfile::TempDir;

struct Fixture {
    _temp_dir: TempDir,
    service: FeedbackService,
    backend: Arc<ScriptedBackend>,
}

async fn fixture(scripts: Vec<Script>, timeout: Duration) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let messages = MessageStore::open(
        temp_dir.path().join("sent_messages.json"),
        temp_dir.path().join("received_messages.json"),
        PersonaAssigner::new(),
    )
    .await;
    let comments = CommentStore::open(temp_dir.path().join("comments.json")).await;
    let backend = Arc::new(ScriptedBackend::new(scripts));
    let gateway = TextGateway::new(backend.clone(), "English", timeout);

    let service = FeedbackService::new(
        Arc::new(messages),
        Arc::new(comments),
        gateway,
        PersonaAssigner::new(),
        Arc::new(StaticAuth::signed_in("user-1")),
    );

    Fixture {
        _temp_dir: temp_dir,
        service,
        backend,
    }
}

#[tokio::test]
async fn test_send_appears_in_combined_view() {
    let fx = fixture(vec![Script::chunks(["It would help ", "to listen more."])], Duration::from_secs(5)).await;
    let view = fx.service.messages().combined();
    let mut watcher = view.subscribe();

    let message = fx.service.send_message("Kim", "you never listen", "20 : 00").await.unwrap();
    assert_eq!(message.transformed_content, "It would help to listen more.");
    assert_eq!(message.content, "you never listen");

    let current = watcher
        .wait_for(|items| items.iter().filter(|m| m.id == message.id && m.status == MessageStatus::Sent).count() == 2)
        .await
        .unwrap()
        .clone();
    assert!(current.windows(2).all(|w| w[0].time >= w[1].time));

    let prompts = fx.backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("{feedback = you never listen}"));
}

#[tokio::test]
async fn test_send_blank_transform_still_sent() {
    let fx = fixture(vec![Script::text("   ")], Duration::from_secs(5)).await;

    let message = fx.service.send_message("Kim", "", "20 : 00").await.unwrap();
    assert_eq!(message.status, MessageStatus::Sent);
    assert_eq!(message.transformed_content, TRANSFORM_EMPTY_FALLBACK);
}

#[tokio::test]
async fn test_send_with_stalled_backend_times_out() {
    let fx = fixture(vec![Script::Stall], Duration::from_millis(50)).await;

    let message = fx.service.send_message("Kim", "hello", "20 : 00").await.unwrap();
    assert_eq!(message.status, MessageStatus::Failed);
    assert_eq!(message.transformed_content, TRANSFORM_ERROR_FALLBACK);

    let stored = fx.service.messages().received_by_id(&message.id.0).unwrap();
    assert_eq!(stored.status, MessageStatus::Failed);
}

#[tokio::test]
async fn test_send_received_write_failure_marks_sent_failed() {
    let fx = fixture(vec![Script::text("soft")], Duration::from_secs(5)).await;
    let received_path = fx.service.messages().received().path().to_path_buf();
    std::fs::create_dir_all(received_path.join("blocked")).unwrap();

    let err = fx.service.send_message("Kim", "hello", "20 : 00").await.unwrap_err();
    assert!(matches!(err, Error::Persist { .. }));

    let sent = fx.service.messages().sent_messages();
    let last = sent.last().unwrap();
    assert_eq!(last.name, "Kim");
    assert_eq!(last.status, MessageStatus::Failed);
}

#[tokio::test]
async fn test_generated_reply_failure_still_posts_fallback() {
    let fx = fixture(vec![Script::Fail("overloaded".into())], Duration::from_secs(5)).await;
    let mut subscription = fx.service.comments().subscribe();

    let comment = fx.service.add_generated_reply("standups run long").await.unwrap();
    assert_eq!(comment.text, REPLY_ERROR_FALLBACK);

    let published = subscription.recv().await.unwrap();
    assert_eq!(published[0], comment);
}

#[tokio::test]
async fn test_poll_from_received_message() {
    let fx = fixture(vec![], Duration::from_secs(5)).await;
    let received = fx.service.messages().received_by_id("msg2").unwrap();

    let poll = fx.service.create_poll(&received);
    assert_eq!(poll.id, "msg2");
    assert_eq!(poll.title, format!("Vote on {}'s feedback", received.anonymous_name));
    assert_eq!(poll.content, received.transformed_content);
    assert_eq!(fx.service.polls().list().len(), 1);
}
