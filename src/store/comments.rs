//! Discussion comments, newest first.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::model::Comment;
use crate::store::codec::JsonListCodec;
use crate::store::persistent::{Snapshot, Store, Subscription};

pub fn comments_seed() -> Vec<Comment> {
    vec![
        Comment::new("Dancing Cat", "I think the point about code reviews is fair."),
        Comment::new("Hungry Otter", "Maybe talk it through in person next time?"),
        Comment::new("Coding Horse", "Good to see this raised politely."),
    ]
}

pub struct CommentStore {
    inner: Arc<Store<Vec<Comment>>>,
}

impl CommentStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let inner = Store::open("comments", path, JsonListCodec::seeded(comments_seed())).await;
        Self { inner: Arc::new(inner) }
    }

    pub fn comments(&self) -> Snapshot<Vec<Comment>> {
        self.inner.snapshot()
    }

    pub fn subscribe(&self) -> Subscription<Vec<Comment>> {
        self.inner.subscribe()
    }

    pub fn store(&self) -> &Arc<Store<Vec<Comment>>> {
        &self.inner
    }

    /// New comments go to the front.
    pub async fn add(&self, comment: Comment) -> Result<()> {
        self.inner.prepend(comment).await?;
        Ok(())
    }

    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }
}
