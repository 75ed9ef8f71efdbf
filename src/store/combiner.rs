//! Combined, time-ordered view over several list stores.
//!
//! The view is recomputed whenever any source store commits, from the
//! sources' current snapshots. It never polls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::model::Message;
use crate::store::persistent::{Snapshot, Store};

/// A record with a point in time to order by.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Message {
    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Concatenate the sources in order, then sort newest first.
///
/// The sort is stable: equal timestamps keep their concatenation order.
pub fn merge<T: Timestamped + Clone>(sources: &[Snapshot<Vec<T>>]) -> Vec<T> {
    let mut merged: Vec<T> = sources.iter().flat_map(|s| s.iter().cloned()).collect();
    merged.sort_by_key(|item| std::cmp::Reverse(item.timestamp()));
    merged
}

/// Live merged view. Dropping it stops the background recompute task.
pub struct CombinedView<T> {
    receiver: watch::Receiver<Snapshot<Vec<T>>>,
    task: JoinHandle<()>,
}

impl<T> CombinedView<T>
where
    T: Timestamped + Clone + Send + Sync + 'static,
{
    /// Start watching `sources`. Must be called inside a tokio runtime.
    pub fn new(sources: Vec<Arc<Store<Vec<T>>>>) -> Self {
        // Subscribe before the first merge so no commit slips between them
        let subscriptions: Vec<_> = sources.iter().map(|s| s.subscribe()).collect();
        let initial = merge(&current(&sources));
        let (sender, receiver) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            let (dirty_tx, mut dirty_rx) = mpsc::unbounded_channel::<()>();
            let mut forwarders = JoinSet::new();
            for mut subscription in subscriptions {
                let dirty = dirty_tx.clone();
                forwarders.spawn(async move {
                    while subscription.recv().await.is_some() {
                        if dirty.send(()).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(dirty_tx);

            while dirty_rx.recv().await.is_some() {
                // Collapse a burst of commits into one recompute
                while dirty_rx.try_recv().is_ok() {}
                let view = merge(&current(&sources));
                log::debug!("Combined view recomputed: {} items", view.len());
                sender.send_replace(Arc::new(view));
            }
        });

        Self { receiver, task }
    }

    /// Current merged list.
    pub fn current(&self) -> Snapshot<Vec<T>> {
        Arc::clone(&self.receiver.borrow())
    }

    /// A receiver that observes every recompute.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Vec<T>>> {
        self.receiver.clone()
    }
}

impl<T> Drop for CombinedView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn current<T: Send + Sync + 'static>(sources: &[Arc<Store<Vec<T>>>]) -> Vec<Snapshot<Vec<T>>> {
    sources.iter().map(|s| s.snapshot()).collect()
}
