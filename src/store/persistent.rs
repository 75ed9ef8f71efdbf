//! Generic persistent store.
//!
//! A store owns one collection value, mirrored to one file. Every accepted
//! mutation is written to disk as a whole-file overwrite and then delivered
//! to every subscriber. Each subscriber has its own unbounded queue, so a slow
//! reader falls behind but never misses a snapshot. Writes on one store are linearized by a writer lock held
//! from reading the latest snapshot until the new snapshot is published.
//!
//! File reads and writes run on tokio's blocking pool.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};

/// Immutable view of a store's collection at one point in time.
pub type Snapshot<C> = Arc<C>;

/// Converts a collection to and from its file contents.
pub trait Codec<C>: Send + Sync {
    /// Value used when the file does not exist yet.
    fn seed(&self) -> C;

    /// Value used when the file is blank or cannot be decoded.
    fn empty(&self) -> C;

    fn decode(&self, text: &str) -> Result<C>;

    fn encode(&self, value: &C) -> Result<String>;
}

/// Receives every snapshot a store commits, in commit order.
pub struct Subscription<C> {
    receiver: UnboundedReceiver<Snapshot<C>>,
}

impl<C> Subscription<C> {
    /// Wait for the next committed snapshot. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Snapshot<C>> {
        self.receiver.recv().await
    }

    /// Take the next committed snapshot if one is waiting.
    pub fn try_recv(&mut self) -> Option<Snapshot<C>> {
        self.receiver.try_recv().ok()
    }

    /// Number of committed snapshots waiting to be received.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// A collection persisted to a single file.
pub struct Store<C> {
    name: String,
    path: PathBuf,
    codec: Arc<dyn Codec<C>>,
    current: RwLock<Snapshot<C>>,
    writer: Mutex<()>,
    subscribers: StdMutex<Vec<UnboundedSender<Snapshot<C>>>>,
}

impl<C> Store<C>
where
    C: Send + Sync + 'static,
{
    /// Open a store, loading its file (or the seed if there is none).
    pub async fn open(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        codec: impl Codec<C> + 'static,
    ) -> Self {
        let name = name.into();
        let path = path.into();
        let codec: Arc<dyn Codec<C>> = Arc::new(codec);
        let initial = read(&name, &path, &codec).await;

        Self {
            name,
            path,
            codec,
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
            subscribers: StdMutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file without touching the in-memory snapshot.
    pub async fn load(&self) -> C {
        read(&self.name, &self.path, &self.codec).await
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot<C> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    /// Register for every future committed snapshot.
    pub fn subscribe(&self) -> Subscription<C> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).push(sender);
        Subscription { receiver }
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|s| !s.is_closed());
        subscribers.len()
    }

    /// Derive a new collection from the latest snapshot, persist it, publish it.
    ///
    /// If `transform` or the write fails, nothing is published and the
    /// snapshot stays as it was.
    pub async fn mutate<F>(&self, transform: F) -> Result<Snapshot<C>>
    where
        F: FnOnce(&C) -> Result<C>,
    {
        let _guard = self.writer.lock().await;
        let next = transform(&self.snapshot())?;
        self.persist(&next).await?;
        Ok(self.publish(next))
    }

    /// Like [`mutate`](Self::mutate), but `transform` may return `None` to
    /// leave the store untouched (no write, no publish).
    pub async fn mutate_if<F>(&self, transform: F) -> Result<Option<Snapshot<C>>>
    where
        F: FnOnce(&C) -> Result<Option<C>>,
    {
        let _guard = self.writer.lock().await;
        let Some(next) = transform(&self.snapshot())? else {
            return Ok(None);
        };
        self.persist(&next).await?;
        Ok(Some(self.publish(next)))
    }

    /// Reload from disk and publish the result.
    pub async fn refresh(&self) -> Snapshot<C> {
        let _guard = self.writer.lock().await;
        let value = self.load().await;
        self.publish(value)
    }

    fn publish(&self, value: C) -> Snapshot<C> {
        let snapshot = Arc::new(value);
        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            *current = Arc::clone(&snapshot);
        }
        // Dropped subscriptions are pruned here
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|s| s.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    async fn persist(&self, value: &C) -> Result<()> {
        let text = self.codec.encode(value)?;
        let path = self.path.clone();

        let written = tokio::task::spawn_blocking(move || write_file(&path, text.as_bytes()))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(format!("write task failed: {}", e))));

        match written {
            Ok(()) => {
                log::debug!("{}: saved to {}", self.name, self.path.display());
                Ok(())
            }
            Err(source) => {
                log::error!("{}: failed to save {}: {}", self.name, self.path.display(), source);
                Err(Error::Persist {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

impl<T> Store<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Add an item at the end of the collection.
    pub async fn append(&self, item: T) -> Result<Snapshot<Vec<T>>> {
        self.mutate(move |items| {
            let mut next = items.clone();
            next.push(item);
            Ok(next)
        })
        .await
    }

    /// Add an item at the front of the collection.
    pub async fn prepend(&self, item: T) -> Result<Snapshot<Vec<T>>> {
        self.mutate(move |items| {
            let mut next = Vec::with_capacity(items.len() + 1);
            next.push(item);
            next.extend(items.iter().cloned());
            Ok(next)
        })
        .await
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

async fn read<C: Send + 'static>(name: &str, path: &Path, codec: &Arc<dyn Codec<C>>) -> C {
    let owned_name = name.to_string();
    let owned_path = path.to_path_buf();
    let owned_codec = Arc::clone(codec);

    match tokio::task::spawn_blocking(move || read_file(&owned_name, &owned_path, owned_codec.as_ref())).await {
        Ok(value) => value,
        Err(e) => {
            log::error!("{}: load task failed: {}", name, e);
            codec.empty()
        }
    }
}

/// Decode failures are logged and recovered as the codec's empty value.
fn read_file<C>(name: &str, path: &Path, codec: &dyn Codec<C>) -> C {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("{}: {} not found, using seed data", name, path.display());
            return codec.seed();
        }
        Err(e) => {
            log::warn!("{}: failed to read {}: {}", name, path.display(), e);
            return codec.empty();
        }
    };

    if text.trim().is_empty() {
        return codec.empty();
    }

    match codec.decode(&text) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{}: corrupted file {}: {}", name, path.display(), e);
            codec.empty()
        }
    }
}

/// Replace `path` with `bytes` via a sibling temp file and rename.
fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let temp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&temp, bytes)?;
    std::fs::rename(&temp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::codec::JsonListCodec;
    use tempfile::TempDir;

    async fn open_numbers(dir: &TempDir, seed: Vec<u32>) -> Store<Vec<u32>> {
        Store::open("numbers", dir.path().join("numbers.json"), JsonListCodec::seeded(seed)).await
    }

    #[tokio::test]
    async fn test_missing_file_uses_seed() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![1, 2]).await;
        assert_eq!(*store.snapshot(), vec![1, 2]);
        // Seeding does not write the file
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_recovers_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("numbers.json"), "{ not json").unwrap();

        let store = open_numbers(&temp, vec![1, 2]).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_blank_file_is_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("numbers.json"), "  \n").unwrap();

        let store = open_numbers(&temp, vec![9]).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_append_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;

        store.append(1).await.unwrap();
        store.append(2).await.unwrap();
        store.prepend(0).await.unwrap();

        assert_eq!(*store.snapshot(), vec![0, 1, 2]);
        assert_eq!(store.load().await, vec![0, 1, 2]);

        let reopened = open_numbers(&temp, vec![42]).await;
        assert_eq!(*reopened.snapshot(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        store.append(5).await.unwrap();

        assert_eq!(store.load().await, store.load().await);
    }

    #[tokio::test]
    async fn test_subscribers_see_commits_in_order() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        let mut sub = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);

        store.append(1).await.unwrap();
        store.append(2).await.unwrap();

        assert_eq!(*sub.recv().await.unwrap(), vec![1]);
        assert_eq!(*sub.recv().await.unwrap(), vec![1, 2]);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_every_commit() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        let mut sub = store.subscribe();

        for i in 0..100 {
            store.append(i).await.unwrap();
        }
        assert_eq!(sub.pending(), 100);

        let mut seen = Vec::new();
        while let Some(snapshot) = sub.try_recv() {
            seen.push(snapshot.len());
        }
        assert_eq!(seen, (1..=100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        let kept = store.subscribe();
        let dropped = store.subscribe();
        assert_eq!(store.subscriber_count(), 2);

        drop(dropped);
        store.append(1).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(kept.pending(), 1);
    }

    #[tokio::test]
    async fn test_failed_transform_publishes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        let mut sub = store.subscribe();

        let result = store
            .mutate(|_| Err(Error::MessageNotFound { id: "x".to_string() }))
            .await;
        assert!(result.is_err());
        assert!(sub.try_recv().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_mutate_if_none_skips_write() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![3]).await;

        let changed = store.mutate_if(|_| Ok(None)).await.unwrap();
        assert!(changed.is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_typed_and_keeps_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("numbers.json");
        let store: Store<Vec<u32>> = Store::open("numbers", &path, JsonListCodec::seeded(vec![7])).await;
        let mut sub = store.subscribe();

        // A directory where the file should be makes the rename fail
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let err = store.append(8).await.unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert_eq!(*store.snapshot(), vec![7]);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_write() {
        let temp = TempDir::new().unwrap();
        let store = open_numbers(&temp, vec![]).await;
        store.append(1).await.unwrap();

        std::fs::write(store.path(), "[1, 2, 3]").unwrap();
        let mut sub = store.subscribe();

        let refreshed = store.refresh().await;
        assert_eq!(*refreshed, vec![1, 2, 3]);
        assert_eq!(*sub.recv().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(open_numbers(&temp, vec![]).await);

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.append(i).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut items = store.snapshot().to_vec();
        items.sort();
        assert_eq!(items, (0..32).collect::<Vec<_>>());

        let mut on_disk = store.load().await;
        on_disk.sort();
        assert_eq!(on_disk, items);
    }
}
