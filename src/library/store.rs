//! The local library store.
//!
//! One record under one key holds the whole [`LibraryData`]. Every
//! read-modify-write runs under the store's async mutex, so concurrent adds
//! through one store never drop each other's changes. Separate processes
//! sharing a backend are not serialized against each other.
//!
//! Storage failures are logged and treated as empty data. Callers always get
//! a valid aggregate back. A change applied after a failed read is not
//! written, so the stored record is never replaced by that empty stand-in.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::backend::{open_backend, BackendKind, KvBackend, MemoryBackend, StoreError};
use crate::domain::{fresh_id, LibraryData, LibraryEntry, MediaCategory, MediaItem, ShareLink};

/// Key the aggregate is stored under
pub const DEFAULT_KEY: &str = "library-data";

/// Persistent library of media items and share links
pub struct LibraryStore {
    backend: Arc<dyn KvBackend>,
    key: String,
    lock: Mutex<()>,
}

impl LibraryStore {
    /// Create a store over a backend
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            key: DEFAULT_KEY.to_string(),
            lock: Mutex::new(()),
        }
    }

    /// Open a store with a backend of the given kind
    pub fn open(kind: BackendKind, path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(open_backend(kind, path)?))
    }

    /// A store that lives only as long as this value
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Use a different record key (one per profile)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The stored aggregate, or the empty default (persisted on first read)
    pub async fn get(&self) -> LibraryData {
        let _guard = self.lock.lock().await;
        self.get_locked().await
    }

    /// Replace the whole aggregate
    pub async fn put(&self, data: LibraryData) {
        let _guard = self.lock.lock().await;
        self.put_locked(data).await;
    }

    /// File an entry under a fresh unique id; returns that id.
    ///
    /// Media items land in the category their MIME type selects; share links
    /// always land in `sharelinks`.
    pub async fn add_auto_classified(&self, entry: impl Into<LibraryEntry>) -> u64 {
        let entry = entry.into();
        self.update(move |data| file_entry(data, entry)).await
    }

    /// Reset to the empty aggregate
    pub async fn clear_all(&self) {
        self.update(|data| *data = LibraryData::new()).await;
        info!("Library cleared");
    }

    /// Items of one category, in insertion order
    pub async fn list(&self, category: MediaCategory) -> Vec<MediaItem> {
        self.get().await.items(category).to_vec()
    }

    /// Share links: owned (`Some(true)`), received (`Some(false)`) or all
    pub async fn share_links(&self, owned: Option<bool>) -> Vec<ShareLink> {
        self.get()
            .await
            .share_links(owned)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Record a share link
    pub async fn add_share_link(&self, link: ShareLink) -> u64 {
        self.add_auto_classified(link).await
    }

    /// Record a link someone else shared
    pub async fn add_received_link(&self, url: &str, title: impl Into<String>) -> u64 {
        self.add_share_link(ShareLink::new_received(url, title)).await
    }

    /// Delete one media item or share link; returns whether anything was removed
    pub async fn remove(&self, id: u64) -> bool {
        let removed = self
            .update(move |data| {
                for category in MediaCategory::ALL {
                    let items = data.items_mut(category);
                    if let Some(pos) = items.iter().position(|i| i.id == id) {
                        items.remove(pos);
                        return true;
                    }
                }
                match data.sharelinks.iter().position(|l| l.id == id) {
                    Some(pos) => {
                        data.sharelinks.remove(pos);
                        true
                    }
                    None => false,
                }
            })
            .await;

        debug!(id, removed, "Remove entry");
        removed
    }

    /// Add every media item of a decoded collection in one update.
    ///
    /// Each item gets a fresh id. Returns the ids in the order added.
    pub async fn import(&self, incoming: LibraryData) -> Vec<u64> {
        let ids = self
            .update(move |data| {
                let LibraryData {
                    videos,
                    audios,
                    pictures,
                    files,
                    ..
                } = incoming;

                videos
                    .into_iter()
                    .chain(audios)
                    .chain(pictures)
                    .chain(files)
                    .map(|item| file_entry(data, LibraryEntry::Media(item)))
                    .collect::<Vec<_>>()
            })
            .await;

        info!(count = ids.len(), "Imported shared items");
        ids
    }

    async fn update<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut LibraryData) -> T,
    {
        let _guard = self.lock.lock().await;
        match self.read_locked().await {
            Ok(mut data) => {
                let result = f(&mut data);
                self.put_locked(data).await;
                result
            }
            Err(e) => {
                error!(error = %e, key = %self.key, "Failed to read library, change not saved");
                f(&mut LibraryData::new())
            }
        }
    }

    async fn get_locked(&self) -> LibraryData {
        self.read_locked().await.unwrap_or_else(|e| {
            error!(error = %e, key = %self.key, "Failed to read library, using empty data");
            LibraryData::new()
        })
    }

    /// The stored aggregate, persisting the empty default when none exists.
    ///
    /// Only a failing backend is an error; an unparseable record reads as
    /// empty and is replaced by the next write.
    async fn read_locked(&self) -> Result<LibraryData, StoreError> {
        match self.backend.read(&self.key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                error!(error = %e, key = %self.key, "Stored library is corrupt, using empty data");
                LibraryData::new()
            })),
            None => {
                let data = LibraryData::new();
                if let Err(e) = self.save(&data).await {
                    error!(error = %e, key = %self.key, "Failed to persist empty library");
                }
                Ok(data)
            }
        }
    }

    async fn put_locked(&self, mut data: LibraryData) {
        data.dedup_ids();
        if let Err(e) = self.save(&data).await {
            error!(error = %e, key = %self.key, "Failed to write library");
        }
    }

    async fn save(&self, data: &LibraryData) -> Result<(), StoreError> {
        let raw = serde_json::to_string(data)?;
        self.backend.write(&self.key, raw).await
    }
}

/// Draw an id no entry in `data` uses yet
fn unique_id(data: &LibraryData) -> (u64, Uuid) {
    loop {
        let (id, uuid) = fresh_id();
        if id != 0 && !data.contains_id(id) {
            return (id, uuid);
        }
    }
}

fn file_entry(data: &mut LibraryData, entry: LibraryEntry) -> u64 {
    let (id, uuid) = unique_id(data);
    match entry {
        LibraryEntry::Media(mut item) => {
            item.id = id;
            item.uuid = Some(uuid);
            let category = data.push_classified(item);
            debug!(id, %category, "Added media item");
        }
        LibraryEntry::ShareLink(mut link) => {
            link.id = id;
            debug!(id, owned = link.is_owned(), "Added share link");
            data.sharelinks.push(link);
        }
    }
    id
}
