//! The per-profile library aggregate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::content::MediaCategory;
use super::media::{fresh_id, MediaItem};
use super::share_link::ShareLink;

/// Everything persisted for one user profile: four media collections keyed by
/// category plus the share-link records.
///
/// Collections keep insertion order for display. Ids are unique across the
/// whole aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryData {
    #[serde(default)]
    pub videos: Vec<MediaItem>,

    #[serde(default)]
    pub audios: Vec<MediaItem>,

    #[serde(default)]
    pub pictures: Vec<MediaItem>,

    #[serde(default)]
    pub files: Vec<MediaItem>,

    #[serde(default)]
    pub sharelinks: Vec<ShareLink>,
}

impl LibraryData {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Items of one category
    pub fn items(&self, category: MediaCategory) -> &[MediaItem] {
        match category {
            MediaCategory::Video => &self.videos,
            MediaCategory::Audio => &self.audios,
            MediaCategory::Picture => &self.pictures,
            MediaCategory::File => &self.files,
        }
    }

    /// Mutable access to one category's items
    pub fn items_mut(&mut self, category: MediaCategory) -> &mut Vec<MediaItem> {
        match category {
            MediaCategory::Video => &mut self.videos,
            MediaCategory::Audio => &mut self.audios,
            MediaCategory::Picture => &mut self.pictures,
            MediaCategory::File => &mut self.files,
        }
    }

    /// Append an item to the category its MIME type selects
    pub fn push_classified(&mut self, item: MediaItem) -> MediaCategory {
        let category = item.category();
        self.items_mut(category).push(item);
        category
    }

    /// Merge a manifest-shaped aggregate into this one.
    ///
    /// Items with a MIME type are re-filed by it. Items without one keep the
    /// collection they arrived in. Share links are not merged.
    pub fn merge_media(&mut self, other: LibraryData) {
        let LibraryData {
            videos,
            audios,
            pictures,
            files,
            ..
        } = other;

        for (arrived_in, items) in [
            (MediaCategory::Video, videos),
            (MediaCategory::Audio, audios),
            (MediaCategory::Picture, pictures),
            (MediaCategory::File, files),
        ] {
            for item in items {
                if item.mime_type.trim().is_empty() {
                    self.items_mut(arrived_in).push(item);
                } else {
                    self.push_classified(item);
                }
            }
        }
    }

    /// Read a manifest, keeping every media item that parses.
    ///
    /// The body must be a JSON object. An item that fails to parse (say one
    /// missing its content id) is dropped on its own; so is a collection that
    /// is not an array. Share links in a manifest are ignored.
    pub fn from_manifest(body: &[u8]) -> Result<Self, serde_json::Error> {
        let mut object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(body)?;
        let mut data = Self::new();

        for category in MediaCategory::ALL {
            let name = category.collection_name();
            let items = match object.remove(name) {
                None | Some(serde_json::Value::Null) => continue,
                Some(serde_json::Value::Array(items)) => items,
                Some(_) => {
                    warn!(collection = name, "Manifest collection is not an array");
                    continue;
                }
            };

            for (index, raw) in items.into_iter().enumerate() {
                match serde_json::from_value::<MediaItem>(raw) {
                    Ok(item) => data.items_mut(category).push(item),
                    Err(e) => {
                        warn!(collection = name, index, error = %e, "Dropping manifest item")
                    }
                }
            }
        }

        Ok(data)
    }

    /// Iterate every media item in category order
    pub fn media(&self) -> impl Iterator<Item = &MediaItem> {
        MediaCategory::ALL
            .into_iter()
            .flat_map(move |c| self.items(c).iter())
    }

    /// Total number of media items
    pub fn media_len(&self) -> usize {
        self.videos.len() + self.audios.len() + self.pictures.len() + self.files.len()
    }

    /// True when all four media collections are empty
    pub fn is_media_empty(&self) -> bool {
        self.media_len() == 0
    }

    /// True when all five collections are empty
    pub fn is_empty(&self) -> bool {
        self.is_media_empty() && self.sharelinks.is_empty()
    }

    /// Whether any media item or share link already uses this id
    pub fn contains_id(&self, id: u64) -> bool {
        self.media().any(|i| i.id == id) || self.sharelinks.iter().any(|l| l.id == id)
    }

    /// Share links filtered by ownership
    pub fn share_links(&self, owned: Option<bool>) -> Vec<&ShareLink> {
        self.sharelinks
            .iter()
            .filter(|l| owned.map_or(true, |o| l.is_owned() == o))
            .collect()
    }

    /// Drop entries whose id was already seen, keeping the first occurrence.
    ///
    /// Returns the number of entries removed.
    pub fn dedup_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut removed = 0;

        for category in MediaCategory::ALL {
            let items = self.items_mut(category);
            let before = items.len();
            items.retain(|i| seen.insert(i.id));
            removed += before - items.len();
        }

        let before = self.sharelinks.len();
        self.sharelinks.retain(|l| seen.insert(l.id));
        removed += before - self.sharelinks.len();

        if removed > 0 {
            warn!(removed, "Dropped library entries with duplicate ids");
        }
        removed
    }

    /// Give a fresh id to every media item whose id is zero or already taken.
    ///
    /// Used for items arriving from manifests, whose ids were assigned by
    /// someone else's store.
    pub fn reassign_duplicate_ids(&mut self) {
        let mut seen: HashSet<u64> = self.sharelinks.iter().map(|l| l.id).collect();

        for category in MediaCategory::ALL {
            for item in self.items_mut(category).iter_mut() {
                while item.id == 0 || seen.contains(&item.id) {
                    let (id, uuid) = fresh_id();
                    item.id = id;
                    item.uuid = Some(uuid);
                }
                seen.insert(item.id);
            }
        }
    }
}

/// Something that can be filed into the library
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEntry {
    Media(MediaItem),
    ShareLink(ShareLink),
}

impl From<MediaItem> for LibraryEntry {
    fn from(item: MediaItem) -> Self {
        LibraryEntry::Media(item)
    }
}

impl From<ShareLink> for LibraryEntry {
    fn from(link: ShareLink) -> Self {
        LibraryEntry::ShareLink(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_drops_only_bad_items() {
        let body = serde_json::json!({
            "videos": [
                { "fileHash": "QmGood", "type": "video/mp4" },
                { "title": "no content id" }
            ],
            "audios": "not a list",
            "pictures": null,
            "files": [{ "contentId": "QmDoc", "mimeType": "application/pdf" }]
        });

        let data = LibraryData::from_manifest(body.to_string().as_bytes()).unwrap();
        assert_eq!(data.videos.len(), 1);
        assert_eq!(data.videos[0].content_id().as_str(), "QmGood");
        assert!(data.audios.is_empty());
        assert!(data.pictures.is_empty());
        assert_eq!(data.files.len(), 1);

        assert!(LibraryData::from_manifest(b"[1, 2]").is_err());
        assert!(LibraryData::from_manifest(b"{ nope").is_err());
    }

    fn item(cid: &str, mime: &str, id: u64) -> MediaItem {
        let mut item = MediaItem::new(cid, mime);
        item.id = id;
        item
    }

    #[test]
    fn test_push_classified() {
        let mut data = LibraryData::new();
        assert_eq!(
            data.push_classified(item("Qm1", "image/gif", 1)),
            MediaCategory::Picture
        );
        assert_eq!(
            data.push_classified(item("Qm2", "text/plain", 2)),
            MediaCategory::File
        );
        assert_eq!(data.pictures.len(), 1);
        assert_eq!(data.files.len(), 1);
        assert_eq!(data.media_len(), 2);
    }

    #[test]
    fn test_merge_refiles_by_mime() {
        let mut incoming = LibraryData::new();
        incoming.videos.push(item("Qm1", "audio/ogg", 1));
        incoming.videos.push(item("Qm2", "", 2));
        incoming.files.push(item("Qm3", "video/mp4", 3));

        let mut data = LibraryData::new();
        data.merge_media(incoming);

        assert_eq!(data.audios.len(), 1);
        assert_eq!(data.videos.len(), 2);
        assert_eq!(data.videos[0].content_id().as_str(), "Qm2");
        assert_eq!(data.videos[1].content_id().as_str(), "Qm3");
        assert!(data.files.is_empty());
    }

    #[test]
    fn test_dedup_ids_keeps_first() {
        let mut data = LibraryData::new();
        data.videos.push(item("Qm1", "video/mp4", 9));
        data.files.push(item("Qm2", "", 9));
        data.files.push(item("Qm3", "", 10));

        assert_eq!(data.dedup_ids(), 1);
        assert_eq!(data.videos.len(), 1);
        assert_eq!(data.files.len(), 1);
        assert_eq!(data.files[0].content_id().as_str(), "Qm3");
    }

    #[test]
    fn test_reassign_duplicate_ids() {
        let mut data = LibraryData::new();
        data.videos.push(item("Qm1", "video/mp4", 0));
        data.audios.push(item("Qm2", "audio/mp3", 5));
        data.files.push(item("Qm3", "", 5));

        data.reassign_duplicate_ids();

        let ids: HashSet<u64> = data.media().map(|i| i.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&0));
        assert_eq!(data.audios[0].id, 5);
    }

    #[test]
    fn test_empty_default_serializes_all_collections() {
        let value = serde_json::to_value(LibraryData::new()).unwrap();
        for key in ["videos", "audios", "pictures", "files", "sharelinks"] {
            assert_eq!(value[key], serde_json::json!([]));
        }

        let parsed: LibraryData = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}
