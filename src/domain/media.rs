//! Media items held in the library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::content::{ContentId, MediaCategory};

/// One addressable piece of content.
///
/// Field names serialize in camelCase. Manifests written by older clients use
/// `fileHash`, `fileUri`, `type`, `size` and `duration`; those are accepted as
/// aliases when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Locally-unique id, assigned when the item enters a store
    #[serde(default)]
    pub id: u64,

    /// Random token the id was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,

    #[serde(alias = "fileHash")]
    content_id: ContentId,

    /// Resolved retrieval URL (empty until resolved)
    #[serde(default, alias = "fileUri", deserialize_with = "null_as_default")]
    pub content_uri: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// MIME string; drives category placement
    #[serde(default, alias = "type", deserialize_with = "null_as_default")]
    pub mime_type: String,

    #[serde(default, alias = "size")]
    pub size_bytes: Option<u64>,

    #[serde(default, alias = "duration")]
    pub duration_seconds: Option<u64>,

    #[serde(default = "Utc::now", deserialize_with = "null_as_now")]
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    /// Create a new media item for a content identifier
    pub fn new(content_id: impl Into<ContentId>, mime_type: impl Into<String>) -> Self {
        Self {
            id: 0,
            uuid: None,
            content_id: content_id.into(),
            content_uri: String::new(),
            title: String::new(),
            description: None,
            mime_type: mime_type.into(),
            size_bytes: None,
            duration_seconds: None,
            created_at: Utc::now(),
        }
    }

    /// The content identifier (immutable once assigned)
    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    /// Category derived from the MIME type
    pub fn category(&self) -> MediaCategory {
        MediaCategory::from_mime(&self.mime_type)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content_uri(mut self, uri: impl Into<String>) -> Self {
        self.content_uri = uri.into();
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_duration(mut self, duration_seconds: u64) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }
}

/// Derive a locally-unique integer id from a fresh random token.
///
/// The id is the first 32 bits of a v4 UUID, so it carries no information
/// about the content it labels.
pub fn fresh_id() -> (u64, Uuid) {
    let uuid = Uuid::new_v4();
    let b = uuid.as_bytes();
    let id = u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64;
    (id, uuid)
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn null_as_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_category_follows_mime() {
        let item = MediaItem::new("QmVideo", "video/webm");
        assert_eq!(item.category(), MediaCategory::Video);

        let item = MediaItem::new("QmDoc", "application/zip");
        assert_eq!(item.category(), MediaCategory::File);
    }

    #[test]
    fn test_deserialize_legacy_manifest_item() {
        let json = r#"{
            "id": 1712345678901,
            "title": "Shared File 1",
            "description": null,
            "cid": "ignored",
            "fileHash": "QmLegacy",
            "fileUri": "https://spfs-gateway.thestratos.net/ipfs/QmLegacy",
            "type": "audio/mpeg",
            "size": null,
            "duration": 212,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "views": 3
        }"#;

        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.content_id().as_str(), "QmLegacy");
        assert_eq!(item.mime_type, "audio/mpeg");
        assert_eq!(item.duration_seconds, Some(212));
        assert_eq!(item.size_bytes, None);
        assert_eq!(item.description, None);
        assert_eq!(item.category(), MediaCategory::Audio);
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let item = MediaItem::new("bafyX", "image/png").with_title("cat");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["contentId"], "bafyX");
        assert_eq!(value["mimeType"], "image/png");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_fresh_ids_differ() {
        let (a, ua) = fresh_id();
        let (b, ub) = fresh_id();
        assert_ne!(ua, ub);
        assert!(a <= u32::MAX as u64);
        // Collisions are possible in principle but not for two draws in practice
        assert_ne!(a, b);
    }
}
