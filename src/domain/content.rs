//! Content identifiers and media categories.

use serde::{Deserialize, Serialize};

/// A content-addressing identifier (CID-like string).
///
/// The inner value is fixed at construction; there is no way to change the
/// identifier of an existing value, only to build a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Create a content ID, trimming surrounding whitespace
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty after trimming
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Category a media item is filed under.
///
/// Membership is a pure function of the item's MIME type, see
/// [`MediaCategory::from_mime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    /// `video/*`
    Video,

    /// `audio/*`
    Audio,

    /// `image/*`
    Picture,

    /// Anything else
    File,
}

impl MediaCategory {
    /// Fixed category order used for display and for share encoding
    pub const ALL: [MediaCategory; 4] = [
        MediaCategory::Video,
        MediaCategory::Audio,
        MediaCategory::Picture,
        MediaCategory::File,
    ];

    /// Classify a MIME type by its top-level type.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=binary`.
    pub fn from_mime(mime: &str) -> Self {
        let top = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if top.starts_with("video/") {
            MediaCategory::Video
        } else if top.starts_with("audio/") {
            MediaCategory::Audio
        } else if top.starts_with("image/") {
            MediaCategory::Picture
        } else {
            MediaCategory::File
        }
    }

    /// Name of the collection this category is persisted under
    pub fn collection_name(&self) -> &'static str {
        match self {
            MediaCategory::Video => "videos",
            MediaCategory::Audio => "audios",
            MediaCategory::Picture => "pictures",
            MediaCategory::File => "files",
        }
    }
}

impl std::fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaCategory::Video => write!(f, "video"),
            MediaCategory::Audio => write!(f, "audio"),
            MediaCategory::Picture => write!(f, "picture"),
            MediaCategory::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for MediaCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "video" | "videos" => Ok(MediaCategory::Video),
            "audio" | "audios" => Ok(MediaCategory::Audio),
            "picture" | "pictures" | "image" | "images" => Ok(MediaCategory::Picture),
            "file" | "files" => Ok(MediaCategory::File),
            _ => anyhow::bail!("Unknown media category: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_trims() {
        let id = ContentId::new("  QmAbc \n");
        assert_eq!(id.as_str(), "QmAbc");
        assert!(ContentId::new("   ").is_empty());
    }

    #[test]
    fn test_category_from_mime() {
        assert_eq!(MediaCategory::from_mime("video/mp4"), MediaCategory::Video);
        assert_eq!(MediaCategory::from_mime("audio/mpeg"), MediaCategory::Audio);
        assert_eq!(MediaCategory::from_mime("image/jpeg"), MediaCategory::Picture);
        assert_eq!(MediaCategory::from_mime("Image/PNG; q=1"), MediaCategory::Picture);
        assert_eq!(MediaCategory::from_mime("application/pdf"), MediaCategory::File);
        assert_eq!(MediaCategory::from_mime(""), MediaCategory::File);
        assert_eq!(MediaCategory::from_mime("videos"), MediaCategory::File);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("video".parse::<MediaCategory>().unwrap(), MediaCategory::Video);
        assert_eq!("pictures".parse::<MediaCategory>().unwrap(), MediaCategory::Picture);
        assert_eq!("image".parse::<MediaCategory>().unwrap(), MediaCategory::Picture);
        assert!("sharelink".parse::<MediaCategory>().is_err());
    }
}
