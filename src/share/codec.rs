//! Share codec: identifier lists in, categorized collections out.
//!
//! Encoding joins the content ids of a selection with `;`, category by
//! category in fixed order (videos, audios, pictures, files). Empty categories
//! still contribute their delimiter, so a single video encodes as `id;;;`.
//!
//! Decoding splits the value, fetches each identifier and files it by the
//! response's declared content type. Media bodies are never downloaded. A JSON
//! response is read as a manifest (a library-shaped object) and its
//! collections are merged in.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{ContentFetcher, FetchedContent};
use crate::domain::{fresh_id, LibraryData, MediaCategory, MediaItem};
use crate::gateway::{generate_candidates, normalize_url, GatewayConfig};

/// Separator between identifiers (never valid inside an identifier)
pub const DELIMITER: char = ';';

/// Optional prefix stripped from identifiers when decoding
pub const ESCAPE_PREFIX: char = '@';

/// Errors that end a decode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("No valid CIDs found")]
    NoIdentifiers,

    #[error("No valid files could be loaded")]
    NoValidFiles,

    #[error("Share decode cancelled")]
    Cancelled,
}

/// Encode a selection into a share query value
pub fn encode(selected: &LibraryData) -> String {
    MediaCategory::ALL
        .iter()
        .map(|&category| {
            selected
                .items(category)
                .iter()
                .map(|item| item.content_id().as_str())
                .filter(|id| {
                    if id.contains(DELIMITER) {
                        warn!(%id, "Skipping identifier containing the share delimiter");
                        false
                    } else {
                        true
                    }
                })
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Split a share query value into identifiers.
///
/// Segments are trimmed, empty segments dropped, and a leading `@` removed.
pub fn parse_query_value(value: &str) -> Vec<String> {
    value
        .split(DELIMITER)
        .map(str::trim)
        .map(|s| s.strip_prefix(ESCAPE_PREFIX).unwrap_or(s).trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// An identifier that contributed nothing to a decode
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedId {
    pub id: String,
    pub reason: String,
}

/// Decode result with per-identifier failures
#[derive(Debug, Clone)]
pub struct DecodedShare {
    pub data: LibraryData,
    pub skipped: Vec<SkippedId>,
}

/// What one identifier produced
enum Decoded {
    Item(MediaItem),
    Manifest(LibraryData),
}

/// Decodes share values by fetching every identifier
pub struct ShareDecoder {
    fetcher: Arc<dyn ContentFetcher>,
    gateway: GatewayConfig,
    concurrency: usize,
}

impl ShareDecoder {
    /// Create a sequential decoder
    pub fn new(fetcher: Arc<dyn ContentFetcher>, gateway: GatewayConfig) -> Self {
        Self {
            fetcher,
            gateway,
            concurrency: 1,
        }
    }

    /// Allow up to `n` identifiers in flight. Results keep input order.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// The URL fetched for an identifier.
    ///
    /// Strings mentioning a known gateway domain are used as-is (with a scheme
    /// added if missing); anything else takes its first gateway candidate.
    pub fn fetch_url(&self, id: &str) -> Option<String> {
        if self.gateway.is_gateway_url(id) {
            return Some(normalize_url(id));
        }
        generate_candidates(&self.gateway, id, None).into_iter().next()
    }

    /// Decode a share query value into categorized collections
    pub async fn decode(&self, value: &str) -> Result<LibraryData, DecodeError> {
        self.decode_detailed(value, &CancellationToken::new())
            .await
            .map(|d| d.data)
    }

    /// Decode, reporting skipped identifiers, until done or cancelled.
    ///
    /// Fails with [`DecodeError::NoValidFiles`] only when nothing at all
    /// could be loaded.
    pub async fn decode_detailed(
        &self,
        value: &str,
        token: &CancellationToken,
    ) -> Result<DecodedShare, DecodeError> {
        let ids = parse_query_value(value);
        if ids.is_empty() {
            return Err(DecodeError::NoIdentifiers);
        }
        debug!(count = ids.len(), concurrency = self.concurrency, "Decoding share");

        let work = stream::iter(ids.into_iter().enumerate())
            .map(|(index, id)| async move {
                let result = self.decode_one(index, &id).await;
                (id, result)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>();

        let results = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DecodeError::Cancelled),
            results = work => results,
        };

        let mut data = LibraryData::new();
        let mut skipped = Vec::new();

        for (id, result) in results {
            match result {
                Ok(Decoded::Item(item)) => {
                    data.push_classified(item);
                }
                Ok(Decoded::Manifest(manifest)) => {
                    data.merge_media(manifest);
                }
                Err(reason) => {
                    warn!(%id, %reason, "Skipping identifier");
                    skipped.push(SkippedId { id, reason });
                }
            }
        }

        if data.is_media_empty() {
            return Err(DecodeError::NoValidFiles);
        }

        data.reassign_duplicate_ids();
        info!(
            items = data.media_len(),
            skipped = skipped.len(),
            "Share decoded"
        );

        Ok(DecodedShare { data, skipped })
    }

    async fn decode_one(&self, index: usize, id: &str) -> Result<Decoded, String> {
        let url = self
            .fetch_url(id)
            .ok_or_else(|| "not a content identifier or gateway URL".to_string())?;

        let content = self.fetcher.fetch(&url).await.map_err(|e| e.to_string())?;

        if content.is_json() {
            let manifest = LibraryData::from_manifest(&content.body)
                .map_err(|e| format!("invalid manifest JSON from {}: {}", url, e))?;
            debug!(%id, items = manifest.media_len(), "Merged manifest");
            return Ok(Decoded::Manifest(manifest));
        }

        Ok(Decoded::Item(synthesize_item(index, id, content)))
    }
}

/// Build a media item for a fetched identifier
fn synthesize_item(index: usize, id: &str, content: FetchedContent) -> MediaItem {
    let (item_id, uuid) = fresh_id();
    let mut item = MediaItem::new(id, content.content_type)
        .with_title(format!("Shared File {}", index + 1))
        .with_description("Shared via CID")
        .with_content_uri(content.url);
    item.size_bytes = content.content_length;
    item.id = item_id;
    item.uuid = Some(uuid);
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(videos: &[&str], audios: &[&str], pictures: &[&str], files: &[&str]) -> LibraryData {
        let mut data = LibraryData::new();
        data.videos = videos.iter().map(|id| MediaItem::new(*id, "video/mp4")).collect();
        data.audios = audios.iter().map(|id| MediaItem::new(*id, "audio/mpeg")).collect();
        data.pictures = pictures.iter().map(|id| MediaItem::new(*id, "image/png")).collect();
        data.files = files.iter().map(|id| MediaItem::new(*id, "")).collect();
        data
    }

    #[test]
    fn test_encode_single_video() {
        assert_eq!(encode(&selection(&["bafyABC"], &[], &[], &[])), "bafyABC;;;");
    }

    #[test]
    fn test_encode_keeps_category_and_selection_order() {
        let value = encode(&selection(&["Qv1", "Qv2"], &["Qa1"], &[], &["Qf1"]));
        assert_eq!(value, "Qv1;Qv2;Qa1;;Qf1");
    }

    #[test]
    fn test_encode_empty_selection() {
        assert_eq!(encode(&LibraryData::new()), ";;;");
    }

    #[test]
    fn test_parse_query_value() {
        assert_eq!(
            parse_query_value(" Qm1 ;;@bafy2;; @ ;Qm3"),
            vec!["Qm1", "bafy2", "Qm3"]
        );
        assert!(parse_query_value(";;;").is_empty());
    }

    #[test]
    fn test_encode_then_parse() {
        let value = encode(&selection(&["Qm1"], &["bafy2"], &["Qm3"], &["bafy4"]));
        assert_eq!(parse_query_value(&value), vec!["Qm1", "bafy2", "Qm3", "bafy4"]);
    }
}
