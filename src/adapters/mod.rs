//! Adapter interfaces for content gateways.
//!
//! Adapters give the resolver and the share codec one seam for talking to
//! the network. The production adapter is [`GatewayClient`]; tests plug in
//! scripted fetchers.

pub mod gateway_client;

use async_trait::async_trait;
use thiserror::Error;

pub use gateway_client::GatewayClient;

/// Response metadata from a successful load attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// The URL that answered
    pub url: String,

    /// Declared content type (if any)
    pub content_type: Option<String>,

    /// Declared content length (if any)
    pub content_length: Option<u64>,
}

impl SourceInfo {
    /// Create source info with just a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
            content_length: None,
        }
    }
}

/// Largest manifest body a fetch will read
pub const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

/// Whether a content type declares a JSON manifest
pub fn is_json_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

/// A fetched response.
///
/// Only JSON manifests carry a body; for anything else `body` is empty and
/// the size comes from the declared content length.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,

    /// Declared content type, empty when the gateway sent none
    pub content_type: String,

    /// Declared content length (if any)
    pub content_length: Option<u64>,

    pub body: Vec<u8>,
}

impl FetchedContent {
    /// Whether the response declares a JSON manifest
    pub fn is_json(&self) -> bool {
        is_json_type(&self.content_type)
    }
}

/// Errors from a single fetch or load attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("{url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("{url} manifest exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Trait for gateway adapters
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Attempt to load a source without reading its body.
    ///
    /// Success means the URL answered with a 2xx status.
    async fn probe(&self, url: &str) -> Result<SourceInfo, FetchError>;

    /// Fetch a URL's headers, reading the body only for a JSON manifest.
    ///
    /// Manifest bodies larger than [`MAX_MANIFEST_BYTES`] are refused.
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json() {
        let content = FetchedContent {
            url: "u".to_string(),
            content_type: "Application/JSON; charset=utf-8".to_string(),
            content_length: None,
            body: Vec::new(),
        };
        assert!(content.is_json());

        let content = FetchedContent {
            content_type: "image/png".to_string(),
            ..content
        };
        assert!(!content.is_json());
    }
}
