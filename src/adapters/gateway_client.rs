//! HTTP adapter for content gateways.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Response;
use tracing::debug;

use super::{
    is_json_type, ContentFetcher, FetchError, FetchedContent, SourceInfo, MAX_MANIFEST_BYTES,
};

/// Gateway HTTP client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// HTTP client
    client: reqwest::Client,

    /// Per-request timeout
    timeout: Duration,
}

impl Default for GatewayClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl GatewayClient {
    /// Create a client with a per-request timeout
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cidshare/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client, timeout }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let request = self.client.get(url).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Open a URL as a byte stream for playback or download
    pub async fn open_stream(
        &self,
        url: &str,
    ) -> Result<impl Stream<Item = Result<Vec<u8>, FetchError>>, FetchError> {
        let response = self.get(url).await?;
        let url = url.to_string();

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map(move |r| {
                r.map_err(|source| FetchError::Request {
                    url: url.clone(),
                    source,
                })
            }))
    }
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

#[async_trait]
impl ContentFetcher for GatewayClient {
    fn name(&self) -> &str {
        "gateway-http"
    }

    async fn probe(&self, url: &str) -> Result<SourceInfo, FetchError> {
        let response = self.get(url).await?;

        let info = SourceInfo {
            url: url.to_string(),
            content_type: header_str(&response, CONTENT_TYPE),
            content_length: header_str(&response, CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        };
        debug!(%url, content_type = ?info.content_type, "Source answered");

        // Dropping the response abandons the body
        Ok(info)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let response = self.get(url).await?;
        let content_type = header_str(&response, CONTENT_TYPE).unwrap_or_default();
        let content_length = header_str(&response, CONTENT_LENGTH).and_then(|v| v.parse().ok());

        if !is_json_type(&content_type) {
            debug!(%url, %content_type, ?content_length, "Fetched headers");
            return Ok(FetchedContent {
                url: url.to_string(),
                content_type,
                content_length,
                body: Vec::new(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: MAX_MANIFEST_BYTES,
        };
        if content_length.is_some_and(|len| len > MAX_MANIFEST_BYTES) {
            return Err(too_large());
        }

        let read = async {
            let mut body = Vec::new();
            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;
                if (body.len() + chunk.len()) as u64 > MAX_MANIFEST_BYTES {
                    return Err(too_large());
                }
                body.extend_from_slice(&chunk);
            }
            Ok(body)
        };

        let body = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        Ok(FetchedContent {
            url: url.to_string(),
            content_type,
            content_length,
            body,
        })
    }
}
