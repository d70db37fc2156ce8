//! Share link records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::{fresh_id, null_as_default, null_as_now};

/// A record of a shareable URL.
///
/// `is_owned` is fixed at creation: a link is either one this user created
/// ("my share") or one received from someone else ("shared with me").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    #[serde(default)]
    pub id: u64,

    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    /// Full share URL containing the encoded identifier list
    pub url: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(alias = "isMySpace")]
    is_owned: bool,

    /// The encoded query value, stored so membership checks do not have to
    /// re-derive it from `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_value: Option<String>,

    #[serde(default = "Utc::now", deserialize_with = "null_as_now")]
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    /// Create a link this user owns, for an already encoded query value
    pub fn new_owned(origin: &str, encoded_value: &str, title: impl Into<String>) -> Self {
        let url = crate::share::share_url(origin, encoded_value);
        let mut link = Self::build(url, title.into(), true);
        link.encoded_value = Some(encoded_value.to_string());
        link
    }

    /// Create a record for a link received from someone else
    pub fn new_received(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        let encoded_value = crate::share::encoded_value_of(&url);
        let mut link = Self::build(url, title.into(), false);
        link.encoded_value = encoded_value;
        link
    }

    fn build(url: String, title: String, is_owned: bool) -> Self {
        let (id, uuid) = fresh_id();
        Self {
            id,
            uuid,
            url,
            title,
            description: None,
            is_owned,
            encoded_value: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether this user created the link
    pub fn is_owned(&self) -> bool {
        self.is_owned
    }

    /// The encoded identifier list this link points at.
    ///
    /// Falls back to deriving it from `url` for records written without a
    /// stored value.
    pub fn share_value(&self) -> Option<String> {
        self.encoded_value
            .clone()
            .or_else(|| crate::share::encoded_value_of(&self.url))
    }
}
