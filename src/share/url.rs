//! Share URL building and parsing.
//!
//! ```text
//! <origin>/share?json=<encoded value>
//! ```
//!
//! A share page without the `json` parameter lists the links shared with the
//! user instead of decoding anything.

use url::form_urlencoded;
use url::Url;

/// Path segment of the share page
pub const SHARE_PATH: &str = "share";

/// Query parameter carrying the encoded identifier list
pub const SHARE_PARAM: &str = "json";

/// Marker stripped from URLs that cannot be parsed
pub const SHARE_MARKER: &str = "share?json=";

/// Build the share URL for an encoded value
pub fn share_url(origin: &str, encoded_value: &str) -> String {
    let escaped: String = form_urlencoded::byte_serialize(encoded_value.as_bytes()).collect();
    format!(
        "{}/{}?{}={}",
        origin.trim().trim_end_matches('/'),
        SHARE_PATH,
        SHARE_PARAM,
        escaped
    )
}

/// Extract the encoded value from a share URL.
///
/// The value is the percent-decoded `json` query parameter. Strings that do
/// not parse as absolute URLs fall back to stripping everything up to and
/// including `share?json=`. Returns `None` when there is no non-empty value.
pub fn encoded_value_of(share_url: &str) -> Option<String> {
    let share_url = share_url.trim();

    let value = match Url::parse(share_url) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == SHARE_PARAM)
            .map(|(_, v)| v.into_owned()),
        Err(_) => share_url.find(SHARE_MARKER).and_then(|pos| {
            let rest = &share_url[pos + SHARE_MARKER.len()..];
            let raw = rest.split(['&', '#']).next().unwrap_or_default();
            form_urlencoded::parse(format!("{}={}", SHARE_PARAM, raw).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
        }),
    };

    value.filter(|v| !v.trim().is_empty())
}

/// What a share page should show for a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePage {
    /// Decode and show the collection in this encoded value
    Decode(String),

    /// List the links shared with this user
    SharedWithMe,
}

impl SharePage {
    /// Pick the page mode from a share URL
    pub fn from_url(url: &str) -> Self {
        match encoded_value_of(url) {
            Some(value) => SharePage::Decode(value),
            None => SharePage::SharedWithMe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url_escapes_value() {
        assert_eq!(
            share_url("https://h/", "QmA;bafyB;;"),
            "https://h/share?json=QmA%3BbafyB%3B%3B"
        );
    }

    #[test]
    fn test_value_round_trips_through_url() {
        let url = share_url("http://localhost:3000", "QmA;;@bafyB;");
        assert_eq!(encoded_value_of(&url).as_deref(), Some("QmA;;@bafyB;"));
    }

    #[test]
    fn test_unescaped_value() {
        assert_eq!(
            encoded_value_of("https://h/share?json=X;;;").as_deref(),
            Some("X;;;")
        );
        assert_eq!(
            encoded_value_of("https://h/share?json=X&utm=1").as_deref(),
            Some("X")
        );
    }

    #[test]
    fn test_relative_url_uses_marker() {
        assert_eq!(
            encoded_value_of("/share?json=Qm1%3B%3B%3B").as_deref(),
            Some("Qm1;;;")
        );
        assert_eq!(encoded_value_of("/share"), None);
    }

    #[test]
    fn test_page_mode() {
        assert_eq!(
            SharePage::from_url("https://h/share?json=Qm1"),
            SharePage::Decode("Qm1".to_string())
        );
        assert_eq!(SharePage::from_url("https://h/share"), SharePage::SharedWithMe);
        assert_eq!(SharePage::from_url("https://h/share?json="), SharePage::SharedWithMe);
    }
}
