//! Identifier classification.
//!
//! Pure string inspection, no network access.

use serde::{Deserialize, Serialize};

/// Prefix of legacy, hash-based identifiers (CIDv0, base58 multihash)
pub const V0_PREFIX: &str = "Qm";

/// Prefix of self-describing base32 identifiers (CIDv1)
pub const V1_PREFIX: &str = "bafy";

/// Addressing scheme of a content identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CidScheme {
    /// Legacy hash-based identifier (`Qm...`)
    V0,

    /// Self-describing base32 identifier (`bafy...`)
    V1,

    /// Not a content identifier; callers treat the string as a URL
    Unknown,
}

impl CidScheme {
    /// Whether this scheme names content (as opposed to a location)
    pub fn is_content_id(&self) -> bool {
        !matches!(self, CidScheme::Unknown)
    }
}

impl std::fmt::Display for CidScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CidScheme::V0 => write!(f, "v0"),
            CidScheme::V1 => write!(f, "v1"),
            CidScheme::Unknown => write!(f, "unknown"),
        }
    }
}

/// Determine the addressing scheme of an identifier
pub fn classify(id: &str) -> CidScheme {
    let id = id.trim();
    if id.starts_with(V0_PREFIX) {
        CidScheme::V0
    } else if id.starts_with(V1_PREFIX) {
        CidScheme::V1
    } else {
        CidScheme::Unknown
    }
}

/// Whether the string is already an absolute http(s) URL
pub fn is_url(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
