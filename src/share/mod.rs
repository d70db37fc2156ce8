//! Sharing: turning selections into URLs and URLs back into collections.

pub mod codec;
pub mod url;

pub use codec::{
    encode, parse_query_value, DecodeError, DecodedShare, ShareDecoder, SkippedId, DELIMITER,
};
pub use url::{encoded_value_of, share_url, SharePage, SHARE_MARKER, SHARE_PARAM, SHARE_PATH};
