//! Domain types for cidshare.
//!
//! This module contains the core data structures:
//! - ContentId / MediaCategory: identifiers and MIME-derived categories
//! - MediaItem: one addressable piece of content
//! - ShareLink: a created or received share URL
//! - LibraryData: the persisted per-profile aggregate

pub mod content;
pub mod library;
pub mod media;
pub mod share_link;

// Re-export commonly used types
pub use content::{ContentId, MediaCategory};
pub use library::{LibraryData, LibraryEntry};
pub use media::{fresh_id, MediaItem};
pub use share_link::ShareLink;
