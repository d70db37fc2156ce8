//! cidshare - content-addressed media resolution and sharing
//!
//! Turns bare content identifiers into working gateway URLs, packs sets of
//! identifiers into compact share links and unpacks them again, and keeps a
//! local library of media items and share links.
//!
//! # Architecture
//!
//! Playback flows one way: identifier → candidate URLs → resolver. Sharing
//! round-trips: selection → encode → URL → decode → reconcile → library.
//!
//! # Modules
//!
//! - `domain`: Data structures (MediaItem, ShareLink, LibraryData)
//! - `gateway`: Identifier classification and candidate URL generation
//! - `adapters`: Network seam (ContentFetcher) and the HTTP gateway client
//! - `resolver`: Ordered fallback over candidate URLs, with a source cache
//! - `share`: Share codec and share URL handling
//! - `library`: Persistent library store, storage backends, reconciler
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List candidate URLs for an identifier
//! cidshare candidates QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG
//!
//! # Share two items
//! cidshare share encode --video QmA... --picture bafyB... --save
//!
//! # Open a share someone sent
//! cidshare share open "http://localhost:3000/share?json=QmA...%3B%3BbafyB...%3B"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod library;
pub mod resolver;
pub mod share;

// Re-export main types at crate root for convenience
pub use adapters::{ContentFetcher, FetchError, GatewayClient};
pub use domain::{ContentId, LibraryData, LibraryEntry, MediaCategory, MediaItem, ShareLink};
pub use gateway::{classify, generate_candidates, preferred_url, CidScheme, GatewayConfig};
pub use library::{LibraryStore, Reconciler, ShareMembership, StoreError};
pub use resolver::{ContentResolver, Resolution, ResolveState, SourceCache};
pub use share::{encode, DecodeError, ShareDecoder, SharePage};
