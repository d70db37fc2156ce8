//! Local library: persisted media items and share links.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.cidshare/
//! ├── library.db                # sqlite backend: kv_store table
//! └── library/                  # json backend
//!     ├── library-data.json     # the whole aggregate
//!     └── library-data.lock     # advisory write lock
//! ```

pub mod backend;
pub mod reconcile;
pub mod store;

pub use backend::{
    open_backend, BackendKind, JsonFileBackend, KvBackend, MemoryBackend, SqliteBackend,
    StoreError,
};
pub use reconcile::{Reconciler, ShareMembership};
pub use store::{LibraryStore, DEFAULT_KEY};
