//! # Wiki Revisions
//!
//! Versioned wiki documents backed by a remote, version-authoritative store.
//!
//! ## Core Concepts
//!
//! - **Revisions**: Numbered, append-only edits of a document (`lang/title`)
//! - **Optimistic concurrency**: A write names the revision it was based on and
//!   is rejected if another writer got there first
//! - **Latest-revision cache**: The newest known revision of each document,
//!   verified against a cheap listing before being served
//! - **Lazy rendering**: Each revision renders its source at most once
//!
//! ## Example
//!
//! ```ignore
//! use wiki_revisions::{AllowAll, MemoryRevisionStore, RequestContext, UserId, WikiConfig,
//!     WikiEngine, WikiServices};
//!
//! let engine = WikiEngine::new(WikiConfig::new(1, 1), WikiServices {
//!     store: Arc::new(MemoryRevisionStore::new()),
//!     authorizer: Arc::new(AllowAll),
//!     renderer: Arc::new(markdown_to_html),
//!     profiles: Arc::new(profiles),
//! });
//!
//! let ctx = RequestContext::with_timeout(Duration::from_secs(5));
//! let number = engine.store(&ctx, UserId(1), "en", "Home", "0", "# Welcome".into())?;
//!
//! // Served from the cache: only a listing call reaches the store.
//! let page = engine.load(&ctx, UserId(1), "en", "Home", "")?.unwrap();
//! let html = engine.rendered(&ctx, &page)?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod content;
pub mod context;
pub mod engine;
pub mod error;
pub mod memory;
pub mod types;

// Re-exports
pub use cache::{CacheStats, RevisionCache};
pub use client::{
    AllowAll, Authorizer, DenyAll, DocumentStoreClient, LoadedRevision, ProfileService,
    RevisionStore, StoreOutcome, StoreSession,
};
pub use config::WikiConfig;
pub use content::{Renderer, RevisionContent};
pub use context::RequestContext;
pub use engine::{WikiEngine, WikiServices};
pub use error::{Result, WikiError};
pub use memory::{MemoryRevisionStore, StoreCallCounts};
pub use types::*;
