//! Wiki engine tying the store client, cache and renderer together.
//!
//! Each public operation is a short orchestration:
//!
//! - **load**: a historical revision goes straight to the store; the latest
//!   revision is checked against a fresh listing and served from the cache
//!   when the cached number still matches
//! - **store**: optimistic-concurrency append; on success the new revision
//!   replaces the cache entry
//! - **list_versions**: retained revisions in ascending order with their
//!   creators' profiles
//! - **delete**: removes a revision and evicts the cache entry if it held it
//!
//! The cache is only mutated on the success path, and never after the request
//! context was cancelled or timed out.

use crate::cache::RevisionCache;
use crate::client::{
    Authorizer, DocumentStoreClient, ProfileService, RevisionStore, StoreOutcome,
};
use crate::config::WikiConfig;
use crate::content::{Renderer, RevisionContent};
use crate::context::RequestContext;
use crate::error::{Result, WikiError};
use crate::types::{Action, DocumentKey, RevisionNumber, UserId, UserProfile, Version};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators the engine is wired with.
pub struct WikiServices {
    pub store: Arc<dyn RevisionStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub renderer: Arc<dyn Renderer>,
    pub profiles: Arc<dyn ProfileService>,
}

/// Versioned wiki documents for one wiki.
pub struct WikiEngine {
    config: WikiConfig,
    client: DocumentStoreClient,
    cache: RevisionCache,
    renderer: Arc<dyn Renderer>,
    profiles: Arc<dyn ProfileService>,
}

impl WikiEngine {
    /// Create an engine with a cache sized from `config`.
    pub fn new(config: WikiConfig, services: WikiServices) -> Self {
        let cache = RevisionCache::with_capacity(config.cache_capacity);
        Self::with_cache(config, services, cache)
    }

    /// Create an engine around an explicitly built cache.
    pub fn with_cache(config: WikiConfig, services: WikiServices, cache: RevisionCache) -> Self {
        let client = DocumentStoreClient::new(services.store, services.authorizer, &config);
        Self {
            config,
            client,
            cache,
            renderer: services.renderer,
            profiles: services.profiles,
        }
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn cache(&self) -> &RevisionCache {
        &self.cache
    }

    // --- Load ---

    /// Load a revision by its textual number.
    ///
    /// An empty `version` asks for the latest revision. A malformed one also
    /// falls back to the latest revision. Returns `None` when the document (or
    /// the requested revision) does not exist.
    pub fn load(
        &self,
        ctx: &RequestContext,
        user: UserId,
        lang: &str,
        title: &str,
        version: &str,
    ) -> Result<Option<Arc<RevisionContent>>> {
        let key = DocumentKey::new(lang, title)?;
        let number = if version.is_empty() {
            RevisionNumber::LATEST
        } else {
            RevisionNumber::parse(version).unwrap_or_else(|e| {
                info!(key = %key, error = %e, "failed to parse wiki version, falling back to latest");
                RevisionNumber::LATEST
            })
        };
        self.load_revision(ctx, user, &key, number)
    }

    /// Load revision `number` of `key`, or the latest one when `number` is 0.
    ///
    /// A delete of the fetched revision landing between the fetch and the
    /// cache store leaves that revision cached until the next latest load
    /// re-lists and replaces it.
    pub fn load_revision(
        &self,
        ctx: &RequestContext,
        user: UserId,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<Option<Arc<RevisionContent>>> {
        let session = self.client.session(ctx, user, Action::Access)?;

        if !number.is_latest() {
            // Historical loads never touch the cache.
            return Ok(session.load_revision(key, number)?.map(Arc::new));
        }

        let revisions = session.list_revisions(key)?;
        let Some(latest) = revisions.iter().map(|r| r.number).max() else {
            return Ok(None);
        };

        if let Some(cached) = self.cache.get(key) {
            if cached.number() == latest {
                debug!(key = %key, number = latest.0, "latest revision served from cache");
                return Ok(Some(cached));
            }
        }

        let Some(content) = session.load_revision(key, RevisionNumber::LATEST)? else {
            return Ok(None);
        };
        ctx.check()?;

        let content = Arc::new(content);
        self.cache.put(key.clone(), Arc::clone(&content));
        Ok(Some(content))
    }

    // --- Store ---

    /// Store `source` on top of the revision numbered by `last`.
    ///
    /// `last` must parse as a revision number; it is never defaulted.
    pub fn store(
        &self,
        ctx: &RequestContext,
        user: UserId,
        lang: &str,
        title: &str,
        last: &str,
        source: String,
    ) -> Result<RevisionNumber> {
        let key = DocumentKey::new(lang, title)?;
        let expected = RevisionNumber::parse(last).map_err(|e| {
            warn!(key = %key, error = %e, "failed to parse wiki last version");
            e
        })?;
        self.store_revision(ctx, user, &key, expected, source)
    }

    /// Append `source` to `key` if its latest revision is still `expected`.
    ///
    /// Fails with [`WikiError::Conflict`] when another writer got there first.
    /// If the request is interrupted after the store accepted, the write stands
    /// but the cache is left alone and the interruption is reported.
    pub fn store_revision(
        &self,
        ctx: &RequestContext,
        user: UserId,
        key: &DocumentKey,
        expected: RevisionNumber,
        source: String,
    ) -> Result<RevisionNumber> {
        let session = self.client.session(ctx, user, Action::Create)?;

        match session.store_revision(key, expected, &source)? {
            StoreOutcome::Rejected { latest } => {
                info!(key = %key, expected = expected.0, latest = latest.0, "wiki base version outdated");
                Err(WikiError::Conflict {
                    key: key.clone(),
                    expected,
                })
            }
            StoreOutcome::Accepted(number) => {
                ctx.check()?;
                self.cache
                    .put(key.clone(), Arc::new(RevisionContent::new(number, source)));
                Ok(number)
            }
        }
    }

    // --- Listing ---

    /// Retained revisions of a document, oldest first, with creator profiles.
    pub fn list_versions(
        &self,
        ctx: &RequestContext,
        user: UserId,
        lang: &str,
        title: &str,
    ) -> Result<Vec<Version>> {
        let key = DocumentKey::new(lang, title)?;
        self.list_key_versions(ctx, user, &key)
    }

    /// Retained revisions of `key`, oldest first, with creator profiles.
    pub fn list_key_versions(
        &self,
        ctx: &RequestContext,
        user: UserId,
        key: &DocumentKey,
    ) -> Result<Vec<Version>> {
        let session = self.client.session(ctx, user, Action::Access)?;

        let mut revisions = session.list_revisions(key)?;
        if revisions.is_empty() {
            return Ok(Vec::new());
        }
        revisions.sort_by_key(|r| r.number);

        // No dedup: the profile service accepts repeated ids.
        let creators: Vec<UserId> = revisions.iter().map(|r| r.creator).collect();
        ctx.check()?;
        let profiles = self.profiles.get_profiles(ctx, &creators).map_err(|e| {
            if e.is_interrupted() {
                return e;
            }
            warn!(key = %key, error = %e, "original profile error");
            match e {
                WikiError::Technical(_) => e,
                other => WikiError::Technical(other.to_string()),
            }
        })?;

        Ok(revisions
            .into_iter()
            .map(|r| Version {
                number: r.number,
                creator: profiles
                    .get(&r.creator)
                    .cloned()
                    .unwrap_or_else(|| UserProfile::unknown(r.creator)),
            })
            .collect())
    }

    // --- Delete ---

    /// Delete the revision numbered by `version`.
    ///
    /// `version` must parse as a non-zero revision number.
    pub fn delete(
        &self,
        ctx: &RequestContext,
        user: UserId,
        lang: &str,
        title: &str,
        version: &str,
    ) -> Result<()> {
        let key = DocumentKey::new(lang, title)?;
        let number = RevisionNumber::parse(version).map_err(|e| {
            warn!(key = %key, error = %e, "failed to parse wiki version to delete");
            e
        })?;
        self.delete_revision(ctx, user, &key, number)
    }

    /// Delete revision `number` of `key`.
    ///
    /// The cache entry is evicted only if it holds exactly that revision.
    pub fn delete_revision(
        &self,
        ctx: &RequestContext,
        user: UserId,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<()> {
        if number.is_latest() {
            return Err(WikiError::InvalidArgument(
                "revision 0 cannot be deleted".into(),
            ));
        }
        let session = self.client.session(ctx, user, Action::Delete)?;

        if !session.delete_revision(key, number)? {
            return Err(WikiError::UpdateRejected {
                key: key.clone(),
                number,
            });
        }
        ctx.check()?;

        self.cache.invalidate_revision(key, number);
        Ok(())
    }

    /// Whether `user` may delete revisions of this wiki.
    pub fn delete_right(&self, ctx: &RequestContext, user: UserId) -> bool {
        self.client.permits(ctx, user, Action::Delete)
    }

    // --- Rendering ---

    /// Rendered form of `content`, computed once per content.
    pub fn rendered(&self, ctx: &RequestContext, content: &RevisionContent) -> Result<Arc<str>> {
        content.rendered(ctx, &*self.renderer).map_err(|e| {
            if !e.is_interrupted() {
                warn!(number = content.number().0, error = %e, "render failed");
            }
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AllowAll, LoadedRevision};
    use crate::memory::MemoryRevisionStore;
    use crate::types::RevisionSummary;
    use std::collections::HashMap;

    fn echo_renderer() -> Arc<dyn Renderer> {
        Arc::new(|_: &RequestContext, s: &str| -> Result<String> { Ok(format!("<p>{s}</p>")) })
    }

    fn engine_with(store: Arc<dyn RevisionStore>) -> WikiEngine {
        WikiEngine::new(
            WikiConfig::new(1, 1),
            WikiServices {
                store,
                authorizer: Arc::new(AllowAll),
                renderer: echo_renderer(),
                profiles: Arc::new(HashMap::<UserId, UserProfile>::new()),
            },
        )
    }

    /// Lists revisions out of order to exercise sorting.
    struct ShuffledStore;

    impl RevisionStore for ShuffledStore {
        fn list_revisions(
            &self,
            _: &RequestContext,
            _: u64,
            _: &DocumentKey,
        ) -> Result<Vec<RevisionSummary>> {
            Ok([7, 2, 40, 5]
                .iter()
                .map(|n| RevisionSummary {
                    number: RevisionNumber(*n),
                    creator: UserId(*n),
                })
                .collect())
        }

        fn load_revision(
            &self,
            _: &RequestContext,
            _: u64,
            _: &DocumentKey,
            _: RevisionNumber,
        ) -> Result<LoadedRevision> {
            Ok(LoadedRevision {
                number: RevisionNumber(40),
                source: "latest".into(),
            })
        }

        fn store_revision(
            &self,
            _: &RequestContext,
            _: u64,
            _: &DocumentKey,
            _: UserId,
            _: RevisionNumber,
            _: &str,
        ) -> Result<StoreOutcome> {
            Err(WikiError::Technical("read only".into()))
        }

        fn delete_revision(
            &self,
            _: &RequestContext,
            _: u64,
            _: &DocumentKey,
            _: RevisionNumber,
        ) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_list_versions_sorted_with_unknown_profiles() {
        let engine = engine_with(Arc::new(ShuffledStore));
        let ctx = RequestContext::background();

        let versions = engine.list_versions(&ctx, UserId(1), "en", "Home").unwrap();
        let numbers: Vec<u64> = versions.iter().map(|v| v.number.0).collect();
        assert_eq!(numbers, vec![2, 5, 7, 40]);
        assert_eq!(versions[0].creator, UserProfile::unknown(UserId(2)));
    }

    #[test]
    fn test_latest_is_max_of_unordered_listing() {
        let engine = engine_with(Arc::new(ShuffledStore));
        let ctx = RequestContext::background();

        let content = engine.load(&ctx, UserId(1), "en", "Home", "").unwrap().unwrap();
        assert_eq!(content.number(), RevisionNumber(40));
        assert_eq!(
            engine.cache().get(&DocumentKey::new("en", "Home").unwrap()).unwrap().number(),
            RevisionNumber(40)
        );
    }

    #[test]
    fn test_malformed_load_version_falls_back_to_latest() {
        let store = Arc::new(MemoryRevisionStore::new());
        let engine = engine_with(store);
        let ctx = RequestContext::background();

        engine
            .store(&ctx, UserId(1), "en", "Home", "0", "hello".into())
            .unwrap();
        let content = engine.load(&ctx, UserId(1), "en", "Home", "abc").unwrap().unwrap();
        assert_eq!(content.number(), RevisionNumber(1));
    }

    #[test]
    fn test_malformed_store_and_delete_arguments_rejected() {
        let store = Arc::new(MemoryRevisionStore::new());
        let engine = engine_with(Arc::clone(&store) as Arc<dyn RevisionStore>);
        let ctx = RequestContext::background();

        assert!(matches!(
            engine.store(&ctx, UserId(1), "en", "Home", "", "x".into()),
            Err(WikiError::InvalidArgument(_))
        ));
        for last in ["+0", " 0", "0 "] {
            assert!(matches!(
                engine.store(&ctx, UserId(1), "en", "Home", last, "x".into()),
                Err(WikiError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            engine.delete(&ctx, UserId(1), "en", "Home", "one"),
            Err(WikiError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.delete(&ctx, UserId(1), "en", "Home", "0"),
            Err(WikiError::InvalidArgument(_))
        ));
        assert_eq!(store.call_counts().total(), 0);
    }

    #[test]
    fn test_rendered_through_engine_is_memoized_on_cached_content() {
        let store = Arc::new(MemoryRevisionStore::new());
        let engine = engine_with(store);
        let ctx = RequestContext::background();

        engine
            .store(&ctx, UserId(1), "en", "Home", "0", "hi".into())
            .unwrap();
        let first = engine.load(&ctx, UserId(1), "en", "Home", "").unwrap().unwrap();
        assert_eq!(&*engine.rendered(&ctx, &first).unwrap(), "<p>hi</p>");

        let second = engine.load(&ctx, UserId(1), "en", "Home", "").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.is_rendered());
    }

    #[test]
    fn test_invalid_key_rejected_before_any_call() {
        let store = Arc::new(MemoryRevisionStore::new());
        let engine = engine_with(Arc::clone(&store) as Arc<dyn RevisionStore>);
        let ctx = RequestContext::background();

        assert!(matches!(
            engine.load(&ctx, UserId(1), "en/us", "Home", ""),
            Err(WikiError::InvalidArgument(_))
        ));
        assert_eq!(store.call_counts().total(), 0);
    }
}
