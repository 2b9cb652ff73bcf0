//! Authorizing client of the revision store.

use super::capabilities::{Authorizer, LoadedRevision, RevisionStore, StoreOutcome};
use crate::config::WikiConfig;
use crate::content::RevisionContent;
use crate::context::RequestContext;
use crate::error::{Result, WikiError};
use crate::types::{Action, DocumentKey, RevisionNumber, RevisionSummary, UserId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed, authorized access to a [`RevisionStore`].
///
/// Failures of the store are logged and reported as
/// [`WikiError::Technical`]; nothing is retried here.
pub struct DocumentStoreClient {
    store: Arc<dyn RevisionStore>,
    authorizer: Arc<dyn Authorizer>,
    wiki_id: u64,
    group_id: u64,
}

impl DocumentStoreClient {
    pub fn new(
        store: Arc<dyn RevisionStore>,
        authorizer: Arc<dyn Authorizer>,
        config: &WikiConfig,
    ) -> Self {
        Self {
            store,
            authorizer,
            wiki_id: config.wiki_id,
            group_id: config.group_id,
        }
    }

    pub fn wiki_id(&self) -> u64 {
        self.wiki_id
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Check that `user` may perform `action`, and open a session for it.
    pub fn session(
        &self,
        ctx: &RequestContext,
        user: UserId,
        action: Action,
    ) -> Result<StoreSession<'_>> {
        ctx.check()?;
        self.authorizer
            .authorize(ctx, user, self.group_id, action)
            .map_err(|e| {
                debug!(user = user.0, action = %action, error = %e, "authorization failed");
                e
            })?;
        Ok(StoreSession {
            client: self,
            ctx: ctx.clone(),
            user,
            action,
        })
    }

    /// Whether `user` may perform `action`. Errors count as a denial.
    pub fn permits(&self, ctx: &RequestContext, user: UserId, action: Action) -> bool {
        self.session(ctx, user, action).is_ok()
    }
}

/// Store access granted for one user and one action.
pub struct StoreSession<'a> {
    client: &'a DocumentStoreClient,
    ctx: RequestContext,
    user: UserId,
    action: Action,
}

impl StoreSession<'_> {
    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Every retained revision of `key`; may be empty.
    pub fn list_revisions(&self, key: &DocumentKey) -> Result<Vec<RevisionSummary>> {
        self.require(&[Action::Access])?;
        self.client
            .store
            .list_revisions(&self.ctx, self.client.wiki_id, key)
            .map_err(|e| technical("list", key, e))
    }

    /// Revision `number` of `key` (0 for the latest), `None` if the store has none.
    pub fn load_revision(
        &self,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<Option<RevisionContent>> {
        self.require(&[Action::Access])?;
        let LoadedRevision {
            number: loaded,
            source,
        } = self
            .client
            .store
            .load_revision(&self.ctx, self.client.wiki_id, key, number)
            .map_err(|e| technical("load", key, e))?;

        if loaded.is_latest() {
            return Ok(None);
        }
        Ok(Some(RevisionContent::new(loaded, source)))
    }

    /// Append `source` on top of `expected`.
    pub fn store_revision(
        &self,
        key: &DocumentKey,
        expected: RevisionNumber,
        source: &str,
    ) -> Result<StoreOutcome> {
        self.require(&[Action::Create, Action::Update])?;
        self.client
            .store
            .store_revision(
                &self.ctx,
                self.client.wiki_id,
                key,
                self.user,
                expected,
                source,
            )
            .map_err(|e| technical("store", key, e))
    }

    /// Delete revision `number` of `key`. Returns whether the store accepted.
    pub fn delete_revision(&self, key: &DocumentKey, number: RevisionNumber) -> Result<bool> {
        self.require(&[Action::Delete])?;
        self.client
            .store
            .delete_revision(&self.ctx, self.client.wiki_id, key, number)
            .map_err(|e| technical("delete", key, e))
    }

    fn require(&self, allowed: &[Action]) -> Result<()> {
        self.ctx.check()?;
        if allowed.contains(&self.action) {
            Ok(())
        } else {
            warn!(user = self.user.0, granted = %self.action, "store call outside granted action");
            Err(WikiError::NotAuthorized)
        }
    }
}

/// Classify a store failure, logging the original error.
fn technical(op: &'static str, key: &DocumentKey, err: WikiError) -> WikiError {
    if err.is_interrupted() {
        return err;
    }
    warn!(op, key = %key, error = %err, "original store error");
    match err {
        WikiError::Technical(_) => err,
        other => WikiError::Technical(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AllowAll, DenyAll};
    use crate::memory::MemoryRevisionStore;

    fn key() -> DocumentKey {
        DocumentKey::new("en", "Home").unwrap()
    }

    fn client(store: Arc<MemoryRevisionStore>, authorizer: Arc<dyn Authorizer>) -> DocumentStoreClient {
        DocumentStoreClient::new(store, authorizer, &WikiConfig::new(1, 5))
    }

    #[test]
    fn test_denied_session_makes_no_call() {
        let store = Arc::new(MemoryRevisionStore::new());
        let client = client(Arc::clone(&store), Arc::new(DenyAll));
        let ctx = RequestContext::background();

        assert!(matches!(
            client.session(&ctx, UserId(1), Action::Access),
            Err(WikiError::NotAuthorized)
        ));
        assert_eq!(store.call_counts().total(), 0);
        assert!(!client.permits(&ctx, UserId(1), Action::Delete));
    }

    #[test]
    fn test_authorizer_sees_group_and_action() {
        let store = Arc::new(MemoryRevisionStore::new());
        let authorizer = |user: UserId, group: u64, action: Action| {
            user == UserId(9) && group == 5 && action == Action::Delete
        };
        let client = client(store, Arc::new(authorizer));
        let ctx = RequestContext::background();

        assert!(client.permits(&ctx, UserId(9), Action::Delete));
        assert!(!client.permits(&ctx, UserId(9), Action::Access));
        assert!(!client.permits(&ctx, UserId(2), Action::Delete));
    }

    #[test]
    fn test_session_limited_to_its_action() {
        let store = Arc::new(MemoryRevisionStore::new());
        let client = client(Arc::clone(&store), Arc::new(AllowAll));
        let ctx = RequestContext::background();

        let session = client.session(&ctx, UserId(1), Action::Access).unwrap();
        assert!(matches!(
            session.delete_revision(&key(), RevisionNumber(1)),
            Err(WikiError::NotAuthorized)
        ));
        assert!(matches!(
            session.store_revision(&key(), RevisionNumber(0), "x"),
            Err(WikiError::NotAuthorized)
        ));
        assert_eq!(store.call_counts().total(), 0);
    }

    #[test]
    fn test_update_session_may_store() {
        let store = Arc::new(MemoryRevisionStore::new());
        let editors = |_: UserId, _: u64, action: Action| action == Action::Update;
        let client = client(Arc::clone(&store), Arc::new(editors));
        let ctx = RequestContext::background();

        assert!(!client.permits(&ctx, UserId(1), Action::Create));
        let session = client.session(&ctx, UserId(1), Action::Update).unwrap();
        assert_eq!(
            session.store_revision(&key(), RevisionNumber(0), "edit").unwrap(),
            StoreOutcome::Accepted(RevisionNumber(1))
        );
        assert!(matches!(
            session.delete_revision(&key(), RevisionNumber(1)),
            Err(WikiError::NotAuthorized)
        ));
    }

    #[test]
    fn test_load_absent_maps_to_none() {
        let store = Arc::new(MemoryRevisionStore::new());
        let client = client(store, Arc::new(AllowAll));
        let ctx = RequestContext::background();

        let session = client.session(&ctx, UserId(1), Action::Access).unwrap();
        assert!(session.load_revision(&key(), RevisionNumber(0)).unwrap().is_none());
        assert!(session.list_revisions(&key()).unwrap().is_empty());
    }

    #[test]
    fn test_store_then_load() {
        let store = Arc::new(MemoryRevisionStore::new());
        let client = client(store, Arc::new(AllowAll));
        let ctx = RequestContext::background();

        let writer = client.session(&ctx, UserId(3), Action::Create).unwrap();
        let outcome = writer.store_revision(&key(), RevisionNumber(0), "hello").unwrap();
        assert_eq!(outcome, StoreOutcome::Accepted(RevisionNumber(1)));

        let reader = client.session(&ctx, UserId(4), Action::Access).unwrap();
        let content = reader.load_revision(&key(), RevisionNumber(1)).unwrap().unwrap();
        assert_eq!(content.number(), RevisionNumber(1));
        assert_eq!(content.source(), "hello");

        let listed = reader.list_revisions(&key()).unwrap();
        assert_eq!(
            listed,
            vec![RevisionSummary {
                number: RevisionNumber(1),
                creator: UserId(3),
            }]
        );
    }

    #[test]
    fn test_store_failure_is_technical() {
        let store = Arc::new(MemoryRevisionStore::new());
        store.set_available(false);
        let client = client(Arc::clone(&store), Arc::new(AllowAll));
        let ctx = RequestContext::background();

        let session = client.session(&ctx, UserId(1), Action::Access).unwrap();
        assert!(matches!(
            session.list_revisions(&key()),
            Err(WikiError::Technical(_))
        ));
    }

    #[test]
    fn test_cancelled_session_makes_no_call() {
        let store = Arc::new(MemoryRevisionStore::new());
        let client = client(Arc::clone(&store), Arc::new(AllowAll));
        let ctx = RequestContext::background();

        let session = client.session(&ctx, UserId(1), Action::Access).unwrap();
        ctx.cancel();
        assert!(matches!(
            session.list_revisions(&key()),
            Err(WikiError::Cancelled)
        ));
        assert_eq!(store.call_counts().total(), 0);
    }
}
