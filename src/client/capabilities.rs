//! Collaborator traits.

use crate::context::RequestContext;
use crate::error::{Result, WikiError};
use crate::types::{Action, DocumentKey, RevisionNumber, RevisionSummary, UserId, UserProfile};
use std::collections::HashMap;

/// Content returned by the store for a load request.
///
/// `number == 0` means the store holds no such revision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadedRevision {
    pub number: RevisionNumber,
    pub source: String,
}

/// Answer of the store to an optimistic-concurrency write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The write was appended under this number.
    Accepted(RevisionNumber),
    /// Another writer advanced the document; nothing was written.
    Rejected { latest: RevisionNumber },
}

impl StoreOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, StoreOutcome::Accepted(_))
    }
}

/// Remote store of numbered document revisions.
///
/// Every call is scoped by a wiki id. Implementations return whatever error
/// their transport produces; the client classifies it.
pub trait RevisionStore: Send + Sync {
    /// All retained revisions of `key`, in any order.
    fn list_revisions(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
    ) -> Result<Vec<RevisionSummary>>;

    /// Revision `number` of `key`, or the latest one when `number` is 0.
    fn load_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<LoadedRevision>;

    /// Append `source` if the latest revision is still `expected`.
    fn store_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        creator: UserId,
        expected: RevisionNumber,
        source: &str,
    ) -> Result<StoreOutcome>;

    /// Delete revision `number`. Returns whether the store accepted.
    fn delete_revision(
        &self,
        ctx: &RequestContext,
        wiki_id: u64,
        key: &DocumentKey,
        number: RevisionNumber,
    ) -> Result<bool>;
}

/// Permission check guarding store calls.
pub trait Authorizer: Send + Sync {
    /// `Ok(())` if `user` may perform `action` on `group_id`.
    fn authorize(
        &self,
        ctx: &RequestContext,
        user: UserId,
        group_id: u64,
        action: Action,
    ) -> Result<()>;
}

impl<F> Authorizer for F
where
    F: Fn(UserId, u64, Action) -> bool + Send + Sync,
{
    fn authorize(
        &self,
        _ctx: &RequestContext,
        user: UserId,
        group_id: u64,
        action: Action,
    ) -> Result<()> {
        if self(user, group_id, action) {
            Ok(())
        } else {
            Err(WikiError::NotAuthorized)
        }
    }
}

/// Authorizer granting everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _: &RequestContext, _: UserId, _: u64, _: Action) -> Result<()> {
        Ok(())
    }
}

/// Authorizer denying everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn authorize(&self, _: &RequestContext, _: UserId, _: u64, _: Action) -> Result<()> {
        Err(WikiError::NotAuthorized)
    }
}

/// Batched lookup of user display data.
pub trait ProfileService: Send + Sync {
    /// Profiles of `ids`. Ids may repeat; unknown ids are simply absent.
    fn get_profiles(
        &self,
        ctx: &RequestContext,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserProfile>>;
}

/// A fixed profile directory.
impl ProfileService for HashMap<UserId, UserProfile> {
    fn get_profiles(
        &self,
        _ctx: &RequestContext,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.get(id).map(|profile| (*id, profile.clone())))
            .collect())
    }
}
