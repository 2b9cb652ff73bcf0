//! Access to the remote, version-authoritative document store.
//!
//! The collaborators this crate consumes are narrow capability traits:
//!
//! - [`RevisionStore`]: the four store RPCs (list, load, store, delete)
//! - [`Authorizer`]: the permission check run before any store call
//! - [`ProfileService`]: batched creator lookup for version listings
//!
//! [`DocumentStoreClient`] combines a store and an authorizer. A store call is
//! only reachable through a [`StoreSession`], which can only be obtained by
//! passing the authorization check, so a denied request never reaches the
//! network.

mod capabilities;
mod store_client;

pub use capabilities::{
    AllowAll, Authorizer, DenyAll, LoadedRevision, ProfileService, RevisionStore, StoreOutcome,
};
pub use store_client::{DocumentStoreClient, StoreSession};
