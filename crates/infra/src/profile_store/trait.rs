use std::sync::Arc;

use thiserror::Error;

use gathering_core::{ExpectedVersion, ProfileId};
use gathering_profiles::{Profile, Slug};

/// Profile store operation error.
///
/// These are **infrastructure errors** (storage, constraints, concurrency) as
/// opposed to profile validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The slug uniqueness constraint rejected the write.
    #[error("slug '{slug}' is already owned by another profile")]
    SlugTaken { slug: Slug },

    /// Optimistic concurrency check failed (version mismatch).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("profile not found")]
    NotFound,

    #[error("profile already exists")]
    AlreadyExists,

    /// Backend could not be reached or failed mid-operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded into a profile.
    #[error("corrupt profile row: {0}")]
    Corrupt(String),
}

/// Authoritative profile storage.
///
/// ## Write Semantics
///
/// `insert` and `commit` write the **whole** profile row atomically. The slug
/// column is covered by a storage-level uniqueness constraint: a write that
/// would give a slug to a second profile fails with [`StoreError::SlugTaken`]
/// and leaves nothing behind. Implementations must not emulate the constraint
/// with a separate read followed by a write.
///
/// Successful writes return the stored profile with its new `version`
/// (`insert` stores version 1, each `commit` adds one).
///
/// ## Read Semantics
///
/// `slug_owner` is a plain read used for availability hints; it may lag
/// behind concurrent writes and must never be used to decide a claim.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, StoreError>;

    async fn insert(&self, profile: Profile) -> Result<Profile, StoreError>;

    async fn commit(&self, profile: Profile, expected: ExpectedVersion) -> Result<Profile, StoreError>;

    async fn slug_owner(&self, slug: &Slug) -> Result<Option<ProfileId>, StoreError>;

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Profile>, StoreError>;
}

#[async_trait::async_trait]
impl<S> ProfileStore for Arc<S>
where
    S: ProfileStore + ?Sized,
{
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, profile: Profile) -> Result<Profile, StoreError> {
        (**self).insert(profile).await
    }

    async fn commit(&self, profile: Profile, expected: ExpectedVersion) -> Result<Profile, StoreError> {
        (**self).commit(profile, expected).await
    }

    async fn slug_owner(&self, slug: &Slug) -> Result<Option<ProfileId>, StoreError> {
        (**self).slug_owner(slug).await
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Profile>, StoreError> {
        (**self).find_by_slug(slug).await
    }
}
