//! Public slug allocation.
//!
//! Two paths with very different guarantees:
//!
//! - [`SlugAllocator::check_availability`] is a read-only hint for the UI. It
//!   may be stale the moment it returns and never reserves anything.
//! - [`SlugAllocator::claim`] / [`SlugAllocator::commit_with_claim`] are the
//!   authoritative path. They hand the full profile row to the store, whose
//!   uniqueness constraint decides the winner. There is no availability read
//!   in front of the write.
//!
//! A conflict is reported as-is; the allocator never picks an alternative
//! slug (e.g. by appending a number) on the member's behalf.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use gathering_core::{ExpectedVersion, ProfileId};
use gathering_profiles::{Profile, Slug, SlugError};

use crate::profile_store::{ProfileStore, StoreError};

/// Non-authoritative availability of a slug candidate for one requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// The candidate after normalization (what would actually be stored).
    pub normalized: String,
    /// A claim by the requester would currently succeed.
    pub available: bool,
    /// Another profile currently owns the slug.
    pub reserved_by_other: bool,
    /// The requester already owns the slug.
    pub is_mine: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// The candidate is unusable (e.g. normalizes to nothing).
    #[error("invalid slug: {0}")]
    InvalidSlug(#[from] SlugError),

    /// Another profile owns the slug; the member has to choose a different one.
    #[error("slug '{slug}' is already taken; choose a different identifier")]
    Conflict { slug: Slug },

    #[error("profile not found")]
    ProfileNotFound,

    /// The profile changed since it was read.
    #[error("profile was modified concurrently: {0}")]
    Stale(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlugTaken { slug } => ClaimError::Conflict { slug },
            StoreError::NotFound => ClaimError::ProfileNotFound,
            StoreError::Concurrency(msg) => ClaimError::Stale(msg),
            other => ClaimError::Store(other),
        }
    }
}

/// Owner of the global slug uniqueness invariant.
#[derive(Debug, Clone)]
pub struct SlugAllocator<S> {
    store: S,
}

impl<S> SlugAllocator<S>
where
    S: ProfileStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read-only availability hint. Safe to serve from a lagging replica.
    #[instrument(skip(self, requester), fields(requester = %requester))]
    pub async fn check_availability(
        &self,
        candidate: &str,
        requester: ProfileId,
    ) -> Result<Availability, ClaimError> {
        let slug = Slug::from_raw(candidate)?;
        let owner = self.store.slug_owner(&slug).await.map_err(ClaimError::Store)?;

        let is_mine = owner == Some(requester);
        let reserved_by_other = owner.is_some() && !is_mine;

        Ok(Availability {
            normalized: slug.into(),
            available: !reserved_by_other,
            reserved_by_other,
            is_mine,
        })
    }

    /// Assign `desired` (normalized) to `profile_id`.
    ///
    /// Claiming the slug the profile already owns is a successful no-op.
    #[instrument(skip(self, profile_id), fields(profile_id = %profile_id), err)]
    pub async fn claim(
        &self,
        profile_id: ProfileId,
        desired: &str,
        now: DateTime<Utc>,
    ) -> Result<Slug, ClaimError> {
        let slug = Slug::from_raw(desired)?;

        let current = self
            .store
            .get(profile_id)
            .await
            .map_err(ClaimError::Store)?
            .ok_or(ClaimError::ProfileNotFound)?;

        if current.public_slug.as_ref() == Some(&slug) {
            debug!(slug = %slug, "slug already owned by requester; nothing to do");
            return Ok(slug);
        }

        let expected = ExpectedVersion::Exact(current.version);
        let mut next = current;
        next.public_slug = Some(slug);
        next.updated_at = now;

        let stored = self.commit_with_claim(next, expected).await?;
        stored
            .public_slug
            .ok_or_else(|| ClaimError::Store(StoreError::Corrupt("slug missing after claim".to_string())))
    }

    /// Persist a full profile, claiming whatever slug it carries.
    ///
    /// This is the single write used by profile saves: the slug claim and the
    /// rest of the profile commit together or not at all.
    pub async fn commit_with_claim(
        &self,
        profile: Profile,
        expected: ExpectedVersion,
    ) -> Result<Profile, ClaimError> {
        let profile_id = profile.id;
        match self.store.commit(profile, expected).await {
            Ok(stored) => {
                debug!(
                    profile_id = %profile_id,
                    slug = ?stored.public_slug.as_ref().map(Slug::as_str),
                    version = stored.version,
                    "profile committed"
                );
                Ok(stored)
            }
            Err(StoreError::SlugTaken { slug }) => {
                warn!(profile_id = %profile_id, slug = %slug, "slug claim rejected: owned by another profile");
                Err(ClaimError::Conflict { slug })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::profile_store::InMemoryProfileStore;

    async fn seeded(names: &[&str]) -> (SlugAllocator<Arc<InMemoryProfileStore>>, Vec<ProfileId>) {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut ids = Vec::new();
        for name in names {
            let p = Profile::new(ProfileId::new(), *name, None, Utc::now());
            ids.push(store.insert(p).await.unwrap().id);
        }
        (SlugAllocator::new(store), ids)
    }

    #[tokio::test]
    async fn claim_normalizes_and_assigns() {
        let (allocator, ids) = seeded(&["Mario"]).await;

        let slug = allocator.claim(ids[0], "Mario Rossi!", Utc::now()).await.unwrap();
        assert_eq!(slug.as_str(), "mario-rossi");

        let stored = allocator.store().get(ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.public_slug, Some(slug));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn reclaiming_own_slug_is_a_no_op() {
        let (allocator, ids) = seeded(&["Mario"]).await;
        allocator.claim(ids[0], "mario", Utc::now()).await.unwrap();

        let again = allocator.claim(ids[0], "MARIO", Utc::now()).await.unwrap();
        assert_eq!(again.as_str(), "mario");

        // No write happened the second time.
        let stored = allocator.store().get(ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn claim_of_foreign_slug_is_a_conflict() {
        let (allocator, ids) = seeded(&["Mario", "Luigi"]).await;
        allocator.claim(ids[0], "plumber", Utc::now()).await.unwrap();

        let err = allocator.claim(ids[1], "Plumber", Utc::now()).await.unwrap_err();
        assert_eq!(err, ClaimError::Conflict { slug: Slug::parse("plumber").unwrap() });
        assert!(err.to_string().contains("choose a different identifier"));
    }

    #[tokio::test]
    async fn empty_candidate_never_reaches_the_store() {
        let (allocator, ids) = seeded(&["Mario"]).await;
        let err = allocator.claim(ids[0], "?!", Utc::now()).await.unwrap_err();
        assert_eq!(err, ClaimError::InvalidSlug(SlugError::Empty));

        let err = allocator.check_availability("   ", ids[0]).await.unwrap_err();
        assert_eq!(err, ClaimError::InvalidSlug(SlugError::Empty));
    }

    #[tokio::test]
    async fn availability_reports_mine_taken_and_free() {
        let (allocator, ids) = seeded(&["Mario", "Luigi"]).await;
        allocator.claim(ids[0], "plumber", Utc::now()).await.unwrap();

        let mine = allocator.check_availability("Plumber", ids[0]).await.unwrap();
        assert!(mine.is_mine && mine.available && !mine.reserved_by_other);

        let taken = allocator.check_availability("plumber", ids[1]).await.unwrap();
        assert!(taken.reserved_by_other && !taken.available && !taken.is_mine);

        let free = allocator.check_availability("Green Plumber", ids[1]).await.unwrap();
        assert_eq!(free.normalized, "green-plumber");
        assert!(free.available && !free.reserved_by_other && !free.is_mine);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_exactly_one_winner() {
        for _ in 0..50 {
            let (allocator, ids) = seeded(&["Mario", "Luigi"]).await;
            let allocator = Arc::new(allocator);

            let a = {
                let allocator = allocator.clone();
                let id = ids[0];
                tokio::spawn(async move { allocator.claim(id, "castle", Utc::now()).await })
            };
            let b = {
                let allocator = allocator.clone();
                let id = ids[1];
                tokio::spawn(async move { allocator.claim(id, "castle", Utc::now()).await })
            };

            let results = [a.await.unwrap(), b.await.unwrap()];
            let winners = results.iter().filter(|r| r.is_ok()).count();
            let conflicts = results
                .iter()
                .filter(|r| matches!(r, Err(ClaimError::Conflict { .. })))
                .count();
            assert_eq!((winners, conflicts), (1, 1));

            let slug = Slug::parse("castle").unwrap();
            let owner = allocator.store().slug_owner(&slug).await.unwrap().unwrap();
            assert!(ids.contains(&owner));
            assert_eq!(profiles_carrying(&allocator, &ids, &slug).await, vec![owner]);
        }
    }

    async fn profiles_carrying(
        allocator: &SlugAllocator<Arc<InMemoryProfileStore>>,
        ids: &[ProfileId],
        slug: &Slug,
    ) -> Vec<ProfileId> {
        let mut carrying = Vec::new();
        for id in ids {
            let p = allocator.store().get(*id).await.unwrap().unwrap();
            if p.public_slug.as_ref() == Some(slug) {
                carrying.push(p.id);
            }
        }
        carrying
    }
}
