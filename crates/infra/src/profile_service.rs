//! Profile reads and saves.
//!
//! Saves go through [`SlugAllocator::commit_with_claim`], so changing the
//! slug and changing the rest of the profile are one write: a slug conflict
//! leaves the stored profile exactly as it was.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use gathering_core::{ExpectedVersion, ProfileId};
use gathering_profiles::{Profile, ProfileError, ProfileUpdate, PublicProfile, Slug, SlugReleasePolicy};

use crate::profile_store::{ProfileStore, StoreError};
use crate::slug_allocator::{ClaimError, SlugAllocator};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("profile not found")]
    NotFound,

    #[error(transparent)]
    Invalid(#[from] ProfileError),

    #[error("slug '{slug}' is already taken; choose a different identifier")]
    SlugConflict { slug: Slug },

    #[error("profile was modified since it was read: {0}")]
    Stale(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<ClaimError> for SaveError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::InvalidSlug(e) => SaveError::Invalid(ProfileError::InvalidSlug(e)),
            ClaimError::Conflict { slug } => SaveError::SlugConflict { slug },
            ClaimError::ProfileNotFound => SaveError::NotFound,
            ClaimError::Stale(msg) => SaveError::Stale(msg),
            ClaimError::Store(e) => SaveError::Store(e),
        }
    }
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        ClaimError::from(err).into()
    }
}

#[derive(Debug, Clone)]
pub struct ProfileService<S> {
    allocator: SlugAllocator<S>,
    policy: SlugReleasePolicy,
}

impl<S> ProfileService<S>
where
    S: ProfileStore,
{
    pub fn new(store: S, policy: SlugReleasePolicy) -> Self {
        Self {
            allocator: SlugAllocator::new(store),
            policy,
        }
    }

    pub fn allocator(&self) -> &SlugAllocator<S> {
        &self.allocator
    }

    pub fn policy(&self) -> SlugReleasePolicy {
        self.policy
    }

    pub async fn get(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        self.allocator.store().get(id).await
    }

    /// Read the member's profile, creating a private one on first access.
    #[instrument(skip(self, display_name, email), fields(profile_id = %id), err)]
    pub async fn load_or_create(
        &self,
        id: ProfileId,
        display_name: &str,
        email: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Profile, StoreError> {
        let store = self.allocator.store();
        if let Some(existing) = store.get(id).await? {
            return Ok(existing);
        }

        match store.insert(Profile::new(id, display_name, email, now)).await {
            Ok(created) => {
                info!("profile created on first access");
                Ok(created)
            }
            // Lost a first-access race against another request for the same member.
            Err(StoreError::AlreadyExists) => store.get(id).await?.ok_or(StoreError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Validate and persist a full profile update.
    ///
    /// Without an `expected_version` the write is last-write-wins.
    #[instrument(skip(self, update), fields(profile_id = %id), err)]
    pub async fn save(&self, id: ProfileId, update: ProfileUpdate, now: DateTime<Utc>) -> Result<Profile, SaveError> {
        let current = self.allocator.store().get(id).await?.ok_or(SaveError::NotFound)?;

        let expected = update
            .expected_version
            .map(ExpectedVersion::Exact)
            .unwrap_or(ExpectedVersion::Any);
        let next = current.apply_update(update, self.policy, now)?;

        if next.public_slug != current.public_slug {
            debug!(
                from = ?current.public_slug.as_ref().map(Slug::as_str),
                to = ?next.public_slug.as_ref().map(Slug::as_str),
                "save changes public slug"
            );
        }

        Ok(self.allocator.commit_with_claim(next, expected).await?)
    }

    /// Owner and public page for `raw_slug`, or `None` if nobody publishes
    /// under it. Both come from the same stored row.
    pub async fn resolve_public(&self, raw_slug: &str) -> Result<Option<(ProfileId, PublicProfile)>, StoreError> {
        let Ok(slug) = Slug::from_raw(raw_slug) else {
            return Ok(None);
        };
        let profile = self.allocator.store().find_by_slug(&slug).await?;
        Ok(profile.and_then(|p| PublicProfile::project(&p).map(|view| (p.id, view))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use gathering_profiles::{CertificateEntry, CertificateKind};

    use crate::profile_store::InMemoryProfileStore;

    fn service(policy: SlugReleasePolicy) -> ProfileService<Arc<InMemoryProfileStore>> {
        ProfileService::new(Arc::new(InMemoryProfileStore::new()), policy)
    }

    async fn member(svc: &ProfileService<Arc<InMemoryProfileStore>>, name: &str) -> Profile {
        svc.load_or_create(ProfileId::new(), name, None, Utc::now())
            .await
            .unwrap()
    }

    fn go_public(profile: &Profile, slug: Option<&str>) -> ProfileUpdate {
        let mut update = ProfileUpdate::from_profile(profile);
        update.public_profile_enabled = true;
        update.public_slug = slug.map(str::to_string);
        update
    }

    #[tokio::test]
    async fn first_access_creates_then_returns_the_same_profile() {
        let svc = service(SlugReleasePolicy::Retain);
        let id = ProfileId::new();

        let first = svc
            .load_or_create(id, "Mario", Some("MARIO@example.com".into()), Utc::now())
            .await
            .unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.email.as_deref(), Some("mario@example.com"));
        assert!(!first.public_profile_enabled);

        let again = svc.load_or_create(id, "Other", None, Utc::now()).await.unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn enabling_public_profile_derives_slug_from_name() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario Rossi!").await;

        let saved = svc.save(mario.id, go_public(&mario, None), Utc::now()).await.unwrap();
        assert_eq!(saved.public_slug.unwrap().as_str(), "mario-rossi");
        assert_eq!(saved.version, 2);
    }

    #[tokio::test]
    async fn conflicting_save_persists_nothing() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;
        let luigi = member(&svc, "Luigi").await;
        svc.save(mario.id, go_public(&mario, Some("plumber")), Utc::now())
            .await
            .unwrap();

        let mut update = go_public(&luigi, Some("Plumber"));
        update.bio = Some("green".into());
        update.certificates = vec![CertificateEntry::new(CertificateKind::Insurance, "Allianz", None)];

        let err = svc.save(luigi.id, update, Utc::now()).await.unwrap_err();
        assert_eq!(err, SaveError::SlugConflict { slug: Slug::parse("plumber").unwrap() });

        let stored = svc.get(luigi.id).await.unwrap().unwrap();
        assert_eq!(stored, luigi);
    }

    #[tokio::test]
    async fn stale_expected_version_is_rejected() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;

        let update = ProfileUpdate::from_profile(&mario);
        svc.save(mario.id, update.clone(), Utc::now()).await.unwrap();

        let err = svc.save(mario.id, update, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SaveError::Stale(_)));
    }

    #[tokio::test]
    async fn invalid_input_is_reported_before_any_write() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;

        let err = svc
            .save(mario.id, go_public(&mario, Some("!!!")), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Invalid(ProfileError::InvalidSlug(_))));

        let mut update = ProfileUpdate::from_profile(&mario);
        update.display_name = "  ".into();
        let err = svc.save(mario.id, update, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SaveError::Invalid(ProfileError::Validation(_))));

        assert_eq!(svc.get(mario.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn saving_unknown_profile_is_not_found() {
        let svc = service(SlugReleasePolicy::Retain);
        let ghost = Profile::new(ProfileId::new(), "Ghost", None, Utc::now());
        let err = svc
            .save(ghost.id, ProfileUpdate::from_profile(&ghost), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, SaveError::NotFound);
    }

    #[tokio::test]
    async fn disabling_keeps_slug_reserved_under_retain() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;
        let luigi = member(&svc, "Luigi").await;
        let public = svc
            .save(mario.id, go_public(&mario, Some("plumber")), Utc::now())
            .await
            .unwrap();

        let mut hide = ProfileUpdate::from_profile(&public);
        hide.public_profile_enabled = false;
        let hidden = svc.save(mario.id, hide, Utc::now()).await.unwrap();
        assert_eq!(hidden.public_slug.as_ref().map(Slug::as_str), Some("plumber"));
        assert_eq!(svc.resolve_public("plumber").await.unwrap(), None);

        let err = svc
            .save(luigi.id, go_public(&luigi, Some("plumber")), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::SlugConflict { .. }));
    }

    #[tokio::test]
    async fn disabling_frees_slug_under_release_on_disable() {
        let svc = service(SlugReleasePolicy::ReleaseOnDisable);
        let mario = member(&svc, "Mario").await;
        let luigi = member(&svc, "Luigi").await;
        let public = svc
            .save(mario.id, go_public(&mario, Some("plumber")), Utc::now())
            .await
            .unwrap();

        let mut hide = ProfileUpdate::from_profile(&public);
        hide.public_profile_enabled = false;
        let hidden = svc.save(mario.id, hide, Utc::now()).await.unwrap();
        assert_eq!(hidden.public_slug, None);

        let taken = svc
            .save(luigi.id, go_public(&luigi, Some("plumber")), Utc::now())
            .await
            .unwrap();
        assert_eq!(taken.public_slug.unwrap().as_str(), "plumber");
    }

    #[tokio::test]
    async fn resolve_public_normalizes_the_path_segment() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;
        svc.save(mario.id, go_public(&mario, Some("trail-boss")), Utc::now())
            .await
            .unwrap();

        let (owner, view) = svc.resolve_public("Trail Boss").await.unwrap().unwrap();
        assert_eq!(owner, mario.id);
        assert_eq!(view.display_name, "Mario");
        assert_eq!(svc.resolve_public("nobody").await.unwrap(), None);
        assert_eq!(svc.resolve_public("***").await.unwrap(), None);
    }

    #[tokio::test]
    async fn resolve_public_follows_a_slug_to_its_new_owner() {
        let svc = service(SlugReleasePolicy::Retain);
        let mario = member(&svc, "Mario").await;
        let luigi = member(&svc, "Luigi").await;
        let public = svc
            .save(mario.id, go_public(&mario, Some("plumber")), Utc::now())
            .await
            .unwrap();

        let mut rename = ProfileUpdate::from_profile(&public);
        rename.public_slug = Some("red-plumber".into());
        svc.save(mario.id, rename, Utc::now()).await.unwrap();
        svc.save(luigi.id, go_public(&luigi, Some("plumber")), Utc::now())
            .await
            .unwrap();

        let (owner, view) = svc.resolve_public("plumber").await.unwrap().unwrap();
        assert_eq!((owner, view.display_name.as_str()), (luigi.id, "Luigi"));
        let (owner, _) = svc.resolve_public("red-plumber").await.unwrap().unwrap();
        assert_eq!(owner, mario.id);
    }
}
