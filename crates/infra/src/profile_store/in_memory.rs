use std::collections::HashMap;
use std::sync::RwLock;

use gathering_core::{ExpectedVersion, ProfileId};
use gathering_profiles::{Profile, Slug};

use super::r#trait::{ProfileStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<ProfileId, Profile>,
    /// Unique index: slug → owning profile.
    slugs: HashMap<Slug, ProfileId>,
}

impl Tables {
    /// Enforce the unique slug index for a row about to be written.
    fn check_slug(&self, profile: &Profile) -> Result<(), StoreError> {
        if let Some(slug) = &profile.public_slug {
            if let Some(owner) = self.slugs.get(slug) {
                if *owner != profile.id {
                    return Err(StoreError::SlugTaken { slug: slug.clone() });
                }
            }
        }
        Ok(())
    }

    fn reindex(&mut self, previous: Option<&Slug>, profile: &Profile) {
        if let Some(old) = previous {
            if profile.public_slug.as_ref() != Some(old) {
                self.slugs.remove(old);
            }
        }
        if let Some(slug) = &profile.public_slug {
            self.slugs.insert(slug.clone(), profile.id);
        }
    }
}

/// In-memory profile store.
///
/// Intended for tests/dev. The profile table and the slug index live behind a
/// single lock, so the constraint check and the write form one critical section.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    tables: RwLock<Tables>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn insert(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::AlreadyExists);
        }
        tables.check_slug(&profile)?;

        profile.version = 1;
        tables.reindex(None, &profile);
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn commit(&self, mut profile: Profile, expected: ExpectedVersion) -> Result<Profile, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let (current_version, previous_slug) = match tables.profiles.get(&profile.id) {
            Some(existing) => (existing.version, existing.public_slug.clone()),
            None => return Err(StoreError::NotFound),
        };

        expected
            .check(current_version)
            .map_err(|e| StoreError::Concurrency(e.to_string()))?;
        tables.check_slug(&profile)?;

        profile.version = current_version + 1;
        tables.reindex(previous_slug.as_ref(), &profile);
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn slug_owner(&self, slug: &Slug) -> Result<Option<ProfileId>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(tables.slugs.get(slug).copied())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Profile>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(tables
            .slugs
            .get(slug)
            .and_then(|id| tables.profiles.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(name: &str) -> Profile {
        Profile::new(ProfileId::new(), name, None, Utc::now())
    }

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_first_version() {
        let store = InMemoryProfileStore::new();
        let stored = store.insert(profile("Mario")).await.unwrap();
        assert_eq!(stored.version, 1);

        let err = store.insert(stored.clone()).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists);
    }

    #[tokio::test]
    async fn commit_enforces_expected_version() {
        let store = InMemoryProfileStore::new();
        let stored = store.insert(profile("Mario")).await.unwrap();

        let next = store
            .commit(stored.clone(), ExpectedVersion::Exact(1))
            .await
            .unwrap();
        assert_eq!(next.version, 2);

        let err = store
            .commit(stored, ExpectedVersion::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }

    #[tokio::test]
    async fn slug_index_rejects_second_owner_and_leaves_row_untouched() {
        let store = InMemoryProfileStore::new();
        let mut a = store.insert(profile("Mario")).await.unwrap();
        let mut b = store.insert(profile("Luigi")).await.unwrap();

        a.public_slug = Some(slug("plumber"));
        store.commit(a, ExpectedVersion::Any).await.unwrap();

        b.public_slug = Some(slug("plumber"));
        b.bio = Some("should not persist".to_string());
        let err = store.commit(b.clone(), ExpectedVersion::Any).await.unwrap_err();
        assert_eq!(err, StoreError::SlugTaken { slug: slug("plumber") });

        let stored_b = store.get(b.id).await.unwrap().unwrap();
        assert_eq!(stored_b.bio, None);
        assert_eq!(stored_b.public_slug, None);
        assert_eq!(stored_b.version, 1);
    }

    #[tokio::test]
    async fn changing_slug_frees_the_previous_one() {
        let store = InMemoryProfileStore::new();
        let mut a = store.insert(profile("Mario")).await.unwrap();
        a.public_slug = Some(slug("old-name"));
        let mut a = store.commit(a, ExpectedVersion::Any).await.unwrap();

        a.public_slug = Some(slug("new-name"));
        store.commit(a.clone(), ExpectedVersion::Any).await.unwrap();

        assert_eq!(store.slug_owner(&slug("old-name")).await.unwrap(), None);
        assert_eq!(store.slug_owner(&slug("new-name")).await.unwrap(), Some(a.id));
        assert_eq!(
            store.find_by_slug(&slug("new-name")).await.unwrap().map(|p| p.id),
            Some(a.id)
        );
    }

    #[tokio::test]
    async fn commit_of_unknown_profile_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = store
            .commit(profile("Ghost"), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }
}
