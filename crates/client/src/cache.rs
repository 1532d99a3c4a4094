//! Locally owned cache of the member's own profile.
//!
//! Only used to render the editor quickly. Anything privileged goes to the
//! server, which re-reads its own copy; this cache is never consulted for
//! eligibility.

use chrono::{DateTime, Duration, Utc};

use gathering_profiles::Profile;

#[derive(Debug, Clone)]
struct Entry {
    profile: Profile,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProfileCache {
    entry: Option<Entry>,
    ttl: Duration,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// Cached profile if it is younger than the TTL.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&Profile> {
        self.entry
            .as_ref()
            .filter(|e| now - e.cached_at < self.ttl)
            .map(|e| &e.profile)
    }

    /// Store a server response. An older version never replaces a newer one.
    pub fn store(&mut self, profile: Profile, now: DateTime<Utc>) {
        if let Some(existing) = &self.entry {
            if existing.profile.id == profile.id && existing.profile.version > profile.version {
                return;
            }
        }
        self.entry = Some(Entry { profile, cached_at: now });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gathering_core::ProfileId;

    const ID: &str = "0190a5c4-7c1e-7000-8000-000000000001";

    fn profile(version: u64) -> Profile {
        let id: ProfileId = ID.parse().unwrap();
        let mut p = Profile::new(id, "Mario", None, Utc::now());
        p.version = version;
        p
    }

    #[test]
    fn entries_expire_after_ttl() {
        let now = Utc::now();
        let mut cache = ProfileCache::new(Duration::seconds(30));
        cache.store(profile(1), now);

        assert!(cache.get(now + Duration::seconds(29)).is_some());
        assert!(cache.get(now + Duration::seconds(30)).is_none());
    }

    #[test]
    fn older_versions_do_not_overwrite_newer_ones() {
        let now = Utc::now();
        let mut cache = ProfileCache::default();
        cache.store(profile(3), now);
        cache.store(profile(2), now);
        assert_eq!(cache.get(now).unwrap().version, 3);

        cache.store(profile(4), now);
        assert_eq!(cache.get(now).unwrap().version, 4);
    }

    #[test]
    fn invalidate_clears_the_entry() {
        let now = Utc::now();
        let mut cache = ProfileCache::default();
        cache.store(profile(1), now);
        cache.invalidate();
        assert!(cache.get(now).is_none());
    }
}
