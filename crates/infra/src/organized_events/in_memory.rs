use std::collections::HashMap;
use std::sync::RwLock;

use gathering_core::{EventId, ProfileId};

use super::OrganizedEvent;
use super::r#trait::{EventRepository, EventStoreError};

/// In-memory event repository for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: RwLock<HashMap<EventId, OrganizedEvent>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> EventStoreError {
    EventStoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        let mut events = self.events.write().map_err(poisoned)?;
        if events.contains_key(&event.id) {
            return Err(EventStoreError::AlreadyExists);
        }
        events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        let mut events = self.events.write().map_err(poisoned)?;
        let existing = events.get(&event.id).ok_or(EventStoreError::NotFound)?;
        if existing.organizer_id != event.organizer_id {
            return Err(EventStoreError::NotOrganizer {
                event_id: event.id,
                profile_id: event.organizer_id,
            });
        }
        let stored = OrganizedEvent {
            created_at: existing.created_at,
            ..event
        };
        events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: EventId) -> Result<Option<OrganizedEvent>, EventStoreError> {
        let events = self.events.read().map_err(poisoned)?;
        Ok(events.get(&id).cloned())
    }

    async fn list_by_organizer(&self, organizer_id: ProfileId) -> Result<Vec<OrganizedEvent>, EventStoreError> {
        let events = self.events.read().map_err(poisoned)?;
        let mut out: Vec<OrganizedEvent> = events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::organized_events::EventDraft;

    fn event(organizer: ProfileId, title: &str, in_days: i64) -> OrganizedEvent {
        let draft = EventDraft {
            title: title.to_string(),
            description: None,
            location: None,
            starts_at: Utc::now() + Duration::days(in_days),
        };
        OrganizedEvent::create(organizer, draft, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn update_requires_the_same_organizer() {
        let repo = InMemoryEventRepository::new();
        let owner = ProfileId::new();
        let stored = repo.insert(event(owner, "Ridge walk", 3)).await.unwrap();

        let mut hijack = stored.clone();
        hijack.organizer_id = ProfileId::new();
        hijack.title = "Mine now".into();
        let err = repo.update(hijack.clone()).await.unwrap_err();
        assert_eq!(
            err,
            EventStoreError::NotOrganizer {
                event_id: stored.id,
                profile_id: hijack.organizer_id
            }
        );
        assert_eq!(repo.get(stored.id).await.unwrap().unwrap().title, "Ridge walk");

        let mut edit = stored.clone();
        edit.title = "Ridge walk (long)".into();
        let updated = repo.update(edit).await.unwrap();
        assert_eq!(updated.title, "Ridge walk (long)");
    }

    #[tokio::test]
    async fn update_of_missing_event_is_not_found() {
        let repo = InMemoryEventRepository::new();
        let err = repo.update(event(ProfileId::new(), "Ghost", 1)).await.unwrap_err();
        assert_eq!(err, EventStoreError::NotFound);
    }

    #[tokio::test]
    async fn list_by_organizer_is_ordered_by_start() {
        let repo = InMemoryEventRepository::new();
        let owner = ProfileId::new();
        repo.insert(event(owner, "later", 10)).await.unwrap();
        repo.insert(event(owner, "sooner", 2)).await.unwrap();
        repo.insert(event(ProfileId::new(), "someone else", 1)).await.unwrap();

        let titles: Vec<String> = repo
            .list_by_organizer(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["sooner", "later"]);
    }
}
