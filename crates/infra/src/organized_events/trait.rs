use std::sync::Arc;

use thiserror::Error;

use gathering_core::{EventId, ProfileId};

use super::OrganizedEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    #[error("event not found")]
    NotFound,

    #[error("event already exists")]
    AlreadyExists,

    /// The event belongs to a different organizer.
    #[error("event {event_id} is not organized by {profile_id}")]
    NotOrganizer { event_id: EventId, profile_id: ProfileId },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt event row: {0}")]
    Corrupt(String),
}

/// Persistence for organized events.
///
/// `update` only succeeds when the stored event's organizer matches the
/// incoming one; the check and the write are a single operation.
#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError>;

    async fn update(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError>;

    async fn get(&self, id: EventId) -> Result<Option<OrganizedEvent>, EventStoreError>;

    async fn list_by_organizer(&self, organizer_id: ProfileId) -> Result<Vec<OrganizedEvent>, EventStoreError>;
}

#[async_trait::async_trait]
impl<R> EventRepository for Arc<R>
where
    R: EventRepository + ?Sized,
{
    async fn insert(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        (**self).insert(event).await
    }

    async fn update(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        (**self).update(event).await
    }

    async fn get(&self, id: EventId) -> Result<Option<OrganizedEvent>, EventStoreError> {
        (**self).get(id).await
    }

    async fn list_by_organizer(&self, organizer_id: ProfileId) -> Result<Vec<OrganizedEvent>, EventStoreError> {
        (**self).list_by_organizer(organizer_id).await
    }
}
