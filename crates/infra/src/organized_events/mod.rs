//! Events published by organizers.
//!
//! Only the persistence side lives here; the eligibility check in front of
//! every write is the caller's job (see [`crate::gateway`]).

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gathering_core::{DomainError, EventId, ProfileId};

pub use in_memory::InMemoryEventRepository;
pub use postgres::PostgresEventRepository;
pub use r#trait::{EventRepository, EventStoreError};

/// Organizer-supplied event fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid("title", "cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedEvent {
    pub id: EventId,
    pub organizer_id: ProfileId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizedEvent {
    pub fn create(organizer_id: ProfileId, draft: EventDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id: EventId::new(),
            organizer_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            location: draft.location,
            starts_at: draft.starts_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edit; ownership is checked by the repository on write.
    pub fn revise(&self, draft: EventDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            title: draft.title.trim().to_string(),
            description: draft.description,
            location: draft.location,
            starts_at: draft.starts_at,
            updated_at: now,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: None,
            location: Some("Monte Rosa".into()),
            starts_at: Utc::now(),
        }
    }

    #[test]
    fn create_rejects_blank_titles() {
        let err = OrganizedEvent::create(ProfileId::new(), draft("   "), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Invalid { field: "title", .. }));
    }

    #[test]
    fn revise_keeps_identity_and_organizer() {
        let organizer = ProfileId::new();
        let event = OrganizedEvent::create(organizer, draft(" Sunrise hike "), Utc::now()).unwrap();
        assert_eq!(event.title, "Sunrise hike");

        let revised = event.revise(draft("Sunset hike"), Utc::now()).unwrap();
        assert_eq!(revised.id, event.id);
        assert_eq!(revised.organizer_id, organizer);
        assert_eq!(revised.created_at, event.created_at);
        assert_eq!(revised.title, "Sunset hike");
    }
}
