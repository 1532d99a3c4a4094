use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use gathering_infra::OrganizedEvent;
use gathering_profiles::{EligibilityVerdict, PublicProfile};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default)]
    pub candidate: String,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    #[serde(flatten)]
    pub verdict: EligibilityVerdict,
    pub as_of: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrganizedEvent> for EventResponse {
    fn from(e: OrganizedEvent) -> Self {
        Self {
            id: e.id.to_string(),
            organizer_id: e.organizer_id.to_string(),
            title: e.title,
            description: e.description,
            location: e.location,
            starts_at: e.starts_at,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Listing entry on a public profile page.
#[derive(Debug, Serialize)]
pub struct PublicEvent {
    pub id: String,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
}

impl From<OrganizedEvent> for PublicEvent {
    fn from(e: OrganizedEvent) -> Self {
        Self {
            id: e.id.to_string(),
            title: e.title,
            location: e.location,
            starts_at: e.starts_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub profile: PublicProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<PublicEvent>>,
}
