//! Infrastructure layer: profile storage, slug allocation, eligibility
//! enforcement, event persistence and configuration.

pub mod config;
pub mod gateway;
pub mod organized_events;
pub mod profile_service;
pub mod profile_store;
pub mod slug_allocator;

pub use config::AppConfig;
pub use gateway::{Decision, EligibilityGateway, GatewayError, PrivilegedAction};
pub use organized_events::{
    EventDraft, EventRepository, EventStoreError, InMemoryEventRepository, OrganizedEvent,
    PostgresEventRepository,
};
pub use profile_service::{ProfileService, SaveError};
pub use profile_store::{InMemoryProfileStore, PostgresProfileStore, ProfileStore, StoreError};
pub use slug_allocator::{Availability, ClaimError, SlugAllocator};
