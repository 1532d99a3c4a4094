//! Client-side helpers for the profile editor: the slug availability probe,
//! a locally owned profile cache, and an HTTP client for the API.

pub mod cache;
pub mod http;
pub mod probe;

pub use cache::ProfileCache;
pub use http::{ApiClient, ClientError, ProfileSession};
pub use probe::{
    AvailabilityProbe, AvailabilityReport, AvailabilitySource, ProbeError, ProbeStatus, ProbeTicket, SharedProbe,
};
