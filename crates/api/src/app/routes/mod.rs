use axum::{Router, routing::get};

pub mod events;
pub mod profile;
pub mod public;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/profile", profile::router())
        .nest("/events", events::router())
}
