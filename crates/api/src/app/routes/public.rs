//! Unauthenticated public profile pages.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use gathering_infra::EventRepository;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/p/:slug", get(public_profile))
}

pub async fn public_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    let (owner, profile) = match services.profiles.resolve_public(&slug).await {
        Ok(Some(found)) => found,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "no public profile at this address"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let events = if profile.show_events {
        match services.events.list_by_organizer(owner).await {
            Ok(list) => Some(list.into_iter().map(dto::PublicEvent::from).collect()),
            Err(e) => return errors::event_error_to_response(e),
        }
    } else {
        None
    };

    (StatusCode::OK, Json(dto::PublicProfileResponse { profile, events })).into_response()
}
