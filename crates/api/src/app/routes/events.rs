//! Organizer-only event writes.
//!
//! Every write asks the eligibility gateway first; the gateway re-reads the
//! stored profile, so a verdict shown earlier in the UI never grants access.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use gathering_core::EventId;
use gathering_infra::{Decision, EventDraft, EventRepository, OrganizedEvent, PrivilegedAction};

use crate::app::routes::profile::ensure_profile;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_event))
        .route("/:id", get(get_event).put(update_event))
}

pub async fn create_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<EventDraft>,
) -> axum::response::Response {
    if let Err(resp) = authorize(&services, &principal, PrivilegedAction::CreateEvent).await {
        return resp;
    }

    let event = match OrganizedEvent::create(principal.profile_id(), body, Utc::now()) {
        Ok(e) => e,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match services.events.insert(event).await {
        Ok(stored) => (StatusCode::CREATED, Json(dto::EventResponse::from(stored))).into_response(),
        Err(e) => errors::event_error_to_response(e),
    }
}

pub async fn update_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<EventDraft>,
) -> axum::response::Response {
    let event_id: EventId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}")),
    };

    if let Err(resp) = authorize(&services, &principal, PrivilegedAction::EditEvent(event_id)).await {
        return resp;
    }

    let existing = match services.events.get(event_id).await {
        Ok(Some(e)) => e,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "event not found"),
        Err(e) => return errors::event_error_to_response(e),
    };

    let mut revised = match existing.revise(body, Utc::now()) {
        Ok(e) => e,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    // The repository rejects the write unless the caller organizes this event.
    revised.organizer_id = principal.profile_id();

    match services.events.update(revised).await {
        Ok(stored) => (StatusCode::OK, Json(dto::EventResponse::from(stored))).into_response(),
        Err(e) => errors::event_error_to_response(e),
    }
}

pub async fn get_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let event_id: EventId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}")),
    };

    match services.events.get(event_id).await {
        Ok(Some(e)) => (StatusCode::OK, Json(dto::EventResponse::from(e))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "event not found"),
        Err(e) => errors::event_error_to_response(e),
    }
}

async fn authorize(
    services: &AppServices,
    principal: &PrincipalContext,
    action: PrivilegedAction,
) -> Result<(), axum::response::Response> {
    ensure_profile(services, principal).await?;

    let as_of = Utc::now().date_naive();
    match services.gateway.authorize(principal.profile_id(), action, as_of).await {
        Ok(Decision::Allow) => Ok(()),
        Ok(Decision::Deny(missing)) => Err(errors::eligibility_denied(&missing)),
        Err(e) => Err(errors::gateway_error_to_response(e)),
    }
}
