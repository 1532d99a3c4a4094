use std::collections::BTreeSet;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gathering_infra::{ClaimError, EventStoreError, GatewayError, SaveError, StoreError};
use gathering_profiles::{ProfileError, RequirementKind};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "stale_profile", msg),
        StoreError::SlugTaken { slug } => slug_conflict(slug.as_str()),
        StoreError::AlreadyExists => json_error(StatusCode::CONFLICT, "conflict", "already exists"),
        StoreError::Unavailable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg),
        StoreError::Corrupt(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn save_error_to_response(err: SaveError) -> axum::response::Response {
    match err {
        SaveError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "profile not found"),
        SaveError::Invalid(e) => profile_error_to_response(e),
        SaveError::SlugConflict { slug } => slug_conflict(slug.as_str()),
        SaveError::Stale(msg) => json_error(StatusCode::CONFLICT, "stale_profile", msg),
        SaveError::Store(e) => store_error_to_response(e),
    }
}

pub fn claim_error_to_response(err: ClaimError) -> axum::response::Response {
    match err {
        ClaimError::InvalidSlug(e) => json_error(StatusCode::BAD_REQUEST, "invalid_slug", e.to_string()),
        ClaimError::Conflict { slug } => slug_conflict(slug.as_str()),
        ClaimError::ProfileNotFound => json_error(StatusCode::NOT_FOUND, "not_found", "profile not found"),
        ClaimError::Stale(msg) => json_error(StatusCode::CONFLICT, "stale_profile", msg),
        ClaimError::Store(e) => store_error_to_response(e),
    }
}

pub fn gateway_error_to_response(err: GatewayError) -> axum::response::Response {
    match err {
        GatewayError::UnknownProfile(_) => json_error(StatusCode::NOT_FOUND, "not_found", "profile not found"),
        GatewayError::Store(e) => store_error_to_response(e),
    }
}

pub fn event_error_to_response(err: EventStoreError) -> axum::response::Response {
    match err {
        EventStoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "event not found"),
        EventStoreError::AlreadyExists => json_error(StatusCode::CONFLICT, "conflict", "event already exists"),
        EventStoreError::NotOrganizer { .. } => json_error(
            StatusCode::FORBIDDEN,
            "not_organizer",
            "only the organizer can edit this event",
        ),
        EventStoreError::Unavailable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg),
        EventStoreError::Corrupt(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

fn profile_error_to_response(err: ProfileError) -> axum::response::Response {
    let code = match err {
        ProfileError::Validation(_) => "validation_error",
        ProfileError::InvalidSlug(_) | ProfileError::CannotDeriveSlug(_) => "invalid_slug",
    };
    json_error(StatusCode::BAD_REQUEST, code, err.to_string())
}

/// 409 for a slug owned by another member. The member must pick another one.
pub fn slug_conflict(slug: &str) -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        axum::Json(json!({
            "error": "slug_conflict",
            "slug": slug,
            "message": "choose a different identifier",
        })),
    )
        .into_response()
}

/// 403 carrying every unmet organizer requirement.
pub fn eligibility_denied(missing: &BTreeSet<RequirementKind>) -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({
            "error": "eligibility_denied",
            "missing": missing,
            "message": "organizer requirements are not met",
        })),
    )
        .into_response()
}
