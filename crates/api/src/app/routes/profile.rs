use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use gathering_profiles::ProfileUpdate;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/me", get(get_my_profile).put(save_my_profile))
        .route("/slug-availability", get(slug_availability))
        .route("/eligibility", get(eligibility))
}

pub async fn get_my_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match ensure_profile(&services, &principal).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn save_my_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ProfileUpdate>,
) -> axum::response::Response {
    if let Err(resp) = ensure_profile(&services, &principal).await {
        return resp;
    }

    match services.profiles.save(principal.profile_id(), body, Utc::now()).await {
        Ok(saved) => (StatusCode::OK, Json(saved)).into_response(),
        Err(e) => errors::save_error_to_response(e),
    }
}

/// Advisory only: the answer can be stale by the time the member saves.
pub async fn slug_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AvailabilityQuery>,
) -> axum::response::Response {
    match services
        .profiles
        .allocator()
        .check_availability(&query.candidate, principal.profile_id())
        .await
    {
        Ok(availability) => (StatusCode::OK, Json(availability)).into_response(),
        Err(e) => errors::claim_error_to_response(e),
    }
}

pub async fn eligibility(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = ensure_profile(&services, &principal).await {
        return resp;
    }

    let as_of = Utc::now().date_naive();
    match services.gateway.verdict(principal.profile_id(), as_of).await {
        Ok(verdict) => (StatusCode::OK, Json(dto::EligibilityResponse { verdict, as_of })).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

/// Load the caller's profile, creating it from the token claims on first access.
pub(crate) async fn ensure_profile(
    services: &AppServices,
    principal: &PrincipalContext,
) -> Result<gathering_profiles::Profile, axum::response::Response> {
    services
        .profiles
        .load_or_create(
            principal.profile_id(),
            principal.display_name(),
            principal.email().map(str::to_string),
            Utc::now(),
        )
        .await
        .map_err(errors::store_error_to_response)
}
