//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage wiring (in-memory or Postgres) and the profile,
//!   slug and eligibility services built on top of it
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use gathering_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(build_app_with(config.jwt_secret.clone(), services))
}

/// Router over already-constructed services.
pub fn build_app_with(jwt_secret: String, services: Arc<services::AppServices>) -> Router {
    let jwt = Arc::new(gathering_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a verified member.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public::router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
