use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use gathering_infra::{
    AppConfig, EligibilityGateway, EventRepository, InMemoryEventRepository, InMemoryProfileStore,
    PostgresEventRepository, PostgresProfileStore, ProfileService, ProfileStore,
};
use gathering_profiles::SlugReleasePolicy;

pub type DynProfileStore = Arc<dyn ProfileStore>;

/// Everything the handlers need, behind one `Extension`.
pub struct AppServices {
    pub profiles: ProfileService<DynProfileStore>,
    pub gateway: EligibilityGateway<DynProfileStore>,
    pub events: Arc<dyn EventRepository>,
}

impl AppServices {
    pub fn new(store: DynProfileStore, events: Arc<dyn EventRepository>, policy: SlugReleasePolicy) -> Self {
        Self {
            profiles: ProfileService::new(store.clone(), policy),
            gateway: EligibilityGateway::new(store),
            events,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(policy: SlugReleasePolicy) -> Self {
        Self::new(
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(InMemoryEventRepository::new()),
            policy,
        )
    }
}

/// Postgres when `DATABASE_URL` is configured, otherwise in-memory.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; profiles are kept in memory only");
        return Ok(AppServices::in_memory(config.slug_release_policy));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    let store = PostgresProfileStore::new(pool.clone());
    store.migrate().await.context("failed to apply profile schema")?;
    tracing::info!("using Postgres profile store");

    Ok(AppServices::new(
        Arc::new(store),
        Arc::new(PostgresEventRepository::new(pool)),
        config.slug_release_policy,
    ))
}
