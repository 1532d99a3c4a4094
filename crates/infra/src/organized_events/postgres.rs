//! Postgres-backed organized-event repository.
//!
//! Shares the pool and schema with [`crate::profile_store::PostgresProfileStore`];
//! `organized_events.organizer_id` references `profiles(id)`.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gathering_core::{EventId, ProfileId};

use super::OrganizedEvent;
use super::r#trait::{EventRepository, EventStoreError};

#[derive(Debug, Clone)]
pub struct PostgresEventRepository {
    pool: Arc<PgPool>,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

const SELECT_EVENT_COLUMNS: &str = r#"
    SELECT id, organizer_id, title, description, location, starts_at, created_at, updated_at
    FROM organized_events
"#;

#[async_trait::async_trait]
impl EventRepository for PostgresEventRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id, organizer_id = %event.organizer_id), err)]
    async fn insert(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        sqlx::query(
            r#"
            INSERT INTO organized_events (
                id, organizer_id, title, description, location, starts_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_event", e))?;

        Ok(event)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, organizer_id = %event.organizer_id), err)]
    async fn update(&self, event: OrganizedEvent) -> Result<OrganizedEvent, EventStoreError> {
        let row = sqlx::query(
            r#"
            UPDATE organized_events SET
                title = $3,
                description = $4,
                location = $5,
                starts_at = $6,
                updated_at = $7
            WHERE id = $1 AND organizer_id = $2
            RETURNING id, organizer_id, title, description, location, starts_at, created_at, updated_at
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_event", e))?;

        if let Some(row) = row {
            return event_from_row(&row);
        }

        // Nothing matched: tell "missing" apart from "someone else's event".
        match self.get(event.id).await? {
            Some(_) => Err(EventStoreError::NotOrganizer {
                event_id: event.id,
                profile_id: event.organizer_id,
            }),
            None => Err(EventStoreError::NotFound),
        }
    }

    #[instrument(skip(self, id), fields(event_id = %id), err)]
    async fn get(&self, id: EventId) -> Result<Option<OrganizedEvent>, EventStoreError> {
        let row = sqlx::query(&format!("{SELECT_EVENT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_event", e))?;

        row.as_ref().map(event_from_row).transpose()
    }

    #[instrument(skip(self, organizer_id), fields(organizer_id = %organizer_id), err)]
    async fn list_by_organizer(&self, organizer_id: ProfileId) -> Result<Vec<OrganizedEvent>, EventStoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENT_COLUMNS} WHERE organizer_id = $1 ORDER BY starts_at ASC, id ASC"
        ))
        .bind(organizer_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_events", e))?;

        rows.iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: &PgRow) -> Result<OrganizedEvent, EventStoreError> {
    let corrupt = |e: sqlx::Error| EventStoreError::Corrupt(e.to_string());

    Ok(OrganizedEvent {
        id: EventId::from_uuid(row.try_get::<Uuid, _>("id").map_err(corrupt)?),
        organizer_id: ProfileId::from_uuid(row.try_get::<Uuid, _>("organizer_id").map_err(corrupt)?),
        title: row.try_get("title").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        location: row.try_get("location").map_err(corrupt)?,
        starts_at: row.try_get("starts_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            EventStoreError::AlreadyExists
        }
        sqlx::Error::Database(db_err) => {
            EventStoreError::Unavailable(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::RowNotFound => EventStoreError::NotFound,
        other => EventStoreError::Unavailable(format!("{operation}: {other}")),
    }
}
