//! Postgres-backed profile store.
//!
//! Slug ownership is enforced by the `profiles_public_slug_key` unique index
//! (over `lower(public_slug)`), so two concurrent saves that want the same slug
//! are serialized by Postgres: one commits, the other fails inside its own
//! transaction and nothing of its update is persisted.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation on `profiles_public_slug_key`) | `23505` | `SlugTaken` | Slug owned by another profile |
//! | Database (unique violation on primary key) | `23505` | `AlreadyExists` | Duplicate insert |
//! | Database (check violation) | `23514` | `Corrupt` | Non-canonical slug reached the database |
//! | Database (other) / PoolClosed / Io / other | any | `Unavailable` | Backend failure |

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gathering_core::{ExpectedVersion, ProfileId};
use gathering_profiles::{CertificateEntry, Profile, ProfileRole, SectionVisibility, Slug};

use super::r#trait::{ProfileStore, StoreError};

const SLUG_UNIQUE_INDEX: &str = "profiles_public_slug_key";

/// Schema shipped with the crate; idempotent.
pub const MIGRATION: &str = include_str!("../../migrations/0001_profiles.sql");

/// Postgres-backed profile store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; every write runs in
/// its own transaction.
#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: Arc<PgPool>,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Apply the bundled schema.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    #[instrument(skip(self, id), fields(profile_id = %id), err)]
    pub async fn load(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(SELECT_PROFILE_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_profile", e))?;

        row.as_ref().map(profile_from_row).transpose()
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id), err)]
    pub async fn insert_profile(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        profile.version = 1;

        sqlx::query(
            r#"
            INSERT INTO profiles (
                id,
                role,
                display_name,
                bio,
                email,
                phone,
                certificates,
                public_profile_enabled,
                public_slug,
                visibility,
                version,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.role.as_str())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(Json(&profile.certificates))
        .bind(profile.public_profile_enabled)
        .bind(profile.public_slug.as_ref().map(Slug::as_str))
        .bind(Json(&profile.visibility))
        .bind(profile.version as i64)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("insert_profile", e, &profile))?;

        Ok(profile)
    }

    /// Write the full profile row and bump its version in one transaction.
    #[instrument(
        skip(self, profile),
        fields(
            profile_id = %profile.id,
            slug = ?profile.public_slug.as_ref().map(Slug::as_str),
            expected_version = ?expected
        ),
        err
    )]
    pub async fn commit_profile(
        &self,
        mut profile: Profile,
        expected: ExpectedVersion,
    ) -> Result<Profile, StoreError> {
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE profiles SET
                display_name = $2,
                bio = $3,
                email = $4,
                phone = $5,
                certificates = $6,
                public_profile_enabled = $7,
                public_slug = $8,
                visibility = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1
              AND ($11::BIGINT IS NULL OR version = $11)
            RETURNING version
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(Json(&profile.certificates))
        .bind(profile.public_profile_enabled)
        .bind(profile.public_slug.as_ref().map(Slug::as_str))
        .bind(Json(&profile.visibility))
        .bind(profile.updated_at)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error("commit_profile", e, &profile))?;

        let Some(new_version) = new_version else {
            let current: Option<i64> = sqlx::query_scalar("SELECT version FROM profiles WHERE id = $1")
                .bind(profile.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_profile_version", e))?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;

            return Err(match current {
                Some(found) => match expected.check(found as u64) {
                    Err(e) => StoreError::Concurrency(e.to_string()),
                    Ok(()) => StoreError::Unavailable("profile update matched no row".to_string()),
                },
                None => StoreError::NotFound,
            });
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        profile.version = new_version as u64;
        Ok(profile)
    }

    #[instrument(skip(self, slug), fields(slug = %slug), err)]
    pub async fn load_slug_owner(&self, slug: &Slug) -> Result<Option<ProfileId>, StoreError> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE lower(public_slug) = lower($1)")
                .bind(slug.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("load_slug_owner", e))?;

        Ok(owner.map(ProfileId::from_uuid))
    }

    #[instrument(skip(self, slug), fields(slug = %slug), err)]
    pub async fn load_by_slug(&self, slug: &Slug) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(SELECT_PROFILE_BY_SLUG)
            .bind(slug.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_by_slug", e))?;

        row.as_ref().map(profile_from_row).transpose()
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        self.load(id).await
    }

    async fn insert(&self, profile: Profile) -> Result<Profile, StoreError> {
        self.insert_profile(profile).await
    }

    async fn commit(&self, profile: Profile, expected: ExpectedVersion) -> Result<Profile, StoreError> {
        self.commit_profile(profile, expected).await
    }

    async fn slug_owner(&self, slug: &Slug) -> Result<Option<ProfileId>, StoreError> {
        self.load_slug_owner(slug).await
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Profile>, StoreError> {
        self.load_by_slug(slug).await
    }
}

const SELECT_PROFILE_BY_ID: &str = r#"
    SELECT
        id, role, display_name, bio, email, phone, certificates,
        public_profile_enabled, public_slug, visibility, version,
        created_at, updated_at
    FROM profiles
    WHERE id = $1
"#;

const SELECT_PROFILE_BY_SLUG: &str = r#"
    SELECT
        id, role, display_name, bio, email, phone, certificates,
        public_profile_enabled, public_slug, visibility, version,
        created_at, updated_at
    FROM profiles
    WHERE lower(public_slug) = lower($1)
"#;

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::Corrupt(e.to_string());

    let role: String = row.try_get("role").map_err(corrupt)?;
    let role: ProfileRole = role
        .parse()
        .map_err(|e: gathering_profiles::ProfileError| StoreError::Corrupt(e.to_string()))?;

    let public_slug = row
        .try_get::<Option<String>, _>("public_slug")
        .map_err(corrupt)?
        .map(|s| Slug::parse(&s))
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let certificates: Json<Vec<CertificateEntry>> = row.try_get("certificates").map_err(corrupt)?;
    let visibility: Json<SectionVisibility> = row.try_get("visibility").map_err(corrupt)?;
    let version: i64 = row.try_get("version").map_err(corrupt)?;

    Ok(Profile {
        id: ProfileId::from_uuid(row.try_get::<Uuid, _>("id").map_err(corrupt)?),
        role,
        display_name: row.try_get("display_name").map_err(corrupt)?,
        bio: row.try_get("bio").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        phone: row.try_get("phone").map_err(corrupt)?,
        certificates: certificates.0,
        public_profile_enabled: row.try_get("public_profile_enabled").map_err(corrupt)?,
        public_slug,
        visibility: visibility.0,
        version: version as u64,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

/// Map a failed profile write, recognizing the slug uniqueness index.
fn map_write_error(operation: &str, err: sqlx::Error, profile: &Profile) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            if db_err.constraint() == Some(SLUG_UNIQUE_INDEX) {
                if let Some(slug) = &profile.public_slug {
                    return StoreError::SlugTaken { slug: slug.clone() };
                }
            }
            return StoreError::AlreadyExists;
        }
    }
    map_sqlx_error(operation, err)
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23514") => StoreError::Corrupt(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Unavailable(format!("{operation}: {other}")),
    }
}
