//! Member profile: the authoritative record behind organizer eligibility and
//! the public profile page.
//!
//! # Invariants
//! - A new profile starts private, without a slug.
//! - The stored slug, when present, is canonical (see [`Slug`]).
//! - Turning the public profile on without a slug derives one from the display name.
//! - Turning it off keeps the slug unless the release policy says otherwise,
//!   so existing public links keep resolving to the same identifier.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gathering_core::ProfileId;

use crate::slug::{Slug, SlugError};

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Stored platform role. Only `Admin` changes eligibility (it bypasses it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    #[default]
    Member,
    Admin,
}

impl ProfileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRole::Member => "member",
            ProfileRole::Admin => "admin",
        }
    }
}

impl core::str::FromStr for ProfileRole {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(ProfileRole::Member),
            "admin" => Ok(ProfileRole::Admin),
            other => Err(ProfileError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Certifications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateKind {
    Insurance,
    MedicalCertificate,
    Diploma,
    Other,
}

/// One certification held by a member (insurance policy, medical clearance, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEntry {
    pub kind: CertificateKind,
    /// Issuer or policy name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl CertificateEntry {
    pub fn new(kind: CertificateKind, name: impl Into<String>, expiry_date: Option<NaiveDate>) -> Self {
        Self {
            kind,
            name: name.into(),
            number: None,
            expiry_date,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

/// Per-section toggles for the public profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionVisibility {
    pub bio: bool,
    pub contact: bool,
    pub certifications: bool,
    pub events: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            bio: true,
            contact: false,
            certifications: false,
            events: true,
        }
    }
}

/// What happens to a slug when its owner turns the public profile off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlugReleasePolicy {
    /// Keep the slug on the profile; it stays reserved and links stay stable.
    #[default]
    Retain,
    /// Clear the slug so another member may claim it.
    ReleaseOnDisable,
}

impl core::str::FromStr for SlugReleasePolicy {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(SlugReleasePolicy::Retain),
            "release_on_disable" => Ok(SlugReleasePolicy::ReleaseOnDisable),
            other => Err(ProfileError::Validation(format!(
                "unknown slug release policy '{other}' (expected retain or release_on_disable)"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub role: ProfileRole,
    pub display_name: String,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub certificates: Vec<CertificateEntry>,
    pub public_profile_enabled: bool,
    pub public_slug: Option<Slug>,
    pub visibility: SectionVisibility,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A freshly registered member: private, no slug, no certifications.
    pub fn new(id: ProfileId, display_name: impl Into<String>, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            role: ProfileRole::Member,
            display_name: display_name.into().trim().to_string(),
            bio: None,
            email: email.map(|e| e.trim().to_lowercase()),
            phone: None,
            certificates: Vec::new(),
            public_profile_enabled: false,
            public_slug: None,
            visibility: SectionVisibility::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }

    /// Certifications of one kind, in stored order.
    pub fn certificates_of(&self, kind: CertificateKind) -> impl Iterator<Item = &CertificateEntry> {
        self.certificates.iter().filter(move |c| c.kind == kind)
    }

    /// Produce the profile that a save of `update` would persist.
    ///
    /// Pure: slug uniqueness is not checked here, it is enforced when the
    /// result is written.
    pub fn apply_update(
        &self,
        update: ProfileUpdate,
        policy: SlugReleasePolicy,
        now: DateTime<Utc>,
    ) -> Result<Profile, ProfileError> {
        let display_name = update.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(ProfileError::Validation("display name cannot be empty".to_string()));
        }

        let email = normalize_optional(update.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(ProfileError::Validation("invalid email format".to_string()));
            }
        }

        let public_slug = match update.public_slug.as_deref() {
            Some(raw) => Some(Slug::from_raw(raw).map_err(ProfileError::InvalidSlug)?),
            None => self.derive_slug(&display_name, update.public_profile_enabled, policy)?,
        };

        Ok(Profile {
            id: self.id,
            role: self.role,
            display_name,
            bio: normalize_optional(update.bio),
            email,
            phone: normalize_optional(update.phone),
            certificates: update.certificates,
            public_profile_enabled: update.public_profile_enabled,
            public_slug,
            visibility: update.visibility,
            version: self.version,
            created_at: self.created_at,
            updated_at: now,
        })
    }

    fn derive_slug(
        &self,
        display_name: &str,
        enable: bool,
        policy: SlugReleasePolicy,
    ) -> Result<Option<Slug>, ProfileError> {
        match (&self.public_slug, enable) {
            (None, true) => Slug::from_raw(display_name)
                .map(Some)
                .map_err(|_| ProfileError::CannotDeriveSlug(display_name.to_string())),
            (Some(_), false)
                if self.public_profile_enabled && policy == SlugReleasePolicy::ReleaseOnDisable =>
            {
                Ok(None)
            }
            (current, _) => Ok(current.clone()),
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Update payload
// ─────────────────────────────────────────────────────────────────────────────

/// Full editable profile payload submitted by the member on save.
///
/// `public_slug: None` means "no explicit slug": the current one is kept (or
/// derived when the public profile is being turned on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,
    #[serde(default)]
    pub public_profile_enabled: bool,
    #[serde(default)]
    pub public_slug: Option<String>,
    #[serde(default)]
    pub visibility: SectionVisibility,
    /// Version the client last read; omitted means "last write wins".
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl ProfileUpdate {
    /// Seed an update with the profile's current editable state.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            certificates: profile.certificates.clone(),
            public_profile_enabled: profile.public_profile_enabled,
            public_slug: None,
            visibility: profile.visibility,
            expected_version: Some(profile.version),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid public slug: {0}")]
    InvalidSlug(SlugError),

    #[error("cannot derive a public slug from display name '{0}'; choose one explicitly")]
    CannotDeriveSlug(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
