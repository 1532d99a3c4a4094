//! HTTP client for the profile API.

use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use gathering_profiles::{EligibilityVerdict, Profile, ProfileUpdate, RequirementKind};

use crate::cache::ProfileCache;
use crate::probe::{AvailabilityReport, AvailabilitySource, ProbeError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("slug '{slug}' is already taken; choose a different identifier")]
    SlugConflict { slug: String },

    #[error("organizer requirements not met: {missing:?}")]
    EligibilityDenied { missing: Vec<RequirementKind> },

    #[error("API error ({status}) {code}: {message}")]
    Api { status: u16, code: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Thin wrapper over `reqwest` carrying the base URL and bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub async fn fetch_profile(&self) -> Result<Profile, ClientError> {
        let resp = self
            .http
            .get(format!("{}/profile/me", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(resp).await
    }

    pub async fn save_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let resp = self
            .http
            .put(format!("{}/profile/me", self.base_url))
            .bearer_auth(&self.token)
            .json(update)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(resp).await
    }

    /// Advisory checklist for the editor; the server re-checks on every write.
    pub async fn eligibility(&self) -> Result<EligibilityVerdict, ClientError> {
        let resp = self
            .http
            .get(format!("{}/profile/eligibility", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(resp).await
    }

    pub async fn slug_availability(&self, candidate: &str) -> Result<AvailabilityReport, ClientError> {
        let resp = self
            .http
            .get(format!("{}/profile/slug-availability", self.base_url))
            .query(&[("candidate", candidate)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(resp).await
    }
}

#[async_trait::async_trait]
impl AvailabilitySource for ApiClient {
    async fn check(&self, candidate: &str) -> Result<AvailabilityReport, ProbeError> {
        self.slug_availability(candidate).await.map_err(|e| match e {
            ClientError::Api { status, message, .. } => ProbeError::Rejected { status, message },
            other => ProbeError::Transport(other.to_string()),
        })
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.map_err(|e| ClientError::Parse(e.to_string()));
    }

    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
    Err(error_from_body(status, &body))
}

fn error_from_body(status: StatusCode, body: &serde_json::Value) -> ClientError {
    let code = body["error"].as_str().unwrap_or_default();
    match code {
        "slug_conflict" => ClientError::SlugConflict {
            slug: body["slug"].as_str().unwrap_or_default().to_string(),
        },
        "eligibility_denied" => ClientError::EligibilityDenied {
            missing: serde_json::from_value(body["missing"].clone()).unwrap_or_default(),
        },
        _ => ClientError::Api {
            status: status.as_u16(),
            code: code.to_string(),
            message: body["message"].as_str().unwrap_or_default().to_string(),
        },
    }
}

/// The member's editing session: API client plus the local profile cache.
#[derive(Debug)]
pub struct ProfileSession {
    api: ApiClient,
    cache: ProfileCache,
}

impl ProfileSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: ProfileCache::default(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Cached profile when fresh, otherwise fetched.
    pub async fn profile(&mut self) -> Result<Profile, ClientError> {
        if let Some(cached) = self.cache.get(Utc::now()) {
            return Ok(cached.clone());
        }
        let fresh = self.api.fetch_profile().await?;
        self.cache.store(fresh.clone(), Utc::now());
        Ok(fresh)
    }

    /// Save and refresh the cache from the server's answer.
    ///
    /// The cache is dropped before the request, so a failed save never leaves
    /// the editor showing the rejected state.
    pub async fn save(&mut self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        self.cache.invalidate();
        let saved = self.api.save_profile(update).await?;
        self.cache.store(saved.clone(), Utc::now());
        Ok(saved)
    }
}
