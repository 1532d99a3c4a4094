use gathering_auth::JwtClaims;
use gathering_core::ProfileId;

/// Authenticated member for a request, derived from verified token claims.
///
/// Carries identity only. Organizer capability is never read from here; it is
/// evaluated against the stored profile on every privileged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    profile_id: ProfileId,
    display_name: String,
    email: Option<String>,
}

impl PrincipalContext {
    pub fn new(profile_id: ProfileId, display_name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            profile_id,
            display_name: display_name.into(),
            email,
        }
    }

    pub fn from_claims(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.name, claims.email)
    }

    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
