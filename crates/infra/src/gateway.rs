//! Organizer eligibility enforcement.
//!
//! The gateway is consulted immediately before any privileged write. It
//! always re-reads the stored profile and re-runs the evaluator; verdicts
//! computed earlier (or sent by a client) are never trusted.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use gathering_core::{EventId, ProfileId};
use gathering_profiles::{EligibilityVerdict, RequirementKind, evaluate};

use crate::profile_store::{ProfileStore, StoreError};

/// Privileged actions gated by organizer eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "event_id", rename_all = "snake_case")]
pub enum PrivilegedAction {
    CreateEvent,
    EditEvent(EventId),
}

impl PrivilegedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegedAction::CreateEvent => "create_event",
            PrivilegedAction::EditEvent(_) => "edit_event",
        }
    }
}

/// Outcome of a gateway check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Itemized requirements the member still has to satisfy.
    Deny(BTreeSet<RequirementKind>),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no profile for {0}")]
    UnknownProfile(ProfileId),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Enforcement point for organizer-only actions.
#[derive(Debug, Clone)]
pub struct EligibilityGateway<S> {
    store: S,
}

impl<S> EligibilityGateway<S>
where
    S: ProfileStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current verdict derived from the stored profile.
    pub async fn verdict(&self, profile_id: ProfileId, as_of: NaiveDate) -> Result<EligibilityVerdict, GatewayError> {
        let profile = self
            .store
            .get(profile_id)
            .await?
            .ok_or(GatewayError::UnknownProfile(profile_id))?;

        Ok(evaluate(&profile, as_of))
    }

    #[instrument(skip(self, profile_id, action), fields(profile_id = %profile_id, action = action.as_str()), err)]
    pub async fn authorize(
        &self,
        profile_id: ProfileId,
        action: PrivilegedAction,
        as_of: NaiveDate,
    ) -> Result<Decision, GatewayError> {
        let verdict = self.verdict(profile_id, as_of).await?;

        if verdict.eligible {
            info!("organizer action allowed");
            Ok(Decision::Allow)
        } else {
            let missing: Vec<&str> = verdict.missing.iter().map(RequirementKind::as_str).collect();
            warn!(?missing, "organizer action denied");
            Ok(Decision::Deny(verdict.missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use gathering_core::ExpectedVersion;
    use gathering_profiles::{CertificateEntry, CertificateKind, Profile, ProfileRole, Slug};

    use crate::profile_store::InMemoryProfileStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn organizer_ready(mut p: Profile) -> Profile {
        p.public_profile_enabled = true;
        p.public_slug = Some(Slug::parse("trail-boss").unwrap());
        p.certificates = vec![
            CertificateEntry::new(CertificateKind::Insurance, "Allianz", Some(today())),
            CertificateEntry::new(CertificateKind::MedicalCertificate, "ASL", Some(today())),
        ];
        p
    }

    async fn setup() -> (EligibilityGateway<Arc<InMemoryProfileStore>>, Arc<InMemoryProfileStore>, Profile) {
        let store = Arc::new(InMemoryProfileStore::new());
        let profile = store
            .insert(Profile::new(ProfileId::new(), "Trail Boss", None, Utc::now()))
            .await
            .unwrap();
        (EligibilityGateway::new(store.clone()), store, profile)
    }

    #[tokio::test]
    async fn denies_with_itemized_missing_set() {
        let (gateway, _store, profile) = setup().await;

        let decision = gateway
            .authorize(profile.id, PrivilegedAction::CreateEvent, today())
            .await
            .unwrap();

        assert_eq!(decision, Decision::Deny(RequirementKind::ALL.into_iter().collect()));
    }

    #[tokio::test]
    async fn allows_once_the_stored_profile_qualifies() {
        let (gateway, store, profile) = setup().await;
        store
            .commit(organizer_ready(profile.clone()), ExpectedVersion::Any)
            .await
            .unwrap();

        let decision = gateway
            .authorize(profile.id, PrivilegedAction::CreateEvent, today())
            .await
            .unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn re_reads_profile_on_every_call() {
        let (gateway, store, profile) = setup().await;
        let ready = store
            .commit(organizer_ready(profile.clone()), ExpectedVersion::Any)
            .await
            .unwrap();
        let event = EventId::new();
        assert!(gateway
            .authorize(profile.id, PrivilegedAction::EditEvent(event), today())
            .await
            .unwrap()
            .is_allowed());

        // The member turns the public profile off between render and write.
        let mut hidden = ready;
        hidden.public_profile_enabled = false;
        store.commit(hidden, ExpectedVersion::Any).await.unwrap();

        let decision = gateway
            .authorize(profile.id, PrivilegedAction::EditEvent(event), today())
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::Deny(BTreeSet::from([RequirementKind::PublicProfileEnabled]))
        );
    }

    #[tokio::test]
    async fn expired_certificates_flip_the_decision_over_time() {
        let (gateway, store, profile) = setup().await;
        store
            .commit(organizer_ready(profile.clone()), ExpectedVersion::Any)
            .await
            .unwrap();

        let two_months_later = NaiveDate::from_ymd_opt(2024, 8, 16).unwrap();
        let decision = gateway
            .authorize(profile.id, PrivilegedAction::CreateEvent, two_months_later)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::Deny(BTreeSet::from([
                RequirementKind::InsuranceValid,
                RequirementKind::MedicalCertificateValid,
            ]))
        );
    }

    #[tokio::test]
    async fn admins_are_always_allowed() {
        let (gateway, store, profile) = setup().await;
        let mut admin = profile.clone();
        admin.role = ProfileRole::Admin;
        store.commit(admin, ExpectedVersion::Any).await.unwrap();

        assert!(gateway
            .authorize(profile.id, PrivilegedAction::CreateEvent, today())
            .await
            .unwrap()
            .is_allowed());
    }

    #[tokio::test]
    async fn unknown_profile_is_an_error_not_a_denial() {
        let (gateway, _store, _profile) = setup().await;
        let ghost = ProfileId::new();
        let err = gateway
            .authorize(ghost, PrivilegedAction::CreateEvent, today())
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UnknownProfile(ghost));
    }
}
