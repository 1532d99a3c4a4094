//! Organizer eligibility.
//!
//! `evaluate` maps a profile snapshot to an itemized verdict. It does no IO
//! and never panics; enforcement (re-reading the stored profile right before a
//! privileged write) lives with the caller.

use std::collections::BTreeSet;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::profile::{CertificateKind, Profile};

/// One organizer requirement. Serialized keys are stable and used by the UI
/// to look up localized checklist labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    PublicProfileEnabled,
    SlugAssigned,
    InsurancePresent,
    InsuranceValid,
    MedicalCertificateValid,
}

impl RequirementKind {
    pub const ALL: [RequirementKind; 5] = [
        RequirementKind::PublicProfileEnabled,
        RequirementKind::SlugAssigned,
        RequirementKind::InsurancePresent,
        RequirementKind::InsuranceValid,
        RequirementKind::MedicalCertificateValid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementKind::PublicProfileEnabled => "public_profile_enabled",
            RequirementKind::SlugAssigned => "slug_assigned",
            RequirementKind::InsurancePresent => "insurance_present",
            RequirementKind::InsuranceValid => "insurance_valid",
            RequirementKind::MedicalCertificateValid => "medical_certificate_valid",
        }
    }
}

impl core::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Itemized outcome of an eligibility evaluation.
///
/// `eligible` is `true` exactly when `missing` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub missing: BTreeSet<RequirementKind>,
}

impl EligibilityVerdict {
    pub fn from_missing(missing: BTreeSet<RequirementKind>) -> Self {
        Self {
            eligible: missing.is_empty(),
            missing,
        }
    }

    pub fn granted() -> Self {
        Self::from_missing(BTreeSet::new())
    }
}

/// Oldest expiry date still accepted on `as_of`: one calendar month back.
///
/// Calendar rollback clamps to the end of shorter months
/// (2024-01-31 → 2023-12-31, 2024-03-31 → 2024-02-29).
pub fn grace_cutoff(as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(1))
        .unwrap_or(NaiveDate::MIN)
}

/// Whether a certification expiring on `expiry` still counts as valid on `as_of`.
/// Inclusive on the grace side.
pub fn is_within_grace(expiry: NaiveDate, as_of: NaiveDate) -> bool {
    expiry >= grace_cutoff(as_of)
}

/// Evaluate organizer eligibility for a profile snapshot.
pub fn evaluate(profile: &Profile, as_of: NaiveDate) -> EligibilityVerdict {
    if profile.is_admin() {
        return EligibilityVerdict::granted();
    }

    let mut missing = BTreeSet::new();

    if !profile.public_profile_enabled {
        missing.insert(RequirementKind::PublicProfileEnabled);
    }

    if profile.public_slug.as_ref().is_none_or(|s| s.as_str().is_empty()) {
        missing.insert(RequirementKind::SlugAssigned);
    }

    let mut named_insurance = profile
        .certificates_of(CertificateKind::Insurance)
        .filter(|c| c.has_name())
        .peekable();
    if named_insurance.peek().is_none() {
        missing.insert(RequirementKind::InsurancePresent);
        missing.insert(RequirementKind::InsuranceValid);
    } else if !named_insurance.any(|c| c.expiry_date.is_some_and(|d| is_within_grace(d, as_of))) {
        missing.insert(RequirementKind::InsuranceValid);
    }

    let medical_valid = profile
        .certificates_of(CertificateKind::MedicalCertificate)
        .any(|c| c.expiry_date.is_some_and(|d| is_within_grace(d, as_of)));
    if !medical_valid {
        missing.insert(RequirementKind::MedicalCertificateValid);
    }

    EligibilityVerdict::from_missing(missing)
}
