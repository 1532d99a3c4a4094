//! `gathering-profiles`: member profiles, public slugs and organizer eligibility.
//!
//! Everything here is pure: no IO, no clocks. Storage, slug uniqueness and
//! enforcement are provided by `gathering-infra`.

pub mod eligibility;
pub mod profile;
pub mod public_view;
pub mod slug;

pub use eligibility::{EligibilityVerdict, RequirementKind, evaluate, grace_cutoff, is_within_grace};
pub use profile::{
    CertificateEntry, CertificateKind, Profile, ProfileError, ProfileRole, ProfileUpdate,
    SectionVisibility, SlugReleasePolicy,
};
pub use public_view::{PublicCertificate, PublicContact, PublicProfile};
pub use slug::{MAX_SLUG_LEN, Slug, SlugError, normalize};
