//! What anonymous visitors see at `/p/{slug}`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::profile::{CertificateKind, Profile};
use crate::slug::Slug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicCertificate {
    pub kind: CertificateKind,
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicContact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Public projection of a profile with hidden sections removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub slug: Slug,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<PublicContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<PublicCertificate>>,
    /// Whether the organized-events section may be listed.
    pub show_events: bool,
}

impl PublicProfile {
    /// `None` unless the profile is public and holds a slug.
    ///
    /// Certificate numbers are never published.
    pub fn project(profile: &Profile) -> Option<Self> {
        if !profile.public_profile_enabled {
            return None;
        }
        let slug = profile.public_slug.clone()?;
        let vis = profile.visibility;

        Some(Self {
            slug,
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone().filter(|_| vis.bio),
            contact: vis.contact.then(|| PublicContact {
                email: profile.email.clone(),
                phone: profile.phone.clone(),
            }),
            certifications: vis.certifications.then(|| {
                profile
                    .certificates
                    .iter()
                    .filter(|c| c.has_name())
                    .map(|c| PublicCertificate {
                        kind: c.kind,
                        name: c.name.clone(),
                        expiry_date: c.expiry_date,
                    })
                    .collect()
            }),
            show_events: vis.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CertificateEntry, SectionVisibility};
    use chrono::Utc;
    use gathering_core::ProfileId;

    fn public_profile() -> Profile {
        let mut p = Profile::new(ProfileId::new(), "Mario Rossi", Some("mario@example.com".into()), Utc::now());
        p.public_profile_enabled = true;
        p.public_slug = Some(Slug::parse("mario-rossi").unwrap());
        p.bio = Some("Hiking guide".into());
        p.phone = Some("+39 000".into());
        let mut insurance = CertificateEntry::new(CertificateKind::Insurance, "Allianz", None);
        insurance.number = Some("POL-123".into());
        p.certificates = vec![insurance, CertificateEntry::new(CertificateKind::Diploma, "  ", None)];
        p
    }

    #[test]
    fn private_profiles_are_not_projected() {
        let mut p = public_profile();
        p.public_profile_enabled = false;
        assert_eq!(PublicProfile::project(&p), None);

        let mut p = public_profile();
        p.public_slug = None;
        assert_eq!(PublicProfile::project(&p), None);
    }

    #[test]
    fn default_visibility_shows_bio_and_events_only() {
        let view = PublicProfile::project(&public_profile()).unwrap();
        assert_eq!(view.bio.as_deref(), Some("Hiking guide"));
        assert!(view.contact.is_none());
        assert!(view.certifications.is_none());
        assert!(view.show_events);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("contact").is_none());
        assert_eq!(json["slug"], "mario-rossi");
    }

    #[test]
    fn enabled_sections_are_included_without_certificate_numbers() {
        let mut p = public_profile();
        p.visibility = SectionVisibility {
            bio: false,
            contact: true,
            certifications: true,
            events: false,
        };

        let view = PublicProfile::project(&p).unwrap();
        assert!(view.bio.is_none());
        assert_eq!(view.contact.unwrap().email.as_deref(), Some("mario@example.com"));

        let certs = view.certifications.unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].name, "Allianz");
        assert!(!serde_json::to_string(&certs).unwrap().contains("POL-123"));
        assert!(!view.show_events);
    }
}
