//! Public profile slugs.
//!
//! A slug is the canonical, URL-safe identifier used in public profile URLs
//! (`/p/{slug}`). Canonical slugs are lowercase ASCII letters, digits and
//! single interior hyphens, at most [`MAX_SLUG_LEN`] bytes long.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the length of a canonical slug.
pub const MAX_SLUG_LEN: usize = 80;

/// Turn arbitrary text into a canonical slug candidate.
///
/// Total and pure. The result may be empty (e.g. for `"!!!"`); callers decide
/// whether that is an error. Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    // Map separators, collapse whitespace runs, drop everything outside the charset.
    let mut mapped = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                mapped.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        match ch {
            '@' | '.' | '_' => mapped.push('-'),
            'a'..='z' | '0'..='9' | '-' => mapped.push(ch),
            _ => {}
        }
    }

    let mut collapsed = String::with_capacity(mapped.len());
    for ch in mapped.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }

    let mut slug = collapsed.trim_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        // ASCII only at this point, so byte truncation is on a char boundary.
        slug.truncate(MAX_SLUG_LEN);
        slug.truncate(slug.trim_end_matches('-').len());
    }
    slug
}

/// Returns `true` if `value` is already in canonical form.
pub fn is_canonical(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SLUG_LEN
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input normalizes to nothing usable.
    #[error("slug is empty after normalization")]
    Empty,

    /// The input is not a canonical slug (strict parsing only).
    #[error("'{0}' is not a canonical slug")]
    NotCanonical(String),
}

/// A canonical public slug.
///
/// Only canonical values can be constructed, so equality on `Slug` is the
/// case-insensitive uniqueness key of the slug index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Normalize free text into a slug; empty results are rejected.
    pub fn from_raw(raw: &str) -> Result<Self, SlugError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Accept only values that are already canonical (storage/wire decoding).
    pub fn parse(value: &str) -> Result<Self, SlugError> {
        if value.is_empty() {
            return Err(SlugError::Empty);
        }
        if !is_canonical(value) {
            return Err(SlugError::NotCanonical(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Slug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}
