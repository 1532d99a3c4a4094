//! `gathering-auth`: bearer-token authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Organizer
//! authorization is not decided here: it is derived from the stored profile.

pub mod claims;
pub mod jwt;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
