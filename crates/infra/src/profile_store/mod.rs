//! Authoritative profile storage boundary.
//!
//! The slug uniqueness constraint lives here, at the storage layer, so every
//! write path that touches a slug inherits it.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryProfileStore;
pub use postgres::PostgresProfileStore;
pub use r#trait::{ProfileStore, StoreError};
