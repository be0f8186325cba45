//! User domain model.
//!
//! # Invariants
//! - `name` is unique across the store.
//! - `password_hash` is opaque to the core and never logged.

use crate::model::Id;

/// Persisted user record.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub name: String,
    /// Salted hash produced outside the core.
    pub password_hash: Vec<u8>,
    /// Default display zone label.
    pub time_zone: String,
}

impl User {
    pub fn new(
        id: Id,
        name: impl Into<String>,
        password_hash: Vec<u8>,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            password_hash,
            time_zone: time_zone.into(),
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("password_hash", &"<redacted>")
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

/// Registration input. The hash is computed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub password_hash: Vec<u8>,
    /// Empty means `UTC`.
    pub time_zone: String,
}

/// Partial user update. Only the time zone is mutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub id: Id,
    /// `None` or empty keeps the stored zone.
    pub time_zone: Option<String>,
}
