//! Domain model for notes, users and display time zones.
//!
//! # Responsibility
//! - Define the records shared by stores, filters and services.
//! - Own the fixed time zone registry.
//!
//! # Invariants
//! - Identifiers are store-assigned, positive and monotonically increasing.
//! - Note dates are persisted in UTC.

pub mod note;
pub mod time_zone;
pub mod user;

/// Store-assigned record identifier.
pub type Id = i64;
