//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into note/user use-cases.
//! - Enforce ownership, date normalization and display zone conversion.
//! - Translate store errors into caller-facing outcomes.
//!
//! # Invariants
//! - A note owned by someone else is reported exactly like a missing one.
//! - Store failures other than not-found/already-exists stay opaque.

use crate::model::time_zone::UnknownTimeZone;
use crate::model::Id;
use crate::repo::{EntityKind, RepoError};
use log::error;
use thiserror::Error;

pub mod note_merge;
pub mod note_service;
pub mod user_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for note/user use-cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing, or owned by another user. The two are indistinguishable.
    #[error("no such {kind} found (id: {id}) for user (id: {user_id})")]
    NotFound { kind: EntityKind, id: Id, user_id: Id },
    #[error("user not found: {name}")]
    UserNameNotFound { name: String },
    #[error("user ({name}) already exists")]
    AlreadyExists { name: String },
    #[error(transparent)]
    InvalidTimeZone(#[from] UnknownTimeZone),
    /// Opaque internal failure from the store.
    #[error("store failure: {0}")]
    Store(#[source] RepoError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UserNameNotFound { .. })
    }
}

/// Maps a store error raised while acting on `(kind, id)` for `user_id`.
pub(crate) fn map_repo_error(
    err: RepoError,
    kind: EntityKind,
    id: Id,
    user_id: Id,
    operation: &'static str,
) -> ServiceError {
    match err {
        RepoError::NotFound { .. } => ServiceError::NotFound { kind, id, user_id },
        RepoError::NameNotFound { name } => ServiceError::UserNameNotFound { name },
        RepoError::AlreadyExists { name } => ServiceError::AlreadyExists { name },
        other => {
            error!(
                "event={} module=service status=error kind={} id={} user_id={} error={}",
                operation, kind, id, user_id, other
            );
            ServiceError::Store(other)
        }
    }
}
