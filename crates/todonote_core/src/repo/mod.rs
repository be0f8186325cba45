//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note/user store contracts shared by both backends.
//! - Translate backend failures into one closed error taxonomy.
//!
//! # Invariants
//! - `insert` always assigns a fresh id and ignores the input id.
//! - `update` reports `NotFound` for a missing id; it never silently no-ops.
//! - Backend-specific error shapes never cross this boundary.
//! - Every operation refuses to start once its cancel token has fired.
//! - Note dates outside years 1..=9999 (UTC) are refused on write by both
//!   backends; that range keeps the SQLite text encoding fixed-width.
//!
//! # Backend differences
//! - Deleting a missing id is a no-op in memory but `NotFound` in SQLite.
//!   Callers must not assume either behavior.

use crate::cancel::CancelToken;
use crate::db::DbError;
use crate::model::note::Note;
use crate::model::user::User;
use crate::model::Id;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

pub mod filter;
pub mod memory;
pub mod note_repo;
pub mod user_repo;

pub use filter::NoteFilter;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity tag carried by errors for structured context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Note,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::User => "user",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-boundary error taxonomy.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Id absent from the store.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Id },
    /// No user with this name.
    #[error("user not found: {name}")]
    NameNotFound { name: String },
    /// Unique user name already taken.
    #[error("user ({name}) already exists")]
    AlreadyExists { name: String },
    /// A mutation touched an unexpected number of rows.
    #[error("{kind} {id}: expected exactly one affected row, got {affected}")]
    IntegrityViolation {
        kind: EntityKind,
        id: Id,
        affected: usize,
    },
    /// In-memory store lock was poisoned by a panicking writer.
    #[error("{0} store lock poisoned")]
    LockPoisoned(EntityKind),
    /// Persisted row could not be decoded.
    #[error("invalid persisted {kind} data: {message}")]
    InvalidData { kind: EntityKind, message: String },
    /// Connectivity or cancellation failure. Never retried by the core.
    #[error(transparent)]
    Transient(#[from] TransientError),
}

#[derive(Debug, Error)]
pub enum TransientError {
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Db(#[from] DbError),
}

impl RepoError {
    /// Both id and name lookups collapse to "not found" for callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NameNotFound { .. })
    }

    /// `NotFound` and `AlreadyExists` map to user-facing outcomes; the rest
    /// are internal failures.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found() || matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transient(TransientError::Cancelled))
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Transient(TransientError::Db(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            return Self::Transient(TransientError::Cancelled);
        }
        Self::Transient(TransientError::Db(DbError::Sqlite(value)))
    }
}

/// Fails fast when the caller already gave up.
pub(crate) fn ensure_not_cancelled(cancel: &CancelToken) -> RepoResult<()> {
    if cancel.is_cancelled() {
        return Err(TransientError::Cancelled.into());
    }
    Ok(())
}

/// Earliest UTC year a stored note date may fall in.
pub const MIN_STORABLE_YEAR: i32 = 1;
/// Latest UTC year a stored note date may fall in.
pub const MAX_STORABLE_YEAR: i32 = 9999;

/// Where a date bound falls relative to the storable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateRange {
    Before,
    Within,
    After,
}

pub(crate) fn date_range(date: &DateTime<FixedOffset>) -> DateRange {
    let year = date.with_timezone(&Utc).year();
    if year < MIN_STORABLE_YEAR {
        DateRange::Before
    } else if year > MAX_STORABLE_YEAR {
        DateRange::After
    } else {
        DateRange::Within
    }
}

/// Refuses to write a note whose date cannot be stored and read back.
pub(crate) fn ensure_storable_note(note: &Note) -> RepoResult<()> {
    if date_range(&note.date) == DateRange::Within {
        return Ok(());
    }
    Err(RepoError::InvalidData {
        kind: EntityKind::Note,
        message: format!(
            "date {} (id {}) is outside years {MIN_STORABLE_YEAR}..={MAX_STORABLE_YEAR}",
            note.date.to_rfc3339(),
            note.id
        ),
    })
}

/// Note store contract implemented by the in-memory and SQLite backends.
pub trait NoteRepository {
    /// Stores a note under a fresh id and returns that id.
    ///
    /// Dates outside the storable year range fail `InvalidData`.
    fn insert(&self, cancel: &CancelToken, note: &Note) -> RepoResult<Id>;
    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<Note>;
    /// Runs the filter/pagination descriptor. Results are ordered by id.
    fn get_all_filtered(&self, cancel: &CancelToken, filter: &NoteFilter) -> RepoResult<Vec<Note>>;
    /// Replaces every field of the stored note with `note.id`.
    fn update(&self, cancel: &CancelToken, note: &Note) -> RepoResult<()>;
    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()>;
}

/// User store contract implemented by the in-memory and SQLite backends.
pub trait UserRepository {
    /// Stores a user under a fresh id. Duplicate names fail `AlreadyExists`.
    fn insert(&self, cancel: &CancelToken, user: &User) -> RepoResult<Id>;
    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<User>;
    fn get_by_name(&self, cancel: &CancelToken, name: &str) -> RepoResult<User>;
    fn update(&self, cancel: &CancelToken, user: &User) -> RepoResult<()>;
    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()>;
}

impl<R: NoteRepository + ?Sized> NoteRepository for Arc<R> {
    fn insert(&self, cancel: &CancelToken, note: &Note) -> RepoResult<Id> {
        (**self).insert(cancel, note)
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<Note> {
        (**self).get_by_id(cancel, id)
    }

    fn get_all_filtered(&self, cancel: &CancelToken, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        (**self).get_all_filtered(cancel, filter)
    }

    fn update(&self, cancel: &CancelToken, note: &Note) -> RepoResult<()> {
        (**self).update(cancel, note)
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        (**self).delete(cancel, id)
    }
}

impl<R: UserRepository + ?Sized> UserRepository for Arc<R> {
    fn insert(&self, cancel: &CancelToken, user: &User) -> RepoResult<Id> {
        (**self).insert(cancel, user)
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<User> {
        (**self).get_by_id(cancel, id)
    }

    fn get_by_name(&self, cancel: &CancelToken, name: &str) -> RepoResult<User> {
        (**self).get_by_name(cancel, name)
    }

    fn update(&self, cancel: &CancelToken, user: &User) -> RepoResult<()> {
        (**self).update(cancel, user)
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        (**self).delete(cancel, id)
    }
}
