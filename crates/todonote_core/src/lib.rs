//! Core domain logic for the todonote backend.
//! Stores, filtering, time-zone handling and note/user use-cases live here;
//! transport layers sit on top of [`service`].

pub mod cancel;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cancel::CancelToken;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Backend, ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_retry, share, DbError, SharedConnection};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{NewNote, Note};
pub use model::time_zone::{convert, normalize_utc, validate, TimeZone, UnknownTimeZone};
pub use model::user::{NewUser, User, UserUpdate};
pub use model::Id;
pub use repo::filter::{FilterError, FilterParams, PageFilter};
pub use repo::memory::{InMemoryNoteRepository, InMemoryUserRepository};
pub use repo::note_repo::SqliteNoteRepository;
pub use repo::user_repo::SqliteUserRepository;
pub use repo::{
    EntityKind, NoteFilter, NoteRepository, RepoError, RepoResult, TransientError, UserRepository,
};
pub use service::note_merge::{merge_note_patch, NotePatch};
pub use service::note_service::{FindParams, NoteService};
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
