//! SQLite-backed user store.
//!
//! # Responsibility
//! - Implement [`UserRepository`] over the shared connection.
//!
//! # Invariants
//! - The `users.name` unique constraint surfaces as `AlreadyExists`.
//! - Missing rows surface as the same `NotFound`/`NameNotFound` the
//!   in-memory store returns.
//! - Deleting a user does not touch the `notes` table.

use crate::cancel::CancelToken;
use crate::db::{table_exists, SharedConnection};
use crate::model::user::User;
use crate::model::Id;
use crate::repo::note_repo::{expect_single_row, InterruptGuard};
use crate::repo::{ensure_not_cancelled, EntityKind, RepoError, RepoResult, UserRepository};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::MutexGuard;

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    password_hash,
    time_zone
FROM users";

/// User store backed by the `users` table.
#[derive(Clone)]
pub struct SqliteUserRepository {
    conn: SharedConnection,
}

impl SqliteUserRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the `users` table is missing.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        let repo = Self { conn };
        {
            let guard = repo.lock()?;
            if !table_exists(&guard, "users")? {
                return Err(RepoError::InvalidData {
                    kind: EntityKind::User,
                    message: "missing required table `users`".to_string(),
                });
            }
        }
        Ok(repo)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::LockPoisoned(EntityKind::User))
    }

    fn query_one(
        &self,
        cancel: &CancelToken,
        where_clause: &str,
        param: &dyn rusqlite::ToSql,
    ) -> RepoResult<Option<User>> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE {where_clause};"))?;
        let user = stmt
            .query_row([param], |row| Ok(parse_user_row(row)))
            .optional()?;
        user.transpose()
    }
}

impl UserRepository for SqliteUserRepository {
    fn insert(&self, cancel: &CancelToken, user: &User) -> RepoResult<Id> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        conn.execute(
            "INSERT INTO users (name, password_hash, time_zone) VALUES (?1, ?2, ?3);",
            params![user.name.as_str(), user.password_hash.as_slice(), user.time_zone.as_str()],
        )
        .map_err(|err| map_unique_violation(err, &user.name))?;

        Ok(conn.last_insert_rowid())
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<User> {
        self.query_one(cancel, "id = ?1", &id)?
            .ok_or(RepoError::NotFound {
                kind: EntityKind::User,
                id,
            })
    }

    fn get_by_name(&self, cancel: &CancelToken, name: &str) -> RepoResult<User> {
        self.query_one(cancel, "name = ?1", &name)?
            .ok_or_else(|| RepoError::NameNotFound {
                name: name.to_string(),
            })
    }

    fn update(&self, cancel: &CancelToken, user: &User) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let changed = conn
            .execute(
                "UPDATE users SET name = ?1, time_zone = ?2 WHERE id = ?3;",
                params![user.name.as_str(), user.time_zone.as_str(), user.id],
            )
            .map_err(|err| map_unique_violation(err, &user.name))?;

        expect_single_row(EntityKind::User, user.id, changed)
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let changed = conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        expect_single_row(EntityKind::User, id, changed)
    }
}

fn map_unique_violation(err: rusqlite::Error, name: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        if ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return RepoError::AlreadyExists {
                name: name.to_string(),
            };
        }
    }
    err.into()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        password_hash: row.get("password_hash")?,
        time_zone: row.get("time_zone")?,
    })
}
