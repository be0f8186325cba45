//! SQLite-backed note store.
//!
//! # Responsibility
//! - Implement [`NoteRepository`] over the shared connection.
//! - Translate the filter descriptor into one parameterized statement.
//! - Map SQLite failures into the store error taxonomy.
//!
//! # Invariants
//! - `update`/`delete` require exactly one affected row: zero is `NotFound`,
//!   more than one is `IntegrityViolation`.
//! - Listing order is `id ASC`, with `id > cursor` as the keyset bound.
//! - Dates are persisted as fixed-width RFC 3339 UTC text.
//! - A fired cancel token interrupts the running statement.

use crate::cancel::CancelToken;
use crate::db::{table_exists, SharedConnection};
use crate::model::note::Note;
use crate::model::Id;
use crate::repo::filter::NoteFilter;
use crate::repo::{
    date_range, ensure_not_cancelled, ensure_storable_note, DateRange, EntityKind,
    NoteRepository, RepoError, RepoResult,
};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::panic::AssertUnwindSafe;
use std::sync::MutexGuard;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    text,
    date,
    is_finished
FROM notes";

/// SQLite VM instructions between cancellation checks.
const PROGRESS_CHECK_OPS: i32 = 1000;

/// Note store backed by the `notes` table.
#[derive(Clone)]
pub struct SqliteNoteRepository {
    conn: SharedConnection,
}

impl SqliteNoteRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the `notes` table is missing.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        let repo = Self { conn };
        {
            let guard = repo.lock()?;
            if !table_exists(&guard, "notes")? {
                return Err(RepoError::InvalidData {
                    kind: EntityKind::Note,
                    message: "missing required table `notes`".to_string(),
                });
            }
        }
        Ok(repo)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::LockPoisoned(EntityKind::Note))
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn insert(&self, cancel: &CancelToken, note: &Note) -> RepoResult<Id> {
        ensure_not_cancelled(cancel)?;
        ensure_storable_note(note)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        conn.execute(
            "INSERT INTO notes (user_id, title, text, date, is_finished)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note.user_id,
                note.title.as_str(),
                note.text.as_str(),
                date_to_db(&note.date),
                bool_to_int(note.is_finished),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<Note> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let note = stmt
            .query_row([id], |row| Ok(parse_note_row(row)))
            .optional()?;

        match note {
            Some(parsed) => parsed,
            None => Err(RepoError::NotFound {
                kind: EntityKind::Note,
                id,
            }),
        }
    }

    fn get_all_filtered(&self, cancel: &CancelToken, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        ensure_not_cancelled(cancel)?;
        let (sql, bind_values) = build_filter_query(filter);
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn update(&self, cancel: &CancelToken, note: &Note) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        ensure_storable_note(note)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let changed = conn.execute(
            "UPDATE notes
             SET
                user_id = ?1,
                title = ?2,
                text = ?3,
                date = ?4,
                is_finished = ?5
             WHERE id = ?6;",
            params![
                note.user_id,
                note.title.as_str(),
                note.text.as_str(),
                date_to_db(&note.date),
                bool_to_int(note.is_finished),
                note.id,
            ],
        )?;

        expect_single_row(EntityKind::Note, note.id, changed)
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        let conn = self.lock()?;
        let _interrupt = InterruptGuard::install(&conn, cancel);

        let changed = conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        expect_single_row(EntityKind::Note, id, changed)
    }
}

/// Builds the listing statement and its bind values.
///
/// Only constrained fields add predicates, so an absent completion flag or
/// date bound matches every row. A date bound before the storable range
/// matches every row and one after it matches none.
pub fn build_filter_query(filter: &NoteFilter) -> (String, Vec<Value>) {
    let mut sql = format!("{NOTE_SELECT_SQL} WHERE user_id = ?");
    let mut bind_values = vec![Value::Integer(filter.user_id)];

    if let Some(cursor) = filter.page.cursor {
        sql.push_str(" AND id > ?");
        bind_values.push(Value::Integer(cursor));
    }

    if let Some(take_from) = filter.take_from.as_ref() {
        match date_range(take_from) {
            DateRange::Before => {}
            DateRange::Within => {
                sql.push_str(" AND date >= ?");
                bind_values.push(Value::Text(date_to_db(take_from)));
            }
            DateRange::After => sql.push_str(" AND 0"),
        }
    }

    if let Some(is_finished) = filter.is_finished {
        sql.push_str(" AND is_finished = ?");
        bind_values.push(Value::Integer(bool_to_int(is_finished)));
    }

    sql.push_str(" ORDER BY id ASC LIMIT ?");
    bind_values.push(Value::Integer(
        i64::try_from(filter.effective_limit()).unwrap_or(i64::MAX),
    ));

    (sql, bind_values)
}

pub(crate) fn expect_single_row(kind: EntityKind, id: Id, changed: usize) -> RepoResult<()> {
    match changed {
        1 => Ok(()),
        0 => Err(RepoError::NotFound { kind, id }),
        affected => Err(RepoError::IntegrityViolation { kind, id, affected }),
    }
}

/// Installs a progress handler that aborts the running statement once the
/// token fires, and removes it on drop.
pub(crate) struct InterruptGuard<'conn> {
    conn: &'conn Connection,
}

impl<'conn> InterruptGuard<'conn> {
    pub(crate) fn install(conn: &'conn Connection, cancel: &CancelToken) -> Self {
        let token = AssertUnwindSafe(cancel.clone());
        conn.progress_handler(PROGRESS_CHECK_OPS, Some(move || token.is_cancelled()));
        Self { conn }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: Id = row.get("id")?;

    let date_text: String = row.get("date")?;
    let date = DateTime::parse_from_rfc3339(&date_text).map_err(|_| RepoError::InvalidData {
        kind: EntityKind::Note,
        message: format!("invalid date value `{date_text}` in notes.date (id {id})"),
    })?;

    let is_finished = match row.get::<_, i64>("is_finished")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData {
                kind: EntityKind::Note,
                message: format!("invalid is_finished value `{other}` in notes.is_finished"),
            });
        }
    };

    Ok(Note {
        id,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        text: row.get("text")?,
        date,
        is_finished,
    })
}

fn date_to_db(date: &DateTime<FixedOffset>) -> String {
    date.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{build_filter_query, date_to_db, expect_single_row, InterruptGuard};
    use crate::cancel::CancelToken;
    use crate::db::open_db_in_memory;
    use crate::repo::{EntityKind, NoteFilter, RepoError};
    use chrono::{DateTime, TimeZone, Utc};
    use rusqlite::types::Value;
    use std::thread;
    use std::time::Duration;

    const LONG_COUNT_SQL: &str = "WITH RECURSIVE counter(x) AS (
            SELECT 1
            UNION ALL
            SELECT x + 1 FROM counter WHERE x < 200000000
        )
        SELECT COUNT(*) FROM counter;";

    #[test]
    fn unconstrained_filter_adds_no_optional_predicates() {
        let (sql, binds) = build_filter_query(&NoteFilter::for_user(3));
        assert!(sql.contains("user_id = ?"));
        assert!(!sql.contains("is_finished = ?"));
        assert!(!sql.contains("date >= ?"));
        assert!(!sql.contains("id > ?"));
        assert!(sql.ends_with("ORDER BY id ASC LIMIT ?"));
        assert_eq!(binds, vec![Value::Integer(3), Value::Integer(1000)]);
    }

    #[test]
    fn constrained_filter_binds_in_predicate_order() {
        let from = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").unwrap();
        let filter = NoteFilter::for_user(3)
            .with_cursor(10)
            .with_take_from(from)
            .with_is_finished(true)
            .with_limit(20);
        let (_, binds) = build_filter_query(&filter);
        assert_eq!(
            binds,
            vec![
                Value::Integer(3),
                Value::Integer(10),
                Value::Text("2024-05-01T10:00:00.000000000Z".to_string()),
                Value::Integer(1),
                Value::Integer(20),
            ]
        );
    }

    #[test]
    fn dates_are_stored_as_sortable_utc_text() {
        let early = DateTime::parse_from_rfc3339("2024-05-01T21:30:00-03:00").unwrap();
        let late = DateTime::parse_from_rfc3339("2024-05-02T03:00:00+01:00").unwrap();
        assert!(early < late);
        assert!(date_to_db(&early) < date_to_db(&late));
    }

    #[test]
    fn affected_row_count_maps_to_taxonomy() {
        assert!(expect_single_row(EntityKind::Note, 1, 1).is_ok());
        assert!(matches!(
            expect_single_row(EntityKind::Note, 1, 0),
            Err(RepoError::NotFound { id: 1, .. })
        ));
        assert!(matches!(
            expect_single_row(EntityKind::Note, 1, 2),
            Err(RepoError::IntegrityViolation { affected: 2, .. })
        ));
    }

    #[test]
    fn date_bounds_outside_storable_years_need_no_bind() {
        let far_future = Utc
            .with_ymd_and_hms(10001, 2, 3, 23, 0, 0)
            .unwrap()
            .fixed_offset();
        let (sql, binds) = build_filter_query(&NoteFilter::for_user(1).with_take_from(far_future));
        assert!(sql.contains(" AND 0"));
        assert!(!sql.contains("date >= ?"));
        assert_eq!(binds.len(), 2);

        let far_past = Utc
            .with_ymd_and_hms(-5, 1, 1, 0, 0, 0)
            .unwrap()
            .fixed_offset();
        let (sql, binds) = build_filter_query(&NoteFilter::for_user(1).with_take_from(far_past));
        assert!(!sql.contains("date >= ?"));
        assert!(!sql.contains(" AND 0"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn running_statement_is_interrupted_when_token_fires() {
        let conn = open_db_in_memory().unwrap();
        let cancel = CancelToken::new();

        let result = thread::scope(|scope| {
            let trigger = cancel.clone();
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(100));
                trigger.cancel();
            });

            let _interrupt = InterruptGuard::install(&conn, &cancel);
            conn.query_row(LONG_COUNT_SQL, [], |row| row.get::<_, i64>(0))
        });

        let err = RepoError::from(result.unwrap_err());
        assert!(err.is_cancelled(), "unexpected error: {err}");

        let one: i64 = conn.query_row("SELECT 1;", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn guard_is_removed_on_drop() {
        let conn = open_db_in_memory().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        drop(InterruptGuard::install(&conn, &cancel));

        let count: i64 = conn
            .query_row(
                "WITH RECURSIVE counter(x) AS (
                    SELECT 1 UNION ALL SELECT x + 1 FROM counter WHERE x < 100000
                )
                SELECT COUNT(*) FROM counter;",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 100_000);
    }
}
