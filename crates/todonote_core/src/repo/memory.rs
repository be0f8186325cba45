//! In-memory note/user stores.
//!
//! # Responsibility
//! - Provide map-backed implementations of the store contracts for tests and
//!   default operation.
//!
//! # Invariants
//! - One `RwLock` per entity type guards both the map and the id counter.
//! - Ids are assigned under the write lock, so concurrent inserts never
//!   collide and always increase.
//! - The lock is held only for the map access; records are cloned out.
//! - `delete` of a missing id is an idempotent no-op here.
//! - Deleting a user leaves that user's notes in place.

use crate::cancel::CancelToken;
use crate::model::note::Note;
use crate::model::user::User;
use crate::model::Id;
use crate::repo::filter::NoteFilter;
use crate::repo::{
    ensure_not_cancelled, ensure_storable_note, EntityKind, NoteRepository, RepoError,
    RepoResult, UserRepository,
};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const FIRST_ID: Id = 1;

struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: FIRST_ID,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn read<T>(lock: &RwLock<Table<T>>, kind: EntityKind) -> RepoResult<RwLockReadGuard<'_, Table<T>>> {
    lock.read().map_err(|_| RepoError::LockPoisoned(kind))
}

fn write<T>(
    lock: &RwLock<Table<T>>,
    kind: EntityKind,
) -> RepoResult<RwLockWriteGuard<'_, Table<T>>> {
    lock.write().map_err(|_| RepoError::LockPoisoned(kind))
}

/// Map-backed note store.
#[derive(Default)]
pub struct InMemoryNoteRepository {
    table: RwLock<Table<Note>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with three open notes owned by user 1, dated `now`.
    pub fn with_seed_data(now: DateTime<FixedOffset>) -> RepoResult<Self> {
        let repo = Self::new();
        let cancel = CancelToken::new();
        for _ in 0..3 {
            repo.insert(&cancel, &Note::new(0, 1, "title", "text", now, false))?;
        }
        Ok(repo)
    }

    /// Number of stored notes, regardless of owner.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(read(&self.table, EntityKind::Note)?.rows.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl NoteRepository for InMemoryNoteRepository {
    fn insert(&self, cancel: &CancelToken, note: &Note) -> RepoResult<Id> {
        ensure_not_cancelled(cancel)?;
        ensure_storable_note(note)?;
        let mut table = write(&self.table, EntityKind::Note)?;
        let id = table.allocate_id();
        let mut stored = note.clone();
        stored.id = id;
        table.rows.insert(id, stored);
        Ok(id)
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<Note> {
        ensure_not_cancelled(cancel)?;
        read(&self.table, EntityKind::Note)?
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound {
                kind: EntityKind::Note,
                id,
            })
    }

    fn get_all_filtered(&self, cancel: &CancelToken, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        ensure_not_cancelled(cancel)?;
        let table = read(&self.table, EntityKind::Note)?;
        let start = filter
            .page
            .cursor
            .map_or(Id::MIN, |cursor| cursor.saturating_add(1));
        Ok(filter.select(table.rows.range(start..).map(|(_, note)| note)))
    }

    fn update(&self, cancel: &CancelToken, note: &Note) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        ensure_storable_note(note)?;
        let mut table = write(&self.table, EntityKind::Note)?;
        match table.rows.get_mut(&note.id) {
            Some(stored) => {
                *stored = note.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound {
                kind: EntityKind::Note,
                id: note.id,
            }),
        }
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        write(&self.table, EntityKind::Note)?.rows.remove(&id);
        Ok(())
    }
}

/// Map-backed user store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the demo account `user` in `UTC-4`.
    pub fn with_seed_data(password_hash: Vec<u8>) -> RepoResult<Self> {
        let repo = Self::new();
        repo.insert(
            &CancelToken::new(),
            &User::new(0, "user", password_hash, "UTC-4"),
        )?;
        Ok(repo)
    }
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, cancel: &CancelToken, user: &User) -> RepoResult<Id> {
        ensure_not_cancelled(cancel)?;
        let mut table = write(&self.table, EntityKind::User)?;
        if table.rows.values().any(|stored| stored.name == user.name) {
            return Err(RepoError::AlreadyExists {
                name: user.name.clone(),
            });
        }
        let id = table.allocate_id();
        let mut stored = user.clone();
        stored.id = id;
        table.rows.insert(id, stored);
        Ok(id)
    }

    fn get_by_id(&self, cancel: &CancelToken, id: Id) -> RepoResult<User> {
        ensure_not_cancelled(cancel)?;
        read(&self.table, EntityKind::User)?
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound {
                kind: EntityKind::User,
                id,
            })
    }

    fn get_by_name(&self, cancel: &CancelToken, name: &str) -> RepoResult<User> {
        ensure_not_cancelled(cancel)?;
        read(&self.table, EntityKind::User)?
            .rows
            .values()
            .find(|user| user.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NameNotFound {
                name: name.to_string(),
            })
    }

    fn update(&self, cancel: &CancelToken, user: &User) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        let mut table = write(&self.table, EntityKind::User)?;
        if table
            .rows
            .iter()
            .any(|(id, stored)| *id != user.id && stored.name == user.name)
        {
            return Err(RepoError::AlreadyExists {
                name: user.name.clone(),
            });
        }
        match table.rows.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound {
                kind: EntityKind::User,
                id: user.id,
            }),
        }
    }

    fn delete(&self, cancel: &CancelToken, id: Id) -> RepoResult<()> {
        ensure_not_cancelled(cancel)?;
        write(&self.table, EntityKind::User)?.rows.remove(&id);
        Ok(())
    }
}
