//! Note use-case service.
//!
//! # Responsibility
//! - Provide create/find/list/update/remove APIs for one user's notes.
//! - Default missing dates to "now" and persist every date in UTC.
//! - Convert returned dates into the caller's display zone.
//!
//! # Invariants
//! - The owner always comes from the authenticated identity argument.
//! - Ownership mismatch yields `NotFound`, never a distinct error.
//! - Updates go through [`merge_note_patch`] and never change the owner.

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};
use crate::model::note::{NewNote, Note};
use crate::model::time_zone::{convert, normalize_utc, TimeZone};
use crate::model::Id;
use crate::repo::{EntityKind, NoteFilter, NoteRepository};
use crate::service::note_merge::{merge_note_patch, NotePatch};
use crate::service::{map_repo_error, ServiceError, ServiceResult};
use log::{debug, info};

/// Listing request: filter descriptor plus display zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindParams {
    pub filter: NoteFilter,
    pub zone: TimeZone,
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository and the wall clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: NoteRepository, C: Clock> NoteService<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates one note owned by `user_id` and returns its id.
    pub fn create_note(
        &self,
        cancel: &CancelToken,
        user_id: Id,
        new_note: NewNote,
    ) -> ServiceResult<Id> {
        let date = new_note
            .date
            .unwrap_or_else(|| self.clock.now().fixed_offset());
        let note = Note::new(
            0,
            user_id,
            new_note.title,
            new_note.text,
            normalize_utc(date),
            false,
        );

        let id = self
            .repo
            .insert(cancel, &note)
            .map_err(|err| map_repo_error(err, EntityKind::Note, 0, user_id, "note_create"))?;
        info!("event=note_create module=service status=ok note_id={id} user_id={user_id}");
        Ok(id)
    }

    /// Gets one owned note with its date shown in `zone`.
    pub fn find_note(
        &self,
        cancel: &CancelToken,
        note_id: Id,
        user_id: Id,
        zone: TimeZone,
    ) -> ServiceResult<Note> {
        let mut note = self.fetch_owned(cancel, note_id, user_id, "note_find")?;
        note.date = convert(note.date, zone);
        Ok(note)
    }

    /// Lists notes matching `params.filter`, dates shown in `params.zone`.
    pub fn find_all(&self, cancel: &CancelToken, params: FindParams) -> ServiceResult<Vec<Note>> {
        let FindParams { mut filter, zone } = params;
        filter.take_from = filter.take_from.map(normalize_utc);

        let mut notes = self.repo.get_all_filtered(cancel, &filter).map_err(|err| {
            map_repo_error(err, EntityKind::Note, 0, filter.user_id, "note_list")
        })?;
        for note in &mut notes {
            note.date = convert(note.date, zone);
        }

        debug!(
            "event=note_list module=service status=ok user_id={} count={} zone={}",
            filter.user_id,
            notes.len(),
            zone
        );
        Ok(notes)
    }

    /// Merges `patch` into an owned note and persists the result.
    pub fn update_note(
        &self,
        cancel: &CancelToken,
        note_id: Id,
        user_id: Id,
        patch: &NotePatch,
    ) -> ServiceResult<()> {
        let existing = self.fetch_owned(cancel, note_id, user_id, "note_update")?;
        let mut merged = merge_note_patch(existing, patch);
        merged.date = normalize_utc(merged.date);

        self.repo
            .update(cancel, &merged)
            .map_err(|err| map_repo_error(err, EntityKind::Note, note_id, user_id, "note_update"))?;
        info!("event=note_update module=service status=ok note_id={note_id} user_id={user_id}");
        Ok(())
    }

    /// Deletes an owned note.
    pub fn remove_note(&self, cancel: &CancelToken, note_id: Id, user_id: Id) -> ServiceResult<()> {
        self.fetch_owned(cancel, note_id, user_id, "note_delete")?;

        self.repo
            .delete(cancel, note_id)
            .map_err(|err| map_repo_error(err, EntityKind::Note, note_id, user_id, "note_delete"))?;
        info!("event=note_delete module=service status=ok note_id={note_id} user_id={user_id}");
        Ok(())
    }

    fn fetch_owned(
        &self,
        cancel: &CancelToken,
        note_id: Id,
        user_id: Id,
        operation: &'static str,
    ) -> ServiceResult<Note> {
        let note = self
            .repo
            .get_by_id(cancel, note_id)
            .map_err(|err| map_repo_error(err, EntityKind::Note, note_id, user_id, operation))?;

        if note.user_id != user_id {
            debug!(
                "event={operation} module=service status=not_found reason=owner_mismatch note_id={note_id} user_id={user_id}"
            );
            return Err(ServiceError::NotFound {
                kind: EntityKind::Note,
                id: note_id,
                user_id,
            });
        }

        Ok(note)
    }
}
