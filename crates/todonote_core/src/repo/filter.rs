//! Note filter/pagination descriptor.
//!
//! # Responsibility
//! - Describe which notes a listing returns: owner, earliest date,
//!   completion flag, cursor and limit.
//! - Build descriptors from caller-supplied primitives.
//! - Provide the in-process match/page walk used by the in-memory store.
//!
//! # Invariants
//! - An absent bound means "unconstrained", never "exclude all".
//! - The cursor is a keyset bound: only ids strictly greater are returned.
//! - Results are ordered by ascending id in every backend, so a page's last
//!   id is always the next page's cursor.
//! - The date bound is inclusive.

use crate::model::note::Note;
use crate::model::Id;
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Page size used when the caller sets no limit.
pub const DEFAULT_PAGE_LIMIT: u64 = 1000;
/// Upper bound applied to caller-supplied limits.
pub const MAX_PAGE_LIMIT: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid start date `{0}`: expected RFC 3339")]
    InvalidDate(String),
    #[error("invalid completion flag `{0}`")]
    InvalidFlag(String),
    #[error("invalid cursor `{0}`: expected a non-negative integer")]
    InvalidCursor(String),
    #[error("invalid limit `{0}`: expected a positive integer")]
    InvalidLimit(String),
}

/// Pagination half of the descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilter {
    /// Last id seen by the caller. `None` starts from the beginning.
    pub cursor: Option<Id>,
    /// `None` or `Some(0)` means [`DEFAULT_PAGE_LIMIT`].
    pub limit: Option<u64>,
}

/// Raw listing parameters as received from a caller (e.g. query string).
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParams<'a> {
    pub take_from: Option<&'a str>,
    pub is_finished: Option<&'a str>,
    pub cursor: Option<&'a str>,
    pub limit: Option<&'a str>,
}

/// Listing descriptor consumed by [`crate::repo::NoteRepository::get_all_filtered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFilter {
    /// Owner; always taken from the authenticated identity.
    pub user_id: Id,
    /// Earliest note date to include.
    pub take_from: Option<DateTime<FixedOffset>>,
    /// Completion flag equality constraint.
    pub is_finished: Option<bool>,
    pub page: PageFilter,
}

impl NoteFilter {
    /// Unconstrained listing of one owner's notes.
    pub fn for_user(user_id: Id) -> Self {
        Self {
            user_id,
            take_from: None,
            is_finished: None,
            page: PageFilter::default(),
        }
    }

    /// Builds a descriptor from raw primitives. Empty strings count as absent.
    ///
    /// # Errors
    /// - One [`FilterError`] for the first primitive that does not parse.
    pub fn from_params(user_id: Id, params: FilterParams<'_>) -> Result<Self, FilterError> {
        let mut filter = Self::for_user(user_id);

        if let Some(raw) = non_empty(params.take_from) {
            let date = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| FilterError::InvalidDate(raw.to_string()))?;
            filter.take_from = Some(date);
        }

        if let Some(raw) = non_empty(params.is_finished) {
            filter.is_finished =
                Some(parse_flag(raw).ok_or_else(|| FilterError::InvalidFlag(raw.to_string()))?);
        }

        if let Some(raw) = non_empty(params.cursor) {
            let cursor = raw
                .parse::<Id>()
                .ok()
                .filter(|value| *value >= 0)
                .ok_or_else(|| FilterError::InvalidCursor(raw.to_string()))?;
            filter.page.cursor = Some(cursor);
        }

        if let Some(raw) = non_empty(params.limit) {
            let limit = raw
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| FilterError::InvalidLimit(raw.to_string()))?;
            filter.page.limit = Some(limit);
        }

        Ok(filter)
    }

    pub fn with_take_from(mut self, take_from: DateTime<FixedOffset>) -> Self {
        self.take_from = Some(take_from);
        self
    }

    pub fn with_is_finished(mut self, is_finished: bool) -> Self {
        self.is_finished = Some(is_finished);
        self
    }

    pub fn with_cursor(mut self, cursor: Id) -> Self {
        self.page.cursor = Some(cursor);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.page.limit = Some(limit);
        self
    }

    /// Limit actually applied by both backends.
    pub fn effective_limit(&self) -> u64 {
        match self.page.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(value) => value.min(MAX_PAGE_LIMIT),
        }
    }

    /// Whether one note passes owner, cursor, date and flag constraints.
    pub fn matches(&self, note: &Note) -> bool {
        if note.user_id != self.user_id {
            return false;
        }
        if self.page.cursor.is_some_and(|cursor| note.id <= cursor) {
            return false;
        }
        if self.take_from.is_some_and(|from| note.date < from) {
            return false;
        }
        if self.is_finished.is_some_and(|flag| note.is_finished != flag) {
            return false;
        }
        true
    }

    /// Walks notes already sorted by ascending id and returns one page.
    pub fn select<'a, I>(&self, notes_by_id: I) -> Vec<Note>
    where
        I: IntoIterator<Item = &'a Note>,
    {
        let limit = usize::try_from(self.effective_limit()).unwrap_or(usize::MAX);
        notes_by_id
            .into_iter()
            .filter(|note| self.matches(note))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Cursor for the page after `page`, or `None` when `page` is empty.
    pub fn next_cursor(page: &[Note]) -> Option<Id> {
        page.last().map(|note| note.id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
