//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and the creation input shape.
//!
//! # Invariants
//! - `id` is assigned by the store; input ids are ignored on insert.
//! - `date` is stored in UTC and only re-expressed for display.
//! - `user_id` is set at creation and not changed by ordinary updates.

use crate::model::Id;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Id,
    /// Owning user. Never changed by the merge path.
    pub user_id: Id,
    pub title: String,
    pub text: String,
    /// Due date. UTC in storage, caller zone on the way out.
    pub date: DateTime<FixedOffset>,
    pub is_finished: bool,
}

impl Note {
    /// Builds a note record. `id` is overwritten by the store on insert.
    pub fn new(
        id: Id,
        user_id: Id,
        title: impl Into<String>,
        text: impl Into<String>,
        date: DateTime<FixedOffset>,
        is_finished: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            text: text.into(),
            date,
            is_finished,
        }
    }
}

/// Creation input. The owner comes from the authenticated identity, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub text: String,
    /// Defaults to "now" when absent.
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
}
