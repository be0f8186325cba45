//! Partial-update merge rules for notes.
//!
//! # Invariants
//! - Text fields change only when the new value is non-empty and different.
//! - The date changes only when supplied and different.
//! - `is_finished` is a latch: it can go from `false` to `true`, never back.
//! - `id` and `user_id` are never touched.

use crate::model::note::Note;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Caller-supplied partial note. Empty/absent fields mean "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub is_finished: bool,
}

/// Applies `patch` onto `existing`. Date normalization is left to the caller.
pub fn merge_note_patch(mut existing: Note, patch: &NotePatch) -> Note {
    if !patch.title.is_empty() && patch.title != existing.title {
        existing.title.clone_from(&patch.title);
    }

    if !patch.text.is_empty() && patch.text != existing.text {
        existing.text.clone_from(&patch.text);
    }

    if let Some(date) = patch.date {
        if date != existing.date {
            existing.date = date;
        }
    }

    if patch.is_finished && !existing.is_finished {
        existing.is_finished = true;
    }

    existing
}

#[cfg(test)]
mod tests {
    use super::{merge_note_patch, NotePatch};
    use crate::model::note::Note;
    use chrono::DateTime;

    fn stored() -> Note {
        Note::new(
            4,
            2,
            "old title",
            "old text",
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            false,
        )
    }

    #[test]
    fn empty_patch_keeps_everything() {
        assert_eq!(merge_note_patch(stored(), &NotePatch::default()), stored());
    }

    #[test]
    fn non_empty_fields_overwrite() {
        let date = DateTime::parse_from_rfc3339("2024-02-02T10:00:00+03:00").unwrap();
        let patch = NotePatch {
            title: "new title".to_string(),
            text: "new text".to_string(),
            date: Some(date),
            is_finished: true,
        };
        let merged = merge_note_patch(stored(), &patch);
        assert_eq!(merged.id, 4);
        assert_eq!(merged.user_id, 2);
        assert_eq!(merged.title, "new title");
        assert_eq!(merged.text, "new text");
        assert_eq!(merged.date, date);
        assert!(merged.is_finished);
    }

    #[test]
    fn finished_flag_never_reverts() {
        let finished = merge_note_patch(
            stored(),
            &NotePatch {
                is_finished: true,
                ..NotePatch::default()
            },
        );
        assert!(finished.is_finished);

        let again = merge_note_patch(
            finished,
            &NotePatch {
                title: "renamed".to_string(),
                is_finished: false,
                ..NotePatch::default()
            },
        );
        assert!(again.is_finished);
        assert_eq!(again.title, "renamed");
    }
}
