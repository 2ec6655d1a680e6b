//! Field edits and lifecycle transitions for a single note.
//!
//! The free functions only touch the note in memory. The `NoteStore` methods
//! at the bottom apply them to a stored note and persist the collection.
use log::{debug, info, trace, warn};

use crate::{
    coerce_color, normalize_tags, note::is_blank, same_tags, Note, NoteId, NotePatch, NoteStatus,
    NoteStore, NotesError, Result, Timestamp,
};

/// Applies `patch` to `note`, returning whether anything changed.
///
/// Absent patch fields leave the current value alone. `lastModified` only
/// moves when a field actually differs. Fails with
/// [`NotesError::ValidationRejected`] without touching the note when the edit
/// would blank out a note that had a title or text.
pub fn update(note: &mut Note, patch: &NotePatch, now: Timestamp) -> Result<bool> {
    let title = match &patch.title {
        Some(title) => title.trim().to_string(),
        None => note.title.clone(),
    };
    let text = match &patch.text {
        Some(text) => text.clone(),
        None => note.text.clone(),
    };
    let tags = match &patch.tags {
        Some(tags) => normalize_tags(tags),
        None => note.tags.clone(),
    };
    let color = match &patch.color {
        Some(raw) => coerce_color(Some(raw))?,
        None => note.color,
    };

    if is_blank(&title, &text) && !note.is_blank() {
        warn!("Refusing to clear title and text of note {}", note.id);
        return Err(NotesError::ValidationRejected {
            message: "a note needs a title or some text".to_string(),
        });
    }

    let mut changed = false;
    if note.title != title {
        note.title = title;
        changed = true;
    }
    if note.text != text {
        note.text = text;
        changed = true;
    }
    if note.color != color {
        note.color = color;
        changed = true;
    }
    if !same_tags(&note.tags, &tags) {
        note.tags = tags;
        changed = true;
    }

    if changed {
        note.last_modified = now;
        debug!("Note {} changed", note.id);
    } else {
        trace!("Note {} unchanged by edit", note.id);
    }
    Ok(changed)
}

fn rejected(note: &Note, action: &'static str) -> NotesError {
    NotesError::InvalidTransition {
        id: note.id,
        action,
        status: note.status.label(),
    }
}

/// Flips the pin of an active note.
pub fn toggle_pin(note: &mut Note, now: Timestamp) -> Result<bool> {
    match note.status {
        NoteStatus::Active { pinned } => {
            note.status = NoteStatus::Active { pinned: !pinned };
            note.last_modified = now;
            Ok(!pinned)
        }
        _ => Err(rejected(note, "pin")),
    }
}

/// Moves an active note to the archive, dropping its pin.
pub fn archive(note: &mut Note, now: Timestamp) -> Result<()> {
    if !note.status.is_active() {
        return Err(rejected(note, "archive"));
    }
    note.status = NoteStatus::Archived;
    note.last_modified = now;
    Ok(())
}

pub fn unarchive(note: &mut Note, now: Timestamp) -> Result<()> {
    if !note.status.is_archived() {
        return Err(rejected(note, "unarchive"));
    }
    note.status = NoteStatus::Active { pinned: false };
    note.last_modified = now;
    Ok(())
}

/// Sends an active or archived note to the trash.
pub fn trash(note: &mut Note, now: Timestamp) -> Result<()> {
    if note.status.is_trashed() {
        return Err(rejected(note, "trash"));
    }
    note.status = NoteStatus::Trashed { deleted_at: now };
    note.last_modified = now;
    Ok(())
}

/// Returns a trashed note to the active view. Its pre-trash state is not kept.
pub fn restore(note: &mut Note, now: Timestamp) -> Result<()> {
    if !note.status.is_trashed() {
        return Err(rejected(note, "restore"));
    }
    note.status = NoteStatus::Active { pinned: false };
    note.last_modified = now;
    Ok(())
}

impl NoteStore {
    /// Applies an edit and persists only if something changed.
    ///
    /// # Returns
    ///
    /// Whether the note changed. A failed save leaves the in-memory edit applied.
    pub fn apply_update(&mut self, id: NoteId, patch: &NotePatch, now: Timestamp) -> Result<bool> {
        let note = self.get_mut(id)?;
        let changed = update(note, patch, now)?;
        if changed {
            self.save()?;
            info!("Note {} updated", id);
        }
        Ok(changed)
    }

    /// Runs a lifecycle transition on a stored note and persists the collection
    pub fn apply_transition<T, F>(&mut self, id: NoteId, transition: F) -> Result<T>
    where
        F: FnOnce(&mut Note) -> Result<T>,
    {
        let note = self.get_mut(id)?;
        let value = transition(note)?;
        debug!("Note {} is now {}", id, note.status.label());
        self.save()?;
        Ok(value)
    }
}
