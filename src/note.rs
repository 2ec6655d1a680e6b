//! Core data structures for the startnotes application.
//!
//! This module contains the primary types used throughout the application,
//! including the Note, Notebook and Template structures.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::NotesError;

/// Epoch milliseconds.
pub type Timestamp = i64;

/// Note identifier; doubles as the creation time in epoch milliseconds.
pub type NoteId = i64;

/// Notebook identifier, assigned from the creation time.
pub type NotebookId = i64;

/// Which view a note belongs to.
///
/// A note is in exactly one of these states, so a note can never be both
/// archived and trashed, and only an active note carries a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    Active { pinned: bool },
    Archived,
    Trashed { deleted_at: Timestamp },
}

impl NoteStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, NoteStatus::Active { .. })
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, NoteStatus::Archived)
    }

    pub fn is_trashed(&self) -> bool {
        matches!(self, NoteStatus::Trashed { .. })
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, NoteStatus::Active { pinned: true })
    }

    pub fn deleted_at(&self) -> Option<Timestamp> {
        match self {
            NoteStatus::Trashed { deleted_at } => Some(*deleted_at),
            _ => None,
        }
    }

    /// Short label used in log and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            NoteStatus::Active { .. } => "active",
            NoteStatus::Archived => "archived",
            NoteStatus::Trashed { .. } => "in the trash",
        }
    }
}

/// The fixed note color palette. `None` on a note means the default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteColor {
    #[serde(rename = "note-color-yellow")]
    Yellow,
    #[serde(rename = "note-color-blue")]
    Blue,
    #[serde(rename = "note-color-green")]
    Green,
    #[serde(rename = "note-color-red")]
    Red,
    #[serde(rename = "note-color-purple")]
    Purple,
    #[serde(rename = "note-color-grey")]
    Grey,
}

impl NoteColor {
    pub const ALL: [NoteColor; 6] = [
        NoteColor::Yellow,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Red,
        NoteColor::Purple,
        NoteColor::Grey,
    ];

    /// The persisted token, e.g. `note-color-yellow`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteColor::Yellow => "note-color-yellow",
            NoteColor::Blue => "note-color-blue",
            NoteColor::Green => "note-color-green",
            NoteColor::Red => "note-color-red",
            NoteColor::Purple => "note-color-purple",
            NoteColor::Grey => "note-color-grey",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NoteColor::Yellow => "yellow",
            NoteColor::Blue => "blue",
            NoteColor::Green => "green",
            NoteColor::Red => "red",
            NoteColor::Purple => "purple",
            NoteColor::Grey => "grey",
        }
    }

    /// Parses either the persisted token or the bare color name, ignoring case.
    pub fn parse(value: &str) -> Result<NoteColor, NotesError> {
        let wanted = value.trim().to_lowercase();
        NoteColor::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted || c.name() == wanted)
            .ok_or_else(|| NotesError::UnknownColor {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Unique identifier, also the creation time
    pub id: NoteId,
    /// Note title, may be empty
    pub title: String,
    /// Primary content, newlines preserved
    pub text: String,
    /// Lowercase, trimmed, non-empty tags
    pub tags: Vec<String>,
    /// Which view the note is in
    pub status: NoteStatus,
    pub color: Option<NoteColor>,
    /// Last substantive change or lifecycle transition
    pub last_modified: Timestamp,
    /// Owning notebook, if any
    pub notebook_id: Option<NotebookId>,
}

impl Note {
    /// Creates a new, active, unpinned note created at `id`.
    pub fn new(id: NoteId, title: String, text: String, tags: Vec<String>) -> Self {
        Note {
            id,
            title,
            text,
            tags,
            status: NoteStatus::Active { pinned: false },
            color: None,
            last_modified: id,
            notebook_id: None,
        }
    }

    /// Both title and text are empty (text is checked ignoring whitespace).
    pub fn is_blank(&self) -> bool {
        is_blank(&self.title, &self.text)
    }

    /// Title for display, with a placeholder for untitled notes.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled note"
        } else {
            &self.title
        }
    }
}

pub(crate) fn is_blank(title: &str, text: &str) -> bool {
    title.trim().is_empty() && text.trim().is_empty()
}

/// A named group of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: NotebookId,
    pub name: String,
}

/// A reusable seed for the new-note form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
