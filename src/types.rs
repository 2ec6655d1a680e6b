//! Shared request, outcome and command types for the startnotes application.
use std::path::PathBuf;

use clap::Subcommand;

use crate::{parse_tags, NoteId, NotebookId, NotesError};

/// A specialized Result type for startnotes operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Which subset of notes is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSelector {
    /// Notes that are neither archived nor trashed, optionally in one notebook
    Active { notebook: Option<NotebookId> },
    Archive,
    Trash,
}

impl Default for ViewSelector {
    fn default() -> Self {
        ViewSelector::ALL
    }
}

impl ViewSelector {
    /// The unscoped active view.
    pub const ALL: ViewSelector = ViewSelector::Active { notebook: None };

    pub fn notebook(id: NotebookId) -> Self {
        ViewSelector::Active { notebook: Some(id) }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ViewSelector::Active { .. })
    }
}

/// Field changes for an existing note. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Raw color input; `""`, `"null"` and `"default"` select the default color
    pub color: Option<String>,
}

impl NotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Sets tags from comma-separated user input
    pub fn tags_input(self, raw: &str) -> Self {
        self.tags(parse_tags(raw))
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.text.is_none() && self.tags.is_none() && self.color.is_none()
    }
}

/// Contents of the new-note form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    /// Name of the notebook to file the note in
    pub notebook: Option<String>,
}

/// Result of an operation that needs the user's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyTrash {
    Emptied(usize),
    AlreadyEmpty,
    Declined,
}

/// Identifies one edit session; stale once the session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken {
    pub note_id: NoteId,
    pub generation: u64,
}

/// Available subcommands for the startnotes application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Add {
        /// Title of the note
        #[clap(short = 'T', long, default_value = "")]
        title: String,

        /// Content of the note
        #[clap(short = 'x', long, default_value = "")]
        text: String,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Notebook to file the note in
        #[clap(short, long)]
        notebook: Option<String>,

        /// Start from a saved template
        #[clap(long)]
        template: Option<String>,
    },

    /// List notes in a view
    List {
        /// Show archived notes
        #[clap(short, long, conflicts_with_all = ["trash", "notebook"])]
        archive: bool,

        /// Show the trash
        #[clap(long, conflicts_with = "notebook")]
        trash: bool,

        /// Only active notes in this notebook
        #[clap(short, long)]
        notebook: Option<String>,

        /// Search text, or #tag for an exact tag match
        #[clap(short, long)]
        search: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: NoteId,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short = 'x', long)]
        text: Option<String>,

        /// Replacement tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Color name, or "default"
        #[clap(short, long)]
        color: Option<String>,
    },

    /// Pin or unpin an active note
    Pin { id: NoteId },

    /// Move a note to the archive
    Archive { id: NoteId },

    /// Move a note back from the archive
    Unarchive { id: NoteId },

    /// Move a note to the trash
    Trash {
        id: NoteId,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Restore a note from the trash
    Restore { id: NoteId },

    /// Permanently delete a note in the trash
    Purge {
        id: NoteId,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Permanently delete everything in the trash
    EmptyTrash {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Reorder active notes; list ids in the new order
    Reorder {
        #[clap(required = true)]
        ids: Vec<NoteId>,
    },

    /// File a note in a notebook
    Move {
        id: NoteId,

        /// Target notebook; omit to remove the note from its notebook
        #[clap(short, long)]
        notebook: Option<String>,
    },

    /// Notebook operations
    Notebook {
        #[clap(subcommand)]
        command: NotebookCommands,
    },

    /// Template operations
    Template {
        #[clap(subcommand)]
        command: TemplateCommands,
    },

    /// Export notes and templates to a JSON file
    Export {
        /// Path where the export will be written
        #[clap(short, long)]
        output: PathBuf,
    },

    /// Replace all notes with the contents of an export file
    Import {
        /// Path to the export file
        source: PathBuf,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum NotebookCommands {
    /// Create a notebook
    Add { name: String },
    /// List notebooks
    List,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create or update a template
    Save {
        name: String,

        #[clap(short = 'T', long, default_value = "")]
        title: String,

        #[clap(short = 'x', long, default_value = "")]
        text: String,

        /// Tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,
    },
    /// List templates
    List,
    /// Delete a template
    Remove { name: String },
}
