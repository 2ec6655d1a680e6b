//! The note board: the single owner of all notes, notebooks, templates and
//! view state.
//!
//! Every user action goes through a `NoteBoard` method. Mutations are applied
//! in memory first and then persisted as a whole collection; when the write
//! fails the in-memory change is kept and the error is returned.
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex as TokioMutex;

use crate::{
    allocate_id, display, mutator, normalize_tags, note::is_blank, reorder, Clock, Config,
    DirectoryStore, EmptyTrash, ExportDocument, ImportDocument, KeyValueStore, NewNote, Note,
    NoteId, NotePatch, NoteStore, Notebook, NotebookStore, NotesError, Outcome, Result,
    SessionGate, SessionToken, SystemClock, Template, TemplateStore, ViewSelector,
};

/// A board shared with auto-save timers.
pub type SharedBoard = Arc<TokioMutex<NoteBoard>>;

/// Yes/no prompt for destructive operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub struct NoteBoard {
    notes: NoteStore,
    notebooks: NotebookStore,
    templates: TemplateStore,
    clock: Arc<dyn Clock>,

    /// Current view and search box contents
    view: ViewSelector,
    search: String,

    /// The one note being edited, if any
    editing: Option<SessionToken>,
    gate: SessionGate,

    /// Problems found while loading, for the caller to show
    warnings: Vec<NotesError>,
}

impl NoteBoard {
    /// Opens the board on `backend`, loading every collection.
    ///
    /// Corrupt collections are replaced by empty ones and reported through
    /// [`NoteBoard::take_warnings`].
    pub fn open(
        backend: Arc<dyn KeyValueStore>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut board = NoteBoard {
            notes: NoteStore::new(Arc::clone(&backend), config.notes_key.clone()),
            notebooks: NotebookStore::new(Arc::clone(&backend), config.notebooks_key.clone()),
            templates: TemplateStore::new(backend, config.templates_key.clone()),
            clock,
            view: ViewSelector::default(),
            search: String::new(),
            editing: None,
            gate: SessionGate::new(),
            warnings: Vec::new(),
        };

        for report in [
            board.notes.load()?,
            board.notebooks.load()?,
            board.templates.load()?,
        ] {
            if let Some(warning) = report.warning {
                board.warnings.push(warning);
            }
        }

        info!(
            "Board opened with {} notes, {} notebooks, {} templates",
            board.notes.len(),
            board.notebooks.len(),
            board.templates.templates().len()
        );
        Ok(board)
    }

    /// Opens the board on the directory store described by `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let backend = DirectoryStore::new(&config.data_dir, config.storage_quota_bytes)?;
        Self::open(Arc::new(backend), config, Arc::new(SystemClock))
    }

    pub fn into_shared(self) -> SharedBoard {
        Arc::new(TokioMutex::new(self))
    }

    pub fn take_warnings(&mut self) -> Vec<NotesError> {
        std::mem::take(&mut self.warnings)
    }

    /// Gate to hand to an [`crate::AutoSaveScheduler`]
    pub fn session_gate(&self) -> SessionGate {
        self.gate.clone()
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.notes()
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn notebooks(&self) -> &[Notebook] {
        self.notebooks.notebooks()
    }

    pub fn templates(&self) -> &[Template] {
        self.templates.templates()
    }

    pub fn view(&self) -> ViewSelector {
        self.view
    }

    pub fn set_view(&mut self, view: ViewSelector) {
        debug!("Switching view to {:?}", view);
        self.view = view;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
    }

    /// Notes for the current view and search, in display order
    pub fn visible_notes(&self) -> Vec<&Note> {
        display(self.notes.notes(), &self.view, &self.search)
    }

    /// Resolves a notebook name to its id, ignoring case
    pub fn notebook_id(&self, name: &str) -> Result<i64> {
        self.notebooks
            .find_by_name(name)
            .map(|nb| nb.id)
            .ok_or_else(|| NotesError::NotebookNotFound {
                name: name.to_string(),
            })
    }

    /// Creates a note at the head of the active order and switches to its view.
    pub fn add_note(&mut self, draft: NewNote) -> Result<NoteId> {
        let title = draft.title.trim().to_string();
        if is_blank(&title, &draft.text) {
            return Err(NotesError::ValidationRejected {
                message: "enter a title or some text".to_string(),
            });
        }

        let notebook_id = match draft.notebook.as_deref() {
            Some(name) => Some(self.notebook_id(name)?),
            None => None,
        };

        let id = allocate_id(self.clock.now_millis(), self.notes.ids());
        let mut note = Note::new(id, title, draft.text, normalize_tags(&draft.tags));
        note.notebook_id = notebook_id;

        self.notes.insert_front(note);
        self.view = ViewSelector::Active {
            notebook: notebook_id,
        };
        self.search.clear();

        self.notes.save()?;
        info!("Created note {}", id);
        Ok(id)
    }

    /// Opens an edit session on an active note.
    ///
    /// Only one note can be edited at a time; asking for a second one fails with
    /// [`NotesError::EditInProgress`] until the first is saved or cancelled.
    pub fn begin_edit(&mut self, id: NoteId) -> Result<SessionToken> {
        if let Some(token) = self.editing {
            if token.note_id == id {
                return Ok(token);
            }
            return Err(NotesError::EditInProgress { id: token.note_id });
        }

        let note = self.notes.get(id).ok_or(NotesError::NoteNotFound { id })?;
        if !note.status.is_active() {
            return Err(NotesError::InvalidTransition {
                id,
                action: "edit",
                status: note.status.label(),
            });
        }

        let token = SessionToken {
            note_id: id,
            generation: self.gate.open(),
        };
        self.editing = Some(token);
        debug!("Editing note {} (session {})", id, token.generation);
        Ok(token)
    }

    pub fn editing(&self) -> Option<SessionToken> {
        self.editing
    }

    fn check_session(&self, token: SessionToken) -> Result<()> {
        if self.editing == Some(token) && self.gate.is_live(&token) {
            Ok(())
        } else {
            Err(NotesError::NoEditSession)
        }
    }

    fn close_session(&mut self) {
        if let Some(token) = self.editing.take() {
            debug!("Closing edit session {} for note {}", token.generation, token.note_id);
            self.gate.close();
        }
    }

    fn close_session_for(&mut self, id: NoteId) {
        if self.editing.is_some_and(|t| t.note_id == id) {
            self.close_session();
        }
    }

    /// Manual save: commits immediately and closes the session.
    ///
    /// On [`NotesError::ValidationRejected`] nothing changes and the session
    /// stays open.
    pub fn save_edit(&mut self, token: SessionToken, patch: &NotePatch) -> Result<bool> {
        self.check_session(token)?;
        let changed = self.notes.apply_update(token.note_id, patch, self.clock.now_millis())?;
        self.close_session();
        Ok(changed)
    }

    pub fn cancel_edit(&mut self, token: SessionToken) -> Result<()> {
        self.check_session(token)?;
        self.close_session();
        Ok(())
    }

    /// Auto-save commit. Stale sessions and drafts that would leave the
    /// note with neither title nor text are skipped.
    pub fn autosave(&mut self, token: SessionToken, patch: &NotePatch) -> Result<bool> {
        if self.check_session(token).is_err() {
            debug!("Ignoring auto-save for closed session {}", token.generation);
            return Ok(false);
        }

        let note = self
            .notes
            .get(token.note_id)
            .ok_or(NotesError::NoteNotFound { id: token.note_id })?;
        let title = patch.title.as_deref().unwrap_or(&note.title);
        let text = patch.text.as_deref().unwrap_or(&note.text);
        if is_blank(title, text) {
            debug!("Not auto-saving blank draft of note {}", token.note_id);
            return Ok(false);
        }

        self.notes.apply_update(token.note_id, patch, self.clock.now_millis())
    }

    /// Pins or unpins an active note, returning the new pin state
    pub fn toggle_pin(&mut self, id: NoteId) -> Result<bool> {
        let now = self.clock.now_millis();
        self.notes.apply_transition(id, |note| mutator::toggle_pin(note, now))
    }

    pub fn archive(&mut self, id: NoteId) -> Result<()> {
        let now = self.clock.now_millis();
        self.close_session_for(id);
        self.notes.apply_transition(id, |note| mutator::archive(note, now))
    }

    /// Returns an archived note to the head of the active order
    pub fn unarchive(&mut self, id: NoteId) -> Result<()> {
        let now = self.clock.now_millis();
        mutator::unarchive(self.notes.get_mut(id)?, now)?;
        self.notes.move_to_front(id)?;
        self.notes.save()
    }

    /// Moves a note to the trash after confirmation
    pub fn trash(&mut self, id: NoteId, confirm: &dyn Confirm) -> Result<Outcome> {
        let note = self.notes.get(id).ok_or(NotesError::NoteNotFound { id })?;
        if note.status.is_trashed() {
            return Err(NotesError::InvalidTransition {
                id,
                action: "trash",
                status: note.status.label(),
            });
        }
        if !confirm.confirm(&format!("Move \"{}\" to the trash?", note.display_title())) {
            return Ok(Outcome::Declined);
        }

        let now = self.clock.now_millis();
        self.close_session_for(id);
        self.notes.apply_transition(id, |note| mutator::trash(note, now))?;
        Ok(Outcome::Applied)
    }

    pub fn restore(&mut self, id: NoteId) -> Result<()> {
        let now = self.clock.now_millis();
        self.notes.apply_transition(id, |note| mutator::restore(note, now))
    }

    /// Removes a trashed note for good after confirmation
    pub fn delete_permanently(&mut self, id: NoteId, confirm: &dyn Confirm) -> Result<Outcome> {
        let note = self.notes.get(id).ok_or(NotesError::NoteNotFound { id })?;
        if !note.status.is_trashed() {
            return Err(NotesError::InvalidTransition {
                id,
                action: "permanently delete",
                status: note.status.label(),
            });
        }
        if !confirm.confirm(&format!(
            "Permanently delete \"{}\"? This cannot be undone.",
            note.display_title()
        )) {
            return Ok(Outcome::Declined);
        }

        self.notes.remove(id)?;
        self.notes.save()?;
        info!("Permanently deleted note {}", id);
        Ok(Outcome::Applied)
    }

    pub fn empty_trash(&mut self, confirm: &dyn Confirm) -> Result<EmptyTrash> {
        let count = self
            .notes
            .notes()
            .iter()
            .filter(|n| n.status.is_trashed())
            .count();
        if count == 0 {
            info!("Trash is already empty");
            return Ok(EmptyTrash::AlreadyEmpty);
        }
        if !confirm.confirm(&format!("Permanently delete {} notes in the trash?", count)) {
            return Ok(EmptyTrash::Declined);
        }

        let removed = self.notes.remove_where(|n| n.status.is_trashed());
        self.notes.save()?;
        info!("Emptied trash, {} notes removed", removed);
        Ok(EmptyTrash::Emptied(removed))
    }

    /// Files a note in the named notebook, or takes it out of any notebook.
    pub fn assign_notebook(&mut self, id: NoteId, notebook: Option<&str>) -> Result<bool> {
        let notebook_id = match notebook {
            Some(name) => Some(self.notebook_id(name)?),
            None => None,
        };

        let now = self.clock.now_millis();
        let note = self.notes.get_mut(id)?;
        if note.notebook_id == notebook_id {
            return Ok(false);
        }
        note.notebook_id = notebook_id;
        note.last_modified = now;
        self.notes.save()?;
        Ok(true)
    }

    /// Applies a drag-and-drop result for the active view and persists it.
    pub fn reorder(&mut self, visual_order: &[NoteId]) -> Result<()> {
        let current = self.notes.take_all();
        let reordered = reorder(current, visual_order);
        self.notes.replace_all(reordered);
        self.notes.save()
    }

    /// Creates a notebook, rejecting names that collide ignoring case
    pub fn add_notebook(&mut self, name: &str) -> Result<Notebook> {
        let id = allocate_id(
            self.clock.now_millis(),
            self.notebooks.notebooks().iter().map(|nb| nb.id),
        );
        let notebook = self.notebooks.add(id, name)?.clone();
        self.notebooks.save()?;
        info!("Created notebook \"{}\"", notebook.name);
        Ok(notebook)
    }

    /// Adds a template, or replaces the one with the same name
    pub fn save_template(
        &mut self,
        name: &str,
        title: &str,
        text: &str,
        tags: Vec<String>,
    ) -> Result<()> {
        let name = crate::helper::require_name(name, "Template")?;
        let id = allocate_id(
            self.clock.now_millis(),
            self.templates.templates().iter().map(|t| t.id),
        );
        self.templates.upsert(Template {
            id,
            name,
            title: title.trim().to_string(),
            text: text.to_string(),
            tags: normalize_tags(tags),
        });
        self.templates.save()
    }

    pub fn delete_template(&mut self, name: &str) -> Result<()> {
        let removed = self.templates.remove(name)?;
        debug!("Deleted template \"{}\"", removed.name);
        self.templates.save()
    }

    /// Seeds a new-note draft from a template
    pub fn draft_from_template(&self, name: &str) -> Result<NewNote> {
        let template = self
            .templates
            .find_by_name(name)
            .ok_or_else(|| NotesError::TemplateNotFound {
                name: name.to_string(),
            })?;
        Ok(NewNote {
            title: template.title.clone(),
            text: template.text.clone(),
            tags: template.tags.clone(),
            notebook: None,
        })
    }

    pub fn export_json(&self) -> Result<String> {
        ExportDocument::new(
            self.notes.notes(),
            self.templates.templates(),
            self.notebooks.notebooks(),
        )
        .to_json()
    }

    /// Replaces the collections with an import document after confirmation.
    ///
    /// The document is fully validated first; a bad document changes nothing.
    pub fn import_json(&mut self, json: &str, confirm: &dyn Confirm) -> Result<Outcome> {
        let document = ImportDocument::parse(json)?;
        if !confirm.confirm(&format!(
            "Replace all {} notes with {} imported notes?",
            self.notes.len(),
            document.notes.len()
        )) {
            return Ok(Outcome::Declined);
        }

        self.close_session();
        let imported = document.notes.len();
        self.notes.replace_all(document.notes);
        self.notes.save()?;

        if let Some(templates) = document.templates {
            self.templates.replace_all(templates);
            self.templates.save()?;
        }
        if let Some(notebooks) = document.notebooks {
            self.notebooks.replace_all(notebooks);
            self.notebooks.save()?;
        }

        if let ViewSelector::Active { notebook: Some(id) } = self.view {
            if self.notebooks.get(id).is_none() {
                warn!("Current notebook vanished with the import, showing all notes");
                self.view = ViewSelector::ALL;
            }
        }
        info!("Imported {} notes", imported);
        Ok(Outcome::Applied)
    }
}
