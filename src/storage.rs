use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;

use crate::{
    decode_notebooks, decode_notes, encode_notes, Note, NoteId, Notebook, NotebookRecord,
    NotesError, Result, Template,
};

/// String key-value persistence, the counterpart of browser local storage.
///
/// Every write replaces the whole value stored under a key.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`, failing with
    /// [`NotesError::StorageQuotaExceeded`] when the backend is full.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

fn check_quota(key: &str, others: u64, value: &str, quota: Option<u64>) -> Result<()> {
    if let Some(limit) = quota {
        let attempted = others + value.len() as u64;
        if attempted > limit {
            warn!(
                "Rejecting write of '{}': {} bytes would exceed quota of {} bytes",
                key, attempted, limit
            );
            return Err(NotesError::StorageQuotaExceeded {
                key: key.to_string(),
                attempted,
                limit,
            });
        }
    }
    Ok(())
}

/// Stores each key as `<key>.json` inside a directory.
///
/// The quota only counts keys this store has read or written; other files in
/// the directory (exports, config) are not part of it.
#[derive(Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
    quota: Option<u64>,
    keys: Mutex<HashSet<String>>,
}

impl DirectoryStore {
    /// Creates the store, making sure the directory exists
    pub fn new(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create data directory {}: {}", dir.display(), e);
                NotesError::Io(e)
            })?;
        }
        Ok(Self {
            dir,
            quota,
            keys: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }

    fn keys(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.keys.lock().map_err(|_| lock_failed("directory store keys"))
    }

    /// Bytes used by every known key except `skip`
    fn used_bytes_except(&self, keys: &HashSet<String>, skip: &str) -> Result<u64> {
        let mut total = 0;
        for key in keys.iter().filter(|k| k.as_str() != skip) {
            let path = self.path_for(key);
            if path.exists() {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            trace!("No stored value for '{}'", key);
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            NotesError::Io(e)
        })?;
        self.keys()?.insert(key.to_string());
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let file_path = self.path_for(key);
        debug!("Writing '{}' to {}", key, file_path.display());

        let mut keys = self.keys()?;
        check_quota(key, self.used_bytes_except(&keys, key)?, value, self.quota)?;

        // Create a temporary file in the same directory (for atomic operation)
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NotesError::Io(e)
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            NotesError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            NotesError::Io(e)
        })?;

        temp_file.persist(&file_path).map_err(|e| {
            error!(
                "Failed to persist file {}: {}",
                file_path.display(),
                e.error
            );
            NotesError::Io(e.error)
        })?;

        keys.insert(key.to_string());
        trace!("Stored {} bytes under '{}'", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed {}", path.display());
        }
        self.keys()?.remove(key);
        Ok(())
    }
}

/// In-process store with an adjustable quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota: Mutex<Option<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota: Mutex::new(Some(quota)),
        }
    }

    pub fn set_quota(&self, quota: Option<u64>) -> Result<()> {
        *self.quota.lock().map_err(|_| lock_failed("memory store quota"))? = quota;
        Ok(())
    }
}

fn lock_failed(what: &str) -> NotesError {
    NotesError::LockAcquisitionFailed {
        message: format!("Failed to acquire lock on {}", what),
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| lock_failed("memory store"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let quota = *self.quota.lock().map_err(|_| lock_failed("memory store quota"))?;
        let mut values = self.values.lock().map_err(|_| lock_failed("memory store"))?;

        let others: u64 = values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum();
        check_quota(key, others, value, quota)?;

        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| lock_failed("memory store"))?;
        values.remove(key);
        Ok(())
    }
}

/// Outcome of loading a collection.
///
/// `warning` carries the [`NotesError::CorruptPersistedData`] that caused stored
/// data to be discarded, for the caller to show to the user.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub warning: Option<NotesError>,
}

fn corrupt(key: &str, message: String) -> NotesError {
    error!("Stored data under '{}' is unreadable: {}", key, message);
    NotesError::CorruptPersistedData {
        key: key.to_string(),
        message,
    }
}

/// Ordered in-memory note collection backed by a [`KeyValueStore`].
///
/// The order of `notes` is the canonical manual order.
pub struct NoteStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    notes: Vec<Note>,
}

impl NoteStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            notes: Vec::new(),
        }
    }

    /// Loads the collection from the backend, replacing what is in memory.
    ///
    /// A missing key yields an empty collection. Corrupt data is discarded and
    /// reported through [`LoadReport::warning`]; only backend read failures are
    /// returned as errors.
    pub fn load(&mut self) -> Result<LoadReport> {
        let raw = match self.backend.get(&self.key)? {
            Some(raw) => raw,
            None => {
                info!("No notes stored under '{}', starting empty", self.key);
                self.notes.clear();
                return Ok(LoadReport::default());
            }
        };

        match decode_notes(&raw) {
            Ok(notes) => {
                info!("Loaded {} notes", notes.len());
                self.notes = notes;
                Ok(LoadReport {
                    loaded: self.notes.len(),
                    warning: None,
                })
            }
            Err(message) => {
                self.notes.clear();
                Ok(LoadReport {
                    loaded: 0,
                    warning: Some(corrupt(&self.key, message)),
                })
            }
        }
    }

    /// Writes the whole collection. In-memory state is kept on failure.
    pub fn save(&self) -> Result<()> {
        let json = encode_notes(&self.notes)?;
        self.backend.set(&self.key, &json).map_err(|e| {
            error!("Failed to save {} notes: {}", self.notes.len(), e);
            e
        })?;
        debug!("Saved {} notes", self.notes.len());
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.notes.iter().map(|n| n.id)
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NoteId) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NotesError::NoteNotFound { id })
    }

    pub fn insert_front(&mut self, note: Note) {
        self.notes.insert(0, note);
    }

    /// Moves a note to the head of the canonical order
    pub fn move_to_front(&mut self, id: NoteId) -> Result<()> {
        let index = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(NotesError::NoteNotFound { id })?;
        let note = self.notes.remove(index);
        self.notes.insert(0, note);
        Ok(())
    }

    pub fn remove(&mut self, id: NoteId) -> Result<Note> {
        let index = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(NotesError::NoteNotFound { id })?;
        Ok(self.notes.remove(index))
    }

    /// Drops every note matching `predicate`, returning how many were removed
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Note) -> bool,
    {
        let before = self.notes.len();
        self.notes.retain(|n| !predicate(n));
        before - self.notes.len()
    }

    pub fn replace_all(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    pub(crate) fn take_all(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.notes)
    }
}

/// Notebook collection, always kept sorted by case-insensitive name.
pub struct NotebookStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    notebooks: Vec<Notebook>,
}

impl NotebookStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            notebooks: Vec::new(),
        }
    }

    pub fn load(&mut self) -> Result<LoadReport> {
        let raw = match self.backend.get(&self.key)? {
            Some(raw) => raw,
            None => {
                self.notebooks.clear();
                return Ok(LoadReport::default());
            }
        };

        match decode_notebooks(&raw) {
            Ok(notebooks) => {
                self.notebooks = notebooks;
                self.sort();
                debug!("Loaded {} notebooks", self.notebooks.len());
                Ok(LoadReport {
                    loaded: self.notebooks.len(),
                    warning: None,
                })
            }
            Err(e) => {
                self.notebooks.clear();
                Ok(LoadReport {
                    loaded: 0,
                    warning: Some(corrupt(&self.key, e)),
                })
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let records: Vec<NotebookRecord> =
            self.notebooks.iter().map(NotebookRecord::from).collect();
        let json = serde_json::to_string(&records)?;
        self.backend.set(&self.key, &json)?;
        debug!("Saved {} notebooks", self.notebooks.len());
        Ok(())
    }

    fn sort(&mut self) {
        self.notebooks
            .sort_by_cached_key(|nb| (nb.name.to_lowercase(), nb.name.clone()));
    }

    /// Adds a notebook named `name` with the given id.
    ///
    /// Rejects blank names and names that collide ignoring case. Does not persist.
    pub fn add(&mut self, id: i64, name: &str) -> Result<&Notebook> {
        let name = crate::helper::require_name(name, "Notebook")?;
        if self.find_by_name(&name).is_some() {
            warn!("Notebook \"{}\" already exists", name);
            return Err(NotesError::DuplicateNotebookName { name });
        }

        self.notebooks.push(Notebook {
            id,
            name: name.clone(),
        });
        self.sort();

        // Just pushed, so the lookup cannot miss.
        self.find_by_name(&name)
            .ok_or(NotesError::NotebookNotFound { name })
    }

    pub fn notebooks(&self) -> &[Notebook] {
        &self.notebooks
    }

    pub fn len(&self) -> usize {
        self.notebooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Notebook> {
        self.notebooks.iter().find(|nb| nb.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Notebook> {
        let wanted = name.trim().to_lowercase();
        self.notebooks
            .iter()
            .find(|nb| nb.name.to_lowercase() == wanted)
    }

    pub fn replace_all(&mut self, notebooks: Vec<Notebook>) {
        self.notebooks = notebooks;
        self.sort();
    }
}

/// Template collection in insertion order.
pub struct TemplateStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    templates: Vec<Template>,
}

impl TemplateStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            templates: Vec::new(),
        }
    }

    pub fn load(&mut self) -> Result<LoadReport> {
        let raw = match self.backend.get(&self.key)? {
            Some(raw) => raw,
            None => {
                self.templates.clear();
                return Ok(LoadReport::default());
            }
        };

        match serde_json::from_str::<Vec<Template>>(&raw) {
            Ok(templates) => {
                self.templates = templates;
                debug!("Loaded {} templates", self.templates.len());
                Ok(LoadReport {
                    loaded: self.templates.len(),
                    warning: None,
                })
            }
            Err(e) => {
                self.templates.clear();
                Ok(LoadReport {
                    loaded: 0,
                    warning: Some(corrupt(&self.key, e.to_string())),
                })
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string(&self.templates)?;
        self.backend.set(&self.key, &json)?;
        debug!("Saved {} templates", self.templates.len());
        Ok(())
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Template> {
        let wanted = name.trim().to_lowercase();
        self.templates
            .iter()
            .find(|t| t.name.to_lowercase() == wanted)
    }

    /// Inserts `template`, or replaces the one with the same name (ignoring case)
    pub fn upsert(&mut self, template: Template) {
        let wanted = template.name.to_lowercase();
        match self
            .templates
            .iter_mut()
            .find(|t| t.name.to_lowercase() == wanted)
        {
            Some(existing) => {
                debug!("Updating template \"{}\"", template.name);
                *existing = Template {
                    id: existing.id,
                    ..template
                };
            }
            None => self.templates.push(template),
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<Template> {
        let wanted = name.trim().to_lowercase();
        let index = self
            .templates
            .iter()
            .position(|t| t.name.to_lowercase() == wanted)
            .ok_or_else(|| NotesError::TemplateNotFound {
                name: name.to_string(),
            })?;
        Ok(self.templates.remove(index))
    }

    pub fn replace_all(&mut self, templates: Vec<Template>) {
        self.templates = templates;
    }
}
