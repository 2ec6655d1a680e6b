//! Persisted record shapes and the import/export document codec.
//!
//! Records mirror the flat JSON layout kept in storage (`archived`/`deleted`
//! booleans, camelCase keys). Every missing or `null` field falls back to its
//! documented default; structural problems become errors instead.
use std::collections::HashSet;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    normalize_tags, Note, NoteColor, NoteId, NoteStatus, Notebook, NotebookId, NotesError, Result,
    Template, Timestamp,
};

/// One note as stored on disk or in an export file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteRecord {
    pub id: Option<NoteId>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
    pub last_modified: Option<Timestamp>,
    pub archived: Option<bool>,
    pub color: Option<String>,
    pub deleted: Option<bool>,
    pub deleted_timestamp: Option<Timestamp>,
    pub notebook_id: Option<NotebookId>,
}

impl From<&Note> for NoteRecord {
    fn from(note: &Note) -> Self {
        NoteRecord {
            id: Some(note.id),
            title: Some(note.title.clone()),
            text: Some(note.text.clone()),
            tags: Some(note.tags.clone()),
            pinned: Some(note.status.is_pinned()),
            last_modified: Some(note.last_modified),
            archived: Some(note.status.is_archived()),
            color: note.color.map(|c| c.as_str().to_string()),
            deleted: Some(note.status.is_trashed()),
            deleted_timestamp: note.status.deleted_at(),
            notebook_id: note.notebook_id,
        }
    }
}

impl TryFrom<NoteRecord> for Note {
    type Error = String;

    fn try_from(record: NoteRecord) -> std::result::Result<Self, Self::Error> {
        let id = record.id.ok_or_else(|| "note record without id".to_string())?;

        let last_modified = record.last_modified.filter(|t| *t > 0).unwrap_or(id);

        // The trash wins over the archive, and a pin only survives on active notes.
        let status = if record.deleted.unwrap_or(false) {
            NoteStatus::Trashed {
                deleted_at: record
                    .deleted_timestamp
                    .filter(|t| *t > 0)
                    .unwrap_or(last_modified),
            }
        } else if record.archived.unwrap_or(false) {
            NoteStatus::Archived
        } else {
            NoteStatus::Active {
                pinned: record.pinned.unwrap_or(false),
            }
        };

        let color = match record.color.as_deref() {
            None | Some("") | Some("null") | Some("default") => None,
            Some(raw) => match NoteColor::parse(raw) {
                Ok(color) => Some(color),
                Err(_) => {
                    warn!("Note {} has unknown color '{}', using default", id, raw);
                    None
                }
            },
        };

        Ok(Note {
            id,
            title: record.title.unwrap_or_default(),
            text: record.text.unwrap_or_default(),
            tags: normalize_tags(record.tags.unwrap_or_default()),
            status,
            color,
            last_modified,
            notebook_id: record.notebook_id,
        })
    }
}

/// Stored notebook shape. A missing name is replaced on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookRecord {
    pub id: NotebookId,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<NotebookRecord> for Notebook {
    fn from(record: NotebookRecord) -> Self {
        let name = record
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Notebook {}", record.id));
        Notebook {
            id: record.id,
            name,
        }
    }
}

impl From<&Notebook> for NotebookRecord {
    fn from(notebook: &Notebook) -> Self {
        NotebookRecord {
            id: notebook.id,
            name: Some(notebook.name.clone()),
        }
    }
}

/// Decodes a stored note collection.
///
/// Fails on the first malformed record or on duplicate ids.
pub fn decode_notes(json: &str) -> std::result::Result<Vec<Note>, String> {
    let records: Vec<NoteRecord> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    notes_from_records(records)
}

fn notes_from_records(records: Vec<NoteRecord>) -> std::result::Result<Vec<Note>, String> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut notes = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let note = Note::try_from(record).map_err(|e| format!("record {}: {}", index, e))?;
        if !seen.insert(note.id) {
            return Err(format!("record {}: duplicate note id {}", index, note.id));
        }
        trace!("Decoded note {}", note.id);
        notes.push(note);
    }

    Ok(notes)
}

/// Decodes a stored notebook collection.
///
/// Fails on names that collide ignoring case and on duplicate ids.
pub fn decode_notebooks(json: &str) -> std::result::Result<Vec<Notebook>, String> {
    let records: Vec<NotebookRecord> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    notebooks_from_records(records)
}

fn notebooks_from_records(
    records: Vec<NotebookRecord>,
) -> std::result::Result<Vec<Notebook>, String> {
    let mut ids = HashSet::with_capacity(records.len());
    let mut names = HashSet::with_capacity(records.len());
    let mut notebooks = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let notebook = Notebook::from(record);
        if !ids.insert(notebook.id) {
            return Err(format!("record {}: duplicate notebook id {}", index, notebook.id));
        }
        if !names.insert(notebook.name.to_lowercase()) {
            return Err(format!("record {}: duplicate notebook name \"{}\"", index, notebook.name));
        }
        notebooks.push(notebook);
    }

    Ok(notebooks)
}

pub fn encode_notes(notes: &[Note]) -> Result<String> {
    let records: Vec<NoteRecord> = notes.iter().map(NoteRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Full-collection export document.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub notes: Vec<NoteRecord>,
    pub templates: Vec<Template>,
    pub notebooks: Vec<NotebookRecord>,
}

impl ExportDocument {
    pub fn new(notes: &[Note], templates: &[Template], notebooks: &[Notebook]) -> Self {
        ExportDocument {
            notes: notes.iter().map(NoteRecord::from).collect(),
            templates: templates.to_vec(),
            notebooks: notebooks.iter().map(NotebookRecord::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of parsing an import file.
///
/// `templates` and `notebooks` are `None` when the document did not carry them,
/// in which case the existing collections are left alone.
#[derive(Debug)]
pub struct ImportDocument {
    pub notes: Vec<Note>,
    pub templates: Option<Vec<Template>>,
    pub notebooks: Option<Vec<Notebook>>,
}

impl ImportDocument {
    /// Parses the legacy bare-array shape or the `{notes, templates}` object shape
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        match value {
            Value::Array(_) => {
                debug!("Import file uses the legacy array shape");
                let records: Vec<NoteRecord> =
                    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
                Ok(ImportDocument {
                    notes: notes_from_records(records).map_err(invalid)?,
                    templates: None,
                    notebooks: None,
                })
            }
            Value::Object(mut map) => {
                let notes = map
                    .remove("notes")
                    .ok_or_else(|| invalid("missing \"notes\" array".to_string()))?;
                let records: Vec<NoteRecord> =
                    serde_json::from_value(notes).map_err(|e| invalid(format!("notes: {}", e)))?;

                let templates = match map.remove("templates") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(
                        serde_json::from_value::<Vec<Template>>(v)
                            .map_err(|e| invalid(format!("templates: {}", e)))?,
                    ),
                };

                let notebooks = match map.remove("notebooks") {
                    None | Some(Value::Null) => None,
                    Some(v) => {
                        let entries = serde_json::from_value::<Vec<NotebookRecord>>(v)
                            .map_err(|e| invalid(format!("notebooks: {}", e)))?;
                        Some(
                            notebooks_from_records(entries)
                                .map_err(|e| invalid(format!("notebooks: {}", e)))?,
                        )
                    }
                };

                Ok(ImportDocument {
                    notes: notes_from_records(records).map_err(invalid)?,
                    templates,
                    notebooks,
                })
            }
            _ => Err(invalid(
                "expected an array of notes or an object with a \"notes\" array".to_string(),
            )),
        }
    }
}

fn invalid(message: String) -> NotesError {
    NotesError::ImportFormatInvalid { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let notes = decode_notes(r#"[{"id": 42, "text": "hello"}]"#).unwrap();
        let note = &notes[0];
        assert_eq!(note.title, "");
        assert!(note.tags.is_empty());
        assert_eq!(note.status, NoteStatus::Active { pinned: false });
        assert_eq!(note.color, None);
        assert_eq!(note.last_modified, 42);
        assert_eq!(note.notebook_id, None);
    }

    #[test]
    fn null_fields_take_defaults() {
        let json = r#"[{"id": 5, "title": null, "text": null, "tags": null,
            "pinned": null, "archived": null, "deleted": null, "color": null,
            "deletedTimestamp": null, "lastModified": null, "notebookId": null}]"#;
        let notes = decode_notes(json).unwrap();
        assert_eq!(notes[0].last_modified, 5);
        assert!(notes[0].status.is_active());
    }

    #[test]
    fn conflicting_flags_fold_into_one_status() {
        let json = r#"[
            {"id": 1, "text": "a", "archived": true, "deleted": true, "pinned": true, "deletedTimestamp": 9},
            {"id": 2, "text": "b", "archived": true, "pinned": true},
            {"id": 3, "text": "c", "deleted": true, "lastModified": 30}
        ]"#;
        let notes = decode_notes(json).unwrap();
        assert_eq!(notes[0].status, NoteStatus::Trashed { deleted_at: 9 });
        assert_eq!(notes[1].status, NoteStatus::Archived);
        assert_eq!(notes[2].status, NoteStatus::Trashed { deleted_at: 30 });
    }

    #[test]
    fn unknown_color_falls_back_to_default() {
        let notes = decode_notes(r#"[{"id": 1, "text": "x", "color": "note-color-orange"}]"#)
            .unwrap();
        assert_eq!(notes[0].color, None);
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert!(decode_notes("not json").is_err());
        assert!(decode_notes(r#"[{"title": "no id"}]"#).is_err());
        assert!(decode_notes(r#"[{"id": "abc"}]"#).is_err());
        assert!(decode_notes(r#"[{"id": 1}, {"id": 1}]"#).is_err());
    }

    #[test]
    fn encoded_notes_use_flat_layout() {
        let mut note = Note::new(10, "T".into(), "body".into(), vec!["a".into()]);
        note.status = NoteStatus::Trashed { deleted_at: 20 };
        note.color = Some(NoteColor::Green);

        let json = encode_notes(&[note]).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let stored = &value[0];
        assert_eq!(stored["deleted"], true);
        assert_eq!(stored["archived"], false);
        assert_eq!(stored["pinned"], false);
        assert_eq!(stored["deletedTimestamp"], 20);
        assert_eq!(stored["color"], "note-color-green");
        assert_eq!(stored["notebookId"], Value::Null);
        assert_eq!(stored["lastModified"], 10);
    }

    #[test]
    fn import_accepts_legacy_array() {
        let doc = ImportDocument::parse(r#"[{"id": 1, "text": "old"}]"#).unwrap();
        assert_eq!(doc.notes.len(), 1);
        assert!(doc.templates.is_none());
        assert!(doc.notebooks.is_none());
    }

    #[test]
    fn import_accepts_object_shape() {
        let json = r#"{
            "notes": [{"id": 1, "text": "new", "tags": [" Work "]}],
            "templates": [{"id": 2, "name": "Daily", "title": "Today", "text": "", "tags": []}]
        }"#;
        let doc = ImportDocument::parse(json).unwrap();
        assert_eq!(doc.notes[0].tags, vec!["work"]);
        assert_eq!(doc.templates.unwrap()[0].name, "Daily");
        assert!(doc.notebooks.is_none());
    }

    #[test]
    fn import_rejects_other_shapes() {
        for json in ["{", "42", r#"{"templates": []}"#, r#"{"notes": {}}"#] {
            assert!(matches!(
                ImportDocument::parse(json),
                Err(NotesError::ImportFormatInvalid { .. })
            ));
        }
    }

    #[test]
    fn import_rejects_colliding_notebooks() {
        let same_name = r#"{"notes": [], "notebooks": [
            {"id": 1, "name": "Work"}, {"id": 2, "name": "work"}]}"#;
        let same_id = r#"{"notes": [], "notebooks": [
            {"id": 2, "name": "Work"}, {"id": 2, "name": "Home"}]}"#;
        for json in [same_name, same_id] {
            assert!(matches!(
                ImportDocument::parse(json),
                Err(NotesError::ImportFormatInvalid { .. })
            ));
        }

        let fine = r#"{"notes": [], "notebooks": [
            {"id": 1, "name": "Work"}, {"id": 2, "name": "Home"}]}"#;
        let doc = ImportDocument::parse(fine).unwrap();
        assert_eq!(doc.notebooks.map(|nbs| nbs.len()), Some(2));
    }

    #[test]
    fn notebook_without_name_gets_placeholder() {
        let nb = Notebook::from(NotebookRecord { id: 7, name: None });
        assert_eq!(nb.name, "Notebook 7");
    }
}
