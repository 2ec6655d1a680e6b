//! Error types for the startnotes application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during note management operations.

use std::io;

use thiserror::Error;

use crate::NoteId;

/// The main error type for the startnotes application.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend refused a write because it would exceed its quota.
    #[error("Storage quota exceeded writing '{key}': {attempted} bytes, limit {limit} bytes")]
    StorageQuotaExceeded {
        key: String,
        attempted: u64,
        limit: u64,
    },

    /// Stored data could not be parsed into a valid collection.
    #[error("Corrupt data under '{key}': {message}")]
    CorruptPersistedData { key: String, message: String },

    /// An edit or creation would leave a note without title and text.
    #[error("Validation rejected: {message}")]
    ValidationRejected { message: String },

    /// A notebook with the same name (ignoring case) already exists.
    #[error("Notebook \"{name}\" already exists")]
    DuplicateNotebookName { name: String },

    /// Import document is not JSON or matches neither supported shape.
    #[error("Invalid import file: {message}")]
    ImportFormatInvalid { message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: NoteId },

    #[error("Notebook not found: {name}")]
    NotebookNotFound { name: String },

    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// A lifecycle transition was requested from a view state that does not allow it.
    #[error("Cannot {action} note {id} while it is {status}")]
    InvalidTransition {
        id: NoteId,
        action: &'static str,
        status: &'static str,
    },

    #[error("Unknown note color: {value}")]
    UnknownColor { value: String },

    /// Another note is already being edited.
    #[error("Note {id} is already being edited; save or cancel it first")]
    EditInProgress { id: NoteId },

    /// The edit session token is closed or belongs to another session.
    #[error("No matching edit session is open")]
    NoEditSession,

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}
