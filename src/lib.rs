//! Local note-taking library
//!
//! This library provides the note lifecycle (active, archived, trashed), the
//! view filtering and ordering rules, notebooks, templates, debounced
//! auto-save, and whole-collection persistence over a key-value store.

mod autosave;
mod board;
mod cli;
mod clock;
mod config;
mod errors;
mod helper;
// Not glob-exported: `update`, `archive` and `trash` are called through `mutator::`.
pub mod mutator;
mod note;
mod record;
mod reorder;
mod storage;
mod types;
mod view;

// Re-export key components
pub use autosave::*;
pub use board::*;
pub use cli::*;
pub use clock::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use record::*;
pub use reorder::*;
pub use storage::*;
pub use types::*;
pub use view::*;
