//! View filter and sort engine.
//!
//! Turns the canonical note collection into the ordered list shown for a
//! view and search query. The input is never reordered.
use std::cmp::Reverse;

use log::trace;

use crate::{Note, ViewSelector};

/// Whether `note` belongs to `view`.
///
/// The three unscoped views partition every collection: each note is in
/// exactly one of them.
pub fn in_view(note: &Note, view: &ViewSelector) -> bool {
    match view {
        ViewSelector::Trash => note.status.is_trashed(),
        ViewSelector::Archive => note.status.is_archived(),
        ViewSelector::Active { notebook: None } => note.status.is_active(),
        ViewSelector::Active { notebook: Some(id) } => {
            note.status.is_active() && note.notebook_id == Some(*id)
        }
    }
}

/// A parsed search box value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Empty input, or a bare `#`
    Everything,
    /// `#tag`: some tag equals the fragment
    Tag(String),
    /// Case-insensitive substring of title, text or any tag
    Text(String),
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        let query = raw.trim().to_lowercase();
        if query.is_empty() {
            return SearchQuery::Everything;
        }
        match query.strip_prefix('#') {
            Some(fragment) if fragment.is_empty() => SearchQuery::Everything,
            Some(fragment) => SearchQuery::Tag(fragment.to_string()),
            None => SearchQuery::Text(query),
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        match self {
            SearchQuery::Everything => true,
            SearchQuery::Tag(tag) => note.tags.iter().any(|t| t.to_lowercase() == *tag),
            SearchQuery::Text(needle) => {
                note.title.to_lowercase().contains(needle.as_str())
                    || note.text.to_lowercase().contains(needle.as_str())
                    || note
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(needle.as_str()))
            }
        }
    }
}

/// Produces the notes to show for `view`, filtered by `search`.
///
/// Ordering:
/// * trash: most recently trashed first
/// * archive: most recently modified first
/// * active: pinned notes first, canonical order within each group
///
/// All sorts are stable, so ties keep canonical order.
pub fn display<'a>(notes: &'a [Note], view: &ViewSelector, search: &str) -> Vec<&'a Note> {
    let query = SearchQuery::parse(search);

    let mut shown: Vec<&Note> = notes
        .iter()
        .filter(|n| in_view(n, view))
        .filter(|n| query.matches(n))
        .collect();

    match view {
        ViewSelector::Trash => {
            shown.sort_by_key(|n| Reverse(n.status.deleted_at().unwrap_or(n.last_modified)))
        }
        ViewSelector::Archive => shown.sort_by_key(|n| Reverse(n.last_modified)),
        ViewSelector::Active { .. } => shown.sort_by_key(|n| !n.status.is_pinned()),
    }

    trace!(
        "View {:?} with query {:?} shows {} of {} notes",
        view,
        query,
        shown.len(),
        notes.len()
    );
    shown
}
