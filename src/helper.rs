use std::collections::HashSet;

use log::{debug, trace};

use crate::{NoteColor, NoteId, NotesError, Result, Timestamp};

/// Splits comma-separated tag input into trimmed, lowercase, non-empty tags.
///
/// Duplicates are kept; tags are only ever compared for membership.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalizes tags that arrive already split (imports, stored records).
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Order-insensitive multiset comparison of two tag lists
pub fn same_tags(current: &[String], candidate: &[String]) -> bool {
    if current.len() != candidate.len() {
        return false;
    }
    let mut a: Vec<&String> = current.iter().collect();
    let mut b: Vec<&String> = candidate.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Maps raw color input onto the palette.
///
/// `""`, `"null"` and `"default"` (any case) select the default color.
pub fn coerce_color(raw: Option<&str>) -> Result<Option<NoteColor>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value)
            if value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("default") =>
        {
            Ok(None)
        }
        Some(value) => NoteColor::parse(value).map(Some),
    }
}

/// Picks a creation-time id that no existing note uses.
///
/// On a collision the id after the current maximum is taken, or the nearest
/// free id below `now` when the maximum is already `i64::MAX`.
pub fn allocate_id<I>(now: Timestamp, existing: I) -> NoteId
where
    I: IntoIterator<Item = NoteId>,
{
    let taken: HashSet<NoteId> = existing.into_iter().collect();
    if !taken.contains(&now) {
        trace!("Allocated id {}", now);
        return now;
    }

    let id = match taken.iter().copied().max().and_then(|max| max.checked_add(1)) {
        Some(next) => next,
        None => (NoteId::MIN..now)
            .rev()
            .find(|id| !taken.contains(id))
            .unwrap_or(now),
    };
    debug!("Id {} already in use, allocating {}", now, id);
    id
}

/// Rejects names that are empty after trimming.
pub(crate) fn require_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NotesError::ValidationRejected {
            message: format!("{} name cannot be empty", what),
        });
    }
    Ok(name.to_string())
}
