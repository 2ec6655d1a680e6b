use std::collections::HashSet;

use log::{debug, trace};

use crate::{Note, NoteId};

/// Rebuilds the canonical order after the user drags active notes around.
///
/// The result is laid out as:
/// 1. active notes named in `visual_order`, in that order
/// 2. active notes the user could not see (other notebooks, filtered out),
///    in their previous relative order
/// 3. archived and trashed notes, in their previous relative order
///
/// Ids that are unknown, repeated, or no longer active are skipped.
pub fn reorder(canonical: Vec<Note>, visual_order: &[NoteId]) -> Vec<Note> {
    let mut slots: Vec<Option<Note>> = canonical.into_iter().map(Some).collect();
    let mut placed = HashSet::with_capacity(visual_order.len());
    let mut result = Vec::with_capacity(slots.len());

    for id in visual_order {
        if !placed.insert(*id) {
            trace!("Skipping repeated id {} in visual order", id);
            continue;
        }
        let slot = slots
            .iter_mut()
            .find(|s| matches!(s, Some(n) if n.id == *id && n.status.is_active()));
        match slot.and_then(Option::take) {
            Some(note) => result.push(note),
            None => debug!("Skipping id {} that is not an active note", id),
        }
    }

    let (active_rest, inactive): (Vec<Note>, Vec<Note>) = slots
        .into_iter()
        .flatten()
        .partition(|n| n.status.is_active());

    result.extend(active_rest);
    result.extend(inactive);
    result
}
