use crate::models::Note;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn upsert_lru_by_key<T: Clone>(
    mut items: Vec<T>,
    item: T,
    same_key: impl Fn(&T, &T) -> bool,
    max: usize,
) -> Vec<T> {
    items.retain(|x| !same_key(x, &item));
    items.insert(0, item);
    if items.len() > max {
        items.truncate(max);
    }
    items
}

/// Most recently touched note sorts first.
pub(crate) fn unshift_note(notes: &mut Vec<Note>, note: Note) {
    notes.retain(|n| n.id != note.id);
    notes.insert(0, note);
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
