use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Server-side note record.
///
/// Owned by the persistence backend; the editor only ever holds a cached copy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Rich-text markup; opaque to this crate.
    #[serde(default)]
    pub content: String,

    /// Order-irrelevant tag identifiers (may carry an emoji prefix).
    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub is_shared: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,

    #[serde(default)]
    pub updated_at: String,
}

/// Body of `POST /notes` and `PUT /notes/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct NotePayload {
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
}

impl NotePayload {
    /// Lazy creation only persists drafts that carry some text.
    pub fn has_text(&self) -> bool {
        !self.title.is_empty() || !self.content.is_empty()
    }
}

/// User-defined tag shortcut kept in the local key-value store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TagPreset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub created_ms: i64,
}

impl TagPreset {
    /// Tag identifier as stored on notes.
    pub fn tag_id(&self) -> String {
        compose_tag(self.emoji.as_deref(), &self.name)
    }
}

/// Build a tag identifier from an optional emoji prefix and a name.
pub fn compose_tag(emoji: Option<&str>, name: &str) -> String {
    match emoji.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => format!("{e} {}", name.trim()),
        None => name.trim().to_string(),
    }
}

/// Split a tag identifier like `"📌 urgent"` into `(Some("📌"), "urgent")`.
///
/// A prefix only counts as an emoji when its first char is neither
/// alphanumeric nor ASCII punctuation and it is followed by a space.
pub fn split_tag(tag: &str) -> (Option<&str>, &str) {
    let tag = tag.trim();
    let Some((head, rest)) = tag.split_once(' ') else {
        return (None, tag);
    };

    let looks_like_emoji = head
        .chars()
        .next()
        .map(|c| !c.is_alphanumeric() && !c.is_ascii())
        .unwrap_or(false);

    if looks_like_emoji && !rest.trim().is_empty() {
        (Some(head), rest.trim())
    } else {
        (None, tag)
    }
}

/// Flip membership of `tag` in `tags`. Returns whether the tag is now present.
pub fn toggle_tag(tags: &mut BTreeSet<String>, tag: &str) -> bool {
    if tags.remove(tag) {
        false
    } else {
        tags.insert(tag.to_string());
        true
    }
}
