use crate::models::TagPreset;
use crate::util::{now_ms, upsert_lru_by_key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub const TAG_PRESETS_KEY: &str = "note_editor_tag_presets";

const MAX_TAG_PRESETS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value store for local decoration state (tag presets).
///
/// Eventually consistent by contract: callers log and carry on when a write fails.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }
}

/// Single JSON object file holding every key. Rewritten on each write.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut items = self.read_all()?;
        f(&mut items);
        self.write_all(&items)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|items| {
            items.remove(key);
        })
    }
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    let json = match store.get_item(key) {
        Ok(v) => v?,
        Err(e) => {
            warn!(key, error = %e, "failed to read local storage");
            return None;
        }
    };
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(key, error = %e, "failed to encode local storage value");
            return;
        }
    };
    if let Err(e) = store.set_item(key, &json) {
        warn!(key, error = %e, "failed to write local storage");
    }
}

pub fn load_tag_presets(store: &dyn KeyValueStore) -> Vec<TagPreset> {
    load_json_from_storage::<Vec<TagPreset>>(store, TAG_PRESETS_KEY).unwrap_or_default()
}

/// Insert (or move to front) a preset by name. Returns the new list.
pub fn write_tag_preset(store: &dyn KeyValueStore, name: &str, emoji: Option<&str>) -> Vec<TagPreset> {
    let name = name.trim();
    if name.is_empty() {
        return load_tag_presets(store);
    }

    let item = TagPreset {
        name: name.to_string(),
        emoji: emoji
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        created_ms: now_ms(),
    };

    let next = upsert_lru_by_key(
        load_tag_presets(store),
        item,
        |a, b| a.name == b.name,
        MAX_TAG_PRESETS,
    );
    save_json_to_storage(store, TAG_PRESETS_KEY, &next);
    next
}

pub fn remove_tag_preset(store: &dyn KeyValueStore, name: &str) -> Vec<TagPreset> {
    let mut presets = load_tag_presets(store);
    let before = presets.len();
    presets.retain(|p| p.name != name.trim());
    if presets.len() != before {
        save_json_to_storage(store, TAG_PRESETS_KEY, &presets);
    }
    presets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("k").expect("get"), None);
        store.set_item("k", "v").expect("set");
        assert_eq!(store.get_item("k").expect("get").as_deref(), Some("v"));
        store.remove_item("k").expect("remove");
        assert_eq!(store.get_item("k").expect("get"), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get_item("missing").expect("get"), None);
        store.set_item("a", "1").expect("set");
        store.set_item("b", "2").expect("set");
        store.remove_item("a").expect("remove");

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get_item("a").expect("get"), None);
        assert_eq!(reopened.get_item("b").expect("get").as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").expect("write");

        let store = FileStore::new(&path);
        assert!(matches!(store.get_item("a"), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_tag_presets_newest_first_and_dedup() {
        let store = MemoryStore::new();
        write_tag_preset(&store, "work", None);
        write_tag_preset(&store, "urgent", Some("📌"));
        let presets = write_tag_preset(&store, "work", Some("💼"));

        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["work", "urgent"]);
        assert_eq!(presets[0].tag_id(), "💼 work");
        assert_eq!(load_tag_presets(&store), presets);
    }

    #[test]
    fn test_tag_presets_ignore_blank_and_remove() {
        let store = MemoryStore::new();
        assert!(write_tag_preset(&store, "   ", None).is_empty());

        write_tag_preset(&store, "a", None);
        write_tag_preset(&store, "b", None);
        let left = remove_tag_preset(&store, "a");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "b");
        assert_eq!(load_tag_presets(&store).len(), 1);
    }

    #[test]
    fn test_tag_presets_survive_garbage_value() {
        let store = MemoryStore::new();
        store.set_item(TAG_PRESETS_KEY, "{broken").expect("set");
        assert!(load_tag_presets(&store).is_empty());
    }
}
