//! Autosave and synchronization engine for a rich-text note editor.
//!
//! [`EditorController`] owns one editor session: it debounces edits into saves,
//! runs them against a [`NotesApi`] backend, keeps the cached note list ordered,
//! tears pending work down on note switches, and pulls remote changes into an
//! idle shared note. Observable state is exposed as Leptos signals.

pub mod api;
pub mod config;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;
mod util;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, NotesApi, ShareRequest};
pub use config::{EditorConfig, EnvConfig};
pub use models::{Note, NotePayload, TagPreset};
pub use notify::{Notifier, Toast, ToastKind, ToastQueue};
pub use state::{
    EditKind, EditorController, EditorError, EditorFields, Intent, SaveMode, SaveOutcome,
    SaveStatus, StatusReporter,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
