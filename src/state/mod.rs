mod executor;
mod notes;
mod poller;
mod scheduler;
mod selection;
pub mod status;

use crate::api::{ApiError, NotesApi};
use crate::config::EditorConfig;
use crate::models::{Note, NotePayload, TagPreset};
use crate::notify::Notifier;
use crate::storage::{load_tag_presets, KeyValueStore};
use leptos::prelude::{ArcRwSignal, GetUntracked, Set};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

pub use status::{SaveStatus, StatusReporter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveMode {
    /// Autosave: no success toast. Failures still surface.
    Silent,
    Interactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
    /// The session switched notes while the request was in flight.
    Cancelled,
    /// Nothing was sent: another save holds the slot, there is no note yet,
    /// or an empty draft was not worth creating.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Title,
    Content,
    Tags,
}

/// UI events, as consumed by [`EditorController::dispatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    EditTitle(String),
    EditContent(String),
    ToggleTag(String),
    SelectNote(String),
    ShowEmptyDraft,
    Save(SaveMode),
    Tick,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("note {0} is not in the loaded note list")]
    UnknownNote(String),
    #[error("no note is active")]
    NoActiveNote,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What the editor currently displays.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorFields {
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub is_shared: bool,
    pub share_url: Option<String>,
}

impl EditorFields {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            is_shared: note.is_shared,
            share_url: note.share_url.clone(),
        }
    }
}

/// Per-call cancellation handle for one save request.
///
/// The generation lets a late finisher tell whether the session slot is still its own.
#[derive(Clone, Debug)]
pub(crate) struct SaveToken {
    generation: u64,
    cancel: CancellationToken,
}

impl SaveToken {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[derive(Debug, Default)]
pub(crate) struct EditorSession {
    /// `None` = unsaved draft.
    pub current_note_id: Option<String>,
    pub fields: EditorFields,

    /// Debounce timer; cleared by the timer itself once it fires.
    pub pending_save: Option<AbortHandle>,
    pub debounce_generation: u64,

    pub in_flight: Option<SaveToken>,
    pub is_saving: bool,
    save_generation: u64,

    /// What the client believes is on the server.
    pub last_synced_title: String,
    pub last_synced_content: String,

    /// Bumped on every note switch; poll results from an older selection are dropped.
    pub selection_generation: u64,

    /// A debounced save fired while another save held the slot. Set by the timer only.
    pub resave_requested: bool,
}

impl EditorSession {
    pub(crate) fn has_local_divergence(&self) -> bool {
        self.fields.title != self.last_synced_title
            || self.fields.content != self.last_synced_content
    }

    pub(crate) fn mark_synced(&mut self, title: &str, content: &str) {
        self.last_synced_title = title.to_string();
        self.last_synced_content = content.to_string();
    }

    pub(crate) fn payload(&self) -> NotePayload {
        NotePayload {
            title: self.fields.title.clone(),
            content: self.fields.content.clone(),
            tags: self.fields.tags.clone(),
        }
    }

    /// Check-and-set of `is_saving`. Never awaits.
    pub(crate) fn claim_save_slot(&mut self) -> Option<SaveToken> {
        if self.is_saving {
            return None;
        }
        self.is_saving = true;
        self.save_generation = self.save_generation.wrapping_add(1);
        let token = SaveToken::new(self.save_generation);
        self.in_flight = Some(token.clone());
        Some(token)
    }

    /// Returns false when the slot was already taken away (cancelled or superseded).
    pub(crate) fn release_save_slot(&mut self, token: &SaveToken) -> bool {
        let owns = self
            .in_flight
            .as_ref()
            .is_some_and(|t| t.generation() == token.generation());
        if owns {
            self.in_flight = None;
            self.is_saving = false;
        }
        owns
    }
}

/// One editor instance: session state plus its collaborators.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct EditorController {
    api: Arc<dyn NotesApi>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KeyValueStore>,
    config: Arc<EditorConfig>,

    session: Arc<Mutex<EditorSession>>,
    status: StatusReporter,

    /// Cached note list, newest first.
    notes: ArcRwSignal<Vec<Note>>,
    active_note_id: ArcRwSignal<Option<String>>,
    fields: ArcRwSignal<EditorFields>,
    tag_presets: ArcRwSignal<Vec<TagPreset>>,

    poller: Arc<Mutex<Option<AbortHandle>>>,
}

impl EditorController {
    pub fn new(
        api: Arc<dyn NotesApi>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KeyValueStore>,
        config: EditorConfig,
    ) -> Self {
        let status = StatusReporter::new(config.error_revert(), config.sync_flash());
        let tag_presets = ArcRwSignal::new(load_tag_presets(store.as_ref()));

        Self {
            api,
            notifier,
            store,
            config: Arc::new(config),
            session: Arc::new(Mutex::new(EditorSession::default())),
            status,
            notes: ArcRwSignal::new(Vec::new()),
            active_note_id: ArcRwSignal::new(None),
            fields: ArcRwSignal::new(EditorFields::default()),
            tag_presets,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    fn session(&self) -> MutexGuard<'_, EditorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the session lock. Never hold the lock across an await.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> R {
        f(&mut self.session())
    }

    pub fn status(&self) -> SaveStatus {
        self.status.current()
    }

    pub fn status_signal(&self) -> ArcRwSignal<SaveStatus> {
        self.status.signal()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.get_untracked()
    }

    pub fn notes_signal(&self) -> ArcRwSignal<Vec<Note>> {
        self.notes.clone()
    }

    pub fn active_note_signal(&self) -> ArcRwSignal<Option<String>> {
        self.active_note_id.clone()
    }

    pub fn active_note_id(&self) -> Option<String> {
        self.active_note_id.get_untracked()
    }

    pub fn fields(&self) -> EditorFields {
        self.with_session(|s| s.fields.clone())
    }

    pub fn fields_signal(&self) -> ArcRwSignal<EditorFields> {
        self.fields.clone()
    }

    pub fn tag_presets(&self) -> Vec<TagPreset> {
        self.tag_presets.get_untracked()
    }

    pub fn tag_presets_signal(&self) -> ArcRwSignal<Vec<TagPreset>> {
        self.tag_presets.clone()
    }

    pub fn current_note_id(&self) -> Option<String> {
        self.with_session(|s| s.current_note_id.clone())
    }

    pub fn is_saving(&self) -> bool {
        self.with_session(|s| s.is_saving)
    }

    pub fn has_pending_save(&self) -> bool {
        self.with_session(|s| s.pending_save.is_some())
    }

    /// `(last_synced_title, last_synced_content)`.
    pub fn last_synced(&self) -> (String, String) {
        self.with_session(|s| (s.last_synced_title.clone(), s.last_synced_content.clone()))
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<(), EditorError> {
        match intent {
            Intent::EditTitle(title) => self.edit_title(title),
            Intent::EditContent(content) => self.edit_content(content),
            Intent::ToggleTag(tag) => self.toggle_tag(&tag),
            Intent::SelectNote(id) => self.select_note(&id)?,
            Intent::ShowEmptyDraft => self.show_empty_draft(),
            Intent::Save(mode) => {
                self.save(mode).await;
            }
            Intent::Tick => self.sync_tick().await,
        }
        Ok(())
    }

    fn publish_fields(&self) {
        let fields = self.fields();
        self.fields.set(fields);
    }

    /// Re-mark the active list item from the session.
    fn mark_active(&self) {
        let id = self.current_note_id();
        self.active_note_id.set(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_slot_is_exclusive() {
        let mut s = EditorSession::default();
        let t1 = s.claim_save_slot().expect("first claim");
        assert!(s.is_saving);
        assert!(s.claim_save_slot().is_none());
        assert!(!s.resave_requested, "only the debounce timer asks for a resave");

        assert!(s.release_save_slot(&t1));
        assert!(!s.is_saving);
        assert!(s.in_flight.is_none());
    }

    #[test]
    fn test_stale_token_cannot_release_newer_slot() {
        let mut s = EditorSession::default();
        let old = s.claim_save_slot().expect("claim");

        // Note switch: slot taken away and token cancelled.
        if let Some(t) = s.in_flight.take() {
            t.cancel();
        }
        s.is_saving = false;
        assert!(old.is_cancelled());

        let new = s.claim_save_slot().expect("claim after switch");
        assert!(!s.release_save_slot(&old));
        assert!(s.is_saving);
        assert!(s.release_save_slot(&new));
    }

    #[test]
    fn test_divergence_tracks_last_synced() {
        let mut s = EditorSession::default();
        assert!(!s.has_local_divergence());
        s.fields.content = "x".to_string();
        assert!(s.has_local_divergence());
        s.mark_synced("", "x");
        assert!(!s.has_local_divergence());
    }
}
