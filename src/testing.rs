//! In-memory persistence backend and controller harness for tests.

use crate::api::{ApiError, ApiResult, NotesApi, ShareRequest};
use crate::config::EditorConfig;
use crate::models::{Note, NotePayload};
use crate::notify::ToastQueue;
use crate::state::EditorController;
use crate::storage::{KeyValueStore, MemoryStore};
use async_trait::async_trait;
use leptos::prelude::Update;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiCall {
    List,
    Get(String),
    Create(NotePayload),
    Update(String, NotePayload),
    Delete(String),
    Share(String, ShareRequest),
    Unshare(String),
}

/// Records every request at send time; the response arrives after `latency`.
#[derive(Default)]
pub(crate) struct FakeNotesApi {
    notes: Mutex<Vec<Note>>,
    calls: Mutex<Vec<ApiCall>>,
    latency: Mutex<Duration>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    next_id: AtomicU64,
    clock: AtomicU64,
}

impl FakeNotesApi {
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self) -> Vec<(String, NotePayload)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Update(id, p) => Some((id, p)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn server_note(&self, id: &str) -> Option<Note> {
        self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    pub(crate) fn insert_server_note(&self, id: &str, title: &str, content: &str) -> Note {
        let note = Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: Default::default(),
            is_shared: false,
            share_url: None,
            updated_at: self.tick(),
        };
        self.notes.lock().unwrap().push(note.clone());
        note
    }

    /// Another client wrote to the note.
    pub(crate) fn edit_on_server(&self, id: &str, title: &str, content: &str) {
        let stamp = self.tick();
        let mut notes = self.notes.lock().unwrap();
        if let Some(n) = notes.iter_mut().find(|n| n.id == id) {
            n.title = title.to_string();
            n.content = content.to_string();
            n.updated_at = stamp;
        }
    }

    pub(crate) fn share_on_server(&self, id: &str, url: &str) {
        let mut notes = self.notes.lock().unwrap();
        if let Some(n) = notes.iter_mut().find(|n| n.id == id) {
            n.is_shared = true;
            n.share_url = Some(url.to_string());
        }
    }

    fn tick(&self) -> String {
        format!("t{}", self.clock.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn respond(&self, write: bool) -> ApiResult<()> {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let fail = if write {
            self.fail_writes.load(Ordering::SeqCst)
        } else {
            self.fail_reads.load(Ordering::SeqCst)
        };
        if fail {
            Err(ApiError::rejected("Fake backend", Some("injected failure")))
        } else {
            Ok(())
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::rejected("Fake backend", Some(format!("note {id} not found").as_str()))
    }
}

#[async_trait]
impl NotesApi for FakeNotesApi {
    async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.record(ApiCall::List);
        self.respond(false).await?;
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn get_note(&self, id: &str) -> ApiResult<Note> {
        self.record(ApiCall::Get(id.to_string()));
        self.respond(false).await?;
        self.server_note(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create_note(&self, payload: &NotePayload) -> ApiResult<Note> {
        self.record(ApiCall::Create(payload.clone()));
        self.respond(true).await?;
        let note = Note {
            id: format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            title: payload.title.clone(),
            content: payload.content.clone(),
            tags: payload.tags.clone(),
            is_shared: false,
            share_url: None,
            updated_at: self.tick(),
        };
        self.notes.lock().unwrap().insert(0, note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: &str, payload: &NotePayload) -> ApiResult<Note> {
        self.record(ApiCall::Update(id.to_string(), payload.clone()));
        self.respond(true).await?;
        let stamp = self.tick();
        let mut notes = self.notes.lock().unwrap();
        let n = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        n.title = payload.title.clone();
        n.content = payload.content.clone();
        n.tags = payload.tags.clone();
        n.updated_at = stamp;
        Ok(n.clone())
    }

    async fn delete_note(&self, id: &str) -> ApiResult<()> {
        self.record(ApiCall::Delete(id.to_string()));
        self.respond(true).await?;
        self.notes.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }

    async fn share_note(&self, id: &str, req: &ShareRequest) -> ApiResult<String> {
        self.record(ApiCall::Share(id.to_string(), req.clone()));
        self.respond(true).await?;
        let url = format!("https://share.example/{id}");
        self.share_on_server(id, &url);
        Ok(url)
    }

    async fn unshare_note(&self, id: &str) -> ApiResult<()> {
        self.record(ApiCall::Unshare(id.to_string()));
        self.respond(true).await?;
        let mut notes = self.notes.lock().unwrap();
        if let Some(n) = notes.iter_mut().find(|n| n.id == id) {
            n.is_shared = false;
            n.share_url = None;
        }
        Ok(())
    }
}

pub(crate) struct Harness {
    pub api: Arc<FakeNotesApi>,
    pub toasts: ToastQueue,
    pub ctl: EditorController,
}

impl Harness {
    /// Put a note on the server and in the controller's cached list (appended).
    pub(crate) fn seed_note(&self, id: &str, title: &str, content: &str) {
        let note = self.api.insert_server_note(id, title, content);
        self.ctl.notes_signal().update(|n| n.push(note));
    }

    pub(crate) fn seed_note_with_tags(&self, id: &str, title: &str, content: &str, tags: &[&str]) {
        let mut note = self.api.insert_server_note(id, title, content);
        note.tags = tags.iter().map(|t| t.to_string()).collect();
        {
            let mut notes = self.api.notes.lock().unwrap();
            if let Some(n) = notes.iter_mut().find(|n| n.id == id) {
                n.tags = note.tags.clone();
            }
        }
        self.ctl.notes_signal().update(|n| n.push(note));
    }

    pub(crate) fn seed_and_select(&self, id: &str, title: &str, content: &str) {
        self.seed_note(id, title, content);
        self.ctl.select_note(id).expect("seeded note should be selectable");
    }
}

pub(crate) fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

pub(crate) fn harness_with_store(store: Arc<dyn KeyValueStore>) -> Harness {
    let api = Arc::new(FakeNotesApi::default());
    let toasts = ToastQueue::new();
    let ctl = EditorController::new(
        api.clone(),
        Arc::new(toasts.clone()),
        store,
        EditorConfig::default(),
    );
    Harness { api, toasts, ctl }
}
