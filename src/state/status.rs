use leptos::prelude::{ArcRwSignal, GetUntracked, Set};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter};
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum SaveStatus {
    Typing,
    Saving,
    #[default]
    Saved,
    Syncing,
    Error,
}

impl SaveStatus {
    /// Transitions the engine is expected to fire.
    ///
    /// `Typing` is reachable from anywhere (a fresh edit), `Saved` likewise (resting state).
    pub fn can_transition_to(self, next: SaveStatus) -> bool {
        use SaveStatus::*;
        match (self, next) {
            (_, Typing) | (_, Saved) => true,
            (Typing | Saved | Error | Saving, Saving) => true,
            (Saving, Error) => true,
            (Saved, Syncing) => true,
            _ => false,
        }
    }
}

/// Holds the current [`SaveStatus`] and runs its automatic reverts.
///
/// `Error` falls back to `Saved` after `error_revert`, `Syncing` after `sync_flash`.
/// Only one automatic revert is ever armed; any transition disarms it.
#[derive(Clone)]
pub struct StatusReporter {
    status: ArcRwSignal<SaveStatus>,
    revert: Arc<Mutex<Option<AbortHandle>>>,
    error_revert: Duration,
    sync_flash: Duration,
}

impl StatusReporter {
    pub fn new(error_revert: Duration, sync_flash: Duration) -> Self {
        Self {
            status: ArcRwSignal::new(SaveStatus::Saved),
            revert: Arc::new(Mutex::new(None)),
            error_revert,
            sync_flash,
        }
    }

    pub fn current(&self) -> SaveStatus {
        self.status.get_untracked()
    }

    /// Reactive handle for rendering.
    pub fn signal(&self) -> ArcRwSignal<SaveStatus> {
        self.status.clone()
    }

    pub fn typing(&self) {
        self.transition(SaveStatus::Typing);
    }

    pub fn saving(&self) {
        self.transition(SaveStatus::Saving);
    }

    pub fn saved(&self) {
        self.transition(SaveStatus::Saved);
    }

    /// Must be called from within a tokio runtime.
    pub fn error(&self) {
        self.transition(SaveStatus::Error);
        self.schedule_revert(self.error_revert);
    }

    /// Must be called from within a tokio runtime.
    pub fn syncing(&self) {
        self.transition(SaveStatus::Syncing);
        self.schedule_revert(self.sync_flash);
    }

    fn transition(&self, next: SaveStatus) {
        self.cancel_revert();

        let prev = self.current();
        if !prev.can_transition_to(next) {
            debug!(%prev, %next, "unexpected save status transition");
        }
        if prev != next {
            debug!(%prev, %next, "save status");
            self.status.set(next);
        }
    }

    fn cancel_revert(&self) {
        let mut slot = self.revert.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn schedule_revert(&self, after: Duration) {
        let status = self.status.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            debug!(prev = %status.get_untracked(), "save status auto-revert");
            status.set(SaveStatus::Saved);
        });

        let mut slot = self.revert.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.replace(task.abort_handle()) {
            prev.abort();
        }
    }
}
