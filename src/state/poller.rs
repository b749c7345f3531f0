use super::EditorController;
use leptos::prelude::Update;
use std::sync::PoisonError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

impl EditorController {
    /// One pull-when-idle pass for the active shared note.
    ///
    /// Never runs while the editor holds unsent edits or a save is pending or in
    /// flight; those are resolved by the save path only.
    pub async fn sync_tick(&self) {
        let probe = self.with_session(|s| {
            let id = s.current_note_id.clone()?;
            if !s.fields.is_shared {
                return None;
            }
            if s.has_local_divergence() || s.is_saving || s.pending_save.is_some() {
                return None;
            }
            Some((
                id,
                s.selection_generation,
                s.fields.title.clone(),
                s.fields.content.clone(),
            ))
        });
        let Some((id, generation, title, content)) = probe else {
            return;
        };

        let remote = match self.api.get_note(&id).await {
            Ok(note) => note,
            Err(e) => {
                debug!(note_id = %id, error = %e, "sync pull failed");
                return;
            }
        };

        let applied = self.with_session(|s| {
            // Re-check: the user may have switched notes or typed during the fetch.
            if s.selection_generation != generation
                || s.current_note_id.as_deref() != Some(id.as_str())
                || s.is_saving
                || s.pending_save.is_some()
                || s.fields.title != title
                || s.fields.content != content
            {
                return false;
            }
            if remote.title == s.last_synced_title && remote.content == s.last_synced_content {
                return false;
            }
            s.fields.title = remote.title.clone();
            s.fields.content = remote.content.clone();
            s.mark_synced(&remote.title, &remote.content);
            true
        });
        if !applied {
            return;
        }

        info!(note_id = %id, "pulled remote changes");
        self.notes.update(|notes| {
            if let Some(slot) = notes.iter_mut().find(|n| n.id == remote.id) {
                *slot = remote;
            }
        });
        self.publish_fields();
        self.status.syncing();
    }

    /// Start the background poller. Idempotent; must be called within a tokio runtime.
    pub fn start_sync_poller(&self) {
        let mut slot = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let period = self.config.sync_interval();
        let this = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                this.sync_tick().await;
            }
        });
        *slot = Some(task.abort_handle());
        debug!(?period, "sync poller started");
    }

    pub fn stop_sync_poller(&self) {
        let mut slot = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
            debug!("sync poller stopped");
        }
    }
}
