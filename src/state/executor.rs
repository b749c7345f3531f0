use super::{EditKind, EditorController, SaveMode, SaveOutcome, SaveToken};
use crate::api::ApiResult;
use crate::models::Note;
use crate::notify::Toast;
use crate::util::unshift_note;
use leptos::prelude::Update;
use tracing::{debug, info, warn};

impl EditorController {
    /// Persist the editor's current fields.
    ///
    /// An unsaved draft is created first (only if it has a title or content), then
    /// the note is written with `PUT`. A call made while another save holds the
    /// slot is a no-op.
    pub async fn save(&self, mode: SaveMode) -> SaveOutcome {
        if self.current_note_id().is_none() {
            match self.create_note_if_needed(mode).await {
                SaveOutcome::Saved => {}
                other => return other,
            }
        }
        self.update_current_note(mode).await
    }

    async fn create_note_if_needed(&self, mode: SaveMode) -> SaveOutcome {
        let claimed = self.with_session(|s| {
            if s.current_note_id.is_some() {
                return Err(SaveOutcome::Saved);
            }
            let payload = s.payload();
            if !payload.has_text() {
                return Err(SaveOutcome::Skipped);
            }
            let token = s.claim_save_slot().ok_or(SaveOutcome::Skipped)?;
            s.mark_synced(&payload.title, &payload.content);
            Ok((token, payload))
        });
        let (token, payload) = match claimed {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        self.status.saving();
        debug!(generation = token.generation(), "creating note");

        let outcome = match self.run_cancellable(&token, self.api.create_note(&payload)).await {
            None => SaveOutcome::Cancelled,
            Some(Ok(note)) => {
                info!(note_id = %note.id, "note created");
                self.with_session(|s| s.current_note_id = Some(note.id.clone()));
                self.notes.update(|n| unshift_note(n, note));
                self.mark_active();
                SaveOutcome::Saved
            }
            Some(Err(e)) => {
                warn!(error = %e, "create note failed");
                self.report_failure(&e.to_string());
                SaveOutcome::Failed
            }
        };

        self.finish_save(&token, outcome, mode)
    }

    async fn update_current_note(&self, mode: SaveMode) -> SaveOutcome {
        let claimed = self.with_session(|s| {
            let id = s.current_note_id.clone()?;
            let token = s.claim_save_slot()?;
            let payload = s.payload();
            // Our own outgoing write is what the server holds from now on.
            s.mark_synced(&payload.title, &payload.content);
            Some((token, id, payload))
        });
        let Some((token, id, payload)) = claimed else {
            debug!("save skipped: no note or a save is already in flight");
            return SaveOutcome::Skipped;
        };

        self.status.saving();
        debug!(note_id = %id, generation = token.generation(), "saving note");

        let outcome = match self
            .run_cancellable(&token, self.api.update_note(&id, &payload))
            .await
        {
            None => SaveOutcome::Cancelled,
            Some(Ok(note)) => {
                self.apply_saved_note(note);
                // Edits made during the request are still waiting on their own timer.
                if !self.has_pending_save() {
                    self.status.saved();
                }
                if mode == SaveMode::Interactive {
                    self.notifier.notify(Toast::success("Note saved"));
                }
                SaveOutcome::Saved
            }
            Some(Err(e)) => {
                warn!(note_id = %id, error = %e, "save failed");
                self.report_failure(&e.to_string());
                SaveOutcome::Failed
            }
        };

        self.finish_save(&token, outcome, mode)
    }

    /// Await `request` unless `token` is cancelled first. `None` means the result is stale.
    async fn run_cancellable<F>(&self, token: &SaveToken, request: F) -> Option<ApiResult<Note>>
    where
        F: std::future::Future<Output = ApiResult<Note>>,
    {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            r = request => Some(r),
        };

        if result.is_none() || token.is_cancelled() {
            debug!(generation = token.generation(), "save cancelled");
            return None;
        }
        result
    }

    fn apply_saved_note(&self, note: Note) {
        self.notes.update(|n| unshift_note(n, note));
        self.mark_active();
    }

    /// Failures always surface, whatever the save mode.
    fn report_failure(&self, message: &str) {
        self.status.error();
        self.notifier
            .notify(Toast::failure(format!("Failed to save note: {message}")));
    }

    fn finish_save(&self, token: &SaveToken, outcome: SaveOutcome, mode: SaveMode) -> SaveOutcome {
        let rearm = self.with_session(|s| {
            if !s.release_save_slot(token) {
                return false;
            }
            std::mem::take(&mut s.resave_requested) && s.pending_save.is_none()
        });

        // A debounced save was dropped while we held the slot; give the latest edits another pass.
        if rearm && outcome != SaveOutcome::Cancelled {
            debug!(?mode, "re-arming debounce after busy save");
            self.arm_debounce(self.debounce_for(EditKind::Content));
        }
        outcome
    }

    #[cfg(test)]
    pub(crate) fn payload_snapshot(&self) -> crate::models::NotePayload {
        self.with_session(|s| s.payload())
    }
}
