use super::{EditorController, EditorError, EditorFields};
use leptos::prelude::WithUntracked;
use tracing::{debug, warn};

impl EditorController {
    /// Switch the editor to a cached note.
    ///
    /// Any pending or in-flight save of the previous note is torn down before the
    /// session points at `id`; a late response from it is ignored.
    pub fn select_note(&self, id: &str) -> Result<(), EditorError> {
        let Some(note) = self
            .notes
            .with_untracked(|notes| notes.iter().find(|n| n.id == id).cloned())
        else {
            warn!(note_id = id, "select_note: unknown note");
            return Err(EditorError::UnknownNote(id.to_string()));
        };

        self.teardown_saves();

        self.with_session(|s| {
            s.current_note_id = Some(note.id.clone());
            s.selection_generation = s.selection_generation.wrapping_add(1);
            s.fields = EditorFields::from_note(&note);
            // Freshly loaded from the server: nothing diverges yet.
            s.mark_synced(&note.title, &note.content);
        });
        self.publish_fields();
        self.mark_active();

        debug!(note_id = id, "note selected");
        Ok(())
    }

    /// Switch to an unsaved draft; the note is created lazily on first non-empty save.
    pub fn show_empty_draft(&self) {
        self.teardown_saves();

        self.with_session(|s| {
            s.current_note_id = None;
            s.selection_generation = s.selection_generation.wrapping_add(1);
            s.fields = EditorFields::default();
            s.mark_synced("", "");
        });
        self.publish_fields();
        self.mark_active();

        debug!("empty draft shown");
    }

    /// Steps that must finish before `current_note_id` may change.
    pub(crate) fn teardown_saves(&self) {
        self.cancel_pending_save();

        self.with_session(|s| {
            if let Some(token) = s.in_flight.take() {
                debug!(generation = token.generation(), "cancelling in-flight save");
                token.cancel();
            }
            s.is_saving = false;
            s.resave_requested = false;
        });

        // Always a clean slate, whatever the previous note was showing.
        self.status.saved();
    }
}
