use super::{EditorController, EditorError};
use crate::api::ShareRequest;
use crate::models::compose_tag;
use crate::storage::{remove_tag_preset, write_tag_preset};
use leptos::prelude::{Set, Update};
use tracing::{info, warn};

impl EditorController {
    /// Fetch the note list. A failure degrades to an empty list; the editor stays usable.
    pub async fn load_notes(&self) {
        match self.api.list_notes().await {
            Ok(notes) => {
                info!(count = notes.len(), "notes loaded");
                self.notes.set(notes);
            }
            Err(e) => {
                warn!(error = %e, "failed to load notes; showing an empty list");
                self.notes.set(Vec::new());
            }
        }
        self.mark_active();
    }

    /// Delete a note.
    ///
    /// Saves targeting the active note are torn down before the request. The editor
    /// only switches to an empty draft once the server confirms; on failure the note's
    /// fields stay in place.
    pub async fn delete_note(&self, id: &str) -> Result<(), EditorError> {
        if self.current_note_id().as_deref() == Some(id) {
            self.teardown_saves();
        }

        self.api.delete_note(id).await?;
        if self.current_note_id().as_deref() == Some(id) {
            self.show_empty_draft();
        }
        self.notes.update(|notes| notes.retain(|n| n.id != id));
        info!(note_id = id, "note deleted");
        Ok(())
    }

    pub async fn share_active_note(
        &self,
        permission: &str,
        expiry_days: u32,
    ) -> Result<String, EditorError> {
        let (id, generation) = self.active_note()?;
        let req = ShareRequest {
            permission: permission.to_string(),
            expiry_days,
        };

        let url = self.api.share_note(&id, &req).await?;
        self.apply_share_state(&id, generation, Some(url.clone()));
        info!(note_id = %id, "note shared");
        Ok(url)
    }

    pub async fn unshare_active_note(&self) -> Result<(), EditorError> {
        let (id, generation) = self.active_note()?;

        self.api.unshare_note(&id).await?;
        self.apply_share_state(&id, generation, None);
        info!(note_id = %id, "note unshared");
        Ok(())
    }

    fn active_note(&self) -> Result<(String, u64), EditorError> {
        self.with_session(|s| {
            s.current_note_id
                .clone()
                .map(|id| (id, s.selection_generation))
                .ok_or(EditorError::NoActiveNote)
        })
    }

    fn apply_share_state(&self, id: &str, generation: u64, share_url: Option<String>) {
        let is_shared = share_url.is_some();

        self.notes.update(|notes| {
            if let Some(n) = notes.iter_mut().find(|n| n.id == id) {
                n.is_shared = is_shared;
                n.share_url = share_url.clone();
            }
        });

        let still_active = self.with_session(|s| {
            if s.selection_generation != generation {
                return false;
            }
            s.fields.is_shared = is_shared;
            s.fields.share_url = share_url;
            true
        });
        if still_active {
            self.publish_fields();
        }
    }

    /// Add a tag preset to the local store. Returns the tag identifier it produces.
    pub fn create_tag_preset(&self, name: &str, emoji: Option<&str>) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        let presets = write_tag_preset(self.store.as_ref(), name, emoji);
        self.tag_presets.set(presets);
        Some(compose_tag(emoji, name))
    }

    pub fn remove_tag_preset(&self, name: &str) {
        let presets = remove_tag_preset(self.store.as_ref(), name);
        self.tag_presets.set(presets);
    }
}
