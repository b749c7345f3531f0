use super::{EditKind, EditorController, SaveMode, SaveOutcome};
use crate::models::toggle_tag;
use std::time::Duration;
use tracing::debug;

impl EditorController {
    pub fn edit_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.with_session(|s| s.fields.title = title);
        self.publish_fields();
        self.on_edit(EditKind::Title);
    }

    pub fn edit_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.with_session(|s| s.fields.content = content);
        self.publish_fields();
        self.on_edit(EditKind::Content);
    }

    pub fn toggle_tag(&self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        self.with_session(|s| {
            toggle_tag(&mut s.fields.tags, tag);
        });
        self.publish_fields();
        self.on_edit(EditKind::Tags);
    }

    /// Record an edit: status goes to `Typing` and the debounce restarts.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_edit(&self, kind: EditKind) {
        self.status.typing();
        self.arm_debounce(self.debounce_for(kind));
    }

    pub(crate) fn debounce_for(&self, kind: EditKind) -> Duration {
        match kind {
            EditKind::Title => self.config.title_debounce(),
            EditKind::Content | EditKind::Tags => self.config.content_debounce(),
        }
    }

    /// Replace any pending timer with a fresh one that saves on expiry.
    pub(crate) fn arm_debounce(&self, delay: Duration) {
        let generation = self.with_session(|s| {
            if let Some(handle) = s.pending_save.take() {
                handle.abort();
            }
            s.debounce_generation = s.debounce_generation.wrapping_add(1);
            s.debounce_generation
        });

        let this = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Detach from the pending slot first: from here on the save is torn down
            // through its cancellation token, never by aborting this task.
            let still_current = this.with_session(|s| {
                if s.debounce_generation != generation {
                    return false;
                }
                s.pending_save = None;
                true
            });
            if !still_current {
                return;
            }

            debug!(generation, "debounce elapsed");
            if this.save(SaveMode::Silent).await == SaveOutcome::Skipped {
                // Busy slot: the holder re-arms us once it finishes.
                this.with_session(|s| {
                    if s.is_saving {
                        s.resave_requested = true;
                    }
                });
            }
        });

        self.with_session(|s| {
            if s.debounce_generation == generation {
                s.pending_save = Some(task.abort_handle());
            } else {
                task.abort();
            }
        });
    }

    /// Drop the pending timer, if any. Returns whether one was armed.
    pub(crate) fn cancel_pending_save(&self) -> bool {
        self.with_session(|s| {
            s.debounce_generation = s.debounce_generation.wrapping_add(1);
            match s.pending_save.take() {
                Some(handle) => {
                    handle.abort();
                    true
                }
                None => false,
            }
        })
    }
}
