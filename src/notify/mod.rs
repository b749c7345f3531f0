use leptos::prelude::{ArcRwSignal, GetUntracked, Update};
use strum::{AsRefStr, Display};

const TOAST_LIMIT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ToastKind {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Failure,
            message: message.into(),
        }
    }
}

/// Sink for transient user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Bounded toast list the host UI renders from.
#[derive(Clone)]
pub struct ToastQueue {
    toasts: ArcRwSignal<Vec<Toast>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self {
            toasts: ArcRwSignal::new(Vec::new()),
        }
    }

    pub fn signal(&self) -> ArcRwSignal<Vec<Toast>> {
        self.toasts.clone()
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.toasts.get_untracked()
    }

    pub fn dismiss_all(&self) {
        self.toasts.update(|t| t.clear());
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, toast: Toast) {
        self.toasts.update(|t| {
            t.push(toast);
            if t.len() > TOAST_LIMIT {
                let excess = t.len() - TOAST_LIMIT;
                t.drain(..excess);
            }
        });
    }
}
