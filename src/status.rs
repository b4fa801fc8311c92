//! Read-only status surface for display.

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Connecting,
    Listening,
    Speaking,
    Error(String),
}

impl SessionStatus {
    pub fn label(&self) -> &str {
        match self {
            SessionStatus::NotStarted => "Gespräch starten",
            SessionStatus::Connecting => "Verbinde...",
            SessionStatus::Listening => "Höre zu...",
            SessionStatus::Speaking => "Coach spricht...",
            SessionStatus::Error(reason) => reason,
        }
    }
}

/// Publishes [`SessionStatus`] changes. Shared between the controller and the
/// playback render thread.
pub struct StatusBoard {
    tx: watch::Sender<SessionStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::NotStarted);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SessionStatus {
        self.tx.borrow().clone()
    }

    pub fn set(&self, status: SessionStatus) {
        self.tx.send_replace(status);
    }

    /// Toggle between listening and speaking. Has no effect in any other
    /// status, so a late playback completion cannot overwrite an error.
    pub fn set_speaking(&self, speaking: bool) {
        self.tx.send_if_modified(|status| {
            let next = match (&*status, speaking) {
                (SessionStatus::Listening, true) => SessionStatus::Speaking,
                (SessionStatus::Speaking, false) => SessionStatus::Listening,
                _ => return false,
            };
            *status = next;
            true
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
