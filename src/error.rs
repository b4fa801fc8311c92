//! Error types for the voice coaching session

use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can end (or be swallowed inside) a voice session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    /// A single inbound chunk could not be decoded. Never surfaced to the user.
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Remote session error: {0}")]
    Remote(String),

    #[error("A session is already running")]
    AlreadyActive,

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Short text for the status surface.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::PermissionDenied(_) => "Kein Zugriff auf das Mikrofon.".to_string(),
            SessionError::Connection(reason) => {
                format!("Konnte keine Verbindung herstellen: {}", reason)
            }
            SessionError::Remote(_) => "Verbindung unterbrochen.".to_string(),
            SessionError::AlreadyActive => "Es läuft bereits ein Gespräch.".to_string(),
            other => other.to_string(),
        }
    }
}
