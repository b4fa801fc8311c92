//! Self-assessment quiz for the five inner drivers, with a live spoken
//! follow-up conversation.
//!
//! - [`quiz`]: questions, score reduction, prompt building
//! - [`controller`]: voice session lifecycle and resource ownership
//! - [`audio`]: capture, gapless playback, ALSA devices
//! - [`net_link`]: websocket transport to the live speech endpoint

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod net_link;
pub mod protocol;
pub mod quiz;
pub mod status;

pub use config::Config;
pub use controller::{
    spawn_session_actor, SessionController, SessionEvent, SessionHandle, SessionState,
};
pub use error::{SessionError, SessionResult};
pub use status::SessionStatus;
