//! Device seams: the session opens its microphone and speaker through an
//! [`AudioBackend`] and owns the returned handles exclusively.

use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::{SessionError, SessionResult};

/// Where the device threads report a failure that ends the session.
pub type FaultSender = mpsc::UnboundedSender<SessionError>;

/// Audio device configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// ALSA playback device name
    pub playback_device: String,
    /// Rate the remote endpoint expects for microphone audio
    pub capture_sample_rate: u32,
    /// Rate of the synthesized speech the remote endpoint returns
    pub playback_sample_rate: u32,
    /// Samples per outbound frame
    pub capture_frame_samples: usize,
    /// Frames rendered per playback period
    pub playback_period_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_device: "default".to_string(),
            playback_device: "default".to_string(),
            capture_sample_rate: 16000,
            playback_sample_rate: 24000,
            capture_frame_samples: 4096,
            playback_period_size: 480,
        }
    }
}

/// A microphone. Dropping it releases the device.
pub trait AudioSource: Send {
    fn sample_rate(&self) -> u32;

    /// Block until some mono samples are available and copy them into `buf`.
    /// Returns the number of samples written; 0 means "nothing this time".
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;
}

/// A speaker. Dropping it closes the device.
pub trait AudioSink: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u32;

    /// Write interleaved samples, blocking at the device's real-time pace.
    fn write(&mut self, interleaved: &[i16]) -> Result<()>;

    /// Throw away everything queued in the device but not yet audible.
    /// Sinks without their own buffer have nothing to drop.
    fn discard(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Factory for the two devices a session owns.
pub trait AudioBackend: Send + Sync {
    /// Acquire the microphone. Refusal is a permission error for this attempt.
    fn open_input(&self) -> SessionResult<Box<dyn AudioSource>>;

    fn open_output(&self) -> SessionResult<Box<dyn AudioSink>>;
}
