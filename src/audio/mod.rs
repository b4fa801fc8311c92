//! audio - Microphone capture, speech playback, and device access
//!
//! Uses ALSA for audio I/O. Capture and playback each run on a dedicated
//! std::thread; the async side only talks to them through channels and the
//! shared playback timeline.

mod alsa_device;
mod backend;
mod capture;
pub mod pcm;
mod playback;
pub mod timeline;

pub use alsa_device::AlsaBackend;
pub use backend::{AudioBackend, AudioConfig, AudioSink, AudioSource, FaultSender};
pub use capture::{CapturePipeline, FrameSink};
pub use playback::{PlaybackRenderer, PlaybackScheduler};
pub use timeline::{ChunkId, RenderOutcome, ScheduledChunk, Timeline};
