//! Gapless playback of synthesized speech.
//!
//! [`PlaybackScheduler`] places decoded chunks on a shared [`Timeline`];
//! [`PlaybackRenderer`] drains that timeline into the speaker on the
//! "audio-play" thread, one period at a time. Interrupting clears the
//! timeline; the renderer notices at its next period and makes the device
//! drop whatever it still had queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use super::backend::{AudioSink, FaultSender};
use super::pcm::decode_pcm16;
use super::timeline::{ScheduledChunk, Timeline};
use crate::error::{SessionError, SessionResult};
use crate::status::StatusBoard;

type SharedTimeline = Arc<Mutex<Timeline>>;

fn lock(timeline: &SharedTimeline) -> MutexGuard<'_, Timeline> {
    timeline.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct PlaybackScheduler {
    timeline: SharedTimeline,
    status: Arc<StatusBoard>,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32, status: Arc<StatusBoard>) -> Self {
        Self {
            timeline: Arc::new(Mutex::new(Timeline::new(sample_rate))),
            status,
        }
    }

    /// Decode a base64 PCM16 payload and queue it right after whatever is
    /// already scheduled. Undecodable payloads are dropped.
    pub fn enqueue(&self, payload: &str) -> Option<ScheduledChunk> {
        let samples = match decode_pcm16(payload) {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("Dropping audio chunk: {}", e);
                return None;
            }
        };
        if samples.is_empty() {
            return None;
        }

        let mut timeline = lock(&self.timeline);
        let chunk = timeline.schedule(samples);
        self.status.set_speaking(true);
        log::debug!(
            "Scheduled chunk {} at frame {} ({} frames)",
            chunk.id,
            chunk.start,
            chunk.frames
        );
        Some(chunk)
    }

    /// Silence everything scheduled, including the chunk currently playing.
    pub fn interrupt(&self) -> usize {
        let cancelled = self.stop_all();
        log::info!("Playback interrupted, {} chunk(s) cancelled", cancelled);
        cancelled
    }

    pub fn stop_all(&self) -> usize {
        let mut timeline = lock(&self.timeline);
        let cancelled = timeline.cancel_all();
        self.status.set_speaking(false);
        cancelled
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.timeline).in_flight()
    }

    /// Start rendering into `sink` on its own thread. A device failure stops
    /// the thread and is reported on `faults`.
    pub fn start_renderer(
        &self,
        sink: Box<dyn AudioSink>,
        period_size: usize,
        faults: FaultSender,
    ) -> SessionResult<PlaybackRenderer> {
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = running.clone();
            let scheduler = self.clone();
            thread::Builder::new()
                .name("audio-play".into())
                .spawn(move || play_loop(scheduler, sink, period_size, &running, &faults))
                .map_err(|e| SessionError::AudioDevice(format!("spawn playback thread: {}", e)))?
        };

        Ok(PlaybackRenderer {
            running,
            handle: Some(handle),
        })
    }
}

fn play_loop(
    scheduler: PlaybackScheduler,
    mut sink: Box<dyn AudioSink>,
    period_size: usize,
    running: &AtomicBool,
    faults: &FaultSender,
) -> Box<dyn AudioSink> {
    let channels = sink.channels().max(1) as usize;
    let mut mono = vec![0i16; period_size];
    let mut interleaved = vec![0i16; period_size * channels];

    log::info!(
        "Playback started: rate={}, ch={}, period={}",
        sink.sample_rate(),
        channels,
        period_size
    );

    let mut generation = lock(&scheduler.timeline).generation();

    while running.load(Ordering::Relaxed) {
        let cancelled = {
            let mut timeline = lock(&scheduler.timeline);
            let cancelled = timeline.generation() != generation;
            generation = timeline.generation();
            let outcome = timeline.render(&mut mono);
            if outcome.drained {
                scheduler.status.set_speaking(false);
            }
            cancelled
        };

        // Speech already queued in the device belongs to cancelled chunks.
        let discarded = if cancelled { sink.discard() } else { Ok(()) };
        let result =
            discarded.and_then(|()| write_period(&mut *sink, &mono, &mut interleaved, channels));
        if let Err(e) = result {
            log::error!("Playback write failed: {:#}", e);
            let _ = faults.send(SessionError::AudioDevice(format!("speaker: {:#}", e)));
            break;
        }
    }

    log::info!("Playback stopped");
    sink
}

fn write_period(
    sink: &mut dyn AudioSink,
    mono: &[i16],
    interleaved: &mut [i16],
    channels: usize,
) -> anyhow::Result<()> {
    for (i, &sample) in mono.iter().enumerate() {
        interleaved[i * channels..(i + 1) * channels].fill(sample);
    }
    sink.write(interleaved)
}

pub struct PlaybackRenderer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn AudioSink>>>,
}

impl PlaybackRenderer {
    /// Stop rendering and return the speaker so the caller controls when it
    /// is closed.
    pub fn close(mut self) -> Option<Box<dyn AudioSink>> {
        self.running.store(false, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                log::error!("Playback thread panicked");
                None
            }
        }
    }
}

impl Drop for PlaybackRenderer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
