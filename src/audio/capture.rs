//! Microphone capture thread.
//!
//! Runs on a dedicated OS thread so blocking device reads never stall the
//! async network side. Samples are accumulated into fixed-size frames,
//! encoded as PCM16 and handed to a non-blocking frame sink. A failed read
//! ends the thread and is reported as a device fault.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::backend::{AudioSource, FaultSender};
use super::pcm::encode_pcm16;
use crate::error::{SessionError, SessionResult};

/// Receives one encoded frame. Must not block.
pub type FrameSink = Box<dyn FnMut(Vec<u8>) + Send>;

pub struct CapturePipeline {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn AudioSource>>>,
}

impl CapturePipeline {
    /// Start streaming `source` in frames of `frame_samples` samples.
    pub fn start(
        source: Box<dyn AudioSource>,
        frame_samples: usize,
        sink: FrameSink,
        faults: FaultSender,
    ) -> SessionResult<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("audio-record".into())
                .spawn(move || record_loop(source, frame_samples, sink, &running, &faults))
                .map_err(|e| SessionError::AudioDevice(format!("spawn capture thread: {}", e)))?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the thread and hand the microphone back so the caller decides
    /// when it is released. Samples short of a full frame are discarded.
    pub fn stop(mut self) -> Option<Box<dyn AudioSource>> {
        self.running.store(false, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(source) => Some(source),
            Err(_) => {
                log::error!("Recording thread panicked");
                None
            }
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn record_loop(
    mut source: Box<dyn AudioSource>,
    frame_samples: usize,
    mut sink: FrameSink,
    running: &AtomicBool,
    faults: &FaultSender,
) -> Box<dyn AudioSource> {
    let mut read_buf = vec![0i16; frame_samples];
    let mut accum_buf: Vec<i16> = Vec::with_capacity(frame_samples * 2);

    log::info!(
        "Recording started: rate={}, frame_samples={}",
        source.sample_rate(),
        frame_samples
    );

    while running.load(Ordering::Relaxed) {
        let n = match source.read(&mut read_buf) {
            Ok(n) => n,
            Err(e) => {
                log::error!("Microphone read failed: {:#}", e);
                let _ = faults.send(SessionError::AudioDevice(format!("microphone: {:#}", e)));
                break;
            }
        };
        accum_buf.extend_from_slice(&read_buf[..n]);

        while accum_buf.len() >= frame_samples && running.load(Ordering::Relaxed) {
            sink(encode_pcm16(&accum_buf[..frame_samples]));
            accum_buf.drain(..frame_samples);
        }
    }

    if !accum_buf.is_empty() {
        log::debug!("Discarding {} samples of a partial frame", accum_buf.len());
    }
    log::info!("Recording stopped");
    source
}
