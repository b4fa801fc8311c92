//! Fake devices and a scripted remote endpoint for driving the controller
//! without hardware or network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use antreiber_coach::audio::pcm::encode_pcm16;
use antreiber_coach::audio::{AudioBackend, AudioSink, AudioSource};
use antreiber_coach::net_link::{
    Connector, NetCommand, SessionSetup, TransportEvent, TransportHandle,
};
use antreiber_coach::{SessionController, SessionError, SessionResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::mpsc;

pub const PLAYBACK_RATE: u32 = 24_000;

#[derive(Default)]
pub struct DeviceLog {
    pub inputs_opened: AtomicUsize,
    pub inputs_released: AtomicUsize,
    pub outputs_opened: AtomicUsize,
    pub outputs_closed: AtomicUsize,
    pub discards: AtomicUsize,
    pub written: Mutex<Vec<i16>>,
}

impl DeviceLog {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<i16> {
        self.written.lock().unwrap().clone()
    }
}

/// How the fake devices should misbehave.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceSetup {
    pub deny_microphone: bool,
    /// Every microphone read fails.
    pub broken_microphone: bool,
    /// The speaker fails as soon as it is asked to play anything audible.
    pub broken_speaker: bool,
}

struct FakeMicrophone {
    log: Arc<DeviceLog>,
    broken: bool,
}

impl AudioSource for FakeMicrophone {
    fn sample_rate(&self) -> u32 {
        16_000
    }

    fn read(&mut self, buf: &mut [i16]) -> anyhow::Result<usize> {
        thread::sleep(Duration::from_millis(1));
        if self.broken {
            anyhow::bail!("capture device unplugged");
        }
        let n = buf.len().min(512);
        buf[..n].fill(100);
        Ok(n)
    }
}

impl Drop for FakeMicrophone {
    fn drop(&mut self) {
        self.log.inputs_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mono speaker that blocks for the real duration of what it is given.
struct FakeSpeaker {
    log: Arc<DeviceLog>,
    broken: bool,
}

impl AudioSink for FakeSpeaker {
    fn sample_rate(&self) -> u32 {
        PLAYBACK_RATE
    }

    fn channels(&self) -> u32 {
        1
    }

    fn write(&mut self, interleaved: &[i16]) -> anyhow::Result<()> {
        if self.broken && interleaved.iter().any(|&s| s != 0) {
            anyhow::bail!("playback device unplugged");
        }
        thread::sleep(Duration::from_secs_f64(
            interleaved.len() as f64 / PLAYBACK_RATE as f64,
        ));
        self.log.written.lock().unwrap().extend_from_slice(interleaved);
        Ok(())
    }

    fn discard(&mut self) -> anyhow::Result<()> {
        self.log.discards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for FakeSpeaker {
    fn drop(&mut self) {
        self.log.outputs_closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeBackend {
    pub log: Arc<DeviceLog>,
    pub setup: DeviceSetup,
}

impl AudioBackend for FakeBackend {
    fn open_input(&self) -> SessionResult<Box<dyn AudioSource>> {
        if self.setup.deny_microphone {
            return Err(SessionError::PermissionDenied("NotAllowedError".into()));
        }
        self.log.inputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMicrophone {
            log: self.log.clone(),
            broken: self.setup.broken_microphone,
        }))
    }

    fn open_output(&self) -> SessionResult<Box<dyn AudioSink>> {
        self.log.outputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSpeaker {
            log: self.log.clone(),
            broken: self.setup.broken_speaker,
        }))
    }
}

/// What the remote side saw on the command channel.
#[derive(Default)]
pub struct Traffic {
    pub frames: AtomicUsize,
    pub closes: AtomicUsize,
    pub setups: Mutex<Vec<SessionSetup>>,
}

/// Test-side end of one connection.
pub struct FakeRemote {
    events: mpsc::Sender<TransportEvent>,
}

impl FakeRemote {
    pub async fn emit(&self, event: TransportEvent) {
        self.events.send(event).await.unwrap();
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub connects: AtomicUsize,
    pub traffic: Arc<Traffic>,
    remotes: Mutex<VecDeque<FakeRemote>>,
}

impl FakeConnector {
    pub fn remote(&self) -> FakeRemote {
        self.remotes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no pending connection")
    }
}

impl Connector for FakeConnector {
    fn connect(&self, setup: SessionSetup) -> TransportHandle {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.traffic.setups.lock().unwrap().push(setup);

        let (cmd_tx, mut cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);

        let traffic = self.traffic.clone();
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    NetCommand::SendAudio(_) => traffic.frames.fetch_add(1, Ordering::SeqCst),
                    NetCommand::Close => traffic.closes.fetch_add(1, Ordering::SeqCst),
                };
            }
        });

        self.remotes
            .lock()
            .unwrap()
            .push_back(FakeRemote { events: event_tx });
        TransportHandle::new(cmd_tx, event_rx, None)
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub devices: Arc<DeviceLog>,
    pub connector: Arc<FakeConnector>,
}

pub fn harness(deny_microphone: bool) -> Harness {
    harness_with(DeviceSetup {
        deny_microphone,
        ..DeviceSetup::default()
    })
}

pub fn harness_with(setup: DeviceSetup) -> Harness {
    let devices = Arc::new(DeviceLog::default());
    let connector = Arc::new(FakeConnector::default());
    let backend = Arc::new(FakeBackend {
        log: devices.clone(),
        setup,
    });
    let config = antreiber_coach::Config::new().unwrap();
    let controller = SessionController::new(config, backend, connector.clone());
    Harness {
        controller,
        devices,
        connector,
    }
}

/// Apply the next transport event or device fault to the controller.
pub async fn pump(controller: &mut SessionController) {
    let event = tokio::time::timeout(Duration::from_secs(2), controller.next_event())
        .await
        .expect("no transport event");
    controller.handle_event(event).await;
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

/// Base64 PCM16 of `seconds` of a constant sample value at the playback rate.
pub fn speech(seconds: f64, value: i16) -> String {
    let samples = vec![value; (seconds * PLAYBACK_RATE as f64).round() as usize];
    BASE64.encode(encode_pcm16(&samples))
}
