//! Voice session lifecycle.
//!
//! `SessionController` owns at most one live session and every resource it
//! holds. User commands, transport events and device faults are applied one
//! at a time, in order, by [`spawn_session_actor`]'s loop.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::audio::{
    AudioBackend, AudioSource, CapturePipeline, FaultSender, FrameSink, PlaybackRenderer,
    PlaybackScheduler,
};
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::net_link::{Connector, SessionSetup, TransportEvent, TransportHandle};
use crate::quiz::{system_prompt, DriverScores};
use crate::status::{SessionStatus, StatusBoard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
    Error(SessionError),
}

impl SessionState {
    fn accepts_start(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Closed | SessionState::Error(_)
        )
    }
}

/// Something the controller has to react to while a session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Transport(TransportEvent),
    /// The microphone or speaker thread stopped on a device error.
    DeviceFault(SessionError),
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        SessionEvent::Transport(event)
    }
}

/// Resources of one conversation. Every field is taken exactly once during
/// teardown.
struct Session {
    id: Uuid,
    system_prompt: String,
    microphone: Option<Box<dyn AudioSource>>,
    capture: Option<CapturePipeline>,
    scheduler: PlaybackScheduler,
    renderer: Option<PlaybackRenderer>,
    transport: Option<TransportHandle>,
    fault_tx: FaultSender,
    faults: mpsc::UnboundedReceiver<SessionError>,
}

pub struct SessionController {
    config: Config,
    backend: Arc<dyn AudioBackend>,
    connector: Arc<dyn Connector>,
    state: SessionState,
    session: Option<Session>,
    status: Arc<StatusBoard>,
}

impl SessionController {
    pub fn new(
        config: Config,
        backend: Arc<dyn AudioBackend>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            backend,
            connector,
            state: SessionState::Idle,
            session: None,
            status: Arc::new(StatusBoard::new()),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> SessionStatus {
        self.status.current()
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.system_prompt.as_str())
    }

    /// Chunks scheduled but not yet played.
    pub fn in_flight(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |s| s.scheduler.in_flight())
    }

    /// Open the devices and start connecting. The prompt is built from
    /// `scores` here and never changes for this session.
    pub async fn start(&mut self, scores: &DriverScores) -> SessionResult<()> {
        if !self.state.accepts_start() {
            log::warn!("Start refused, session is {:?}", self.state);
            return Err(SessionError::AlreadyActive);
        }

        let (fault_tx, faults) = mpsc::unbounded_channel();
        let mut session = Session {
            id: Uuid::new_v4(),
            system_prompt: system_prompt(scores),
            microphone: None,
            capture: None,
            scheduler: PlaybackScheduler::new(
                self.config.playback_sample_rate,
                self.status.clone(),
            ),
            renderer: None,
            transport: None,
            fault_tx,
            faults,
        };
        log::info!("Session {} connecting", session.id);
        self.state = SessionState::Connecting;
        self.status.set(SessionStatus::Connecting);

        let acquired = self.acquire(&mut session);
        self.session = Some(session);
        if let Err(e) = acquired {
            self.fail(e.clone()).await;
            return Err(e);
        }
        Ok(())
    }

    fn acquire(&self, session: &mut Session) -> SessionResult<()> {
        session.microphone = Some(self.backend.open_input()?);

        let sink = self.backend.open_output()?;
        session.renderer = Some(session.scheduler.start_renderer(
            sink,
            self.config.playback_period_size,
            session.fault_tx.clone(),
        )?);

        session.transport = Some(self.connector.connect(SessionSetup {
            model: self.config.model.to_string(),
            voice: self.config.voice.to_string(),
            system_prompt: session.system_prompt.clone(),
            input_sample_rate: self.config.capture_sample_rate,
        }));
        Ok(())
    }

    /// Wait for the next transport event or device fault. Never resolves
    /// while no session is open.
    pub async fn next_event(&mut self) -> SessionEvent {
        let Some(session) = self.session.as_mut() else {
            return std::future::pending().await;
        };
        let Session {
            transport, faults, ..
        } = session;

        match transport {
            Some(transport) => tokio::select! {
                Some(err) = faults.recv() => SessionEvent::DeviceFault(err),
                event = transport.next_event() => {
                    SessionEvent::Transport(event.unwrap_or(TransportEvent::Closed))
                }
            },
            None => match faults.recv().await {
                Some(err) => SessionEvent::DeviceFault(err),
                None => std::future::pending().await,
            },
        }
    }

    pub async fn handle_event(&mut self, event: impl Into<SessionEvent>) {
        match event.into() {
            SessionEvent::Transport(event) => self.handle_transport(event).await,
            SessionEvent::DeviceFault(err) => match self.state {
                SessionState::Connecting | SessionState::Active => self.fail(err).await,
                _ => log::debug!("Ignoring device fault in {:?}: {}", self.state, err),
            },
        }
    }

    async fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.state != SessionState::Connecting {
                    log::debug!("Ignoring open in {:?}", self.state);
                    return;
                }
                if let Err(e) = self.begin_capture() {
                    self.fail(e).await;
                    return;
                }
                self.state = SessionState::Active;
                self.status.set(SessionStatus::Listening);
                log::info!("Session active, streaming microphone");
            }
            TransportEvent::AudioChunk(payload) => {
                if self.state != SessionState::Active {
                    return;
                }
                if let Some(session) = &self.session {
                    session.scheduler.enqueue(&payload);
                }
            }
            TransportEvent::Interrupted => {
                if self.state != SessionState::Active {
                    return;
                }
                if let Some(session) = &self.session {
                    session.scheduler.interrupt();
                }
            }
            TransportEvent::Closed => match self.state {
                SessionState::Active => {
                    log::info!("Remote closed the session");
                    self.state = SessionState::Closing;
                    self.teardown().await;
                    self.state = SessionState::Closed;
                    self.status.set(SessionStatus::NotStarted);
                }
                SessionState::Connecting => {
                    self.fail(SessionError::Connection("closed by remote".to_string()))
                        .await;
                }
                _ => {}
            },
            TransportEvent::Error(reason) => {
                let err = match self.state {
                    SessionState::Connecting => SessionError::Connection(reason),
                    SessionState::Active => SessionError::Remote(reason),
                    _ => {
                        log::debug!("Ignoring transport error in {:?}: {}", self.state, reason);
                        return;
                    }
                };
                self.fail(err).await;
            }
        }
    }

    fn begin_capture(&mut self) -> SessionResult<()> {
        let frame_samples = self.config.capture_frame_samples;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SessionError::AudioDevice("no session".to_string()))?;

        let microphone = session
            .microphone
            .take()
            .ok_or_else(|| SessionError::AudioDevice("microphone not open".to_string()))?;
        let sender = session
            .transport
            .as_ref()
            .map(|t| t.sender())
            .ok_or_else(|| SessionError::Connection("transport not open".to_string()))?;

        let sink: FrameSink = Box::new(move |frame| {
            sender.send(frame);
        });
        session.capture = Some(CapturePipeline::start(
            microphone,
            frame_samples,
            sink,
            session.fault_tx.clone(),
        )?);
        Ok(())
    }

    /// End the session. Safe to call in any state and any number of times;
    /// when it returns the microphone is released.
    pub async fn stop(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::Active => {
                log::info!("Stopping session");
                self.state = SessionState::Closing;
                self.teardown().await;
                self.state = SessionState::Closed;
                self.status.set(SessionStatus::NotStarted);
            }
            _ => log::debug!("Stop ignored in {:?}", self.state),
        }
    }

    async fn fail(&mut self, err: SessionError) {
        log::error!("Session failed: {}", err);
        self.teardown().await;
        self.status.set(SessionStatus::Error(err.user_message()));
        self.state = SessionState::Error(err);
    }

    /// Release in a fixed order: frame production, microphone, scheduled
    /// playback, playback device, connection.
    async fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        // Joining the device threads waits out at most one blocking read or
        // write, which must not happen on a runtime worker.
        if let Some(capture) = session.capture.take() {
            match tokio::task::spawn_blocking(move || capture.stop()).await {
                Ok(Some(microphone)) => session.microphone = Some(microphone),
                Ok(None) => {}
                Err(e) => log::error!("Capture shutdown failed: {}", e),
            }
        }

        if let Some(microphone) = session.microphone.take() {
            drop(microphone);
        }

        let cancelled = session.scheduler.stop_all();
        if cancelled > 0 {
            log::info!("Dropped {} scheduled chunk(s)", cancelled);
        }

        if let Some(renderer) = session.renderer.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || drop(renderer.close())).await {
                log::error!("Playback shutdown failed: {}", e);
            }
        }

        if let Some(mut transport) = session.transport.take() {
            transport.close().await;
        }

        log::info!("Session {} released", session.id);
    }
}

// ======================== Actor ========================

pub enum ControlCommand {
    Start {
        scores: DriverScores,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front end to a controller running in its own task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<ControlCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub async fn start(&self, scores: DriverScores) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlCommand::Start { scores, reply })
            .await
            .map_err(|_| actor_gone())?;
        rx.await.map_err(|_| actor_gone())?
    }

    pub async fn stop(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ControlCommand::Stop { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }
}

fn actor_gone() -> SessionError {
    SessionError::Remote("session controller stopped".to_string())
}

/// Run `controller` in a task that serializes commands and transport events.
/// The task stops the session and exits once every handle is dropped.
pub fn spawn_session_actor(controller: SessionController) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(8);
    let status = controller.status();
    let task = tokio::spawn(run_actor(controller, rx));
    (SessionHandle { tx, status }, task)
}

async fn run_actor(mut controller: SessionController, mut rx: mpsc::Receiver<ControlCommand>) {
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(ControlCommand::Start { scores, reply }) => {
                    let result = controller.start(&scores).await;
                    let _ = reply.send(result);
                }
                Some(ControlCommand::Stop { reply }) => {
                    controller.stop().await;
                    let _ = reply.send(());
                }
                None => {
                    controller.stop().await;
                    break;
                }
            },
            event = controller.next_event() => controller.handle_event(event).await,
        }
    }
    log::info!("Session actor stopped");
}
