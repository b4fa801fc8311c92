//! Bidirectional link to the live speech endpoint.
//!
//! One tokio task owns the websocket. The session talks to it through a
//! bounded command channel (audio frames, close) and reads an ordered event
//! channel back. Failures end the task with a single `Error` event; there is
//! no reconnect.

use std::time::Duration;

use anyhow::{anyhow, Context};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::config::Config;
use crate::protocol::{realtime_input, ServerEvent, ServerMessage, SetupMessage};

/// How long a closing I/O task may take to flush its close frame before it
/// is aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The endpoint accepted the setup.
    Opened,
    /// Base64 PCM16 speech.
    AudioChunk(String),
    Interrupted,
    /// Remote side closed an established session.
    Closed,
    Error(String),
}

#[derive(Debug)]
pub enum NetCommand {
    SendAudio(Vec<u8>),
    Close,
}

/// Everything the endpoint needs to configure one conversation.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub model: String,
    pub voice: String,
    pub system_prompt: String,
    pub input_sample_rate: u32,
}

pub trait Connector: Send + Sync {
    /// Start connecting. Never fails here: problems arrive as the first and
    /// only `Error` event on the returned handle.
    fn connect(&self, setup: SessionSetup) -> TransportHandle;
}

/// Cloneable, non-blocking sender for outbound audio frames.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<NetCommand>,
}

impl FrameSender {
    /// Queue a frame without waiting. Returns false if it was dropped.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        match self.tx.try_send(NetCommand::SendAudio(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Outbound queue full, dropping audio frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Transport gone, dropping audio frame");
                false
            }
        }
    }
}

pub struct TransportHandle {
    cmd_tx: mpsc::Sender<NetCommand>,
    events: mpsc::Receiver<TransportEvent>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl TransportHandle {
    pub fn new(
        cmd_tx: mpsc::Sender<NetCommand>,
        events: mpsc::Receiver<TransportEvent>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cmd_tx,
            events,
            task,
            closed: false,
        }
    }

    pub fn sender(&self) -> FrameSender {
        FrameSender {
            tx: self.cmd_tx.clone(),
        }
    }

    pub fn send(&self, frame: Vec<u8>) -> bool {
        self.sender().send(frame)
    }

    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the connection and wait a bounded time for the I/O task to
    /// finish; a task stuck on an unresponsive peer is aborted. Calling it
    /// again is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Unblock a task waiting on a full event queue before asking it to stop.
        self.events.close();
        if let Err(e) = self.cmd_tx.try_send(NetCommand::Close) {
            log::debug!("Close request not queued: {}", e);
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(CLOSE_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => log::error!("Transport task failed: {}", e),
                Err(_) => {
                    log::warn!("Transport task did not stop in time, aborting");
                    task.abort();
                }
            }
        }
        log::info!("Transport closed");
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ======================== WebSocket ========================

pub struct WsConnector {
    url: String,
    api_key: Option<String>,
    event_buffer: usize,
    frame_buffer: usize,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
            event_buffer: 256,
            frame_buffer: 32,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ws_url.clone(), config.api_key())
            .with_buffers(config.event_buffer, config.frame_buffer)
    }

    pub fn with_buffers(mut self, event_buffer: usize, frame_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self.frame_buffer = frame_buffer.max(1);
        self
    }
}

impl Connector for WsConnector {
    fn connect(&self, setup: SessionSetup) -> TransportHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.frame_buffer);
        let (event_tx, event_rx) = mpsc::channel(self.event_buffer);

        let link = NetLink {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            setup,
            event_tx,
            cmd_rx,
        };
        let task = tokio::spawn(link.run());

        TransportHandle::new(cmd_tx, event_rx, Some(task))
    }
}

struct NetLink {
    url: String,
    api_key: Option<String>,
    setup: SessionSetup,
    event_tx: mpsc::Sender<TransportEvent>,
    cmd_rx: mpsc::Receiver<NetCommand>,
}

impl NetLink {
    async fn run(mut self) {
        if let Err(e) = self.connect_and_loop().await {
            if self.event_tx.is_closed() {
                log::debug!("Transport stopped: {:#}", e);
                return;
            }
            log::error!("Transport error: {:#}", e);
            let _ = self.event_tx.send(TransportEvent::Error(format!("{:#}", e))).await;
        }
    }

    async fn emit(&self, event: TransportEvent) -> anyhow::Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| anyhow!("event receiver dropped"))
    }

    async fn connect_and_loop(&mut self) -> anyhow::Result<()> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("no API key configured"))?;

        let url = Url::parse(&self.url).context("Invalid endpoint URL")?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(anyhow!("endpoint URL has no host")),
        };

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(self.url.as_str())
            .header("Host", host)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .header("x-goog-api-key", api_key)
            .body(())?;

        log::info!("Connecting to {}...", url.host_str().unwrap_or_default());
        let ws_stream = tokio::select! {
            res = connect_async(request) => res.context("WebSocket handshake failed")?.0,
            _ = wait_for_close(&mut self.cmd_rx) => {
                log::info!("Connection attempt cancelled");
                return Ok(());
            }
        };
        log::info!("Connected, sending setup");

        let (mut write, mut read) = ws_stream.split();

        let setup = SetupMessage::new(
            &self.setup.model,
            &self.setup.voice,
            &self.setup.system_prompt,
        );
        write
            .send(Message::Text(serde_json::to_string(&setup)?.into()))
            .await
            .context("Failed to send setup")?;

        let mut opened = false;
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.dispatch(text.as_str(), &mut opened).await?;
                        }
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => self.dispatch(text, &mut opened).await?,
                            Err(_) => log::warn!("Dropping non-UTF-8 binary frame ({} bytes)", data.len()),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                                .unwrap_or_else(|| "no reason".to_string());
                            return self.remote_closed(opened, &reason).await;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                        None => return self.remote_closed(opened, "stream ended").await,
                    }
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(NetCommand::SendAudio(pcm)) => {
                            if !opened {
                                continue;
                            }
                            let msg = realtime_input(&pcm, self.setup.input_sample_rate);
                            write
                                .send(Message::Text(serde_json::to_string(&msg)?.into()))
                                .await
                                .context("Failed to send audio frame")?;
                        }
                        Some(NetCommand::Close) | None => {
                            log::info!("Closing connection");
                            let _ = write.send(Message::Close(None)).await;
                            let _ = write.close().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, raw: &str, opened: &mut bool) -> anyhow::Result<()> {
        let message = match ServerMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Dropping undecodable server message: {}", e);
                return Ok(());
            }
        };

        for event in message.into_events() {
            match event {
                ServerEvent::SetupComplete => {
                    if !*opened {
                        *opened = true;
                        log::info!("Session opened");
                        self.emit(TransportEvent::Opened).await?;
                    }
                }
                ServerEvent::Audio(data) => {
                    log::debug!("Audio chunk: {} base64 bytes", data.len());
                    self.emit(TransportEvent::AudioChunk(data)).await?;
                }
                ServerEvent::Interrupted => {
                    log::info!("Remote signalled interruption");
                    self.emit(TransportEvent::Interrupted).await?;
                }
                ServerEvent::TurnComplete => log::debug!("Turn complete"),
                ServerEvent::GoAway => log::warn!("Endpoint is about to close the session"),
            }
        }
        Ok(())
    }

    async fn remote_closed(&self, opened: bool, reason: &str) -> anyhow::Result<()> {
        if !opened {
            return Err(anyhow!("connection closed before setup completed: {}", reason));
        }
        log::info!("Server closed connection: {}", reason);
        self.emit(TransportEvent::Closed).await
    }
}

/// Resolves once a close is requested or every sender is gone. Frames
/// queued before the session opened are discarded.
async fn wait_for_close(cmd_rx: &mut mpsc::Receiver<NetCommand>) {
    loop {
        match cmd_rx.recv().await {
            Some(NetCommand::SendAudio(_)) => {}
            Some(NetCommand::Close) | None => return,
        }
    }
}
