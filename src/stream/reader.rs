//! Stream reader
//!
//! Opens one long-lived connection and turns its newline-delimited frames
//! into [`StreamEvent`]s on a dedicated task.

use super::event::{MalformedFrames, StreamEvent};
use crate::decode::LineFramer;
use crate::error::{ApiError, Error, Result};
use crate::http::{ByteStream, StreamConnector};
use crate::queue::UnitOfWork;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Item published by a session
pub type EventResult = std::result::Result<StreamEvent, ApiError>;

/// Stream reader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Handling of frames that are not valid JSON
    pub malformed_frames: MalformedFrames,
    /// Capacity of the event channel
    pub buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            malformed_frames: MalformedFrames::Skip,
            buffer: 1,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub fn with_malformed_frames(mut self, policy: MalformedFrames) -> Self {
        self.malformed_frames = policy;
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

/// Why a session's reader task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamExit {
    /// The server ended the body
    #[default]
    ServerClosed,
    /// `stop()` was called or the session was dropped
    Stopped,
    /// Reading the body failed
    ReadError,
    /// A malformed frame ended the session
    Malformed,
    /// The event receiver went away
    ConsumerGone,
}

/// Counters of one finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub exit: StreamExit,
    /// Events published, errors included
    pub events: u64,
    pub heartbeats: u64,
    /// Malformed frames dropped under [`MalformedFrames::Skip`]
    pub skipped: u64,
}

// ============================================================================
// Reader
// ============================================================================

/// Starts streaming sessions over a [`StreamConnector`]
#[derive(Clone)]
pub struct StreamReader {
    connector: Arc<dyn StreamConnector>,
    config: StreamConfig,
}

impl StreamReader {
    pub fn new(connector: Arc<dyn StreamConnector>, config: StreamConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Connect to `url` with the given query parameters
    ///
    /// Fails without emitting anything when the connection or the handshake
    /// fails.
    pub async fn start<I, K, V>(
        &self,
        url: &str,
        params: I,
    ) -> std::result::Result<StreamSession, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.open(UnitOfWork::get(url).with_params(params)).await
    }

    /// Connect with a prepared unit of work
    pub async fn open(&self, work: UnitOfWork) -> std::result::Result<StreamSession, ApiError> {
        let request = work.to_request().map_err(|e| ApiError::from_error(&e))?;
        let body = self
            .connector
            .connect(&request)
            .await
            .map_err(|e| ApiError::from_error(&e))?;

        info!("Stream connected: {}", request.url);

        let (running_tx, running_rx) = watch::channel(true);
        let (events_tx, events_rx) = mpsc::channel(self.config.buffer.max(1));

        let read_loop = ReadLoop {
            body,
            framer: LineFramer::new(),
            events: events_tx,
            running: running_rx,
            policy: self.config.malformed_frames,
            summary: StreamSummary::default(),
        };

        Ok(StreamSession {
            events: events_rx,
            running: running_tx,
            task: Some(tokio::spawn(read_loop.run())),
        })
    }
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Read loop
// ============================================================================

/// Owns the body for the lifetime of a session
struct ReadLoop {
    body: ByteStream,
    framer: LineFramer,
    events: mpsc::Sender<EventResult>,
    running: watch::Receiver<bool>,
    policy: MalformedFrames,
    summary: StreamSummary,
}

impl ReadLoop {
    async fn run(mut self) -> StreamSummary {
        let exit = match self.read_all().await {
            Ok(()) => StreamExit::ServerClosed,
            Err(exit) => exit,
        };
        self.summary.exit = exit;

        info!(
            "Stream closed: {:?} after {} event(s)",
            exit, self.summary.events
        );
        // The body is dropped together with `self`.
        self.summary
    }

    async fn read_all(&mut self) -> std::result::Result<(), StreamExit> {
        loop {
            while let Some(frame) = self.framer.next_frame() {
                self.handle_frame(frame).await?;
            }

            if self.stopped() {
                return Err(StreamExit::Stopped);
            }

            let chunk = tokio::select! {
                biased;
                _ = self.running.changed() => return Err(StreamExit::Stopped),
                chunk = self.body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => self.framer.push(&bytes),
                Some(Err(e)) => {
                    warn!("Stream read failed: {}", e);
                    self.emit(Err(ApiError::from_error(&e))).await?;
                    return Err(StreamExit::ReadError);
                }
                None => {
                    if let Some(tail) = self.framer.finish() {
                        self.handle_frame(tail).await?;
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: String) -> std::result::Result<(), StreamExit> {
        if frame.trim().is_empty() {
            trace!("Stream heartbeat");
            self.summary.heartbeats += 1;
            return Ok(());
        }

        let event = match StreamEvent::decode(&frame) {
            Ok(event) => event,
            Err(e) => match self.policy {
                MalformedFrames::Skip => {
                    warn!("Skipping malformed stream frame: {}", e);
                    self.summary.skipped += 1;
                    return Ok(());
                }
                MalformedFrames::Surface => StreamEvent::Malformed {
                    raw: frame,
                    reason: e.to_string(),
                },
                MalformedFrames::Terminate => {
                    self.emit(Err(ApiError::decode(e.to_string()))).await?;
                    return Err(StreamExit::Malformed);
                }
            },
        };

        debug!("Stream event: {}", event.kind());
        self.emit(Ok(event)).await
    }

    async fn emit(&mut self, item: EventResult) -> std::result::Result<(), StreamExit> {
        if self.stopped() {
            return Err(StreamExit::Stopped);
        }

        tokio::select! {
            biased;
            _ = self.running.changed() => Err(StreamExit::Stopped),
            sent = self.events.send(item) => {
                sent.map_err(|_| StreamExit::ConsumerGone)?;
                self.summary.events += 1;
                Ok(())
            }
        }
    }

    fn stopped(&self) -> bool {
        !*self.running.borrow()
    }
}

// ============================================================================
// Session
// ============================================================================

/// A running stream: a single-consumer sequence of events plus `stop()`
///
/// The sequence ends when the server closes the body, after a read error
/// (published once as `Err`), or after [`stop`](Self::stop). A session
/// cannot be restarted; dropping it stops the reader.
pub struct StreamSession {
    events: mpsc::Receiver<EventResult>,
    running: watch::Sender<bool>,
    task: Option<JoinHandle<StreamSummary>>,
}

impl StreamSession {
    /// Next event, `None` once the session has closed
    pub async fn next_event(&mut self) -> Option<EventResult> {
        if self.is_stopped() {
            return None;
        }
        self.events.recv().await
    }

    /// Ask the reader to stop; idempotent
    ///
    /// The event sequence is closed immediately and the connection is
    /// released by the reader task.
    pub fn stop(&mut self) {
        if !self.is_stopped() {
            debug!("Stopping stream session");
        }
        self.running.send_replace(false);
        self.events.close();
    }

    /// True while the reader task is still consuming the connection
    pub fn is_running(&self) -> bool {
        !self.is_stopped() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop and wait for the reader task to release the connection
    pub async fn shutdown(mut self) -> Result<StreamSummary> {
        self.stop();
        match self.task.take() {
            Some(handle) => handle
                .await
                .map_err(|e| Error::Other(format!("stream task failed: {e}"))),
            None => Ok(StreamSummary::default()),
        }
    }

    fn is_stopped(&self) -> bool {
        !*self.running.borrow()
    }
}

impl Stream for StreamSession {
    type Item = EventResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_stopped() {
            return Poll::Ready(None);
        }
        self.events.poll_recv(cx)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.running.send_replace(false);
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
