//! Queue processor
//!
//! One task executes units of work strictly one at a time. Successful
//! dispatches are spaced by `rate`; throttled attempts are put back behind any
//! waiting work and the processor pauses for `delay`.

use super::types::{Completed, QueueConfig, QueueExit, QueueReport, UnitOfWork};
use crate::decode::{decode_envelope, Envelope};
use crate::error::{ApiError, Error, Result};
use crate::http::Transport;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Submission side of a queue
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<UnitOfWork>,
}

impl QueueSender {
    /// Submit one unit, waiting while the inbound channel is full
    pub async fn enqueue(&self, work: UnitOfWork) -> Result<()> {
        self.tx.send(work).await.map_err(|_| Error::QueueClosed)
    }

    /// Submit one unit without waiting
    pub fn try_enqueue(&self, work: UnitOfWork) -> Result<()> {
        self.tx.try_send(work).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Other("request queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }

    /// True once the processor has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side of a queue
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<Completed>,
}

impl QueueReceiver {
    /// Next completed unit, `None` once the processor has stopped
    pub async fn recv(&mut self) -> Option<Completed> {
        self.rx.recv().await
    }

    pub fn into_inner(self) -> mpsc::Receiver<Completed> {
        self.rx
    }
}

/// Rate-limited, retrying, serial executor of units of work
///
/// Single use: [`run`](Self::run) consumes the queue, and both channels
/// close when it returns.
pub struct RequestQueue {
    transport: Arc<dyn Transport>,
    config: QueueConfig,
    inbound: mpsc::Receiver<UnitOfWork>,
    outbound: mpsc::Sender<Completed>,
    retries: VecDeque<(UnitOfWork, u32)>,
}

impl RequestQueue {
    /// Create a queue and its two channel ends
    pub fn new(
        transport: Arc<dyn Transport>,
        config: QueueConfig,
    ) -> (QueueSender, RequestQueue, QueueReceiver) {
        let buffer = config.buffer.max(1);
        let (in_tx, in_rx) = mpsc::channel(buffer);
        let (out_tx, out_rx) = mpsc::channel(buffer);

        let queue = RequestQueue {
            transport,
            config,
            inbound: in_rx,
            outbound: out_tx,
            retries: VecDeque::new(),
        };

        (QueueSender { tx: in_tx }, queue, QueueReceiver { rx: out_rx })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Run the processor on its own task
    pub fn spawn(self) -> JoinHandle<QueueReport> {
        tokio::spawn(self.run())
    }

    /// Process units until a terminal error, until every sender is gone and
    /// no work is pending, or until the outbound receiver is dropped
    pub async fn run(mut self) -> QueueReport {
        let mut report = QueueReport::default();

        let exit = loop {
            let Some((work, previous_attempts)) = self.next_work().await else {
                break QueueExit::Drained;
            };
            let attempts = previous_attempts + 1;
            report.dispatched += 1;

            match self.execute(&work).await {
                Ok(envelope) => {
                    report.succeeded += 1;
                    debug!(
                        "Dispatched {} {} ({} results)",
                        work.method(),
                        work.target(),
                        envelope.meta.result_count
                    );
                    let completed = Completed {
                        work,
                        outcome: Ok(envelope),
                        attempts,
                    };
                    if self.outbound.send(completed).await.is_err() {
                        break QueueExit::Abandoned;
                    }
                    tokio::time::sleep(self.config.rate).await;
                }
                Err(error) if self.config.should_retry(&error, attempts) => {
                    report.retried += 1;
                    warn!(
                        "Error {} ({}) on {}, attempt {}. Delaying request for {:?}",
                        error.code,
                        error.message,
                        work.target(),
                        attempts,
                        self.config.delay
                    );
                    self.retries.push_back((work, attempts));
                    tokio::time::sleep(self.config.delay).await;
                }
                Err(error) => {
                    warn!(
                        "Request {} failed after {} attempt(s): {}",
                        work.target(),
                        attempts,
                        error
                    );
                    let completed = Completed {
                        work,
                        outcome: Err(error.clone()),
                        attempts,
                    };
                    // The receiver may already be gone; the queue stops either way.
                    let _ = self.outbound.send(completed).await;
                    break QueueExit::Failed(error);
                }
            }
        };
        report.exit = exit;

        debug!(
            "Queue stopped: {:?} after {} dispatches",
            report.exit, report.dispatched
        );
        report
    }

    /// Next unit to dispatch: work already waiting on the inbound channel goes
    /// ahead of pending retries.
    async fn next_work(&mut self) -> Option<(UnitOfWork, u32)> {
        if let Ok(work) = self.inbound.try_recv() {
            return Some((work, 0));
        }
        if let Some(retry) = self.retries.pop_front() {
            return Some(retry);
        }
        self.inbound.recv().await.map(|work| (work, 0))
    }

    async fn execute(&self, work: &UnitOfWork) -> std::result::Result<Envelope, ApiError> {
        execute_unit(self.transport.as_ref(), work).await
    }
}

/// Execute one unit and classify any failure
async fn execute_unit(
    transport: &dyn Transport,
    work: &UnitOfWork,
) -> std::result::Result<Envelope, ApiError> {
    let request = work.to_request().map_err(|e| ApiError::from_error(&e))?;
    let response = transport
        .execute(&request)
        .await
        .map_err(|e| ApiError::from_error(&e))?;

    if !response.is_success() {
        return Err(ApiError::from_status(response.status, response.status_text));
    }

    decode_envelope(&response.body).map_err(|e| ApiError::decode(e.to_string()))
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("config", &self.config)
            .field("pending_retries", &self.retries.len())
            .finish_non_exhaustive()
    }
}
