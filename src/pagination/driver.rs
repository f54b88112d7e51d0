//! Pagination driver
//!
//! Walks a cursor-paginated endpoint through a dedicated request queue and
//! hands pages to the caller in order.

use super::strategies::CursorPaginator;
use super::types::{NextPage, PaginationPolicy, PaginationState, StopReason};
use crate::decode::Envelope;
use crate::error::{ApiError, Error, Result};
use crate::http::Transport;
use crate::queue::{QueueConfig, QueueReceiver, QueueSender, RequestQueue, UnitOfWork};
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Drives a unit of work page by page
#[derive(Clone)]
pub struct PaginationDriver {
    transport: Arc<dyn Transport>,
    queue: QueueConfig,
    policy: PaginationPolicy,
}

impl PaginationDriver {
    pub fn new(transport: Arc<dyn Transport>, queue: QueueConfig, policy: PaginationPolicy) -> Self {
        Self {
            transport,
            queue,
            policy,
        }
    }

    pub fn policy(&self) -> &PaginationPolicy {
        &self.policy
    }

    pub fn queue_config(&self) -> &QueueConfig {
        &self.queue
    }

    /// Start walking pages from `work`
    ///
    /// Spawns one queue processor and one relay task; both stop once the
    /// returned stream is exhausted or dropped.
    pub fn paginate(&self, work: UnitOfWork) -> PageStream {
        let (sender, queue, receiver) =
            RequestQueue::new(Arc::clone(&self.transport), self.queue.clone());
        let (data_tx, data_rx) = mpsc::channel(self.queue.buffer.max(1));
        let (error_tx, error_rx) = mpsc::channel(1);

        queue.spawn();

        let relay = Relay {
            template: work,
            paginator: CursorPaginator::new(self.policy.clone()),
            sender,
            receiver,
            data: data_tx,
            errors: error_tx,
        };

        PageStream {
            data: Some(data_rx),
            errors: Some(error_rx),
            relay: Some(tokio::spawn(relay.run())),
        }
    }

    /// Continue a walk from a cursor returned by an earlier page
    pub fn resume(&self, work: UnitOfWork, token: impl Into<String>) -> PageStream {
        self.paginate(work.with_query(self.policy.token_param.clone(), token))
    }
}

impl std::fmt::Debug for PaginationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationDriver")
            .field("queue", &self.queue)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Moves pages from the queue to the caller and feeds continuation units back
struct Relay {
    template: UnitOfWork,
    paginator: CursorPaginator,
    sender: QueueSender,
    receiver: QueueReceiver,
    data: mpsc::Sender<Envelope>,
    errors: mpsc::Sender<ApiError>,
}

impl Relay {
    async fn run(mut self) -> PaginationState {
        let token_param = self.paginator.policy.token_param.clone();
        let mut state = match self.template.query(&token_param) {
            Some(token) => PaginationState::with_cursor(token),
            None => PaginationState::new(),
        };

        if let Err(e) = self.sender.enqueue(self.template.clone()).await {
            let _ = self.errors.send(ApiError::from_error(&e)).await;
            state.mark_done(StopReason::Failed);
            return state;
        }

        while let Some(completed) = self.receiver.recv().await {
            let envelope = match completed.outcome {
                Ok(envelope) => envelope,
                Err(error) => {
                    debug!("Pagination of {} failed: {}", self.template.target(), error);
                    // The consumer may be gone; nothing else to do with the error.
                    let _ = self.errors.send(error).await;
                    state.mark_done(StopReason::Failed);
                    break;
                }
            };

            let next = self.paginator.process_page(&envelope, &mut state);

            if self.data.send(envelope).await.is_err() {
                debug!("Page consumer dropped, stopping pagination");
                state.mark_done(StopReason::Cancelled);
                break;
            }

            match next {
                NextPage::Continue(token) => {
                    let work = self.template.clone().with_query(token_param.clone(), token);
                    if self.sender.enqueue(work).await.is_err() {
                        state.mark_done(StopReason::Cancelled);
                        break;
                    }
                }
                NextPage::Done(_) => break,
            }
        }

        info!(
            "Pagination of {} finished: {} page(s), {} result(s), {:?}",
            self.template.target(),
            state.pages,
            state.total_fetched,
            state.stop
        );
        // Dropping the sender lets the queue processor drain and exit.
        state
    }
}

// ============================================================================
// Page stream
// ============================================================================

/// Pages of one walk, plus at most one terminal error
///
/// The data sequence closes when the walk ends for any reason. The error
/// sequence carries at most one error and is closed afterwards.
pub struct PageStream {
    data: Option<mpsc::Receiver<Envelope>>,
    errors: Option<mpsc::Receiver<ApiError>>,
    relay: Option<JoinHandle<PaginationState>>,
}

impl PageStream {
    /// Next page, `None` once the walk has ended
    pub async fn next_page(&mut self) -> Option<Envelope> {
        match self.data.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// The terminal error, if any
    ///
    /// Resolves once the walk has ended; call it after the pages are drained,
    /// otherwise the walk may still be waiting for room on the data channel.
    pub async fn next_error(&mut self) -> Option<ApiError> {
        match self.errors.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Split into the raw data and error channels
    pub fn into_parts(mut self) -> (mpsc::Receiver<Envelope>, mpsc::Receiver<ApiError>) {
        let (_, data) = mpsc::channel(1);
        let (_, errors) = mpsc::channel(1);
        (
            self.data.take().unwrap_or(data),
            self.errors.take().unwrap_or(errors),
        )
    }

    /// Drain every page, failing on the terminal error
    pub async fn collect_all(mut self) -> std::result::Result<Vec<Envelope>, ApiError> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            pages.push(page);
        }
        match self.next_error().await {
            Some(error) => Err(error),
            None => Ok(pages),
        }
    }

    /// Wait for the walk to end and return its final state
    ///
    /// Undelivered pages are discarded.
    pub async fn finish(mut self) -> Result<PaginationState> {
        self.data = None;
        self.errors = None;
        match self.relay.take() {
            Some(handle) => handle
                .await
                .map_err(|e| Error::Other(format!("pagination task failed: {e}"))),
            None => Ok(PaginationState::default()),
        }
    }
}

impl Stream for PageStream {
    type Item = std::result::Result<Envelope, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(rx) = self.data.as_mut() {
            match rx.poll_recv(cx) {
                Poll::Ready(Some(page)) => return Poll::Ready(Some(Ok(page))),
                Poll::Ready(None) => self.data = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if let Some(rx) = self.errors.as_mut() {
            match rx.poll_recv(cx) {
                Poll::Ready(Some(error)) => {
                    self.errors = None;
                    return Poll::Ready(Some(Err(error)));
                }
                Poll::Ready(None) => self.errors = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        Poll::Ready(None)
    }
}

impl std::fmt::Debug for PageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStream")
            .field("data_open", &self.data.is_some())
            .field("errors_open", &self.errors.is_some())
            .finish()
    }
}
