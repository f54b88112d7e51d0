//! Scripted transports for unit tests

use crate::error::{Error, Result};
use crate::http::{ByteStream, HttpRequest, HttpResponse, StreamConnector, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Replays a fixed sequence of responses and records every request
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    calls: Mutex<Vec<(HttpRequest, Instant)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, status: u16, body: serde_json::Value) -> Self {
        let text = reason(status);
        self.push(Ok(HttpResponse::new(status, text, body.to_string())))
    }

    pub(crate) fn respond_raw(self, status: u16, body: &'static str) -> Self {
        self.push(Ok(HttpResponse::new(status, reason(status), body)))
    }

    pub(crate) fn fail(self, error: Error) -> Self {
        self.push(Err(error))
    }

    fn push(self, response: Result<HttpResponse>) -> Self {
        self.responses
            .lock()
            .expect("script lock")
            .push_back(response);
        self
    }

    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn calls(&self) -> Vec<(HttpRequest, Instant)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(req, _)| req.url).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((request.clone(), Instant::now()));
        self.responses
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".to_string())))
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        420 => "Enhance Your Calm",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Body stream that counts how often it is dropped
pub(crate) struct TrackedBody {
    inner: ByteStream,
    drops: Arc<AtomicUsize>,
}

impl TrackedBody {
    pub(crate) fn new(inner: ByteStream, drops: Arc<AtomicUsize>) -> Self {
        Self { inner, drops }
    }
}

impl Stream for TrackedBody {
    type Item = Result<Bytes>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one prepared body, or fails the handshake
pub(crate) struct ScriptedConnector {
    body: Mutex<Option<Result<ByteStream>>>,
    pub(crate) drops: Arc<AtomicUsize>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedConnector {
    /// Serve the given chunks, then end the body
    pub(crate) fn chunks(chunks: Vec<&'static str>) -> Self {
        let items: Vec<Result<Bytes>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Self::with_body(Box::pin(futures::stream::iter(items)))
    }

    pub(crate) fn with_body(body: ByteStream) -> Self {
        let drops = Arc::new(AtomicUsize::new(0));
        let tracked: ByteStream = Box::pin(TrackedBody::new(body, Arc::clone(&drops)));
        Self {
            body: Mutex::new(Some(Ok(tracked))),
            drops,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn refuse(error: Error) -> Self {
        Self {
            body: Mutex::new(Some(Err(error))),
            drops: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, request: &HttpRequest) -> Result<ByteStream> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.body
            .lock()
            .expect("body lock")
            .take()
            .unwrap_or_else(|| Err(Error::Other("connection already used".to_string())))
    }
}
