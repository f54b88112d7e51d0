//! Streaming module
//!
//! Long-lived connections that deliver newline-delimited JSON frames.
//!
//! ```text
//!   StreamConnector ──body──▶ reader task ──LineFramer──▶ StreamEvent::decode
//!                                 ▲                             │
//!                          watch (stop)                  mpsc (events)
//!                                 │                             ▼
//!                                 └──────── StreamSession ◀─────┘
//! ```
//!
//! Blank frames are heartbeats and produce no event.

mod event;
mod reader;

pub use event::{MalformedFrames, StreamEvent};
pub use reader::{
    EventResult, StreamConfig, StreamExit, StreamReader, StreamSession, StreamSummary,
};

#[cfg(test)]
mod tests;
