//! Newline framing for chunked response bodies
//!
//! Chunks from the network do not line up with frames; the framer buffers
//! bytes until a `\n` arrives and hands out whole lines with the trailing
//! `\r` removed.

use bytes::{Buf, BytesMut};

/// Splits a byte stream into `\n`-terminated frames
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the connection
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let line = self.buf.split_to(pos);
        self.buf.advance(1);
        Some(to_frame(&line))
    }

    /// Take whatever is left once the connection has ended
    ///
    /// Returns `None` when nothing but whitespace remains.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        let frame = to_frame(&rest);
        if frame.trim().is_empty() {
            None
        } else {
            Some(frame)
        }
    }

    /// Bytes buffered without a terminating newline
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn to_frame(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
