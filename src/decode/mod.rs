//! Response decoder module
//!
//! Wire types for the paginated JSON envelope and the line framing used by
//! the streaming reader.
//!
//! # Overview
//!
//! Every paginated response shares one envelope shape:
//!
//! ```text
//! { "data": ..., "includes": {...}, "errors": [...],
//!   "meta": { "result_count": 2, "next_token": "...", "previous_token": "..." } }
//! ```
//!
//! The payload under `data` stays a [`serde_json::Value`]; callers pick the
//! concrete type with [`Envelope::data_as`].

mod decoders;
mod lines;
mod types;

pub use decoders::{decode_envelope, decode_json};
pub use lines::LineFramer;
pub use types::{Envelope, Includes, Meta};
