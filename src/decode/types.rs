//! Envelope types
//!
//! The decoded top-level response of a paginated endpoint.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Pagination block of a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Number of entities in this page
    #[serde(default)]
    pub result_count: u64,
    /// Cursor for the next page, present only while more pages exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    /// Cursor for the previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_token: Option<String>,
    /// Newest entity id in this page (search endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<String>,
    /// Oldest entity id in this page (search endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
}

impl Meta {
    /// The continuation cursor, treating an empty string as absent
    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The backwards cursor, treating an empty string as absent
    pub fn previous_token(&self) -> Option<&str> {
        self.previous_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Side-table of expanded objects referenced from `data`
///
/// Kept schema-agnostic: each key (`users`, `tweets`, `media`, ...) maps to a
/// list of objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Includes(pub JsonObject);

impl Includes {
    /// Objects of one expansion table (empty when missing)
    pub fn table(&self, name: &str) -> &[JsonValue] {
        match self.0.get(name) {
            Some(JsonValue::Array(items)) => items,
            _ => &[],
        }
    }

    /// Expanded users
    pub fn users(&self) -> &[JsonValue] {
        self.table("users")
    }

    /// Expanded tweets
    pub fn tweets(&self) -> &[JsonValue] {
        self.table("tweets")
    }

    /// Names of the tables present
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decoded response envelope for one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Page payload: a list of entities or a single entity
    #[serde(default)]
    pub data: JsonValue,
    /// Expanded objects
    #[serde(default)]
    pub includes: Includes,
    /// Partial errors reported alongside the data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonValue>,
    /// Pagination metadata
    #[serde(default)]
    pub meta: Meta,
}

impl Envelope {
    /// The continuation cursor of this page
    pub fn next_token(&self) -> Option<&str> {
        self.meta.next_token()
    }

    /// True when the server advertised another page
    pub fn has_more(&self) -> bool {
        self.next_token().is_some()
    }

    /// Entities in this page, whether `data` is a list or a single object
    pub fn records(&self) -> Vec<&JsonValue> {
        match &self.data {
            JsonValue::Array(items) => items.iter().collect(),
            JsonValue::Null => Vec::new(),
            single => vec![single],
        }
    }

    /// Number of entities in this page
    pub fn record_count(&self) -> usize {
        match &self.data {
            JsonValue::Array(items) => items.len(),
            JsonValue::Null => 0,
            _ => 1,
        }
    }

    /// Deserialize the payload into a concrete type
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| Error::decode(format!("data does not match the requested type: {e}")))
    }
}
