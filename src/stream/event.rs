//! Stream events
//!
//! One event per non-empty frame of a newline-delimited JSON stream.

use crate::decode::Includes;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A decoded stream frame
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A payload frame (`{"data": ..., "includes": ..., "matching_rules": [...]}`)
    Data {
        data: JsonValue,
        includes: Includes,
        matching_rules: Vec<JsonValue>,
    },
    /// An error frame without payload (`{"errors": [...]}`)
    Errors(Vec<JsonValue>),
    /// Valid JSON of a shape this reader does not know
    Unrecognized(JsonValue),
    /// A frame that is not valid JSON, surfaced on request
    Malformed { raw: String, reason: String },
}

impl StreamEvent {
    /// Decode a frame, inspecting the top-level keys before anything else
    pub fn decode(frame: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: JsonValue = serde_json::from_str(frame)?;
        Ok(Self::from_value(value))
    }

    /// Classify an already parsed frame
    pub fn from_value(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) if map.contains_key("data") => Self::data_frame(map),
            JsonValue::Object(mut map) if map.contains_key("errors") => {
                match map.remove("errors") {
                    Some(JsonValue::Array(errors)) => Self::Errors(errors),
                    Some(other) => Self::Errors(vec![other]),
                    None => Self::Errors(Vec::new()),
                }
            }
            other => Self::Unrecognized(other),
        }
    }

    fn data_frame(mut map: JsonObject) -> Self {
        let data = map.remove("data").unwrap_or_default();
        let includes = map
            .remove("includes")
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let matching_rules = match map.remove("matching_rules") {
            Some(JsonValue::Array(rules)) => rules,
            _ => Vec::new(),
        };

        Self::Data {
            data,
            includes,
            matching_rules,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "data",
            Self::Errors(_) => "errors",
            Self::Unrecognized(_) => "unrecognized",
            Self::Malformed { .. } => "malformed",
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// The payload of a data frame
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            Self::Data { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Deserialize the payload of a data frame into `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data()
            .ok_or_else(|| Error::decode(format!("{} frame carries no data", self.kind())))?;
        Ok(serde_json::from_value(data.clone())?)
    }
}

/// What to do with a frame that is not valid JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedFrames {
    /// Log and drop the frame
    #[default]
    Skip,
    /// Emit [`StreamEvent::Malformed`]
    Surface,
    /// Emit one decode error and close the session
    Terminate,
}
