// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A single HEC event and its routing metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HecError;

/// Structured event payload carried in the `event` key.
pub type Event = Map<String, Value>;

/// One line of an HEC batch.
///
/// Field order matters: it is the key order of the serialized JSON object.
/// `None` fields are omitted entirely, `Some("")` is kept as `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unix epoch milliseconds. Always serialized, `0` included.
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        rename = "sourcetype",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Document {
    /// Creates a document with the given event and no metadata.
    pub fn new(event: Event) -> Self {
        Self {
            event: Some(event),
            ..Default::default()
        }
    }

    /// Wraps any serializable value as the event payload.
    ///
    /// Fails when the value does not serialize into a JSON object.
    pub fn from_payload<T: Serialize + ?Sized>(payload: &T) -> Result<Self, HecError> {
        match serde_json::to_value(payload) {
            Ok(Value::Object(event)) => Ok(Self::new(event)),
            Ok(other) => Err(HecError::validation(
                "payload",
                format!("expected a JSON object, got {}", json_type_name(&other)),
            )),
            Err(err) => Err(HecError::validation("payload", err.to_string())),
        }
    }

    /// Compact single-line JSON representation used in the NDJSON batch.
    pub fn serialize(&self) -> String {
        // Only string keys and JSON values are involved, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
