// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoded reply from the collector.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::HecError;

/// Collector reply. `code` is the collector status (0 = success) and is
/// independent from `transport_status`, the HTTP status of the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Response {
    pub text: Option<String>,
    pub code: i32,
    #[serde(rename = "invalid-event-number")]
    pub invalid_event_number: i32,
    #[serde(skip)]
    pub transport_status: StatusCode,
}

impl Response {
    /// Decodes a collector body. An empty body is a valid, all-default reply.
    pub(crate) fn decode(status: StatusCode, body: &[u8]) -> Result<Self, HecError> {
        let mut response = if body.is_empty() {
            Response::default()
        } else {
            serde_json::from_slice::<Response>(body)?
        };
        response.transport_status = status;
        Ok(response)
    }

    /// True when both the HTTP exchange and the collector report success.
    pub fn is_success(&self) -> bool {
        self.transport_status.is_success() && self.code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_success_body() {
        let response =
            Response::decode(StatusCode::OK, br#"{"text":"Success","code":0}"#).unwrap();
        assert_eq!(response.text.as_deref(), Some("Success"));
        assert_eq!(response.code, 0);
        assert_eq!(response.invalid_event_number, 0);
        assert_eq!(response.transport_status, StatusCode::OK);
        assert!(response.is_success());
    }

    #[test]
    fn decode_empty_body_sets_only_status() {
        let response = Response::decode(StatusCode::OK, b"").unwrap();
        assert_eq!(
            response,
            Response {
                transport_status: StatusCode::OK,
                ..Default::default()
            }
        );
        assert!(response.text.is_none());
    }

    #[test]
    fn decode_error_body_keeps_collector_code() {
        let response = Response::decode(
            StatusCode::BAD_REQUEST,
            br#"{"text":"Invalid data format","code":6,"invalid-event-number":0}"#,
        )
        .unwrap();
        assert_eq!(response.code, 6);
        assert_eq!(response.text.as_deref(), Some("Invalid data format"));
        assert_eq!(response.transport_status, StatusCode::BAD_REQUEST);
        assert!(!response.is_success());
    }

    #[test]
    fn decode_ignores_unknown_keys() {
        let response =
            Response::decode(StatusCode::OK, br#"{"ackId":7,"text":"Success"}"#).unwrap();
        assert_eq!(response.code, 0);
        assert_eq!(response.text.as_deref(), Some("Success"));
    }

    #[test]
    fn decode_rejects_malformed_body() {
        let err = Response::decode(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .expect_err("html is not json");
        assert!(matches!(err, HecError::Decode(_)));
    }
}
