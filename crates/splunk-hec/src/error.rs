// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every HEC operation.

/// Boxed error used for transport failures so that substitute transports can
/// report their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when building, overriding, sending or decoding HEC requests.
#[derive(Debug, thiserror::Error)]
pub enum HecError {
    /// Missing or invalid configuration value.
    #[error("invalid configuration for `{param}`: {message}")]
    Configuration {
        param: &'static str,
        message: String,
    },

    /// A caller-supplied argument was rejected before any network activity.
    #[error("invalid argument `{param}`: {message}")]
    Validation {
        param: &'static str,
        message: String,
    },

    /// The timestamp field could not be located or parsed for an event.
    #[error("timestamp field `{field}`: {message}")]
    FieldOverride { field: String, message: String },

    /// Connection, TLS or timeout failure while talking to the collector.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The collector answered with a non-empty body that is not valid JSON.
    #[error("failed to decode collector response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A before/after send hook rejected the call.
    #[error("send hook failed: {0}")]
    Hook(String),

    /// The runtime backing the blocking API could not be started.
    #[error("failed to start runtime for blocking call: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Discriminant of [`HecError`], handy for assertions and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    FieldOverride,
    Transport,
    Decode,
    Hook,
    Runtime,
}

impl HecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::FieldOverride { .. } => ErrorKind::FieldOverride,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Hook(_) => ErrorKind::Hook,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }

    pub(crate) fn configuration(param: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            param,
            message: message.into(),
        }
    }

    pub(crate) fn validation(param: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            param,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for HecError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HecError::configuration("endpoint", "missing");
        assert_eq!(
            error.to_string(),
            "invalid configuration for `endpoint`: missing"
        );

        let error = HecError::FieldOverride {
            field: "Timestamp".to_string(),
            message: "field is missing from event".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "timestamp field `Timestamp`: field is missing from event"
        );
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            HecError::validation("payload", "not an object").kind(),
            ErrorKind::Validation
        );
        assert_eq!(HecError::Hook("nope".into()).kind(), ErrorKind::Hook);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(HecError::Transport(Box::new(io)).kind(), ErrorKind::Transport);

        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(HecError::from(decode).kind(), ErrorKind::Decode);
    }
}
