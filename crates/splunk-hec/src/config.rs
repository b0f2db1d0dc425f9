// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collector configuration.
//!
//! There are two ways to obtain a [`HecConfig`]:
//!
//! - plain struct construction, which performs no validation at all;
//! - [`HecConfig::from_figment`] (and the env/YAML loaders built on it), which
//!   requires `Endpoint`, `Token` and a non-blank `DefaultSourceType`.
//!
//! # Example source
//!
//! ```yaml
//! Endpoint: https://hec.example.com:8088/services/collector
//! Token: 00000000-0000-0000-0000-000000000000
//! DefaultSourceType: _json
//! DefaultIndex: main
//! UseTimestampField:
//!   FieldName: Timestamp
//!   Format: yyyy-MM-ddTHH:mm:ss.fffzzz
//! ```
//!
//! The same keys are accepted from `SPLUNK_HEC_*` environment variables in
//! snake case, with `__` separating nested keys
//! (`SPLUNK_HEC_USE_TIMESTAMP_FIELD__FIELD_NAME`).

use std::fmt;
use std::path::Path;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::HecError;

/// Prefix of the environment variables read by [`HecConfig::from_env`].
pub const ENV_PREFIX: &str = "SPLUNK_HEC_";

/// Derive the document time from a field of the event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampField {
    /// Name of the top-level event key holding the timestamp.
    pub field_name: String,
    /// .NET style custom date format, e.g. `yyyy-MM-ddTHH:mm:ss.fffzzz`.
    pub format: String,
}

/// Collector endpoint, credentials and per-document defaults.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HecConfig {
    /// Base URI of the collector; `/event` and `/health` are appended to it.
    pub endpoint: Option<Url>,
    /// Sent as `Authorization: Splunk <token>`.
    pub token: Option<String>,
    pub default_index: Option<String>,
    pub default_host: Option<String>,
    pub default_source: Option<String>,
    pub default_source_type: Option<String>,
    pub timestamp_field: Option<TimestampField>,
}

impl fmt::Debug for HecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HecConfig")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("default_index", &self.default_index)
            .field("default_host", &self.default_host)
            .field("default_source", &self.default_source)
            .field("default_source_type", &self.default_source_type)
            .field("timestamp_field", &self.timestamp_field)
            .finish()
    }
}

impl HecConfig {
    /// Builds a validated configuration from an external source.
    ///
    /// `Endpoint` must be present and absolute, `Token` must be present and
    /// `DefaultSourceType` must be present and non-blank. Other keys are optional.
    pub fn from_figment(figment: &Figment) -> Result<Self, HecError> {
        let source: SourceConfig = figment
            .extract()
            .map_err(|e| HecError::configuration("config", e.to_string()))?;

        let endpoint = source
            .endpoint
            .ok_or_else(|| HecError::configuration("endpoint", "Endpoint is required"))?;
        let token = source
            .token
            .ok_or_else(|| HecError::configuration("token", "Token is required"))?;
        let endpoint = parse_endpoint(&endpoint)?;
        let default_source_type = source
            .default_source_type
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                HecError::configuration(
                    "default_source_type",
                    "DefaultSourceType is required and cannot be blank",
                )
            })?;

        Ok(Self {
            endpoint: Some(endpoint),
            token: Some(token),
            default_index: source.default_index,
            default_host: source.default_host,
            default_source: source.default_source,
            default_source_type: Some(default_source_type),
            timestamp_field: source
                .use_timestamp_field
                .map(timestamp_rule)
                .transpose()?,
        })
    }

    /// Reads `SPLUNK_HEC_*` environment variables.
    pub fn from_env() -> Result<Self, HecError> {
        Self::from_figment(&Figment::new().merge(env_provider()))
    }

    /// Reads a YAML file, with `SPLUNK_HEC_*` environment variables taking precedence.
    pub fn from_yaml_and_env(path: impl AsRef<Path>) -> Result<Self, HecError> {
        Self::from_figment(
            &Figment::new()
                .merge(Yaml::file(path.as_ref()))
                .merge(env_provider()),
        )
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// A `UseTimestampField` section must name both the field and its format.
fn timestamp_rule(source: SourceTimestampField) -> Result<TimestampField, HecError> {
    let required = |value: Option<String>, key: &str| {
        value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
            HecError::configuration(
                "timestamp_field",
                format!("UseTimestampField.{key} is required and cannot be blank"),
            )
        })
    };
    Ok(TimestampField {
        field_name: required(source.field_name, "FieldName")?,
        format: required(source.format, "Format")?,
    })
}

fn parse_endpoint(value: &str) -> Result<Url, HecError> {
    let invalid = || {
        HecError::configuration(
            "endpoint",
            format!("Endpoint must be a valid absolute URI, got '{value}'"),
        )
    };
    let url = Url::parse(value.trim()).map_err(|_| invalid())?;
    if url.cannot_be_a_base() {
        return Err(invalid());
    }
    Ok(url)
}

/// Raw shape of the external source. Keys are PascalCase, snake_case aliases
/// let environment providers populate the same fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceConfig {
    #[serde(
        rename = "Endpoint",
        alias = "endpoint",
        deserialize_with = "deserialize_optional_string"
    )]
    endpoint: Option<String>,
    #[serde(
        rename = "Token",
        alias = "token",
        deserialize_with = "deserialize_optional_string"
    )]
    token: Option<String>,
    #[serde(
        rename = "DefaultIndex",
        alias = "default_index",
        deserialize_with = "deserialize_optional_string"
    )]
    default_index: Option<String>,
    #[serde(
        rename = "DefaultHost",
        alias = "default_host",
        deserialize_with = "deserialize_optional_string"
    )]
    default_host: Option<String>,
    #[serde(
        rename = "DefaultSource",
        alias = "default_source",
        deserialize_with = "deserialize_optional_string"
    )]
    default_source: Option<String>,
    #[serde(
        rename = "DefaultSourceType",
        alias = "default_source_type",
        deserialize_with = "deserialize_optional_string"
    )]
    default_source_type: Option<String>,
    #[serde(rename = "UseTimestampField", alias = "use_timestamp_field")]
    use_timestamp_field: Option<SourceTimestampField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceTimestampField {
    #[serde(
        rename = "FieldName",
        alias = "field_name",
        deserialize_with = "deserialize_optional_string"
    )]
    field_name: Option<String>,
    #[serde(
        rename = "Format",
        alias = "format",
        deserialize_with = "deserialize_optional_string"
    )]
    format: Option<String>,
}

/// Accepts strings as-is and stringifies numbers and booleans, since
/// providers such as `Env` type values like `12345` as integers.
fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}
