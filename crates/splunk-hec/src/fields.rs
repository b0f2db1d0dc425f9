// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Field overrides applied to every document before it is sent.
//!
//! For each document, in order:
//!
//! 1. when a timestamp field is configured, `time` is derived from that event key;
//! 2. `index`, `host`, `source` and `sourcetype` receive the configured
//!    default when they are blank (missing, empty or whitespace only).
//!
//! Documents are independent, so a batch is processed in parallel on the
//! rayon pool. Output order is untouched since documents are mutated in place.

use rayon::prelude::*;
use serde_json::Value;

use crate::config::{HecConfig, TimestampField};
use crate::document::Document;
use crate::error::HecError;
use crate::timestamp::parse_epoch_millis;

/// True for `None`, `""` and whitespace-only strings.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Applies the configured overrides to a single document.
pub fn override_fields(config: &HecConfig, doc: &mut Document) -> Result<(), HecError> {
    if let Some(timestamp_field) = &config.timestamp_field {
        doc.time = derive_time(timestamp_field, doc)?;
    }

    apply_default(&config.default_index, &mut doc.index);
    apply_default(&config.default_host, &mut doc.host);
    apply_default(&config.default_source, &mut doc.source);
    apply_default(&config.default_source_type, &mut doc.source_type);
    Ok(())
}

/// Applies [`override_fields`] to every document of a batch.
///
/// The first failure aborts the batch; documents already processed keep
/// their overrides.
pub fn override_batch(config: &HecConfig, docs: &mut [Document]) -> Result<(), HecError> {
    docs.par_iter_mut()
        .try_for_each(|doc| override_fields(config, doc))
}

fn apply_default(default: &Option<String>, field: &mut Option<String>) {
    if let Some(default) = default {
        if !is_blank(Some(default)) && is_blank(field.as_deref()) {
            *field = Some(default.clone());
        }
    }
}

fn derive_time(timestamp_field: &TimestampField, doc: &Document) -> Result<i64, HecError> {
    let field_error = |message: String| HecError::FieldOverride {
        field: timestamp_field.field_name.clone(),
        message,
    };

    let value = doc
        .event
        .as_ref()
        .and_then(|event| event.get(&timestamp_field.field_name))
        .ok_or_else(|| field_error("field does not exist on the event".to_string()))?;

    match value {
        Value::String(raw) => parse_epoch_millis(raw, &timestamp_field.format)
            .map_err(|e| field_error(format!("invalid configuration: {e}"))),
        other => Err(field_error(format!(
            "invalid configuration: expected a string timestamp, got {other}"
        ))),
    }
}
