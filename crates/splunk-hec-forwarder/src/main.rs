// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::error::Error;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use splunk_hec::{Client, Document, HecConfig, HecError, Request, Response};

const CONFIG_FILE_VAR: &str = "SPLUNK_HEC_CONFIG_FILE";
const LOG_LEVEL_VAR: &str = "SPLUNK_HEC_LOG_LEVEL";

/// Usage:
///
/// * `splunk-hec-forwarder` sends every JSON object read from stdin, one per
///   line, as a single batch;
/// * `splunk-hec-forwarder health [token]` queries the collector health.
#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var(LOG_LEVEL_VAR)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to load HEC configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Loaded configuration: {config:?}");

    let client = match Client::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to create HEC client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut args = env::args().skip(1);
    let result: Result<Response, Box<dyn Error>> = match args.next().as_deref() {
        Some("health") => client
            .health_check(args.next().as_deref())
            .await
            .map_err(Into::into),
        Some(other) => {
            error!("Unknown command '{other}', expected no argument or 'health [token]'");
            return ExitCode::FAILURE;
        }
        None => forward_stdin(&client).await,
    };

    match result {
        Ok(response) => report(&response),
        Err(e) => {
            error!("HEC call failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<HecConfig, HecError> {
    match env::var(CONFIG_FILE_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Reading configuration from {path}");
            HecConfig::from_yaml_and_env(path)
        }
        _ => HecConfig::from_env(),
    }
}

async fn forward_stdin(client: &Client) -> Result<Response, Box<dyn Error>> {
    let mut request = Request::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let document = parse_event(&line).map_err(|e| format!("stdin line {line_number}: {e}"))?;
        if let Some(document) = document {
            request.push(document);
        }
    }

    if request.is_empty() {
        info!("No events read from stdin, sending an empty batch");
    } else {
        debug!("Forwarding {} events", request.len());
    }
    Ok(client.send(&mut request).await?)
}

/// Parses one NDJSON line. Blank lines are skipped.
fn parse_event(line: &str) -> Result<Option<Document>, HecError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| HecError::Validation {
            param: "payload",
            message: format!("not valid JSON: {e}"),
        })?;
    Document::from_payload(&value).map(Some)
}

fn report(response: &Response) -> ExitCode {
    let text = response.text.as_deref().unwrap_or("");
    if response.is_success() {
        info!(
            status = %response.transport_status,
            code = response.code,
            "Collector accepted the request: {text}"
        );
        ExitCode::SUCCESS
    } else {
        error!(
            status = %response.transport_status,
            code = response.code,
            invalid_event_number = response.invalid_event_number,
            "Collector rejected the request: {text}"
        );
        ExitCode::FAILURE
    }
}
