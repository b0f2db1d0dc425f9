// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HEC client: field overrides, serialization, one HTTP exchange, decoding
//! and notifications, composed into a single call.
//!
//! ```text
//!   send(&mut Request)
//!       │
//!       ├─ override fields (parallel per document)
//!       ├─ before-send hooks
//!       ├─ POST {endpoint}/event   (NDJSON body)
//!       ├─ decode body + HTTP status
//!       └─ after-send hooks ──> Response
//! ```
//!
//! Nothing is retried. Any error aborts the call and no response is returned.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, trace};

use crate::config::HecConfig;
use crate::error::HecError;
use crate::fields::override_batch;
use crate::hooks::{HookError, Hooks};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{ClientOptions, ReqwestTransport, Transport, TransportRequest};

const EVENT_PATH: &str = "event";
const HEALTH_PATH: &str = "health";

/// Splunk HTTP Event Collector client.
///
/// Holds one transport and one read-only configuration for its whole
/// lifetime. Concurrent calls on a shared client are fine.
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<HecConfig>,
    /// Default headers, the `Authorization` header included.
    headers: HeaderMap,
    hooks: Hooks,
    blocking_runtime: BlockingRuntime,
}

#[derive(Default)]
pub struct ClientBuilder {
    config: Option<HecConfig>,
    transport: Option<Arc<dyn Transport>>,
    options: ClientOptions,
}

impl ClientBuilder {
    #[must_use]
    pub fn config(mut self, config: HecConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `transport` instead of building a reqwest transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Options for the built-in transport. Ignored when a transport is supplied.
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Client, HecError> {
        let (config, transport) = match (self.config, self.transport) {
            (None, None) => {
                return Err(HecError::configuration(
                    "config",
                    "a configuration or a transport is required",
                ))
            }
            (config, Some(transport)) => (config.unwrap_or_default(), transport),
            (Some(config), None) => {
                let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(self.options)?);
                (config, transport)
            }
        };

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Splunk {token}")).map_err(|_| {
                HecError::validation("token", "token is not a valid header value")
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Client {
            transport,
            config: Arc::new(config),
            headers,
            hooks: Hooks::default(),
            blocking_runtime: BlockingRuntime::default(),
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Builds a client with the default reqwest transport.
    pub fn new(config: HecConfig) -> Result<Self, HecError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &HecConfig {
        &self.config
    }

    /// Registers a hook fired after field overrides, before the request is sent.
    pub fn on_before_send<F>(&mut self, hook: F)
    where
        F: Fn(&Request) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.add_before_send(Arc::new(hook));
    }

    /// Registers a hook fired with every decoded response, health checks included.
    pub fn on_after_send<F>(&mut self, hook: F)
    where
        F: Fn(&Response) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.add_after_send(Arc::new(hook));
    }

    /// Sends the batch to `{endpoint}/event`.
    ///
    /// Documents are updated in place by the field overrides, so the caller
    /// sees the values that were actually sent.
    pub async fn send(&self, request: &mut Request) -> Result<Response, HecError> {
        override_batch(&self.config, &mut request.items)?;
        self.hooks.fire_before_send(request)?;

        let url = self.route(EVENT_PATH)?;
        let body = request.serialize();
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(
            documents = request.len(),
            url = %url,
            headers = ?redact_headers(&headers),
            body_len = body.len(),
            "HEC | sending batch"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(body = %body_preview(&body), "HEC | batch body");
        }

        let response = self
            .exchange(TransportRequest {
                method: Method::POST,
                url,
                headers,
                body: Some(Bytes::from(body)),
            })
            .await?;
        self.hooks.fire_after_send(&response)?;
        Ok(response)
    }

    /// Queries `{endpoint}/health`, optionally with `?token=`.
    ///
    /// Only after-send hooks fire for health checks.
    pub async fn health_check(&self, token: Option<&str>) -> Result<Response, HecError> {
        let mut url = self.route(HEALTH_PATH)?;
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }

        debug!(
            url = %redact_query(&url),
            headers = ?redact_headers(&self.headers),
            "HEC | health check"
        );

        let response = self
            .exchange(TransportRequest {
                method: Method::GET,
                url,
                headers: self.headers.clone(),
                body: None,
            })
            .await?;
        self.hooks.fire_after_send(&response)?;
        Ok(response)
    }

    /// Blocking form of [`Client::send`].
    ///
    /// Safe on plain threads and on `spawn_blocking` threads. Called from an
    /// async task it blocks that task's worker until the exchange completes.
    pub fn send_blocking(&self, request: &mut Request) -> Result<Response, HecError> {
        self.block_on(self.send(request))
    }

    /// Blocking form of [`Client::health_check`].
    ///
    /// Same threading rules as [`Client::send_blocking`].
    pub fn health_check_blocking(&self, token: Option<&str>) -> Result<Response, HecError> {
        self.block_on(self.health_check(token))
    }

    async fn exchange(&self, request: TransportRequest) -> Result<Response, HecError> {
        let method = request.method.clone();
        let url = redact_query(&request.url);
        let reply = self.transport.execute(request).await?;

        debug!(
            method = %method,
            url = %url,
            status = %reply.status,
            body_len = reply.body.len(),
            "HEC | response received"
        );

        Response::decode(reply.status, &reply.body)
    }

    fn route(&self, segment: &str) -> Result<Url, HecError> {
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| HecError::configuration("endpoint", "no endpoint configured"))?;

        let mut url = endpoint.clone();
        let path = format!("{}/{segment}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    fn block_on<F>(&self, future: F) -> Result<Response, HecError>
    where
        F: Future<Output = Result<Response, HecError>> + Send,
    {
        let runtime = self.blocking_runtime.get().map_err(HecError::Runtime)?;
        if Handle::try_current().is_err() {
            return runtime.block_on(future);
        }

        // Tokio refuses to enter a runtime on a thread that already carries a
        // runtime context (spawn_blocking threads included).
        std::thread::scope(|scope| {
            match scope.spawn(|| runtime.block_on(future)).join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            }
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("headers", &redact_headers(&self.headers))
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Current-thread runtime driving the blocking API, started on first use.
///
/// It only makes progress inside `block_on`, so no thread outlives a
/// blocking call. Idle pooled connections are picked up again by the next one.
#[derive(Default)]
struct BlockingRuntime {
    runtime: Mutex<Option<Arc<Runtime>>>,
}

impl BlockingRuntime {
    fn get(&self) -> std::io::Result<Arc<Runtime>> {
        let mut slot = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = slot.as_ref() {
            return Ok(Arc::clone(runtime));
        }
        let runtime = Arc::new(
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?,
        );
        *slot = Some(Arc::clone(&runtime));
        Ok(runtime)
    }
}

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        let slot = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = slot.take().and_then(|rt| Arc::try_unwrap(rt).ok()) {
            runtime.shutdown_background();
        }
    }
}

/// Returns a redacted view of request headers suitable for debug logging.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let lower = name.as_str().to_ascii_lowercase();
            let display = if value.is_sensitive() || lower == "authorization" {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (lower, display)
        })
        .collect()
}

/// Masks the health check token in logged URLs.
fn redact_query(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    redacted.set_query(Some("token=<redacted>"));
    redacted.to_string()
}

fn body_preview(body: &str) -> String {
    const MAX_CHARS: usize = 1024;
    match body.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
