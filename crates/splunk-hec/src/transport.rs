// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The network seam of the client.
//!
//! [`Transport`] performs exactly one HTTP exchange and hands back the status
//! and raw body. [`ReqwestTransport`] is the production implementation; tests
//! and embedders can substitute their own.

#[cfg(feature = "fips")]
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{ClientBuilder, Method, StatusCode, Url};
#[cfg(feature = "fips")]
use tracing::debug;

use crate::error::HecError;

/// Knobs for the built-in reqwest transport.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Upper bound for a whole exchange, connection included.
    pub timeout: Duration,
    /// Skip TLS certificate and hostname validation.
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange once. Non-2xx statuses are not errors.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, HecError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(options: ClientOptions) -> Result<Self, HecError> {
        let client = tls_client_builder(&options)?
            .timeout(options.timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, HecError> {
        let builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}

/// rustls with webpki roots; `accept_invalid_certs` turns off certificate
/// and hostname checks.
#[cfg(not(feature = "fips"))]
fn tls_client_builder(options: &ClientOptions) -> Result<ClientBuilder, HecError> {
    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .danger_accept_invalid_hostnames(options.accept_invalid_certs))
}

/// rustls restricted to the process-wide FIPS provider, trusting the platform
/// roots. Install the provider first, e.g.
/// `rustls::crypto::default_fips_provider().install_default()`.
///
/// Certificate validation cannot be relaxed in this mode.
#[cfg(feature = "fips")]
fn tls_client_builder(options: &ClientOptions) -> Result<ClientBuilder, HecError> {
    if options.accept_invalid_certs {
        return Err(tls_error(
            "accept_invalid_certs is not allowed with FIPS TLS",
        ));
    }

    let provider = rustls::crypto::CryptoProvider::get_default()
        .filter(|provider| provider.fips())
        .ok_or_else(|| tls_error("no FIPS crypto provider is installed as process default"))?;

    let tls = rustls::ClientConfig::builder_with_provider(Arc::clone(provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(e.to_string()))?
        .with_root_certificates(native_roots()?)
        .with_no_client_auth();
    if !tls.fips() {
        return Err(tls_error("resulting TLS configuration is not FIPS compliant"));
    }

    debug!("HEC | transport uses FIPS TLS");
    Ok(reqwest::Client::builder().use_preconfigured_tls(tls))
}

#[cfg(feature = "fips")]
fn native_roots() -> Result<rustls::RootCertStore, HecError> {
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        debug!("HEC | native root store: {err}");
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, skipped) = roots.add_parsable_certificates(loaded.certs);
    if skipped > 0 {
        debug!(skipped, "HEC | skipped unparsable native certificates");
    }
    if added == 0 {
        return Err(tls_error("native root store holds no usable certificates"));
    }
    Ok(roots)
}

#[cfg(feature = "fips")]
fn tls_error(message: impl Into<String>) -> HecError {
    HecError::configuration("tls", message)
}
