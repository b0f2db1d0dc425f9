// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the Splunk HTTP Event Collector (HEC).
//!
//! A [`Client`] takes a batch of [`Document`]s, fills blank metadata from the
//! configured defaults, optionally derives each event time from a payload
//! field, and submits the batch as newline-delimited JSON to
//! `{endpoint}/event`. Collector replies come back as [`Response`] values
//! whose `code` is independent from the HTTP status.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod hooks;
pub mod request;
pub mod response;
pub mod timestamp;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{HecConfig, TimestampField};
pub use document::{Document, Event};
pub use error::{BoxError, ErrorKind, HecError};
pub use hooks::{AfterSendHook, BeforeSendHook, HookError};
pub use request::Request;
pub use response::Response;
pub use transport::{ClientOptions, ReqwestTransport, Transport, TransportRequest, TransportResponse};
