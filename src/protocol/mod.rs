// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol implementation for communicating with the MyQ cloud API.
//!
//! This module builds and sends authenticated JSON requests against the
//! vendor's REST endpoints. Every request carries the fixed identification
//! headers the API expects, and every response is interpreted through the
//! vendor's status-code envelope before any payload is handed to callers.
//!
//! # Components
//!
//! - [`ApiConfig`]: connection parameters (base URL, timeout)
//! - [`Transport`]: the HTTP client that sends [`ApiRequest`]s
//! - [`ApiRequest`]: a single request description (method, path, token, body)

mod http;

pub use http::{ApiConfig, Transport};

use reqwest::Method;

/// A single request against the MyQ API.
///
/// Describes everything the [`Transport`] needs to issue one call: the HTTP
/// method and path, optional query parameters, an optional security token
/// (sent as the `SecurityToken` header), and an optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    method: Method,
    path: &'a str,
    query: &'a [(&'a str, &'a str)],
    security_token: Option<&'a str>,
    body: Option<serde_json::Value>,
}

impl<'a> ApiRequest<'a> {
    /// Creates a GET request for the given path.
    #[must_use]
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::GET,
            path,
            query: &[],
            security_token: None,
            body: None,
        }
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: &'a str, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path,
            query: &[],
            security_token: None,
            body: Some(body),
        }
    }

    /// Creates a PUT request with a JSON body.
    #[must_use]
    pub fn put(path: &'a str, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            path,
            query: &[],
            security_token: None,
            body: Some(body),
        }
    }

    /// Attaches query parameters.
    #[must_use]
    pub fn with_query(mut self, query: &'a [(&'a str, &'a str)]) -> Self {
        self.query = query;
        self
    }

    /// Attaches a security token, sent as the `SecurityToken` header.
    #[must_use]
    pub fn with_security_token(mut self, token: &'a str) -> Self {
        self.security_token = Some(token);
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path
    }
}
