// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `MyQ` library.
//!
//! This module provides an error hierarchy for handling failures across the
//! library: transport problems, vendor API errors, response parsing, and
//! device resolution.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when talking to
/// the MyQ cloud API or operating the door accessory.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred at the transport layer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The vendor API reported a non-success return code.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The target device or attribute could not be resolved.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// A door command was rejected locally because the door is obstructed.
    ///
    /// This never reaches the network.
    #[error("cannot operate door because it is obstructed")]
    Obstructed,
}

/// Errors related to transport-level communication.
///
/// These are never interpreted by the library and propagate unchanged.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid base URL or client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Classification of a vendor API error.
///
/// The MyQ API signals session expiry only through a human-readable error
/// message. The classification happens once, when the response envelope is
/// decoded, so that callers match on this kind rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The security token is no longer valid and a new login is required.
    SessionExpired,
    /// Any other vendor-reported failure.
    Other,
}

/// A non-success response from the vendor API.
///
/// The MyQ response envelope carries a `ReturnCode` field where the literal
/// string `"0"` means success. Any other code becomes an `ApiError` with the
/// vendor's `ErrorMessage`, or a synthesized message if none was present.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    code: String,
    message: String,
    kind: ApiErrorKind,
}

/// Message signature the vendor uses to report an expired session.
///
/// Known fragility: this is the only expiry signal the API is known to emit.
/// It is matched exactly once, here, and carried as [`ApiErrorKind`] afterward.
const SESSION_EXPIRED_SIGNATURE: &str = "Please login again";

impl ApiError {
    /// Creates an API error from a decoded response envelope.
    ///
    /// A missing `ErrorMessage` is replaced with `Unknown Error (<code>)`.
    #[must_use]
    pub fn from_envelope(code: impl Into<String>, message: Option<String>) -> Self {
        let code = code.into();
        let message = message.unwrap_or_else(|| format!("Unknown Error ({code})"));
        let kind = if message.contains(SESSION_EXPIRED_SIGNATURE) {
            ApiErrorKind::SessionExpired
        } else {
            ApiErrorKind::Other
        };
        Self { code, message, kind }
    }

    /// Returns the vendor return code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the vendor error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured classification of this error.
    #[must_use]
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns `true` if this error indicates an expired session.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        self.kind == ApiErrorKind::SessionExpired
    }
}

/// Errors related to parsing MyQ responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Failed to interpret a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to resolving the controllable device or its attributes.
///
/// These are structural failures and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The device list contained no non-gateway devices.
    #[error("no controllable devices found")]
    NoDevices,

    /// The device list contained more than one non-gateway device and no
    /// device id was pinned. Lists all candidate ids.
    #[error("multiple controllable devices found: {0}")]
    MultipleDevices(String),

    /// The pinned device id was not present in the device list.
    #[error("device {0} not found in device list")]
    DeviceNotFound(u64),

    /// The named attribute was not present on the resolved device.
    #[error("attribute {name} not found on device {device_id}")]
    AttributeNotFound {
        /// The attribute display name that was requested.
        name: String,
        /// The device that was inspected.
        device_id: u64,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
