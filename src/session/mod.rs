// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session management and device resolution for the MyQ cloud API.
//!
//! A [`Session`] owns the account credentials, the short-lived security
//! token, and the resolved device id. Both token and device id are obtained
//! lazily and cached for the lifetime of the session; the token is cleared
//! and re-obtained automatically when the API reports session expiry.
//!
//! # Examples
//!
//! ```no_run
//! use myq_lib::session::Session;
//!
//! # async fn example() -> myq_lib::Result<()> {
//! let session = Session::builder()
//!     .credentials("user@example.com", "hunter2")
//!     .build()?;
//!
//! let state = session.attribute("doorstate").await?;
//! println!("raw door state: {state}");
//! # Ok(())
//! # }
//! ```

mod attributes;
mod device_list;

pub use attributes::{DESIRED_DOOR_STATE, DOOR_STATE, UNATTENDED_CLOSE_ALLOWED};
pub use device_list::{DeviceAttribute, DeviceId, DeviceRecord};

use parking_lot::Mutex;

use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::protocol::{ApiConfig, ApiRequest, Transport};

use device_list::resolve_candidate;

/// Login endpoint.
const VALIDATE_PATH: &str = "/api/v4/User/Validate";

/// Device list endpoint.
const DEVICE_DETAILS_PATH: &str = "/api/v4/UserDeviceDetails/Get";

/// An authenticated session against the MyQ cloud API.
///
/// The session holds the mutable credential state (security token, resolved
/// device id) that the rest of the library shares. Cached values are plain
/// overwrites behind short-lived locks; no lock is held across a network
/// call, so interleaved operations simply observe the latest value.
///
/// Concurrent calls before the token is cached are not de-duplicated: each
/// may trigger its own login attempt. This is an accepted simplification,
/// not a guaranteed single-flight.
#[derive(Debug)]
pub struct Session {
    transport: Transport,
    username: String,
    password: String,
    security_token: Mutex<Option<String>>,
    device_id: Mutex<Option<DeviceId>>,
}

impl Session {
    /// Creates a builder for a new session.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the cached security token, logging in first if necessary.
    ///
    /// A token seeded at build time (or left over from a previous call) is
    /// returned immediately and bypasses login entirely.
    ///
    /// # Errors
    ///
    /// Returns the envelope/transport error of the login call, or a
    /// `ParseError` if the response lacks a `SecurityToken`.
    pub async fn security_token(&self) -> Result<String> {
        if let Some(token) = self.security_token.lock().clone() {
            return Ok(token);
        }

        tracing::debug!(username = %self.username, "logging in to MyQ");

        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });
        let response = self
            .transport
            .send(ApiRequest::post(VALIDATE_PATH, body))
            .await?;

        let token = response
            .get("SecurityToken")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ParseError::MissingField("SecurityToken".to_string()))?
            .to_string();

        *self.security_token.lock() = Some(token.clone());
        Ok(token)
    }

    /// Fetches the full device list, filtered to "on" devices at the API.
    ///
    /// # Errors
    ///
    /// Returns login or transport errors, or a `ParseError` if the response
    /// lacks a `Devices` array.
    pub async fn device_list(&self) -> Result<Vec<DeviceRecord>> {
        let token = self.security_token().await?;

        let query = [("filterOn", "true")];
        let response = self
            .transport
            .send(
                ApiRequest::get(DEVICE_DETAILS_PATH)
                    .with_query(&query)
                    .with_security_token(&token),
            )
            .await?;

        let devices = response
            .get("Devices")
            .cloned()
            .ok_or_else(|| ParseError::MissingField("Devices".to_string()))?;
        let devices: Vec<DeviceRecord> =
            serde_json::from_value(devices).map_err(ParseError::Json)?;

        Ok(devices)
    }

    /// Resolves the single controllable device from a device list and caches
    /// its id.
    ///
    /// # Errors
    ///
    /// Returns a `ResolutionError` when zero or more than one non-gateway
    /// device is present; ambiguity is never resolved by guessing.
    pub fn resolve_device_id(&self, devices: &[DeviceRecord]) -> Result<DeviceId> {
        let id = resolve_candidate(devices)?;
        *self.device_id.lock() = Some(id);
        Ok(id)
    }

    /// Returns the pinned or cached device id, resolving it if unknown.
    ///
    /// # Errors
    ///
    /// Propagates device list and resolution failures.
    pub async fn device_id(&self) -> Result<DeviceId> {
        if let Some(id) = *self.device_id.lock() {
            return Ok(id);
        }

        let devices = self.device_list().await?;
        self.resolve_device_id(&devices)
    }

    /// Returns the currently cached device id, if any, without any I/O.
    #[must_use]
    pub fn cached_device_id(&self) -> Option<DeviceId> {
        *self.device_id.lock()
    }

    /// Clears the cached security token, forcing a login on next use.
    pub fn clear_security_token(&self) {
        *self.security_token.lock() = None;
    }

    /// Executes `op`, retrying exactly once after a session expiry.
    ///
    /// If `op` fails with an [`ApiError`](crate::error::ApiError) classified
    /// as session expiry, the cached token is cleared and `op` runs once
    /// more (which logs in again). Any other failure, or a second failure,
    /// propagates. This is the sole retry policy in the library.
    ///
    /// # Errors
    ///
    /// Whatever `op` ultimately returns.
    pub async fn with_retry_on_expiry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(Error::Api(err)) if err.is_session_expired() => {
                tracing::debug!("security token expired, retrying once with a fresh login");
                self.clear_security_token();
                op().await
            }
            other => other,
        }
    }

    /// Returns the security token and device id together, with the expiry
    /// retry applied to the whole composition.
    ///
    /// # Errors
    ///
    /// Propagates login, device list, and resolution failures.
    pub async fn security_token_and_device_id(&self) -> Result<(String, DeviceId)> {
        self.with_retry_on_expiry(|| self.ensure_token_and_device_id())
            .await
    }

    /// Token + device id composition without a retry wrapper.
    ///
    /// Callers that already run inside `with_retry_on_expiry` use this to
    /// keep the retry bounded to one.
    pub(crate) async fn ensure_token_and_device_id(&self) -> Result<(String, DeviceId)> {
        let token = self.security_token().await?;
        let device_id = self.device_id().await?;
        Ok((token, device_id))
    }

    /// Returns the transport, for request building in sibling modules.
    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }
}

/// Builder for creating a [`Session`].
///
/// # Examples
///
/// ```no_run
/// use myq_lib::session::Session;
///
/// # fn example() -> myq_lib::Result<()> {
/// let session = Session::builder()
///     .credentials("user@example.com", "hunter2")
///     .device_id(555)                 // pin the device, skip resolution
///     .security_token("abc123")       // pre-obtained token, skip login
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: ApiConfig,
    username: Option<String>,
    password: Option<String>,
    device_id: Option<DeviceId>,
    security_token: Option<String>,
}

impl SessionBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ApiConfig::new(),
            username: None,
            password: None,
            device_id: None,
            security_token: None,
        }
    }

    /// Sets the account credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Pins the device id, bypassing single-candidate resolution.
    #[must_use]
    pub fn device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Seeds a pre-obtained security token, bypassing the initial login.
    #[must_use]
    pub fn security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    /// Sets the endpoint configuration.
    #[must_use]
    pub fn api_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or the HTTP client cannot
    /// be created.
    pub fn build(self) -> Result<Session> {
        let (Some(username), Some(password)) = (self.username, self.password) else {
            return Err(ProtocolError::InvalidConfiguration(
                "username and password are required".to_string(),
            )
            .into());
        };

        let transport = self.config.into_transport()?;

        Ok(Session {
            transport,
            username,
            password,
            security_token: Mutex::new(self.security_token),
            device_id: Mutex::new(self.device_id),
        })
    }
}
