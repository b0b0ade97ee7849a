// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute access on the resolved device.
//!
//! Attributes are named, string-valued properties read from the device list
//! payload and written through a dedicated endpoint. Both directions are
//! wrapped in the session's one-shot expiry retry.

use crate::error::{ResolutionError, Result};
use crate::protocol::ApiRequest;

use super::Session;

/// Attribute write endpoint.
const PUT_ATTRIBUTE_PATH: &str = "/api/v4/DeviceAttribute/PutDeviceAttribute";

/// Attribute carrying the current door state code.
pub const DOOR_STATE: &str = "doorstate";

/// Attribute accepting the desired door state code.
pub const DESIRED_DOOR_STATE: &str = "desireddoorstate";

/// Attribute reporting whether unattended close is currently allowed.
///
/// Any value other than `"0"` means the door is obstructed.
pub const UNATTENDED_CLOSE_ALLOWED: &str = "isunattendedcloseallowed";

impl Session {
    /// Reads a single named attribute of the resolved device.
    ///
    /// Fetches the device list, locates the target device (pinned id if
    /// given, else the single-candidate rule), and returns the attribute
    /// value by display name. Wrapped in the expiry retry.
    ///
    /// # Errors
    ///
    /// Login, transport, and envelope failures propagate; a missing device
    /// or attribute is a [`ResolutionError`].
    pub async fn attribute(&self, name: &str) -> Result<String> {
        self.with_retry_on_expiry(|| async {
            let devices = self.device_list().await?;

            let device_id = match self.cached_device_id() {
                Some(id) => id,
                None => self.resolve_device_id(&devices)?,
            };

            let device = devices
                .iter()
                .find(|device| device.id == device_id.value())
                .ok_or(ResolutionError::DeviceNotFound(device_id.value()))?;

            let value =
                device
                    .attribute(name)
                    .ok_or_else(|| ResolutionError::AttributeNotFound {
                        name: name.to_string(),
                        device_id: device_id.value(),
                    })?;

            Ok(value.to_string())
        })
        .await
    }

    /// Writes a single named attribute on the resolved device.
    ///
    /// Ensures token and device id, then issues the attribute write.
    /// Wrapped in the expiry retry.
    ///
    /// # Errors
    ///
    /// Login, transport, envelope, and resolution failures propagate.
    pub async fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.with_retry_on_expiry(|| async {
            let (token, device_id) = self.ensure_token_and_device_id().await?;

            let body = serde_json::json!({
                "AttributeName": name,
                "AttributeValue": value,
                "MyQDeviceId": device_id.value(),
            });

            self.transport()
                .send(ApiRequest::put(PUT_ATTRIBUTE_PATH, body).with_security_token(&token))
                .await?;

            Ok(())
        })
        .await
    }
}
