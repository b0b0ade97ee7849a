// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device list models and candidate resolution.

use serde::Deserialize;

use crate::error::ResolutionError;

/// Device type ids of MyQ gateways (hub devices).
///
/// Gateways appear in every account's device list but are not controllable
/// doors, so they are excluded from candidate selection.
const GATEWAY_TYPE_IDS: [u32; 2] = [1, 15];

/// Integer identifier of a MyQ device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Creates a device id from its raw value.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One device record from the `Devices` array of the device list response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    /// The device id.
    #[serde(rename = "MyQDeviceId")]
    pub id: u64,

    /// The device type id; gateway types are excluded from selection.
    #[serde(rename = "MyQDeviceTypeId")]
    pub type_id: u32,

    /// Named string-valued attributes of the device.
    #[serde(rename = "Attributes", default)]
    pub attributes: Vec<DeviceAttribute>,
}

impl DeviceRecord {
    /// Returns `true` if this record is a gateway (hub) device.
    #[must_use]
    pub fn is_gateway(&self) -> bool {
        GATEWAY_TYPE_IDS.contains(&self.type_id)
    }

    /// Looks up an attribute value by its display name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }
}

/// A named, string-valued device attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAttribute {
    /// The attribute display name (e.g. `doorstate`).
    #[serde(rename = "AttributeDisplayName")]
    pub name: String,

    /// The attribute value as reported by the API.
    #[serde(rename = "Value")]
    pub value: String,
}

/// Selects the single controllable device from a device list.
///
/// Gateways are filtered out first. Exactly one remaining candidate is
/// returned; zero or multiple candidates fail, because an ambiguous account
/// must never be resolved by guessing.
pub(crate) fn resolve_candidate(devices: &[DeviceRecord]) -> Result<DeviceId, ResolutionError> {
    let candidates: Vec<u64> = devices
        .iter()
        .filter(|device| !device.is_gateway())
        .map(|device| device.id)
        .collect();

    match candidates.as_slice() {
        [] => Err(ResolutionError::NoDevices),
        [id] => Ok(DeviceId::new(*id)),
        ids => Err(ResolutionError::MultipleDevices(
            ids.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}
