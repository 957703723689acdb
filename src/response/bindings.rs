// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the `app/bindings` endpoint.

use serde::Deserialize;

use crate::error::ParseError;

/// A device bound to the user account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceBinding {
    /// Cloud device identifier, used in every device URL.
    pub did: String,
    /// Product name as registered by the vendor.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Alias chosen by the user in the vendor app.
    #[serde(default, rename = "dev_alias")]
    pub alias: Option<String>,
    /// Whether the cloud currently sees the device online.
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
struct BindingsResponse {
    #[serde(default)]
    devices: Option<Vec<DeviceBinding>>,
}

/// Parses a bindings response body.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn parse_bindings(body: &str) -> Result<Vec<DeviceBinding>, ParseError> {
    let response: BindingsResponse = serde_json::from_str(body)?;
    response
        .devices
        .ok_or_else(|| ParseError::MissingField("devices".to_string()))
}
