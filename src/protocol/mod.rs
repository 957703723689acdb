// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote device gateway.
//!
//! The reconciliation engine talks to the device through the [`Gateway`]
//! trait only. With the `http` feature enabled, [`GizwitsClient`] implements
//! it against the vendor cloud REST API.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{GizwitsClient, GizwitsConfig};

use std::future::Future;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::state::DeviceAttributes;
use crate::types::AttributeValue;

/// Authenticated read and write access to one remote device.
///
/// Implementations are shared between the poller and the confirmation
/// loops, so both operations may run concurrently. Neither operation
/// retries; retry and confirmation policy belong to the caller.
///
/// Implementations may use `async fn` directly:
///
/// ```
/// use dcrunner_lib::error::GatewayError;
/// use dcrunner_lib::protocol::Gateway;
/// use dcrunner_lib::state::DeviceAttributes;
/// use dcrunner_lib::types::AttributeValue;
///
/// struct Offline;
///
/// impl Gateway for Offline {
///     async fn read_state(&self) -> Result<DeviceAttributes, GatewayError> {
///         Err(GatewayError::Unreachable("offline".into()))
///     }
///
///     async fn write_attribute(&self, _value: AttributeValue) -> Result<(), GatewayError> {
///         Err(GatewayError::Unreachable("offline".into()))
///     }
/// }
/// ```
pub trait Gateway: Send + Sync + 'static {
    /// Reads the current attributes of the device.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unreachable`] on transport failure and
    /// [`GatewayError::MalformedResponse`] when the payload is incomplete or
    /// mistyped.
    fn read_state(&self) -> impl Future<Output = Result<DeviceAttributes, GatewayError>> + Send;

    /// Writes a single attribute.
    ///
    /// A successful return only means the request was accepted; the device
    /// may apply it later, or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unreachable`] on transport failure and
    /// [`GatewayError::Rejected`] when the server refuses the write.
    fn write_attribute(
        &self,
        value: AttributeValue,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<G: Gateway> Gateway for Arc<G> {
    fn read_state(&self) -> impl Future<Output = Result<DeviceAttributes, GatewayError>> + Send {
        G::read_state(self)
    }

    fn write_attribute(
        &self,
        value: AttributeValue,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        G::write_attribute(self, value)
    }
}
