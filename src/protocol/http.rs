// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gizwits cloud REST gateway.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::error::{Error, GatewayError};
use crate::protocol::Gateway;
use crate::response::{DeviceBinding, parse_bindings, parse_latest};
use crate::state::DeviceAttributes;
use crate::types::AttributeValue;

/// Header carrying the vendor application identifier.
const APPLICATION_ID_HEADER: &str = "X-Gizwits-Application-Id";
/// Header carrying the user session token.
const USER_TOKEN_HEADER: &str = "X-Gizwits-User-token";
/// Page size used when listing bound devices.
const BINDINGS_LIMIT: u32 = 10;

// ============================================================================
// GizwitsConfig
// ============================================================================

/// Configuration for the Gizwits cloud gateway.
///
/// The user token is obtained out of band; this crate never logs in.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::protocol::GizwitsConfig;
/// use std::time::Duration;
///
/// let config = GizwitsConfig::new("app-id", "user-token", "device-id")
///     .with_base_url("https://usapi.gizwits.com")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "https://usapi.gizwits.com");
/// ```
#[derive(Clone)]
pub struct GizwitsConfig {
    app_id: String,
    token: String,
    device_id: String,
    base_url: String,
    timeout: Duration,
}

impl GizwitsConfig {
    /// Default cloud endpoint (EU region).
    pub const DEFAULT_BASE_URL: &'static str = "http://euapi.gizwits.com";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for one device.
    ///
    /// # Arguments
    ///
    /// * `app_id` - Vendor application identifier
    /// * `token` - User session token
    /// * `device_id` - Cloud device identifier (`did`)
    #[must_use]
    pub fn new(
        app_id: impl Into<String>,
        token: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            token: token.into(),
            device_id: device_id.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the cloud endpoint. A trailing slash is ignored.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the application identifier.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the cloud endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a [`GizwitsClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if a credential or the device
    /// identifier is empty, or if the HTTP client cannot be created.
    pub fn into_client(self) -> crate::Result<GizwitsClient> {
        for (name, value) in [
            ("application id", &self.app_id),
            ("user token", &self.token),
            ("device id", &self.device_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfiguration(format!("{name} is empty")));
            }
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;

        Ok(GizwitsClient {
            device_path: urlencoding::encode(&self.device_id).into_owned(),
            config: self,
            client,
        })
    }
}

impl std::fmt::Debug for GizwitsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GizwitsConfig")
            .field("app_id", &self.app_id)
            .field("token", &"<redacted>")
            .field("device_id", &self.device_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// GizwitsClient
// ============================================================================

/// HTTP client for one device on the Gizwits cloud.
///
/// - reads use `GET /app/devdata/<did>/latest`
/// - writes use `POST /app/control/<did>` with `{"attrs": {...}}`
///
/// # Examples
///
/// ```no_run
/// use dcrunner_lib::protocol::{Gateway, GizwitsConfig};
///
/// # async fn example() -> dcrunner_lib::Result<()> {
/// let client = GizwitsConfig::new("app-id", "user-token", "device-id").into_client()?;
/// let attrs = client.read_state().await?;
/// println!("Pump is {} at {}", attrs.power(), attrs.speed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GizwitsClient {
    config: GizwitsConfig,
    device_path: String,
    client: Client,
}

impl GizwitsClient {
    /// Returns the configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &GizwitsConfig {
        &self.config
    }

    /// Lists the devices bound to the user account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unreachable`] on transport failure or non-2xx
    /// status, and [`GatewayError::MalformedResponse`] if the body cannot be
    /// parsed.
    pub async fn bindings(&self) -> Result<Vec<DeviceBinding>, GatewayError> {
        let url = format!(
            "{}/app/bindings?limit={BINDINGS_LIMIT}",
            self.config.base_url
        );

        tracing::debug!(url = %url, "Listing bound devices");

        let response = self.authorized(self.client.get(&url)).send().await?;
        let body = Self::success_body(response).await?;
        Ok(parse_bindings(&body)?)
    }

    /// Checks that the credentials and device identifier work by performing
    /// one read.
    ///
    /// # Errors
    ///
    /// Returns the read failure.
    pub async fn verify(&self) -> Result<DeviceAttributes, GatewayError> {
        let result = self.read_state().await;
        match &result {
            Ok(_) => tracing::info!(device_id = %self.config.device_id, "Device verified"),
            Err(e) => {
                tracing::warn!(device_id = %self.config.device_id, error = %e, "Device verification failed");
            }
        }
        result
    }

    fn latest_url(&self) -> String {
        format!(
            "{}/app/devdata/{}/latest",
            self.config.base_url, self.device_path
        )
    }

    fn control_url(&self) -> String {
        format!("{}/app/control/{}", self.config.base_url, self.device_path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(APPLICATION_ID_HEADER, &self.config.app_id)
            .header(USER_TOKEN_HEADER, &self.config.token)
    }

    async fn success_body(response: Response) -> Result<String, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unreachable(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response.text().await?)
    }
}

impl Gateway for GizwitsClient {
    async fn read_state(&self) -> Result<DeviceAttributes, GatewayError> {
        let url = self.latest_url();

        tracing::debug!(url = %url, "Reading device state");

        let response = self.authorized(self.client.get(&url)).send().await?;
        let body = Self::success_body(response).await?;

        tracing::debug!(body = %body, "Received device state");

        Ok(parse_latest(&body)?)
    }

    async fn write_attribute(&self, value: AttributeValue) -> Result<(), GatewayError> {
        let url = self.control_url();
        let mut attrs = serde_json::Map::new();
        attrs.insert(value.attribute().wire_name().to_string(), value.to_wire());
        let payload = serde_json::json!({ "attrs": attrs });

        tracing::debug!(url = %url, %value, "Sending control command");

        let response = self
            .authorized(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = rejection_message(status, response.text().await);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Picks the message of a refused command: the body if there is one,
/// otherwise the reason phrase.
fn rejection_message<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: Result<String, E>,
) -> String {
    let reason = || status.canonical_reason().unwrap_or("Unknown").to_string();
    match body {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => reason(),
        Err(e) => {
            tracing::debug!(
                status = status.as_u16(),
                error = %e,
                "Failed to read rejection body"
            );
            reason()
        }
    }
}
