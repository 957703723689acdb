// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session builder.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::poller::{Poller, poll_once};
use crate::protocol::Gateway;
use crate::reconcile::{ConfirmationPolicy, ReconciliationController};
use crate::session::{DeviceSession, SessionConfig};
use crate::state::{DeviceStateCache, PollOutcome};
use crate::types::{SpeedRange, UpdateInterval};

#[cfg(feature = "http")]
use crate::protocol::{GizwitsClient, GizwitsConfig};

/// Builder for [`DeviceSession`].
///
/// # Examples
///
/// ```no_run
/// use dcrunner_lib::protocol::GizwitsConfig;
/// use dcrunner_lib::session::SessionBuilder;
/// use dcrunner_lib::types::UpdateInterval;
///
/// # async fn example() -> dcrunner_lib::Result<()> {
/// let config = GizwitsConfig::new("app-id", "user-token", "device-id");
/// let (session, initial) = SessionBuilder::gizwits(config)?
///     .with_poll_interval(UpdateInterval::new(15)?)
///     .start()
///     .await?;
///
/// println!("First read: {initial:?}");
/// session.set_speed(60).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionBuilder<G> {
    gateway: G,
    config: SessionConfig,
}

impl<G: Gateway> SessionBuilder<G> {
    /// Creates a builder around a gateway with default settings.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            config: SessionConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the accepted speed range.
    #[must_use]
    pub fn with_speed_range(mut self, range: SpeedRange) -> Self {
        self.config.speed_range = range;
        self
    }

    /// Sets the initial poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: UpdateInterval) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets the confirmation policy.
    #[must_use]
    pub fn with_confirmation(mut self, policy: ConfirmationPolicy) -> Self {
        self.config.confirmation = policy;
        self
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts the session.
    ///
    /// Performs one read to seed the cache, then starts the background
    /// poller. The device being unreachable does not fail the start; the
    /// first read is returned so the caller can report it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    /// if the configuration is invalid.
    pub async fn start(self) -> crate::Result<(DeviceSession<G>, PollOutcome)> {
        self.config.validate()?;

        let gateway = Arc::new(self.gateway);
        let cache = Arc::new(DeviceStateCache::new());
        let cancel = CancellationToken::new();

        let controller = ReconciliationController::new(
            Arc::clone(&gateway),
            Arc::clone(&cache),
            self.config.speed_range,
            self.config.confirmation,
            cancel.child_token(),
        )?;

        let initial = poll_once(gateway.as_ref(), &cache).await;

        let (interval_tx, interval_rx) = watch::channel(self.config.poll_interval);
        let poller = Poller::new(
            Arc::clone(&gateway),
            Arc::clone(&cache),
            interval_rx,
            cancel.child_token(),
        )
        .spawn();

        tracing::debug!(
            available = cache.is_available(),
            interval = %self.config.poll_interval,
            "Device session started"
        );

        let session = DeviceSession::new(gateway, cache, controller, interval_tx, cancel, poller);
        Ok((session, initial))
    }
}

#[cfg(feature = "http")]
impl SessionBuilder<GizwitsClient> {
    /// Creates a builder for a device on the Gizwits cloud.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    /// if the client cannot be created.
    pub fn gizwits(config: GizwitsConfig) -> crate::Result<Self> {
        Ok(Self::new(config.into_client()?))
    }
}
