// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session: the observer-facing handle of one device.
//!
//! A [`DeviceSession`] owns the gateway, the shared cache, the
//! reconciliation controller and the background poller of one device for as
//! long as the session lives. Sessions are created through
//! [`SessionBuilder`].

mod builder;
mod config;

pub use builder::SessionBuilder;
pub use config::SessionConfig;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::WriteError;
use crate::poller::poll_once;
use crate::protocol::Gateway;
use crate::reconcile::{ReconciliationController, WriteHandle, WritePhase};
use crate::state::{CacheSnapshot, DeviceStateCache, PollOutcome, StateChange};
use crate::subscription::{Subscribable, SubscriptionId};
use crate::types::{
    Attribute, AttributeValue, MotorSpeed, PowerState, SpeedRange, UpdateInterval, WriteRequest,
};

/// Handle to one device.
///
/// Reads are served from the cache and never block on the network. Writes
/// go through the [`ReconciliationController`]. Dropping the session stops
/// its background tasks like [`shutdown`](Self::shutdown) does, without
/// waiting for them.
///
/// # Examples
///
/// ```no_run
/// use dcrunner_lib::session::SessionBuilder;
/// use dcrunner_lib::subscription::Subscribable;
/// # use dcrunner_lib::protocol::Gateway;
///
/// # async fn example<G: Gateway>(gateway: G) -> dcrunner_lib::Result<()> {
/// let (session, _initial) = SessionBuilder::new(gateway).start().await?;
///
/// session.on_state_changed(|change| println!("{change:?}"));
///
/// let handle = session.set_power(true).await?;
/// // The optimistic value is visible right away.
/// assert!(session.power().is_some_and(|p| p.is_on()));
///
/// match handle.confirmed().await {
///     Ok(attempts) => println!("confirmed after {attempts} reads"),
///     Err(e) => println!("{e}"),
/// }
///
/// session.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession<G> {
    gateway: Arc<G>,
    cache: Arc<DeviceStateCache>,
    controller: ReconciliationController<G>,
    interval: watch::Sender<UpdateInterval>,
    cancel: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<G: Gateway> DeviceSession<G> {
    pub(crate) fn new(
        gateway: Arc<G>,
        cache: Arc<DeviceStateCache>,
        controller: ReconciliationController<G>,
        interval: watch::Sender<UpdateInterval>,
        cancel: CancellationToken,
        poller: JoinHandle<()>,
    ) -> Self {
        Self {
            gateway,
            cache,
            controller,
            interval,
            cancel,
            poller: Mutex::new(Some(poller)),
        }
    }

    /// Creates a builder around a gateway.
    #[must_use]
    pub fn builder(gateway: G) -> SessionBuilder<G> {
        SessionBuilder::new(gateway)
    }

    // ========== Cache reads ==========

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<DeviceStateCache> {
        &self.cache
    }

    /// Returns the gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Returns the effective value of an attribute.
    #[must_use]
    pub fn read(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.cache.read(attribute)
    }

    /// Returns the effective power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.cache.power()
    }

    /// Returns the effective motor speed.
    #[must_use]
    pub fn speed(&self) -> Option<MotorSpeed> {
        self.cache.speed()
    }

    /// Returns a consistent view of the cache.
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Returns whether the most recent read succeeded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.cache.is_available()
    }

    // ========== Writes ==========

    /// Returns the accepted speed range.
    #[must_use]
    pub fn speed_range(&self) -> SpeedRange {
        self.controller.speed_range()
    }

    /// Returns the phase of the latest write of an attribute.
    #[must_use]
    pub fn phase(&self, attribute: Attribute) -> WritePhase {
        self.controller.phase(attribute)
    }

    /// Requests a write. See [`ReconciliationController::request_write`].
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] if the write was not accepted.
    pub async fn request_write(&self, request: WriteRequest) -> Result<WriteHandle, WriteError> {
        self.controller.request_write(request).await
    }

    /// Starts (`true`) or stops (`false`) the pump.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] if the write was not accepted.
    pub async fn set_power(&self, on: bool) -> Result<WriteHandle, WriteError> {
        self.controller.set_power(on).await
    }

    /// Sets the motor speed in percent.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] if the speed is out of range or the write
    /// was not accepted.
    pub async fn set_speed(&self, percent: u16) -> Result<WriteHandle, WriteError> {
        self.controller.set_speed(percent).await
    }

    // ========== Polling ==========

    /// Returns the current poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> UpdateInterval {
        *self.interval.borrow()
    }

    /// Changes the poll interval.
    ///
    /// The poller restarts its period immediately. The interval is a local
    /// setting and is never sent to the device.
    pub fn set_poll_interval(&self, interval: UpdateInterval) {
        let previous = self.interval.send_replace(interval);
        if previous != interval {
            tracing::debug!(%previous, %interval, "Poll interval updated");
        }
    }

    /// Reads the device now and merges the result into the cache.
    pub async fn refresh(&self) -> PollOutcome {
        poll_once(self.gateway.as_ref(), &self.cache).await
    }

    // ========== Lifecycle ==========

    /// Returns `true` once the session has been shut down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the session.
    ///
    /// The poller stops at once and waits here until it has exited.
    /// Confirmations stop at their next sleep and their handles resolve to
    /// [`WriteOutcome::Cancelled`](crate::reconcile::WriteOutcome::Cancelled).
    /// Later writes fail with [`WriteError::ShutDown`]. Cache reads keep
    /// working.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let poller = self.poller.lock().take();
        if let Some(handle) = poller {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Poller task ended abnormally");
            }
        }

        tracing::debug!("Device session shut down");
    }
}

impl<G: Gateway> Subscribable for DeviceSession<G> {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.cache.callbacks().on_state_changed(callback)
    }

    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.cache.callbacks().on_availability_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cache.callbacks().unsubscribe(id)
    }
}

impl<G> Drop for DeviceSession<G> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<G> std::fmt::Debug for DeviceSession<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("cache", &self.cache)
            .field("controller", &self.controller)
            .field("poll_interval", &*self.interval.borrow())
            .field("shut_down", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
