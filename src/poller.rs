// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background polling of the device.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::protocol::Gateway;
use crate::state::{DeviceStateCache, PollOutcome};
use crate::types::UpdateInterval;

/// Reads the device once and merges the result into the cache.
///
/// Expired overrides are purged afterwards. A failed read is logged and
/// merged as a failure; it is never returned as an error.
pub async fn poll_once<G: Gateway>(gateway: &G, cache: &DeviceStateCache) -> PollOutcome {
    let result = gateway.read_state().await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Device poll failed");
    }

    let outcome = PollOutcome::from(result);
    cache.merge(outcome.clone());
    cache.purge_expired();
    outcome
}

/// Periodic reader of the device state.
///
/// The cadence is read from a [`watch`] channel so it can change while the
/// poller runs; a new interval restarts the period from the moment it is
/// received. The poller never writes to the device.
pub struct Poller<G> {
    gateway: Arc<G>,
    cache: Arc<DeviceStateCache>,
    interval: watch::Receiver<UpdateInterval>,
    cancel: CancellationToken,
}

impl<G: Gateway> Poller<G> {
    /// Creates a poller. Nothing runs until [`spawn`](Self::spawn).
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        cache: Arc<DeviceStateCache>,
        interval: watch::Receiver<UpdateInterval>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            cache,
            interval,
            cancel,
        }
    }

    /// Runs the poll loop on a new task until the token is cancelled.
    ///
    /// The first read happens one full period after spawning.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut period = *self.interval.borrow_and_update();
        let mut ticker = new_ticker(period, Instant::now() + period.as_duration());

        tracing::debug!(%period, "Poller started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = self.interval.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Poll interval sender dropped");
                        break;
                    }
                    period = *self.interval.borrow_and_update();
                    ticker = new_ticker(period, Instant::now() + period.as_duration());
                    tracing::debug!(%period, "Poll interval changed");
                }
                _ = ticker.tick() => {
                    poll_once(self.gateway.as_ref(), &self.cache).await;
                }
            }
        }

        tracing::debug!("Poller stopped");
    }
}

fn new_ticker(period: UpdateInterval, start: Instant) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period.as_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl<G> std::fmt::Debug for Poller<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &*self.interval.borrow())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
