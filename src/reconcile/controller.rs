// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Optimistic writes and their confirmation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::WriteError;
use crate::protocol::Gateway;
use crate::state::{DeviceStateCache, PollOutcome};
use crate::types::{Attribute, AttributeValue, SpeedRange, WriteRequest};

use super::{Confirmation, ConfirmationPolicy, Observation};

// ============================================================================
// Phases and outcomes
// ============================================================================

/// Progress of the latest write of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePhase {
    /// No write has been requested, or the last one was cancelled.
    #[default]
    Idle,
    /// The command is being sent.
    Dispatching,
    /// The command was accepted and the optimistic value installed.
    OptimisticallyApplied,
    /// Waiting for, or performing, the given 1-based read-back.
    Confirming {
        /// Current attempt.
        attempt: u32,
    },
    /// The device reported the written value.
    Confirmed,
    /// The write failed or was never confirmed.
    Abandoned,
}

impl WritePhase {
    /// Returns `true` while the attribute is locked by a write.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Dispatching | Self::OptimisticallyApplied | Self::Confirming { .. }
        )
    }
}

/// Final result of an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The device reported the written value.
    Confirmed {
        /// Read-backs needed, including the matching one.
        attempts: u32,
    },
    /// The budget ran out; the optimistic value expires on its own.
    Abandoned {
        /// Read-backs performed.
        attempts: u32,
    },
    /// The session shut down before the write was settled.
    Cancelled,
}

/// Handle to an accepted write.
///
/// Dropping the handle does not stop the confirmation.
#[derive(Debug)]
pub struct WriteHandle {
    value: AttributeValue,
    outcome: oneshot::Receiver<WriteOutcome>,
}

impl WriteHandle {
    /// Returns the written value.
    #[must_use]
    pub fn value(&self) -> AttributeValue {
        self.value
    }

    /// Returns the written attribute.
    #[must_use]
    pub fn attribute(&self) -> Attribute {
        self.value.attribute()
    }

    /// Waits for the confirmation to settle.
    pub async fn outcome(self) -> WriteOutcome {
        self.outcome.await.unwrap_or(WriteOutcome::Cancelled)
    }

    /// Waits for the confirmation and returns the number of read-backs.
    ///
    /// # Errors
    ///
    /// - [`WriteError::ConfirmationAbandoned`] if the budget ran out
    /// - [`WriteError::ShutDown`] if the session shut down first
    pub async fn confirmed(self) -> Result<u32, WriteError> {
        let attribute = self.attribute();
        match self.outcome().await {
            WriteOutcome::Confirmed { attempts } => Ok(attempts),
            WriteOutcome::Abandoned { attempts } => {
                Err(WriteError::ConfirmationAbandoned { attribute, attempts })
            }
            WriteOutcome::Cancelled => Err(WriteError::ShutDown),
        }
    }
}

// ============================================================================
// Per-attribute write lock
// ============================================================================

type PhaseTable = Arc<Mutex<HashMap<Attribute, WritePhase>>>;

/// Exclusive right to write one attribute.
///
/// Dropping the lock without [`release`](Self::release) resets the phase to
/// idle, which covers cancelled dispatches and stopped confirmations.
struct WriteLock {
    phases: PhaseTable,
    attribute: Attribute,
    released: bool,
}

impl WriteLock {
    fn acquire(phases: &PhaseTable, attribute: Attribute) -> Result<Self, WriteError> {
        let mut table = phases.lock();
        if table.get(&attribute).is_some_and(WritePhase::is_active) {
            return Err(WriteError::Busy { attribute });
        }
        table.insert(attribute, WritePhase::Dispatching);
        Ok(Self {
            phases: Arc::clone(phases),
            attribute,
            released: false,
        })
    }

    fn set(&self, phase: WritePhase) {
        self.phases.lock().insert(self.attribute, phase);
    }

    fn release(mut self, phase: WritePhase) {
        self.set(phase);
        self.released = true;
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if !self.released {
            self.set(WritePhase::Idle);
        }
    }
}

// ============================================================================
// ReconciliationController
// ============================================================================

struct Shared<G> {
    gateway: Arc<G>,
    cache: Arc<DeviceStateCache>,
    speed_range: SpeedRange,
    policy: ConfirmationPolicy,
    phases: PhaseTable,
    cancel: CancellationToken,
}

/// Arbitrates writes between observers, the gateway and the cache.
///
/// A write goes through: validation, a fail-fast per-attribute lock,
/// dispatch, an optimistic override in the cache and a background
/// confirmation loop reading the device back on the
/// [`ConfirmationPolicy`] schedule. Writes to different attributes proceed
/// independently.
///
/// The controller is cheap to clone; clones share the same locks.
pub struct ReconciliationController<G> {
    shared: Arc<Shared<G>>,
}

impl<G> Clone for ReconciliationController<G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: Gateway> ReconciliationController<G> {
    /// Creates a controller.
    ///
    /// Cancelling `cancel` stops every confirmation at its next sleep and
    /// refuses further writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    /// if the policy is unusable.
    pub fn new(
        gateway: Arc<G>,
        cache: Arc<DeviceStateCache>,
        speed_range: SpeedRange,
        policy: ConfirmationPolicy,
        cancel: CancellationToken,
    ) -> crate::Result<Self> {
        policy.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                gateway,
                cache,
                speed_range,
                policy,
                phases: Arc::new(Mutex::new(HashMap::new())),
                cancel,
            }),
        })
    }

    /// Returns the cache this controller writes to.
    #[must_use]
    pub fn cache(&self) -> &Arc<DeviceStateCache> {
        &self.shared.cache
    }

    /// Returns the accepted speed range.
    #[must_use]
    pub fn speed_range(&self) -> SpeedRange {
        self.shared.speed_range
    }

    /// Returns the confirmation policy.
    #[must_use]
    pub fn policy(&self) -> ConfirmationPolicy {
        self.shared.policy
    }

    /// Returns the phase of the latest write of an attribute.
    #[must_use]
    pub fn phase(&self, attribute: Attribute) -> WritePhase {
        self.shared
            .phases
            .lock()
            .get(&attribute)
            .copied()
            .unwrap_or_default()
    }

    /// Returns `true` while a write of the attribute is in flight.
    #[must_use]
    pub fn is_busy(&self, attribute: Attribute) -> bool {
        self.phase(attribute).is_active()
    }

    /// Requests a write.
    ///
    /// Returns once the gateway has accepted the command and the optimistic
    /// value is visible in the cache. Confirmation continues in the
    /// background; the returned handle reports how it ends.
    ///
    /// # Errors
    ///
    /// - [`WriteError::Validation`] if the value is out of range; nothing is sent
    /// - [`WriteError::Busy`] if the attribute is already being written
    /// - [`WriteError::WriteFailed`] if the gateway refused the command; the
    ///   cache is untouched
    /// - [`WriteError::ShutDown`] after the session was shut down
    pub async fn request_write(&self, request: WriteRequest) -> Result<WriteHandle, WriteError> {
        let value = request.validate(&self.shared.speed_range)?;
        let attribute = value.attribute();

        if self.shared.cancel.is_cancelled() {
            return Err(WriteError::ShutDown);
        }

        let lock = WriteLock::acquire(&self.shared.phases, attribute)?;

        tracing::debug!(%value, "Dispatching write");

        if let Err(source) = self.shared.gateway.write_attribute(value).await {
            tracing::warn!(%value, error = %source, "Write rejected");
            lock.release(WritePhase::Abandoned);
            return Err(WriteError::WriteFailed { attribute, source });
        }

        lock.set(WritePhase::OptimisticallyApplied);
        self.shared
            .cache
            .set_override(value, self.shared.policy.override_ttl);

        let (tx, rx) = oneshot::channel();
        let confirmation = Confirmation::new(value, self.shared.policy);
        tokio::spawn(confirm(Arc::clone(&self.shared), lock, confirmation, tx));

        Ok(WriteHandle { value, outcome: rx })
    }

    /// Requests a power change.
    ///
    /// # Errors
    ///
    /// See [`request_write`](Self::request_write).
    pub async fn set_power(&self, on: bool) -> Result<WriteHandle, WriteError> {
        self.request_write(WriteRequest::Power(on)).await
    }

    /// Requests a speed change.
    ///
    /// # Errors
    ///
    /// See [`request_write`](Self::request_write).
    pub async fn set_speed(&self, percent: u16) -> Result<WriteHandle, WriteError> {
        self.request_write(WriteRequest::Speed(percent)).await
    }
}

impl<G> std::fmt::Debug for ReconciliationController<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationController")
            .field("speed_range", &self.shared.speed_range)
            .field("policy", &self.shared.policy)
            .field("phases", &*self.shared.phases.lock())
            .finish_non_exhaustive()
    }
}

/// Confirmation loop of one accepted write.
async fn confirm<G: Gateway>(
    shared: Arc<Shared<G>>,
    lock: WriteLock,
    mut confirmation: Confirmation,
    tx: oneshot::Sender<WriteOutcome>,
) {
    let target = confirmation.target();
    let attribute = target.attribute();

    let outcome = loop {
        let Some(delay) = confirmation.next_delay() else {
            break WriteOutcome::Abandoned {
                attempts: confirmation.attempts(),
            };
        };
        let attempt = confirmation.attempts();
        lock.set(WritePhase::Confirming { attempt });
        // Slow reads must not let the value lapse while still confirming.
        shared
            .cache
            .extend_override(target, Instant::now() + shared.policy.override_hold(attempt));

        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break WriteOutcome::Cancelled,
            () = tokio::time::sleep(delay) => {}
        }

        let result = shared.gateway.read_state().await;
        let observation = confirmation.observe(result.as_ref().ok());
        let reported = result.as_ref().ok().map(|attrs| attrs.get(attribute));
        shared.cache.merge(PollOutcome::from(result));

        match observation {
            Observation::Matched => {
                shared.cache.clear_override(attribute);
                break WriteOutcome::Confirmed { attempts: attempt };
            }
            Observation::Mismatched => {
                tracing::debug!(
                    attempt,
                    expected = %target,
                    reported = ?reported,
                    "Write not confirmed yet"
                );
            }
            Observation::ReadFailed => {
                tracing::warn!(attempt, expected = %target, "Confirmation read failed");
            }
        }
    };

    match outcome {
        WriteOutcome::Confirmed { attempts } => {
            tracing::info!(value = %target, attempts, "Write confirmed");
            lock.release(WritePhase::Confirmed);
            let _ = tx.send(outcome);
        }
        WriteOutcome::Abandoned { attempts } => {
            tracing::warn!(value = %target, attempts, "Write not confirmed, keeping optimistic value until expiry");
            lock.release(WritePhase::Abandoned);
            let _ = tx.send(outcome);
            expire_override(&shared, attribute).await;
        }
        WriteOutcome::Cancelled => {
            tracing::debug!(value = %target, "Confirmation cancelled");
            drop(lock);
            let _ = tx.send(outcome);
        }
    }
}

/// Purges the override of an abandoned write once its time-to-live elapses.
async fn expire_override<G>(shared: &Shared<G>, attribute: Attribute) {
    let Some(pending) = shared.cache.pending_override(attribute) else {
        return;
    };

    tokio::select! {
        biased;
        () = shared.cancel.cancelled() => {}
        () = tokio::time::sleep_until(pending.expires_at) => {
            shared.cache.purge_expired();
        }
    }
}
