// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared device state cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::subscription::CallbackRegistry;
use crate::types::{Attribute, AttributeValue, MotorSpeed, PowerState};

use super::{DeviceAttributes, StateChange};

/// Result of one gateway read, as merged into the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The device reported a complete snapshot.
    Success(DeviceAttributes),
    /// The read failed; the snapshot must be kept.
    Failure(GatewayError),
}

impl From<Result<DeviceAttributes, GatewayError>> for PollOutcome {
    fn from(result: Result<DeviceAttributes, GatewayError>) -> Self {
        match result {
            Ok(attributes) => Self::Success(attributes),
            Err(err) => Self::Failure(err),
        }
    }
}

/// An optimistic value waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOverride {
    /// The value shown to observers.
    pub value: AttributeValue,
    /// When the value stops taking precedence over the device report.
    pub expires_at: Instant,
}

impl PendingOverride {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Consistent view of the cache for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// Effective power state (override first, then device report).
    pub power: Option<PowerState>,
    /// Effective motor speed (override first, then device report).
    pub speed: Option<MotorSpeed>,
    /// Whether the most recent read succeeded.
    pub available: bool,
    /// Last snapshot reported by the device.
    pub last_known: Option<DeviceAttributes>,
    /// Live optimistic overrides, ordered by attribute.
    pub pending: Vec<PendingOverride>,
}

#[derive(Debug, Default)]
struct CacheInner {
    last_known: Option<DeviceAttributes>,
    last_update_succeeded: bool,
    last_updated: Option<Instant>,
    overrides: HashMap<Attribute, PendingOverride>,
}

impl CacheInner {
    fn effective(&self, attribute: Attribute, now: Instant) -> Option<AttributeValue> {
        match self.overrides.get(&attribute) {
            Some(pending) if pending.is_live(now) => Some(pending.value),
            _ => self.last_known.map(|attrs| attrs.get(attribute)),
        }
    }
}

/// Last known state of one device plus pending optimistic writes.
///
/// One cache exists per device session and is shared (behind an [`Arc`])
/// by the poller, the reconciliation controller and every observer.
///
/// Reads give precedence to a live override over the device report. Gateway
/// results replace the report wholesale and never touch overrides; only the
/// controller clears them, or they expire.
///
/// Every mutation notifies the observers of the attached
/// [`CallbackRegistry`] after the internal lock has been released, so
/// observers may read the cache from inside a callback. Mutations from
/// different threads are serialized together with their notifications:
/// observers see changes in the order they were applied. A callback may
/// itself mutate the cache.
///
/// The cache starts unavailable with no snapshot until the first read is
/// merged.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dcrunner_lib::state::{DeviceAttributes, DeviceStateCache, PollOutcome};
/// use dcrunner_lib::types::{Attribute, AttributeValue, MotorSpeed, PowerState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = DeviceStateCache::new();
/// cache.merge(PollOutcome::Success(DeviceAttributes::new(
///     PowerState::Off,
///     MotorSpeed::new(40).unwrap(),
/// )));
///
/// cache.set_override(AttributeValue::Power(PowerState::On), Duration::from_secs(30));
/// assert_eq!(cache.read(Attribute::Power), Some(AttributeValue::Power(PowerState::On)));
///
/// cache.clear_override(Attribute::Power);
/// assert_eq!(cache.read(Attribute::Power), Some(AttributeValue::Power(PowerState::Off)));
/// # }
/// ```
pub struct DeviceStateCache {
    inner: Mutex<CacheInner>,
    // Held across "mutate + dispatch"; reentrant for callbacks that mutate.
    ordered: ReentrantMutex<()>,
    callbacks: Arc<CallbackRegistry>,
}

impl DeviceStateCache {
    /// Creates an empty cache with its own callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_callbacks(Arc::new(CallbackRegistry::new()))
    }

    /// Creates an empty cache notifying the given registry.
    #[must_use]
    pub fn with_callbacks(callbacks: Arc<CallbackRegistry>) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            ordered: ReentrantMutex::new(()),
            callbacks,
        }
    }

    /// Returns the registry notified on every mutation.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    // ========== Reads ==========

    /// Returns the effective value of an attribute.
    ///
    /// A live override wins; otherwise the last device report is used;
    /// otherwise the value is unknown.
    #[must_use]
    pub fn read(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.inner.lock().effective(attribute, Instant::now())
    }

    /// Returns the effective power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.read(Attribute::Power).and_then(|v| v.as_power())
    }

    /// Returns the effective motor speed.
    #[must_use]
    pub fn speed(&self) -> Option<MotorSpeed> {
        self.read(Attribute::Speed).and_then(|v| v.as_speed())
    }

    /// Returns the last snapshot reported by the device, ignoring overrides.
    #[must_use]
    pub fn last_known(&self) -> Option<DeviceAttributes> {
        self.inner.lock().last_known
    }

    /// Returns whether the most recent read succeeded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.lock().last_update_succeeded
    }

    /// Returns when a read last succeeded.
    #[must_use]
    pub fn last_updated(&self) -> Option<Instant> {
        self.inner.lock().last_updated
    }

    /// Returns the live override for an attribute, if any.
    #[must_use]
    pub fn pending_override(&self, attribute: Attribute) -> Option<PendingOverride> {
        let now = Instant::now();
        self.inner
            .lock()
            .overrides
            .get(&attribute)
            .filter(|pending| pending.is_live(now))
            .copied()
    }

    /// Returns a consistent view of the whole cache.
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut pending: Vec<PendingOverride> = inner
            .overrides
            .values()
            .filter(|pending| pending.is_live(now))
            .copied()
            .collect();
        pending.sort_by_key(|pending| pending.value.attribute());

        CacheSnapshot {
            power: inner
                .effective(Attribute::Power, now)
                .and_then(|v| v.as_power()),
            speed: inner
                .effective(Attribute::Speed, now)
                .and_then(|v| v.as_speed()),
            available: inner.last_update_succeeded,
            last_known: inner.last_known,
            pending,
        }
    }

    // ========== Mutations ==========

    /// Merges the result of a gateway read.
    ///
    /// A success replaces the last known snapshot and marks the device
    /// available. A failure keeps the snapshot and marks it unavailable.
    /// Overrides are left untouched in both cases.
    pub fn merge(&self, outcome: PollOutcome) {
        let _ordered = self.ordered.lock();
        let (change, availability_changed) = {
            let mut inner = self.inner.lock();
            let was_available = inner.last_update_succeeded;
            let change = match outcome {
                PollOutcome::Success(attributes) => {
                    inner.last_known = Some(attributes);
                    inner.last_update_succeeded = true;
                    inner.last_updated = Some(Instant::now());
                    StateChange::Refreshed(attributes)
                }
                PollOutcome::Failure(err) => {
                    inner.last_update_succeeded = false;
                    StateChange::RefreshFailed(err)
                }
            };
            let now_available = inner.last_update_succeeded;
            (change, (was_available != now_available).then_some(now_available))
        };

        self.callbacks.dispatch(&change);
        if let Some(available) = availability_changed {
            tracing::debug!(available, "Device availability changed");
            self.callbacks.dispatch_availability(available);
        }
    }

    /// Installs or replaces the optimistic value for an attribute.
    ///
    /// Returns the expiry instant of the new override.
    pub fn set_override(&self, value: AttributeValue, ttl: Duration) -> Instant {
        let _ordered = self.ordered.lock();
        let expires_at = Instant::now() + ttl;
        self.inner.lock().overrides.insert(
            value.attribute(),
            PendingOverride { value, expires_at },
        );

        self.callbacks.dispatch(&StateChange::OverrideSet { value });
        expires_at
    }

    /// Keeps the live override of `value` visible until at least `until`.
    ///
    /// Never shortens an override and ignores a different or expired one.
    /// Returns the resulting expiry, or `None` if nothing was extended. The
    /// value seen by observers does not change, so nobody is notified.
    pub fn extend_override(&self, value: AttributeValue, until: Instant) -> Option<Instant> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let pending = inner
            .overrides
            .get_mut(&value.attribute())
            .filter(|pending| pending.value == value && pending.is_live(now))?;
        pending.expires_at = pending.expires_at.max(until);
        Some(pending.expires_at)
    }

    /// Removes the override for an attribute, expired or not.
    ///
    /// Returns the removed value. Observers are only notified if an override
    /// was present.
    pub fn clear_override(&self, attribute: Attribute) -> Option<AttributeValue> {
        let _ordered = self.ordered.lock();
        let removed = self.inner.lock().overrides.remove(&attribute);
        removed.map(|pending| {
            self.callbacks
                .dispatch(&StateChange::OverrideCleared { attribute });
            pending.value
        })
    }

    /// Removes every override whose time-to-live has elapsed.
    ///
    /// Returns the attributes that expired, in attribute order.
    pub fn purge_expired(&self) -> Vec<Attribute> {
        let _ordered = self.ordered.lock();
        let now = Instant::now();
        let mut expired: Vec<Attribute> = {
            let mut inner = self.inner.lock();
            let expired: Vec<Attribute> = inner
                .overrides
                .iter()
                .filter(|(_, pending)| !pending.is_live(now))
                .map(|(attribute, _)| *attribute)
                .collect();
            for attribute in &expired {
                inner.overrides.remove(attribute);
            }
            expired
        };
        expired.sort();

        for attribute in &expired {
            tracing::debug!(%attribute, "Optimistic value expired");
            self.callbacks
                .dispatch(&StateChange::OverrideExpired { attribute: *attribute });
        }
        expired
    }
}

impl Default for DeviceStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DeviceStateCache")
            .field("last_known", &inner.last_known)
            .field("available", &inner.last_update_succeeded)
            .field("overrides", &inner.overrides.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn attrs(power: bool, speed: u16) -> DeviceAttributes {
        DeviceAttributes::new(PowerState::from(power), MotorSpeed::new(speed).unwrap())
    }

    fn speed(value: u16) -> AttributeValue {
        AttributeValue::Speed(MotorSpeed::new(value).unwrap())
    }

    fn recorder(cache: &DeviceStateCache) -> Arc<StdMutex<Vec<StateChange>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        cache
            .callbacks()
            .on_state_changed(move |change| seen_clone.lock().unwrap().push(change.clone()));
        seen
    }

    #[test]
    fn empty_cache_reads_absent() {
        let cache = DeviceStateCache::new();
        assert_eq!(cache.read(Attribute::Power), None);
        assert_eq!(cache.read(Attribute::Speed), None);
        assert!(!cache.is_available());
        assert!(cache.last_updated().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn success_replaces_snapshot_wholesale() {
        let cache = DeviceStateCache::new();
        cache.merge(PollOutcome::Success(attrs(false, 40)));
        cache.merge(PollOutcome::Success(attrs(true, 70)));

        assert_eq!(cache.last_known(), Some(attrs(true, 70)));
        assert_eq!(cache.power(), Some(PowerState::On));
        assert_eq!(cache.speed().unwrap().value(), 70);
        assert!(cache.is_available());
        assert!(cache.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_snapshot_and_flips_availability() {
        let cache = DeviceStateCache::new();
        cache.merge(PollOutcome::Success(attrs(true, 55)));
        cache.merge(PollOutcome::Failure(GatewayError::Unreachable(
            "timeout".into(),
        )));

        assert!(!cache.is_available());
        assert_eq!(cache.last_known(), Some(attrs(true, 55)));
        assert_eq!(cache.speed().unwrap().value(), 55);
    }

    #[tokio::test(start_paused = true)]
    async fn live_override_wins_over_snapshot() {
        let cache = DeviceStateCache::new();
        cache.merge(PollOutcome::Success(attrs(false, 40)));
        cache.set_override(speed(80), Duration::from_secs(10));

        assert_eq!(cache.read(Attribute::Speed), Some(speed(80)));
        // Power has no override.
        assert_eq!(cache.power(), Some(PowerState::Off));
    }

    #[tokio::test(start_paused = true)]
    async fn override_without_snapshot_is_readable() {
        let cache = DeviceStateCache::new();
        cache.set_override(speed(60), Duration::from_secs(10));
        assert_eq!(cache.read(Attribute::Speed), Some(speed(60)));
        assert_eq!(cache.read(Attribute::Power), None);
    }

    #[tokio::test(start_paused = true)]
    async fn merge_does_not_clear_overrides() {
        let cache = DeviceStateCache::new();
        cache.set_override(speed(60), Duration::from_secs(10));
        cache.merge(PollOutcome::Success(attrs(true, 60)));

        assert!(cache.pending_override(Attribute::Speed).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_override_falls_back_to_snapshot() {
        let cache = DeviceStateCache::new();
        cache.merge(PollOutcome::Success(attrs(false, 40)));
        cache.set_override(speed(80), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(cache.read(Attribute::Speed), Some(speed(40)));
        assert!(cache.pending_override(Attribute::Speed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn new_override_replaces_previous() {
        let cache = DeviceStateCache::new();
        cache.set_override(speed(50), Duration::from_secs(5));
        let expires = cache.set_override(speed(70), Duration::from_secs(20));

        let pending = cache.pending_override(Attribute::Speed).unwrap();
        assert_eq!(pending.value, speed(70));
        assert_eq!(pending.expires_at, expires);
        assert_eq!(cache.snapshot().pending.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let cache = DeviceStateCache::new();
        cache.set_override(speed(50), Duration::from_secs(5));
        cache.set_override(AttributeValue::Power(PowerState::On), Duration::from_secs(60));
        let seen = recorder(&cache);

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), vec![Attribute::Speed]);
        assert!(cache.pending_override(Attribute::Power).is_some());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StateChange::OverrideExpired {
                attribute: Attribute::Speed
            }]
        );
        assert!(cache.purge_expired().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_override_notifies_only_when_present() {
        let cache = DeviceStateCache::new();
        let seen = recorder(&cache);

        assert_eq!(cache.clear_override(Attribute::Power), None);
        assert!(seen.lock().unwrap().is_empty());

        cache.set_override(AttributeValue::Power(PowerState::On), Duration::from_secs(5));
        assert_eq!(
            cache.clear_override(Attribute::Power),
            Some(AttributeValue::Power(PowerState::On))
        );
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_mutation_notifies_in_order() {
        let cache = DeviceStateCache::new();
        let seen = recorder(&cache);
        let err = GatewayError::MalformedResponse("missing attr".into());

        cache.merge(PollOutcome::Success(attrs(false, 40)));
        cache.set_override(speed(60), Duration::from_secs(5));
        cache.merge(PollOutcome::Failure(err.clone()));
        cache.clear_override(Attribute::Speed);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StateChange::Refreshed(attrs(false, 40)),
                StateChange::OverrideSet { value: speed(60) },
                StateChange::RefreshFailed(err),
                StateChange::OverrideCleared {
                    attribute: Attribute::Speed
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn availability_callbacks_fire_on_transitions_only() {
        let cache = DeviceStateCache::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        cache
            .callbacks()
            .on_availability_changed(move |available| seen_clone.lock().unwrap().push(available));

        let failure = || PollOutcome::Failure(GatewayError::Unreachable("down".into()));
        cache.merge(PollOutcome::Success(attrs(true, 40)));
        cache.merge(PollOutcome::Success(attrs(true, 40)));
        cache.merge(failure());
        cache.merge(failure());
        cache.merge(PollOutcome::Success(attrs(true, 40)));

        assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_read_cache() {
        let cache = Arc::new(DeviceStateCache::new());
        let observed = Arc::new(StdMutex::new(None));

        let cache_clone = Arc::clone(&cache);
        let observed_clone = Arc::clone(&observed);
        cache.callbacks().on_state_changed(move |_| {
            *observed_clone.lock().unwrap() = cache_clone.speed();
        });

        cache.set_override(speed(90), Duration::from_secs(5));
        assert_eq!(observed.lock().unwrap().unwrap().value(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn extend_override_only_pushes_matching_live_value() {
        let cache = DeviceStateCache::new();
        let seen = recorder(&cache);
        let first = cache.set_override(speed(60), Duration::from_secs(10));

        // Never shortened.
        let earlier = Instant::now() + Duration::from_secs(5);
        assert_eq!(cache.extend_override(speed(60), earlier), Some(first));

        let later = Instant::now() + Duration::from_secs(30);
        assert_eq!(cache.extend_override(speed(60), later), Some(later));
        assert_eq!(cache.extend_override(speed(70), later + Duration::from_secs(1)), None);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.extend_override(speed(60), Instant::now() + Duration::from_secs(5)), None);

        // Only the initial install was announced.
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn notifications_follow_mutation_order_across_threads() {
        let cache = DeviceStateCache::new();
        cache.merge(PollOutcome::Success(attrs(true, 50)));

        let delivered = Arc::new(StdMutex::new(Vec::new()));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let delivered_clone = Arc::clone(&delivered);
        cache.callbacks().on_availability_changed(move |available| {
            delivered_clone.lock().unwrap().push(available);
            if !available {
                let _ = entered_tx.send(());
                std::thread::sleep(Duration::from_millis(200));
            }
        });

        std::thread::scope(|scope| {
            let failing = scope.spawn(|| {
                cache.merge(PollOutcome::Failure(GatewayError::Unreachable(
                    "timeout".into(),
                )));
            });
            // The failure is being delivered; this merge must wait for it.
            entered_rx.recv().unwrap();
            cache.merge(PollOutcome::Success(attrs(true, 50)));
            failing.join().unwrap();
        });

        assert!(cache.is_available());
        assert_eq!(*delivered.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_mutate_cache() {
        let cache = Arc::new(DeviceStateCache::new());
        cache.set_override(speed(60), Duration::from_secs(10));

        let cache_clone = Arc::clone(&cache);
        cache.callbacks().on_state_changed(move |change| {
            if matches!(change, StateChange::Refreshed(a) if a.speed().value() == 60) {
                cache_clone.clear_override(Attribute::Speed);
            }
        });

        cache.merge(PollOutcome::Success(attrs(true, 60)));
        assert!(cache.pending_override(Attribute::Speed).is_none());
    }

    #[test]
    fn poll_outcome_from_result() {
        let ok: Result<DeviceAttributes, GatewayError> = Ok(attrs(true, 30));
        assert_eq!(PollOutcome::from(ok), PollOutcome::Success(attrs(true, 30)));

        let err: Result<DeviceAttributes, GatewayError> =
            Err(GatewayError::Unreachable("x".into()));
        assert!(matches!(PollOutcome::from(err), PollOutcome::Failure(_)));
    }
}
