// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for cache subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Ordered registry for storing and dispatching callbacks

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateChange;

/// Unique identifier for a subscription.
///
/// IDs increase monotonically, so ordering by ID is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for state change callbacks.
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Type alias for availability callbacks.
type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry for cache observers.
///
/// Callbacks are delivered synchronously on the task that mutated the cache,
/// in registration order. The registry lock is released before callbacks
/// run, so a callback may read the cache, subscribe or unsubscribe.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Callbacks receiving every cache mutation.
    state_changed_callbacks: RwLock<BTreeMap<SubscriptionId, StateChangedCallback>>,
    /// Callbacks receiving availability transitions.
    availability_callbacks: RwLock<BTreeMap<SubscriptionId, AvailabilityCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed_callbacks: RwLock::new(BTreeMap::new()),
            availability_callbacks: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for every cache mutation.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for availability transitions.
    ///
    /// The callback receives the new availability and is only called when
    /// it actually changes.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.state_changed_callbacks.write().remove(&id).is_some() {
            return true;
        }
        self.availability_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_changed_callbacks.write().clear();
        self.availability_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches a cache mutation to every state change callback.
    pub fn dispatch(&self, change: &StateChange) {
        let callbacks: Vec<StateChangedCallback> =
            self.state_changed_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(change);
        }
    }

    /// Dispatches an availability transition.
    pub fn dispatch_availability(&self, available: bool) {
        let callbacks: Vec<AvailabilityCallback> =
            self.availability_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(available);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed_callbacks.read().len() + self.availability_callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish_non_exhaustive()
    }
}
