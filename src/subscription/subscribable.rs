// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types exposing cache notifications.

use crate::state::StateChange;
use crate::subscription::SubscriptionId;

/// Trait for types that support change subscriptions.
///
/// Callbacks run synchronously on the task that mutated the cache, in
/// registration order. They must not block.
///
/// # Examples
///
/// ```no_run
/// use dcrunner_lib::session::DeviceSession;
/// use dcrunner_lib::subscription::Subscribable;
/// # use dcrunner_lib::protocol::Gateway;
///
/// # fn example<G: Gateway>(session: &DeviceSession<G>) {
/// let sub_id = session.on_state_changed(|change| {
///     println!("Cache changed: {change:?}");
/// });
///
/// session.on_availability_changed(|available| {
///     println!("Device available: {available}");
/// });
///
/// session.unsubscribe(sub_id);
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to every cache mutation.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Subscribes to availability transitions.
    ///
    /// The callback receives the new availability.
    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
