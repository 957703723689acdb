// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for cache changes.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches changes
//! - [`Subscribable`] - Trait for types that support subscriptions
//!
//! The device never pushes state, so every notification originates from a
//! local cache mutation: a merged read, an optimistic write, a confirmation
//! or an expiry.

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
