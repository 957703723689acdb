// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceAttributes`] is an immutable snapshot reported by the device.
//! [`DeviceStateCache`] holds the last snapshot together with pending
//! optimistic writes, and [`StateChange`] describes each mutation of the
//! cache to observers.

mod attributes;
mod cache;
mod state_change;

pub use attributes::DeviceAttributes;
pub use cache::{CacheSnapshot, DeviceStateCache, PendingOverride, PollOutcome};
pub use state_change::StateChange;
