// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write reconciliation.
//!
//! The device accepts commands without applying them synchronously and
//! reports state only when polled. Every write therefore goes through an
//! optimistic phase, during which observers see the requested value, and a
//! confirmation phase, during which the device is read back on a backoff
//! schedule until it reports the value or the budget runs out.
//!
//! - [`ConfirmationPolicy`] - Backoff schedule and override lifetime
//! - [`Confirmation`] - Timer-free state machine of one confirmation
//! - [`ReconciliationController`] - Dispatches writes and runs confirmations
//! - [`WriteHandle`] - Reports how an accepted write ends

mod confirmation;
mod controller;
mod policy;

pub use confirmation::{Confirmation, Observation};
pub use controller::{ReconciliationController, WriteHandle, WriteOutcome, WritePhase};
pub use policy::ConfirmationPolicy;
