// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timer-free confirmation state machine.

use std::time::Duration;

use crate::state::DeviceAttributes;
use crate::types::AttributeValue;

use super::ConfirmationPolicy;

/// Result of comparing one read-back with the written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The device reports the written value.
    Matched,
    /// The device reports another value, usually a stale one.
    Mismatched,
    /// The read-back failed.
    ReadFailed,
}

/// Confirmation of one write against the device.
///
/// The caller drives the schedule: [`next_delay`](Self::next_delay) starts
/// an attempt and returns how long to wait before reading, and
/// [`observe`](Self::observe) judges the read. Every attempt counts toward
/// the budget whatever its outcome.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dcrunner_lib::reconcile::{Confirmation, ConfirmationPolicy, Observation};
/// use dcrunner_lib::state::DeviceAttributes;
/// use dcrunner_lib::types::{AttributeValue, MotorSpeed, PowerState};
///
/// let mut confirmation = Confirmation::new(
///     AttributeValue::Power(PowerState::On),
///     ConfirmationPolicy::default(),
/// );
///
/// assert_eq!(confirmation.next_delay(), Some(Duration::from_secs(2)));
/// let stale = DeviceAttributes::new(PowerState::Off, MotorSpeed::new(50).unwrap());
/// assert_eq!(confirmation.observe(Some(&stale)), Observation::Mismatched);
///
/// assert_eq!(confirmation.next_delay(), Some(Duration::from_secs(4)));
/// let fresh = DeviceAttributes::new(PowerState::On, MotorSpeed::new(50).unwrap());
/// assert_eq!(confirmation.observe(Some(&fresh)), Observation::Matched);
/// assert_eq!(confirmation.attempts(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Confirmation {
    target: AttributeValue,
    policy: ConfirmationPolicy,
    attempts: u32,
}

impl Confirmation {
    /// Creates a confirmation for the given written value.
    #[must_use]
    pub fn new(target: AttributeValue, policy: ConfirmationPolicy) -> Self {
        Self {
            target,
            policy,
            attempts: 0,
        }
    }

    /// Returns the value being confirmed.
    #[must_use]
    pub fn target(&self) -> AttributeValue {
        self.target
    }

    /// Returns the number of attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` once every attempt of the budget has been started.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !self.policy.should_retry(self.attempts + 1)
    }

    /// Starts the next attempt and returns the delay before its read.
    ///
    /// Returns `None` when the budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for_attempt(self.attempts))
    }

    /// Judges a read-back. `None` stands for a failed read.
    #[must_use]
    pub fn observe(&self, reported: Option<&DeviceAttributes>) -> Observation {
        match reported {
            Some(attributes) if attributes.matches(&self.target) => Observation::Matched,
            Some(_) => Observation::Mismatched,
            None => Observation::ReadFailed,
        }
    }
}
