// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session configuration.

use crate::reconcile::ConfirmationPolicy;
use crate::types::{SpeedRange, UpdateInterval};

/// Configuration of a device session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dcrunner_lib::reconcile::ConfirmationPolicy;
/// use dcrunner_lib::session::SessionConfig;
/// use dcrunner_lib::types::{SpeedRange, UpdateInterval};
///
/// let config = SessionConfig::new()
///     .with_speed_range(SpeedRange::new(40, 90).unwrap())
///     .with_poll_interval(UpdateInterval::new(60).unwrap())
///     .with_confirmation(ConfirmationPolicy::new().with_max_attempts(3));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    /// Speeds accepted by writes.
    pub speed_range: SpeedRange,
    /// Initial cadence of the background poller.
    pub poll_interval: UpdateInterval,
    /// Confirmation schedule of writes.
    pub confirmation: ConfirmationPolicy,
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accepted speed range.
    #[must_use]
    pub fn with_speed_range(mut self, range: SpeedRange) -> Self {
        self.speed_range = range;
        self
    }

    /// Sets the initial poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: UpdateInterval) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the confirmation policy.
    #[must_use]
    pub fn with_confirmation(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    /// if the confirmation policy is invalid.
    pub fn validate(&self) -> crate::Result<()> {
        self.confirmation.validate()
    }
}
