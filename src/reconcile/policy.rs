// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Confirmation schedule configuration.

use std::time::Duration;

use crate::error::Error;

/// Schedule used to confirm a write by reading the device back.
///
/// Attempt `n` (1-based) waits `min(step * n, max_delay)` before reading.
/// [`validate`](Self::validate) requires the optimistic value to live at
/// least as long as the whole schedule.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dcrunner_lib::reconcile::ConfirmationPolicy;
///
/// let policy = ConfirmationPolicy::default();
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
/// assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
/// assert_eq!(policy.total_delay(), Duration::from_secs(30));
///
/// let policy = ConfirmationPolicy::new()
///     .with_max_attempts(3)
///     .with_step(Duration::from_secs(1))
///     .with_override_ttl(Duration::from_secs(10));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Maximum number of read-backs before giving up.
    pub max_attempts: u32,
    /// Delay increment between read-backs.
    pub step: Duration,
    /// Upper bound of a single delay.
    pub max_delay: Duration,
    /// Lifetime of the optimistic value.
    pub override_ttl: Duration,
}

impl ConfirmationPolicy {
    /// Default number of read-backs.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default delay increment.
    pub const DEFAULT_STEP: Duration = Duration::from_secs(2);
    /// Default cap of a single delay.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
    /// Default lifetime of an optimistic value.
    pub const DEFAULT_OVERRIDE_TTL: Duration = Duration::from_secs(45);

    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of read-backs.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay increment.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Sets the cap of a single delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the lifetime of the optimistic value.
    #[must_use]
    pub fn with_override_ttl(mut self, ttl: Duration) -> Self {
        self.override_ttl = ttl;
        self
    }

    /// Calculates the delay before a given 1-based attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.step
            .checked_mul(attempt.max(1))
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
    }

    /// Returns true if the given 1-based attempt is within budget.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    /// Returns the sum of every delay in the schedule.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Returns how long the optimistic value must stay visible when the
    /// given 1-based attempt is about to wait.
    ///
    /// This is the rest of the schedule plus the slack the time-to-live
    /// leaves over [`total_delay`](Self::total_delay). For attempt 1 it
    /// equals the time-to-live; re-arming with it before every attempt
    /// keeps the value visible however long the reads themselves take.
    #[must_use]
    pub fn override_hold(&self, attempt: u32) -> Duration {
        let remaining = (attempt.max(1)..=self.max_attempts)
            .map(|n| self.delay_for_attempt(n))
            .fold(Duration::ZERO, Duration::saturating_add);
        let slack = self.override_ttl.saturating_sub(self.total_delay());
        remaining.saturating_add(slack)
    }

    /// Checks that the schedule is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if there are no attempts, if
    /// a delay is zero, if the delays never grow, or if the override would
    /// expire before the last read-back.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfiguration(
                "confirmation needs at least one attempt".to_string(),
            ));
        }
        if self.step.is_zero() || self.max_delay.is_zero() {
            return Err(Error::InvalidConfiguration(
                "confirmation delays must be positive".to_string(),
            ));
        }
        if self.max_attempts > 1 && self.max_delay <= self.step {
            return Err(Error::InvalidConfiguration(format!(
                "confirmation delay cap {:?} must exceed the step {:?}",
                self.max_delay, self.step
            )));
        }
        let total = self.total_delay();
        if self.override_ttl < total {
            return Err(Error::InvalidConfiguration(format!(
                "override TTL {:?} is shorter than the confirmation schedule {:?}",
                self.override_ttl, total
            )));
        }
        Ok(())
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            step: Self::DEFAULT_STEP,
            max_delay: Self::DEFAULT_MAX_DELAY,
            override_ttl: Self::DEFAULT_OVERRIDE_TTL,
        }
    }
}
