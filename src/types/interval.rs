// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling interval type.

use std::fmt;
use std::time::Duration;

use crate::error::ValueError;

/// Interval between two background polls, in seconds (5-300).
///
/// This is a purely local setting: it governs how often the session reads
/// the device and is never written to or confirmed against the device.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dcrunner_lib::types::UpdateInterval;
///
/// let interval = UpdateInterval::new(15).unwrap();
/// assert_eq!(interval.as_duration(), Duration::from_secs(15));
/// assert!(UpdateInterval::new(2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateInterval(u16);

impl UpdateInterval {
    /// Shortest allowed interval in seconds.
    pub const MIN: u16 = 5;

    /// Longest allowed interval in seconds.
    pub const MAX: u16 = 300;

    /// Default interval in seconds.
    pub const DEFAULT: Self = Self(30);

    /// Creates a new interval.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `seconds` is outside [5, 300].
    pub fn new(seconds: u16) -> Result<Self, ValueError> {
        if !(Self::MIN..=Self::MAX).contains(&seconds) {
            return Err(ValueError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: seconds,
            });
        }
        Ok(Self(seconds))
    }

    /// Returns the interval in seconds.
    #[must_use]
    pub const fn seconds(&self) -> u16 {
        self.0
    }

    /// Returns the interval as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for UpdateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl TryFrom<u16> for UpdateInterval {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
