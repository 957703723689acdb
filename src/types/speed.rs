// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor speed types.
//!
//! [`MotorSpeed`] is any value the device can report (0-100 %).
//! [`SpeedRange`] is the narrower, configured window that writes must
//! respect; the DC Runner stalls below roughly 30 %.

use std::fmt;

use crate::error::ValueError;

/// Motor speed in percent (0-100) as reported by the device.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::types::MotorSpeed;
///
/// let speed = MotorSpeed::new(75).unwrap();
/// assert_eq!(speed.value(), 75);
/// assert!(MotorSpeed::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct MotorSpeed(u8);

impl MotorSpeed {
    /// Lowest value the device accepts.
    pub const MIN: u8 = 0;

    /// Highest value the device accepts.
    pub const MAX: u8 = 100;

    /// Creates a new motor speed.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is above 100.
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if value > u16::from(Self::MAX) {
            return Err(ValueError::OutOfRange {
                min: u16::from(Self::MIN),
                max: u16::from(Self::MAX),
                actual: value,
            });
        }
        // Bounded by MAX above.
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(value as u8))
    }

    /// Returns the speed value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for MotorSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u16> for MotorSpeed {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MotorSpeed> for u16 {
    fn from(value: MotorSpeed) -> Self {
        u16::from(value.0)
    }
}

/// Inclusive speed window accepted for writes.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::types::SpeedRange;
///
/// let range = SpeedRange::default();
/// assert_eq!((range.min(), range.max()), (30, 100));
/// assert!(range.validate(50).is_ok());
/// assert!(range.validate(150).is_err());
/// assert!(range.validate(20).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedRange {
    min: u8,
    max: u8,
}

impl SpeedRange {
    /// Default lower bound.
    pub const DEFAULT_MIN: u8 = 30;

    /// Default upper bound.
    pub const DEFAULT_MAX: u8 = 100;

    /// Creates a new range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `max` exceeds the device limit,
    /// or `ValueError::InvalidRange` if `min > max`.
    pub fn new(min: u8, max: u8) -> Result<Self, ValueError> {
        if max > MotorSpeed::MAX {
            return Err(ValueError::OutOfRange {
                min: u16::from(MotorSpeed::MIN),
                max: u16::from(MotorSpeed::MAX),
                actual: u16::from(max),
            });
        }
        if min > max {
            return Err(ValueError::InvalidRange {
                min: u16::from(min),
                max: u16::from(max),
            });
        }
        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> u8 {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> u8 {
        self.max
    }

    /// Returns `true` if `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: u16) -> bool {
        (u16::from(self.min)..=u16::from(self.max)).contains(&value)
    }

    /// Validates a requested speed.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `value` lies outside the range.
    pub fn validate(&self, value: u16) -> Result<MotorSpeed, ValueError> {
        if !self.contains(value) {
            return Err(ValueError::OutOfRange {
                min: u16::from(self.min),
                max: u16::from(self.max),
                actual: value,
            });
        }
        MotorSpeed::new(value)
    }
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
