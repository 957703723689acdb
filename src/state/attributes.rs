// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute snapshot reported by the device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Attribute, AttributeValue, MotorSpeed, PowerState};

/// A complete, validated attribute snapshot as reported by the cloud API.
///
/// Both attributes are mandatory: a response missing either one is rejected
/// while parsing and never produces a partially filled snapshot. A snapshot
/// is immutable; each successful read replaces the previous one wholesale.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::state::DeviceAttributes;
/// use dcrunner_lib::types::{Attribute, AttributeValue, MotorSpeed, PowerState};
///
/// let attrs = DeviceAttributes::new(PowerState::On, MotorSpeed::new(60).unwrap());
/// assert_eq!(attrs.get(Attribute::Power), AttributeValue::Power(PowerState::On));
/// assert!(attrs.matches(&AttributeValue::Speed(MotorSpeed::new(60).unwrap())));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    power: PowerState,
    speed: MotorSpeed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl DeviceAttributes {
    /// Creates a snapshot without a device timestamp.
    #[must_use]
    pub fn new(power: PowerState, speed: MotorSpeed) -> Self {
        Self {
            power,
            speed,
            updated_at: None,
        }
    }

    /// Attaches the time at which the cloud last heard from the device.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Returns the reported power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Returns the reported motor speed.
    #[must_use]
    pub fn speed(&self) -> MotorSpeed {
        self.speed
    }

    /// Returns the device-side timestamp of this snapshot, if reported.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns the value of one attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> AttributeValue {
        match attribute {
            Attribute::Power => AttributeValue::Power(self.power),
            Attribute::Speed => AttributeValue::Speed(self.speed),
        }
    }

    /// Returns `true` if the snapshot reports exactly `value`.
    #[must_use]
    pub fn matches(&self, value: &AttributeValue) -> bool {
        self.get(value.attribute()) == *value
    }
}
