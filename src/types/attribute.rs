// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device attributes and write requests.

use std::fmt;

use crate::error::ValueError;

use super::{MotorSpeed, PowerState, SpeedRange};

/// A mutable attribute of the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    /// Run/stop switch (`SwitchON`).
    Power,
    /// Motor speed in percent (`Motor_Speed`).
    Speed,
}

impl Attribute {
    /// All attributes, in a stable order.
    pub const ALL: [Self; 2] = [Self::Power, Self::Speed];

    /// Returns the attribute name used by the cloud API.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Power => "SwitchON",
            Self::Speed => "Motor_Speed",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A typed value for one [`Attribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// Power state.
    Power(PowerState),
    /// Motor speed.
    Speed(MotorSpeed),
}

impl AttributeValue {
    /// Returns the attribute this value belongs to.
    #[must_use]
    pub const fn attribute(&self) -> Attribute {
        match self {
            Self::Power(_) => Attribute::Power,
            Self::Speed(_) => Attribute::Speed,
        }
    }

    /// Returns the JSON value sent to the cloud API.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Power(state) => serde_json::Value::from(state.as_num()),
            Self::Speed(speed) => serde_json::Value::from(speed.value()),
        }
    }

    /// Returns the power state, if this is a power value.
    #[must_use]
    pub const fn as_power(&self) -> Option<PowerState> {
        match self {
            Self::Power(state) => Some(*state),
            Self::Speed(_) => None,
        }
    }

    /// Returns the motor speed, if this is a speed value.
    #[must_use]
    pub const fn as_speed(&self) -> Option<MotorSpeed> {
        match self {
            Self::Speed(speed) => Some(*speed),
            Self::Power(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Power(state) => write!(f, "{}={state}", self.attribute()),
            Self::Speed(speed) => write!(f, "{}={speed}", self.attribute()),
        }
    }
}

/// An unvalidated write requested by an observer.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::types::{Attribute, SpeedRange, WriteRequest};
///
/// let range = SpeedRange::default();
/// let value = WriteRequest::Speed(60).validate(&range).unwrap();
/// assert_eq!(value.attribute(), Attribute::Speed);
///
/// assert!(WriteRequest::Speed(150).validate(&range).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRequest {
    /// Start (`true`) or stop (`false`) the pump.
    Power(bool),
    /// Set the motor speed in percent.
    Speed(u16),
}

impl WriteRequest {
    /// Returns the attribute targeted by this request.
    #[must_use]
    pub const fn attribute(&self) -> Attribute {
        match self {
            Self::Power(_) => Attribute::Power,
            Self::Speed(_) => Attribute::Speed,
        }
    }

    /// Checks the request against the configured constraints.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if a speed lies outside `range`.
    pub fn validate(&self, range: &SpeedRange) -> Result<AttributeValue, ValueError> {
        match *self {
            Self::Power(on) => Ok(AttributeValue::Power(PowerState::from(on))),
            Self::Speed(raw) => range.validate(raw).map(AttributeValue::Speed),
        }
    }
}
