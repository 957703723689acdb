// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state of the pump.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Represents the power state of the pump.
///
/// The cloud API encodes it in the `SwitchON` attribute as `1`/`0`; some
/// firmware revisions report a JSON boolean instead.
///
/// # Examples
///
/// ```
/// use dcrunner_lib::types::PowerState;
///
/// assert_eq!(PowerState::from(true), PowerState::On);
/// assert_eq!(PowerState::On.as_num(), 1);
/// assert!("off".parse::<PowerState>().unwrap().is_off());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    /// Pump is stopped.
    Off,
    /// Pump is running.
    On,
}

impl PowerState {
    /// Returns the display string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns the numeric value used on the wire.
    #[must_use]
    pub const fn as_num(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    /// Returns `true` if the pump is running.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns `true` if the pump is stopped.
    #[must_use]
    pub const fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }

    /// Interprets a raw JSON attribute value.
    ///
    /// Accepts `0`/`1` and `false`/`true`.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidPowerState` for any other value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ValueError> {
        match value {
            serde_json::Value::Bool(on) => Ok(Self::from(*on)),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Self::Off),
                Some(1) => Ok(Self::On),
                _ => Err(ValueError::InvalidPowerState(n.to_string())),
            },
            other => Err(ValueError::InvalidPowerState(other.to_string())),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OFF" | "0" | "FALSE" => Ok(Self::Off),
            "ON" | "1" | "TRUE" => Ok(Self::On),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<PowerState> for bool {
    fn from(value: PowerState) -> Self {
        value.is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_as_str() {
        assert_eq!(PowerState::Off.as_str(), "OFF");
        assert_eq!(PowerState::On.as_str(), "ON");
    }

    #[test]
    fn power_state_from_str() {
        assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
        assert_eq!("1".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("false".parse::<PowerState>().unwrap(), PowerState::Off);
    }

    #[test]
    fn power_state_from_str_invalid() {
        let result = "toggle".parse::<PowerState>();
        assert!(matches!(
            result.unwrap_err(),
            ValueError::InvalidPowerState(_)
        ));
    }

    #[test]
    fn power_state_from_json_numbers_and_bools() {
        assert_eq!(
            PowerState::from_json(&serde_json::json!(1)).unwrap(),
            PowerState::On
        );
        assert_eq!(
            PowerState::from_json(&serde_json::json!(0)).unwrap(),
            PowerState::Off
        );
        assert_eq!(
            PowerState::from_json(&serde_json::json!(true)).unwrap(),
            PowerState::On
        );
    }

    #[test]
    fn power_state_from_json_rejects_other_values() {
        assert!(PowerState::from_json(&serde_json::json!(2)).is_err());
        assert!(PowerState::from_json(&serde_json::json!("ON")).is_err());
        assert!(PowerState::from_json(&serde_json::Value::Null).is_err());
    }

    #[test]
    fn power_state_bool_round_trip() {
        assert!(bool::from(PowerState::from(true)));
        assert!(!bool::from(PowerState::from(false)));
    }
}
