// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the `devdata/<did>/latest` endpoint.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::state::DeviceAttributes;
use crate::types::{Attribute, MotorSpeed, PowerState};

/// Legacy name of the power attribute on older firmware.
const LEGACY_POWER_FIELD: &str = "PowerState";

/// Response of the latest-data endpoint.
///
/// The cloud wraps the device attributes in an `attr` object:
///
/// ```json
/// {"did": "abc", "updated_at": 1700000000, "attr": {"SwitchON": 1, "Motor_Speed": 60}}
/// ```
///
/// # Examples
///
/// ```
/// use dcrunner_lib::response::LatestDataResponse;
/// use dcrunner_lib::types::PowerState;
///
/// let json = r#"{"did":"abc","attr":{"SwitchON":1,"Motor_Speed":60}}"#;
/// let response: LatestDataResponse = serde_json::from_str(json).unwrap();
/// let attrs = response.into_attributes().unwrap();
/// assert_eq!(attrs.power(), PowerState::On);
/// assert_eq!(attrs.speed().value(), 60);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestDataResponse {
    /// Device identifier echoed by the cloud.
    #[serde(default)]
    did: Option<String>,

    /// Unix timestamp of the last report from the device.
    #[serde(default)]
    updated_at: Option<i64>,

    /// Raw attribute map.
    #[serde(default)]
    attr: Option<Map<String, Value>>,
}

impl LatestDataResponse {
    /// Returns the device identifier, if echoed.
    #[must_use]
    pub fn did(&self) -> Option<&str> {
        self.did.as_deref()
    }

    /// Returns the raw attribute map.
    #[must_use]
    pub fn raw_attributes(&self) -> Option<&Map<String, Value>> {
        self.attr.as_ref()
    }

    /// Validates the payload into a typed snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingField` if `attr` or one of the attributes
    /// is absent, and `ParseError::InvalidValue` if a value has the wrong
    /// type or range. Missing values are never defaulted.
    pub fn into_attributes(self) -> Result<DeviceAttributes, ParseError> {
        let attr = self
            .attr
            .ok_or_else(|| ParseError::MissingField("attr".to_string()))?;

        let power_field = Attribute::Power.wire_name();
        let raw_power = attr
            .get(power_field)
            .or_else(|| attr.get(LEGACY_POWER_FIELD))
            .ok_or_else(|| ParseError::MissingField(power_field.to_string()))?;
        let power = PowerState::from_json(raw_power).map_err(|e| ParseError::InvalidValue {
            field: power_field.to_string(),
            message: e.to_string(),
        })?;

        let speed_field = Attribute::Speed.wire_name();
        let raw_speed = attr
            .get(speed_field)
            .ok_or_else(|| ParseError::MissingField(speed_field.to_string()))?;
        let speed = raw_speed
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| ParseError::InvalidValue {
                field: speed_field.to_string(),
                message: format!("expected an integer, got {raw_speed}"),
            })
            .and_then(|v| {
                MotorSpeed::new(v).map_err(|e| ParseError::InvalidValue {
                    field: speed_field.to_string(),
                    message: e.to_string(),
                })
            })?;

        let mut attributes = DeviceAttributes::new(power, speed);
        if let Some(ts) = self.updated_at.and_then(|s| DateTime::from_timestamp(s, 0)) {
            attributes = attributes.with_updated_at(ts);
        }
        Ok(attributes)
    }
}

/// Parses a latest-data response body into a typed snapshot.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn parse_latest(body: &str) -> Result<DeviceAttributes, ParseError> {
    let response: LatestDataResponse = serde_json::from_str(body)?;
    response.into_attributes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_complete_payload() {
        let body = r#"{"did":"d1","updated_at":1700000000,"attr":{"SwitchON":0,"Motor_Speed":45}}"#;
        let attrs = parse_latest(body).unwrap();

        assert_eq!(attrs.power(), PowerState::Off);
        assert_eq!(attrs.speed().value(), 45);
        assert_eq!(attrs.updated_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn parse_boolean_switch() {
        let attrs = parse_latest(r#"{"attr":{"SwitchON":true,"Motor_Speed":80}}"#).unwrap();
        assert_eq!(attrs.power(), PowerState::On);
    }

    #[test]
    fn parse_legacy_power_field() {
        let attrs = parse_latest(r#"{"attr":{"PowerState":1,"Motor_Speed":80}}"#).unwrap();
        assert_eq!(attrs.power(), PowerState::On);
    }

    #[test]
    fn missing_attr_object_is_an_error() {
        let err = parse_latest(r#"{"did":"d1"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "attr"));
    }

    #[test]
    fn missing_speed_is_not_defaulted() {
        let err = parse_latest(r#"{"attr":{"SwitchON":1}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "Motor_Speed"));
    }

    #[test]
    fn missing_power_is_not_defaulted() {
        let err = parse_latest(r#"{"attr":{"Motor_Speed":50}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "SwitchON"));
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(matches!(
            parse_latest(r#"{"attr":{"SwitchON":"on","Motor_Speed":50}}"#),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_latest(r#"{"attr":{"SwitchON":1,"Motor_Speed":"fast"}}"#),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_latest(r#"{"attr":{"SwitchON":1,"Motor_Speed":250}}"#),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(parse_latest("<html>"), Err(ParseError::Json(_))));
    }
}
