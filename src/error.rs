// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `dcrunner_lib` library.
//!
//! The hierarchy mirrors the layers of the library: value validation,
//! response parsing, gateway communication and the write protocol. Gateway
//! failures never reach observers directly; the reconciliation layer turns
//! them into [`WriteError`] variants or into the availability flag of the
//! state cache.

use thiserror::Error;

use crate::types::Attribute;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the cloud gateway.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A write request was refused or could not be completed.
    #[error("write error: {0}")]
    Write(#[from] WriteError),

    /// Session or gateway configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// An invalid power state was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// A range was constructed with its bounds inverted.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Requested lower bound.
        min: u16,
        /// Requested upper bound.
        max: u16,
    },
}

/// Errors related to parsing gateway responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Failed to interpret a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Failures reported by a [`Gateway`](crate::protocol::Gateway).
///
/// The variants carry only owned strings so that a failure can be stored in
/// a [`PollOutcome`](crate::state::PollOutcome) and cloned to observers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The cloud API could not be reached or answered with a non-success
    /// status on a read.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The response was received but did not contain a complete, well-typed
    /// attribute record.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The cloud API refused a control command.
    #[error("command rejected with HTTP {status}: {message}")]
    Rejected {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
}

impl From<ParseError> for GatewayError {
    fn from(err: ParseError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.to_string())
    }
}

/// Signals returned by the write protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The requested value is invalid; nothing was sent to the device.
    #[error("invalid write request: {0}")]
    Validation(#[from] ValueError),

    /// A write for the same attribute is still being dispatched or confirmed.
    #[error("a write for {attribute} is already in flight")]
    Busy {
        /// The attribute that is locked.
        attribute: Attribute,
    },

    /// The gateway refused the command or could not be reached. No
    /// optimistic state was applied.
    #[error("write of {attribute} failed: {source}")]
    WriteFailed {
        /// The attribute that was being written.
        attribute: Attribute,
        /// The underlying gateway failure.
        source: GatewayError,
    },

    /// The device accepted the command but never reported the target value
    /// within the confirmation budget. The optimistic value stays visible
    /// until its time-to-live elapses.
    #[error("write of {attribute} not confirmed after {attempts} attempts")]
    ConfirmationAbandoned {
        /// The attribute that was written.
        attribute: Attribute,
        /// Number of confirmation reads performed.
        attempts: u32,
    },

    /// The device session was shut down; nothing was sent to the device.
    #[error("the device session has been shut down")]
    ShutDown,
}

impl WriteError {
    /// Returns `true` for the soft, non-failure outcome of an accepted but
    /// unconfirmed write.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::ConfirmationAbandoned { .. })
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 30,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [30, 100]");
    }

    #[test]
    fn write_error_from_value_error() {
        let err: WriteError = ValueError::InvalidPowerState("maybe".to_string()).into();
        assert!(matches!(
            err,
            WriteError::Validation(ValueError::InvalidPowerState(_))
        ));
        assert!(!err.is_soft());
    }

    #[test]
    fn parse_error_becomes_malformed_response() {
        let err: GatewayError = ParseError::MissingField("attr".to_string()).into();
        assert_eq!(
            err,
            GatewayError::MalformedResponse("missing field in response: attr".to_string())
        );
    }

    #[test]
    fn busy_display_names_attribute() {
        let err = WriteError::Busy {
            attribute: Attribute::Speed,
        };
        assert_eq!(err.to_string(), "a write for Motor_Speed is already in flight");
    }

    #[test]
    fn abandoned_is_soft() {
        let err = WriteError::ConfirmationAbandoned {
            attribute: Attribute::Power,
            attempts: 5,
        };
        assert!(err.is_soft());
        assert_eq!(
            err.to_string(),
            "write of SwitchON not confirmed after 5 attempts"
        );
    }

    #[test]
    fn shut_down_is_not_soft() {
        let err: Error = WriteError::ShutDown.into();
        assert!(!WriteError::ShutDown.is_soft());
        assert_eq!(
            err.to_string(),
            "write error: the device session has been shut down"
        );
    }
}
