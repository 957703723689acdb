// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cache mutation notifications.
//!
//! Every mutation of a [`DeviceStateCache`](super::DeviceStateCache) emits
//! one [`StateChange`] to the registered observers, in the order the
//! mutations happened.
//!
//! # Change Types
//!
//! - [`StateChange::Refreshed`] - A read succeeded and replaced the snapshot
//! - [`StateChange::RefreshFailed`] - A read failed; the snapshot was kept
//! - [`StateChange::OverrideSet`] - An optimistic value was installed
//! - [`StateChange::OverrideCleared`] - An optimistic value was confirmed or cancelled
//! - [`StateChange::OverrideExpired`] - An optimistic value outlived its TTL

use crate::error::GatewayError;
use crate::types::{Attribute, AttributeValue};

use super::DeviceAttributes;

/// A mutation applied to the device state cache.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A successful read replaced the last known snapshot.
    Refreshed(DeviceAttributes),

    /// A read failed. The last known snapshot is unchanged.
    RefreshFailed(GatewayError),

    /// An optimistic value was installed or replaced.
    OverrideSet {
        /// The value now shown to observers.
        value: AttributeValue,
    },

    /// An optimistic value was removed before its expiry.
    OverrideCleared {
        /// The attribute whose override was removed.
        attribute: Attribute,
    },

    /// An optimistic value reached its time-to-live and was removed.
    OverrideExpired {
        /// The attribute whose override expired.
        attribute: Attribute,
    },
}

impl StateChange {
    /// Returns the attribute concerned by an override change, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<Attribute> {
        match self {
            Self::OverrideSet { value } => Some(value.attribute()),
            Self::OverrideCleared { attribute } | Self::OverrideExpired { attribute } => {
                Some(*attribute)
            }
            Self::Refreshed(_) | Self::RefreshFailed(_) => None,
        }
    }

    /// Returns `true` for changes produced by a gateway read.
    #[must_use]
    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::Refreshed(_) | Self::RefreshFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MotorSpeed, PowerState};

    #[test]
    fn attribute_of_override_changes() {
        let set = StateChange::OverrideSet {
            value: AttributeValue::Speed(MotorSpeed::new(40).unwrap()),
        };
        assert_eq!(set.attribute(), Some(Attribute::Speed));

        let expired = StateChange::OverrideExpired {
            attribute: Attribute::Power,
        };
        assert_eq!(expired.attribute(), Some(Attribute::Power));
        assert!(!expired.is_refresh());
    }

    #[test]
    fn refresh_changes_have_no_attribute() {
        let attrs = DeviceAttributes::new(PowerState::On, MotorSpeed::new(40).unwrap());
        let change = StateChange::Refreshed(attrs);
        assert!(change.is_refresh());
        assert_eq!(change.attribute(), None);

        let failed = StateChange::RefreshFailed(GatewayError::Unreachable("timeout".into()));
        assert!(failed.is_refresh());
    }
}
