// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for DC Runner control.
//!
//! Each type ensures values are within their valid ranges at construction
//! time, so a request that reaches the network is already known to be valid.
//!
//! # Types
//!
//! - [`PowerState`] - On/Off
//! - [`MotorSpeed`] - Reported motor speed (0-100 %)
//! - [`SpeedRange`] - Configured write window for the speed (default 30-100 %)
//! - [`UpdateInterval`] - Local polling cadence (5-300 s)
//! - [`Attribute`], [`AttributeValue`], [`WriteRequest`] - Write addressing

mod attribute;
mod interval;
mod power;
mod speed;

pub use attribute::{Attribute, AttributeValue, WriteRequest};
pub use interval::UpdateInterval;
pub use power::PowerState;
pub use speed::{MotorSpeed, SpeedRange};
