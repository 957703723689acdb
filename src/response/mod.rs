// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for the Gizwits cloud API.
//!
//! Responses are deserialized into loose structures first and then validated
//! into typed records, so that an incomplete payload surfaces as a
//! [`ParseError`](crate::error::ParseError) instead of a guessed default.

mod bindings;
mod latest;

pub use bindings::DeviceBinding;
pub use latest::LatestDataResponse;

#[cfg_attr(not(feature = "http"), allow(unused_imports))]
pub(crate) use bindings::parse_bindings;
#[cfg_attr(not(feature = "http"), allow(unused_imports))]
pub(crate) use latest::parse_latest;
