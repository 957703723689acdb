// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `DcRunner` Lib - A Rust library to control Aqua Medic DC Runner pumps.
//!
//! The pump is reachable only through the Gizwits cloud REST API. The cloud
//! accepts commands without applying them synchronously, never pushes state
//! and sometimes reports stale values for a while after a change. This
//! library keeps a local view of the pump that is immediately responsive to
//! writes and eventually consistent with the device.
//!
//! # Supported Features
//!
//! - **Power control**: Start and stop the pump
//! - **Speed control**: Set the motor speed within a configurable range
//! - **Polling**: Background reads with a cadence adjustable at runtime
//! - **Optimistic writes**: Requested values are visible at once and
//!   confirmed by reading the device back on a backoff schedule
//! - **Subscriptions**: Callbacks on every state change and availability
//!   transition
//!
//! # Quick Start
//!
//! ```no_run
//! use dcrunner_lib::protocol::GizwitsConfig;
//! use dcrunner_lib::session::SessionBuilder;
//! use dcrunner_lib::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> dcrunner_lib::Result<()> {
//!     let config = GizwitsConfig::new("app-id", "user-token", "device-id");
//!
//!     // Returns (session, first_read) tuple
//!     let (session, _first_read) = SessionBuilder::gizwits(config)?.start().await?;
//!
//!     session.on_availability_changed(|available| {
//!         println!("Pump available: {available}");
//!     });
//!
//!     let handle = session.set_speed(75).await?;
//!     println!("Speed shown: {:?}", session.speed());
//!
//!     if let Err(e) = handle.confirmed().await {
//!         println!("{e}");
//!     }
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Gateways
//!
//! The engine only depends on the [`protocol::Gateway`] trait. Disable the
//! default `http` feature to use it without `reqwest`.

pub mod error;
pub mod poller;
pub mod protocol;
pub mod reconcile;
pub mod response;
pub mod session;
pub mod state;
pub mod subscription;
pub mod types;

pub use error::{Error, GatewayError, ParseError, Result, ValueError, WriteError};
#[cfg(feature = "http")]
pub use protocol::{GizwitsClient, GizwitsConfig};
pub use protocol::Gateway;
pub use reconcile::{ConfirmationPolicy, WriteHandle, WriteOutcome};
pub use session::{DeviceSession, SessionBuilder, SessionConfig};
pub use state::{DeviceAttributes, DeviceStateCache, PollOutcome, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{
    Attribute, AttributeValue, MotorSpeed, PowerState, SpeedRange, UpdateInterval, WriteRequest,
};
