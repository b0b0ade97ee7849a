// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `MyQ` Lib - A Rust library exposing MyQ garage doors as stateful
//! accessories.
//!
//! This library talks to the Chamberlain/LiftMaster MyQ cloud API and keeps a
//! garage door's observable state (current door state, target door state,
//! obstruction detected) continuously reconciled against the cloud.
//!
//! # Supported Features
//!
//! - **Door control**: Open and close commands with an immediate follow-up
//!   poll to pick up the transition
//! - **State sync**: Adaptive polling, fast while the door is moving and slow
//!   once it has settled
//! - **Obstruction gating**: Commands are rejected locally while an
//!   obstruction is asserted
//! - **Session recovery**: Security tokens are obtained lazily and refreshed
//!   transparently when the API reports expiry
//! - **Event subscriptions**: Callbacks on every observable state change
//!
//! # Quick Start
//!
//! ## Accessory with Automatic Device Resolution
//!
//! ```no_run
//! use myq_lib::{GarageDoor, TargetDoorState};
//!
//! #[tokio::main]
//! async fn main() -> myq_lib::Result<()> {
//!     // With a single opener on the account, the device id is resolved
//!     // automatically on first use
//!     let door = GarageDoor::builder()
//!         .name("Garage Door")
//!         .credentials("user@example.com", "hunter2")
//!         .build()?;
//!
//!     door.set_target_door_state(TargetDoorState::Open).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Accessory with a Pinned Device
//!
//! ```no_run
//! use myq_lib::GarageDoor;
//!
//! #[tokio::main]
//! async fn main() -> myq_lib::Result<()> {
//!     // Accounts with several openers must pin the device id
//!     let door = GarageDoor::builder()
//!         .credentials("user@example.com", "hunter2")
//!         .device_id(2_332_164)
//!         .build()?;
//!
//!     let state = door.read_current_door_state().await?;
//!     println!("door is {}", state.label());
//!     Ok(())
//! }
//! ```
//!
//! ## Event Subscriptions
//!
//! ```no_run
//! use myq_lib::{GarageDoor, UpdateOrigin};
//!
//! #[tokio::main]
//! async fn main() -> myq_lib::Result<()> {
//!     let door = GarageDoor::builder()
//!         .credentials("user@example.com", "hunter2")
//!         .build()?;
//!
//!     door.on_current_door_state_changed(|from, to| {
//!         println!("door went from {} to {}", from.label(), to.label());
//!     });
//!
//!     door.on_target_door_state_changed(|_from, to, origin| {
//!         if origin == UpdateOrigin::Reactive {
//!             println!("target followed the door to {}", to.label());
//!         }
//!     });
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Direct Session Use
//!
//! The session layer is public for callers that want raw attribute access
//! without the accessory's poll loop:
//!
//! ```no_run
//! use myq_lib::session::{Session, DOOR_STATE};
//!
//! #[tokio::main]
//! async fn main() -> myq_lib::Result<()> {
//!     let session = Session::builder()
//!         .credentials("user@example.com", "hunter2")
//!         .build()?;
//!
//!     let raw = session.attribute(DOOR_STATE).await?;
//!     println!("raw door state code: {raw}");
//!     Ok(())
//! }
//! ```

pub mod accessory;
pub mod error;
pub mod protocol;
pub mod session;
pub mod state;
pub mod subscription;

pub use accessory::{GarageDoor, GarageDoorBuilder};
pub use error::{
    ApiError, ApiErrorKind, Error, ParseError, ProtocolError, ResolutionError, Result,
};
pub use protocol::ApiConfig;
pub use session::{DeviceId, Session, SessionBuilder};
pub use state::{CurrentDoorState, StateChange, TargetDoorState, UpdateOrigin};
pub use subscription::{CallbackRegistry, SubscriptionId};
