// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door-state types and the remote-code mapper.
//!
//! This module translates between the MyQ API's numeric door-state codes and
//! the host-canonical vocabulary, and defines the [`StateChange`] events the
//! accessory emits when an observable property changes.
//!
//! # Examples
//!
//! ```
//! use myq_lib::state::{CurrentDoorState, TargetDoorState};
//!
//! let current = CurrentDoorState::from_remote("2", None).unwrap();
//! assert_eq!(current, CurrentDoorState::Closed);
//!
//! // An observed current state implies a target state
//! assert_eq!(TargetDoorState::from(current), TargetDoorState::Closed);
//! ```

mod door_state;
mod state_change;

pub use door_state::{CurrentDoorState, TargetDoorState, obstruction_label};
pub use state_change::{StateChange, UpdateOrigin};
