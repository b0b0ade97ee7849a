// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The garage door accessory: a stateful view of the physical door kept in
//! sync with the MyQ cloud API.
//!
//! The [`GarageDoor`] drives current-state queries, target-state commands,
//! and obstruction queries through the session layer, and keeps itself
//! reconciled with an adaptive poll loop: a short interval while the door is
//! presumed mid-transition, a longer one while it is settled, and an
//! immediate poll after every successful command.

mod garage_door;

pub use garage_door::{
    ACTIVE_POLL_INTERVAL, GarageDoor, GarageDoorBuilder, IDLE_POLL_INTERVAL,
};
