// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! Each observable property change of the accessory is expressed as a
//! [`StateChange`] carrying the before and after values. Target changes
//! additionally carry their [`UpdateOrigin`], making the reactive-versus-
//! command distinction explicit data rather than an ambient flag: a reactive
//! target update is the echo of an observed current-state change and must
//! never re-trigger the command path.

use super::door_state::{CurrentDoorState, TargetDoorState, obstruction_label};

/// How a target-state update came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// A host-initiated write that went through the command path.
    Command,
    /// A propagation of an externally observed current-state change.
    ///
    /// Reactive updates perform no network call and no obstruction check.
    Reactive,
}

/// A change of one observable accessory property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// The current door state changed.
    CurrentDoor {
        /// Previous value.
        from: CurrentDoorState,
        /// New value.
        to: CurrentDoorState,
    },

    /// The target door state changed.
    TargetDoor {
        /// Previous value.
        from: TargetDoorState,
        /// New value.
        to: TargetDoorState,
        /// Whether this was a command or a reactive propagation.
        origin: UpdateOrigin,
    },

    /// The obstruction flag changed.
    Obstruction {
        /// Previous value.
        from: bool,
        /// New value.
        to: bool,
    },
}

impl StateChange {
    /// Returns the human-readable before/after labels for logging.
    #[must_use]
    pub fn labels(&self) -> (&'static str, &'static str) {
        match self {
            Self::CurrentDoor { from, to } => (from.label(), to.label()),
            Self::TargetDoor { from, to, .. } => (from.label(), to.label()),
            Self::Obstruction { from, to } => (obstruction_label(*from), obstruction_label(*to)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_door_labels() {
        let change = StateChange::CurrentDoor {
            from: CurrentDoorState::Closed,
            to: CurrentDoorState::Opening,
        };
        assert_eq!(change.labels(), ("closed", "opening"));
    }

    #[test]
    fn obstruction_labels() {
        let change = StateChange::Obstruction {
            from: false,
            to: true,
        };
        assert_eq!(change.labels(), ("not obstructed", "obstructed"));
    }

    #[test]
    fn target_change_carries_origin() {
        let change = StateChange::TargetDoor {
            from: TargetDoorState::Closed,
            to: TargetDoorState::Open,
            origin: UpdateOrigin::Reactive,
        };
        match change {
            StateChange::TargetDoor { origin, .. } => {
                assert_eq!(origin, UpdateOrigin::Reactive);
            }
            _ => unreachable!(),
        }
    }
}
