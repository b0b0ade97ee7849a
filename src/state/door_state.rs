// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door-state vocabulary and translation tables.
//!
//! The MyQ API reports door state as a small closed set of numeric string
//! codes. An API regression collapsed the distinguishable opening/closing
//! codes into the single ambiguous code `"0"` ("in transition, direction
//! unknown"); [`CurrentDoorState::from_remote`] resolves that ambiguity with
//! the last commanded target direction before the value is surfaced.
//!
//! All translation here is pure, no I/O.

use crate::error::ParseError;

/// Remote code reported while the door is in transition, direction unknown.
const REMOTE_IN_TRANSITION: &str = "0";

/// Current door state as surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentDoorState {
    /// The door is fully open.
    Open,
    /// The door is fully closed.
    Closed,
    /// The door is moving toward open.
    Opening,
    /// The door is moving toward closed.
    Closing,
}

/// Target door state as commanded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDoorState {
    /// The door should be open.
    Open,
    /// The door should be closed.
    Closed,
}

impl CurrentDoorState {
    /// Maps a remote `doorstate` code to the host vocabulary.
    ///
    /// Codes `4` (opening) and `5` (closing) are legacy values kept in case
    /// the API regression turns out to be a defect; current firmware reports
    /// `0` for both directions. For code `0` the `pending_target` hint is
    /// consulted: a pending Open maps to Opening, anything else maps to
    /// Closing. Defaulting to Closing with no hint is a best-effort
    /// heuristic, not a guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] for codes outside the known set
    /// `{0, 1, 2, 4, 5, 9}`.
    pub fn from_remote(
        code: &str,
        pending_target: Option<TargetDoorState>,
    ) -> Result<Self, ParseError> {
        match code {
            "1" | "9" => Ok(Self::Open),
            "2" => Ok(Self::Closed),
            "4" => Ok(Self::Opening),
            "5" => Ok(Self::Closing),
            REMOTE_IN_TRANSITION => Ok(match pending_target {
                Some(TargetDoorState::Open) => Self::Opening,
                _ => Self::Closing,
            }),
            other => Err(ParseError::InvalidValue {
                field: "doorstate".to_string(),
                message: format!("unknown door state code: {other}"),
            }),
        }
    }

    /// Returns the human-readable label used in logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Closing => "closing",
        }
    }
}

impl TargetDoorState {
    /// Maps the target state to the remote `desireddoorstate` code.
    #[must_use]
    pub fn to_remote_code(self) -> &'static str {
        match self {
            Self::Open => "1",
            Self::Closed => "0",
        }
    }

    /// Returns the human-readable label used in logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Derives the target state implied by an observed current state.
///
/// Used to reactively align the target property when the door is observed
/// moving or settled without a host-initiated command.
impl From<CurrentDoorState> for TargetDoorState {
    fn from(current: CurrentDoorState) -> Self {
        match current {
            CurrentDoorState::Open | CurrentDoorState::Opening => Self::Open,
            CurrentDoorState::Closed | CurrentDoorState::Closing => Self::Closed,
        }
    }
}

/// Returns the human-readable label for an obstruction flag.
#[must_use]
pub fn obstruction_label(obstructed: bool) -> &'static str {
    if obstructed { "obstructed" } else { "not obstructed" }
}
