// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The garage door accessory and its state-sync engine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::ApiConfig;
use crate::session::{
    DESIRED_DOOR_STATE, DOOR_STATE, DeviceId, Session, UNATTENDED_CLOSE_ALLOWED,
};
use crate::state::{CurrentDoorState, StateChange, TargetDoorState, UpdateOrigin};
use crate::subscription::{CallbackRegistry, SubscriptionId};

/// Poll interval while the door is presumed mid-transition.
pub const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll interval while the door is settled at its target.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Observable accessory state plus the transient command hint.
#[derive(Debug, Clone, Copy)]
struct DoorSnapshot {
    current: CurrentDoorState,
    target: TargetDoorState,
    obstructed: bool,
    /// Last target submitted by a command; used only to disambiguate the
    /// "in transition, direction unknown" remote code.
    pending_target: Option<TargetDoorState>,
}

impl DoorSnapshot {
    fn initial() -> Self {
        Self {
            current: CurrentDoorState::Closed,
            target: TargetDoorState::Closed,
            obstructed: false,
            pending_target: None,
        }
    }
}

/// Returns `true` when the door has settled at its target state.
///
/// Any transitional current state (opening/closing) counts as unsettled
/// regardless of the target, so the poll loop keeps the short interval
/// until the door reports a terminal state.
fn door_settled(current: CurrentDoorState, target: TargetDoorState) -> bool {
    matches!(
        (current, target),
        (CurrentDoorState::Open, TargetDoorState::Open)
            | (CurrentDoorState::Closed, TargetDoorState::Closed)
    )
}

/// Computes the delay until the next poll tick.
///
/// A failed tick always yields the idle interval; a successful tick yields
/// the active interval while the door is unsettled.
fn tick_delay(
    tick_failed: bool,
    current: CurrentDoorState,
    target: TargetDoorState,
    active: Duration,
    idle: Duration,
) -> Duration {
    if tick_failed || door_settled(current, target) {
        idle
    } else {
        active
    }
}

/// Shared engine state behind the [`GarageDoor`] handle.
#[derive(Debug)]
struct Inner {
    session: Session,
    name: String,
    state: Mutex<DoorSnapshot>,
    callbacks: CallbackRegistry,
    /// Wakes the poll loop early, cancelling the pending sleep.
    wake: Notify,
    active_interval: Duration,
    idle_interval: Duration,
}

impl Inner {
    /// Reads and applies the current door state.
    async fn fetch_current(&self) -> Result<CurrentDoorState> {
        let raw = self.session.attribute(DOOR_STATE).await?;
        let pending = self.state.lock().pending_target;
        let value = CurrentDoorState::from_remote(&raw, pending)?;
        self.apply_current(value);
        Ok(value)
    }

    /// Reads and applies the obstruction flag.
    ///
    /// The remote value `"0"` means unattended close is allowed, i.e. the
    /// door is not obstructed; any other value asserts an obstruction.
    async fn fetch_obstruction(&self) -> Result<bool> {
        let raw = self.session.attribute(UNATTENDED_CLOSE_ALLOWED).await?;
        let obstructed = raw != "0";
        self.apply_obstruction(obstructed);
        Ok(obstructed)
    }

    /// Applies an observed current door state.
    ///
    /// A change is logged, dispatched, and reactively propagated to the
    /// target property.
    fn apply_current(&self, value: CurrentDoorState) {
        let previous = {
            let mut state = self.state.lock();
            if state.current == value {
                None
            } else {
                let from = state.current;
                state.current = value;
                Some(from)
            }
        };

        if let Some(from) = previous {
            tracing::info!(
                accessory = %self.name,
                from = from.label(),
                to = value.label(),
                "current door state changed"
            );
            self.callbacks
                .dispatch(&StateChange::CurrentDoor { from, to: value });
            self.apply_target(TargetDoorState::from(value), UpdateOrigin::Reactive);
        }
    }

    /// Applies a target door state update.
    ///
    /// Reactive updates are the echo of an observed current-state change:
    /// they perform no network call and no obstruction check, and they
    /// supersede any pending command hint.
    fn apply_target(&self, value: TargetDoorState, origin: UpdateOrigin) {
        let previous = {
            let mut state = self.state.lock();
            if origin == UpdateOrigin::Reactive {
                state.pending_target = None;
            }
            if state.target == value {
                None
            } else {
                let from = state.target;
                state.target = value;
                Some(from)
            }
        };

        if let Some(from) = previous {
            tracing::info!(
                accessory = %self.name,
                from = from.label(),
                to = value.label(),
                "target door state changed"
            );
            self.callbacks.dispatch(&StateChange::TargetDoor {
                from,
                to: value,
                origin,
            });
        }
    }

    /// Applies an observed obstruction flag.
    fn apply_obstruction(&self, value: bool) {
        let previous = {
            let mut state = self.state.lock();
            if state.obstructed == value {
                None
            } else {
                let from = state.obstructed;
                state.obstructed = value;
                Some(from)
            }
        };

        if let Some(from) = previous {
            tracing::info!(
                accessory = %self.name,
                from = crate::state::obstruction_label(from),
                to = crate::state::obstruction_label(value),
                "obstruction changed"
            );
            self.callbacks
                .dispatch(&StateChange::Obstruction { from, to: value });
        }
    }

    /// The host-initiated command path for the target door state.
    async fn command_target(&self, value: TargetDoorState) -> Result<()> {
        tracing::info!(
            accessory = %self.name,
            target = value.label(),
            "setting desired door state"
        );

        if self.state.lock().obstructed {
            tracing::error!(
                accessory = %self.name,
                "cannot operate door because it is obstructed"
            );
            return Err(Error::Obstructed);
        }

        self.state.lock().pending_target = Some(value);

        match self
            .session
            .set_attribute(DESIRED_DOOR_STATE, value.to_remote_code())
            .await
        {
            Ok(()) => {
                self.apply_target(value, UpdateOrigin::Command);
                self.state.lock().pending_target = None;
                self.wake.notify_one();
                Ok(())
            }
            Err(err) => {
                // The pending hint stays set so the next poll can still
                // disambiguate an in-transition door.
                tracing::error!(
                    accessory = %self.name,
                    error = %err,
                    "failed to set desired door state"
                );
                Err(err)
            }
        }
    }

    /// One poll cycle: re-read current state and obstruction.
    async fn poll_once(&self) -> Result<()> {
        self.fetch_current().await?;
        self.fetch_obstruction().await?;
        Ok(())
    }
}

/// The autonomous poll loop.
///
/// Runs a tick immediately, then sleeps for the computed delay; a wake
/// notification cancels the pending sleep for an immediate next tick, so at
/// most one timer is ever pending. Errors are logged and swallowed; the loop
/// never stops on error.
async fn run_poll_loop(inner: Arc<Inner>) {
    loop {
        let tick_failed = match inner.poll_once().await {
            Ok(()) => false,
            Err(err) => {
                tracing::warn!(
                    accessory = %inner.name,
                    error = %err,
                    "poll tick failed"
                );
                true
            }
        };

        let (current, target) = {
            let state = inner.state.lock();
            (state.current, state.target)
        };
        let delay = tick_delay(
            tick_failed,
            current,
            target,
            inner.active_interval,
            inner.idle_interval,
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = inner.wake.notified() => {}
        }
    }
}

/// A MyQ garage door exposed as a stateful accessory.
///
/// The accessory tracks three observable properties (current door state,
/// target door state, obstruction detected), keeps them reconciled against
/// the cloud API through an adaptive poll loop, and notifies subscribers of
/// every change.
///
/// # Examples
///
/// ```no_run
/// use myq_lib::accessory::GarageDoor;
/// use myq_lib::state::TargetDoorState;
///
/// #[tokio::main]
/// async fn main() -> myq_lib::Result<()> {
///     let door = GarageDoor::builder()
///         .name("Garage Door")
///         .credentials("user@example.com", "hunter2")
///         .build()?;
///
///     door.on_current_door_state_changed(|from, to| {
///         println!("door went from {} to {}", from.label(), to.label());
///     });
///
///     door.set_target_door_state(TargetDoorState::Open).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct GarageDoor {
    inner: Arc<Inner>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl GarageDoor {
    /// Creates a builder for a new accessory.
    #[must_use]
    pub fn builder() -> GarageDoorBuilder {
        GarageDoorBuilder::new()
    }

    /// Returns the accessory display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // =========================================================================
    // Cached observable properties
    // =========================================================================

    /// Returns the last observed current door state without any I/O.
    #[must_use]
    pub fn current_door_state(&self) -> CurrentDoorState {
        self.inner.state.lock().current
    }

    /// Returns the current target door state without any I/O.
    #[must_use]
    pub fn target_door_state(&self) -> TargetDoorState {
        self.inner.state.lock().target
    }

    /// Returns the last observed obstruction flag without any I/O.
    #[must_use]
    pub fn obstruction_detected(&self) -> bool {
        self.inner.state.lock().obstructed
    }

    // =========================================================================
    // Host-initiated operations
    // =========================================================================

    /// Reads the current door state from the API and applies it.
    ///
    /// # Errors
    ///
    /// Failures are logged and returned to the caller; a stale value is
    /// never substituted.
    pub async fn read_current_door_state(&self) -> Result<CurrentDoorState> {
        self.inner.fetch_current().await.inspect_err(|err| {
            tracing::error!(
                accessory = %self.inner.name,
                error = %err,
                "failed to read current door state"
            );
        })
    }

    /// Reads the obstruction flag from the API and applies it.
    ///
    /// # Errors
    ///
    /// Failures are logged and returned to the caller.
    pub async fn read_obstruction_state(&self) -> Result<bool> {
        self.inner.fetch_obstruction().await.inspect_err(|err| {
            tracing::error!(
                accessory = %self.inner.name,
                error = %err,
                "failed to read obstruction state"
            );
        })
    }

    /// Commands a new target door state.
    ///
    /// While an obstruction is asserted the command is rejected locally with
    /// [`Error::Obstructed`] and no network call is made. On success an
    /// immediate poll is triggered to pick up the transition.
    ///
    /// # Errors
    ///
    /// `Error::Obstructed`, or any session/API failure from the write.
    pub async fn set_target_door_state(&self, value: TargetDoorState) -> Result<()> {
        self.inner.command_target(value).await
    }

    /// Runs one poll cycle on demand.
    ///
    /// # Errors
    ///
    /// Unlike autonomous ticks, failures of an on-demand refresh surface to
    /// the caller.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.poll_once().await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Registers a callback for current door state changes.
    pub fn on_current_door_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CurrentDoorState, CurrentDoorState) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_current_door_state_changed(callback)
    }

    /// Registers a callback for target door state changes.
    ///
    /// The callback receives the update origin, distinguishing reactive
    /// propagations from host commands.
    pub fn on_target_door_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(TargetDoorState, TargetDoorState, UpdateOrigin) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_target_door_state_changed(callback)
    }

    /// Registers a callback for obstruction changes.
    pub fn on_obstruction_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_obstruction_changed(callback)
    }

    /// Registers a callback for all state changes.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stops the poll loop.
    ///
    /// The accessory remains usable for host-initiated operations.
    pub fn shutdown(&self) {
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
            tracing::debug!(accessory = %self.inner.name, "poll loop stopped");
        }
    }
}

impl Drop for GarageDoor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for creating a [`GarageDoor`] accessory.
///
/// Building spawns the poll loop, so it must happen inside a tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use myq_lib::accessory::GarageDoor;
/// use std::time::Duration;
///
/// # fn example() -> myq_lib::Result<()> {
/// let door = GarageDoor::builder()
///     .name("Garage Door")
///     .credentials("user@example.com", "hunter2")
///     .device_id(555)
///     .poll_intervals(Duration::from_secs(2), Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GarageDoorBuilder {
    name: String,
    username: Option<String>,
    password: Option<String>,
    device_id: Option<DeviceId>,
    security_token: Option<String>,
    api_config: ApiConfig,
    active_interval: Duration,
    idle_interval: Duration,
}

impl GarageDoorBuilder {
    /// Creates a new builder with default intervals and endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "Garage Door".to_string(),
            username: None,
            password: None,
            device_id: None,
            security_token: None,
            api_config: ApiConfig::new(),
            active_interval: ACTIVE_POLL_INTERVAL,
            idle_interval: IDLE_POLL_INTERVAL,
        }
    }

    /// Sets the accessory display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the account credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Pins the device id, bypassing single-candidate resolution.
    #[must_use]
    pub fn device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Seeds a pre-obtained security token, bypassing the initial login.
    #[must_use]
    pub fn security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    /// Sets the endpoint configuration.
    #[must_use]
    pub fn api_config(mut self, config: ApiConfig) -> Self {
        self.api_config = config;
        self
    }

    /// Overrides the active and idle poll intervals.
    #[must_use]
    pub fn poll_intervals(mut self, active: Duration, idle: Duration) -> Self {
        self.active_interval = active;
        self.idle_interval = idle;
        self
    }

    /// Builds the accessory and starts its poll loop.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or the HTTP client cannot
    /// be created.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn build(self) -> Result<GarageDoor> {
        let mut session = Session::builder().api_config(self.api_config);
        if let (Some(username), Some(password)) = (self.username, self.password) {
            session = session.credentials(username, password);
        }
        if let Some(id) = self.device_id {
            session = session.device_id(id);
        }
        if let Some(token) = self.security_token {
            session = session.security_token(token);
        }
        let session = session.build()?;

        let inner = Arc::new(Inner {
            session,
            name: self.name,
            state: Mutex::new(DoorSnapshot::initial()),
            callbacks: CallbackRegistry::new(),
            wake: Notify::new(),
            active_interval: self.active_interval,
            idle_interval: self.idle_interval,
        });

        let poll_task = tokio::spawn(run_poll_loop(Arc::clone(&inner)));

        Ok(GarageDoor {
            inner,
            poll_task: Mutex::new(Some(poll_task)),
        })
    }
}

impl Default for GarageDoorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
