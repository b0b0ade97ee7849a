// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for accessory state subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Internal registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::{CurrentDoorState, StateChange, TargetDoorState, UpdateOrigin};

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and can be used to
/// unsubscribe later. IDs are unique within an accessory's lifetime.
///
/// # Examples
///
/// ```ignore
/// let sub_id = door.on_current_door_state_changed(|from, to| { /* ... */ });
///
/// // Later, unsubscribe
/// door.unsubscribe(sub_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for current door state callbacks.
type CurrentDoorCallback = Arc<dyn Fn(CurrentDoorState, CurrentDoorState) + Send + Sync>;

/// Type alias for target door state callbacks.
type TargetDoorCallback = Arc<dyn Fn(TargetDoorState, TargetDoorState, UpdateOrigin) + Send + Sync>;

/// Type alias for obstruction callbacks.
type ObstructionCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Type alias for generic state change callbacks.
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Registry for managing accessory subscription callbacks.
///
/// This is an internal type used by the accessory to store and dispatch
/// callbacks. It uses thread-safe interior mutability via
/// `parking_lot::RwLock` for high performance in async contexts.
///
/// # Thread Safety
///
/// The registry is fully thread-safe and can be accessed from multiple tasks
/// concurrently. Callbacks are wrapped in `Arc` so they can be cloned cheaply.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Current door state change callbacks.
    current_door_callbacks: RwLock<HashMap<SubscriptionId, CurrentDoorCallback>>,
    /// Target door state change callbacks.
    target_door_callbacks: RwLock<HashMap<SubscriptionId, TargetDoorCallback>>,
    /// Obstruction flag change callbacks.
    obstruction_callbacks: RwLock<HashMap<SubscriptionId, ObstructionCallback>>,
    /// Generic state change callbacks (receives all changes).
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            current_door_callbacks: RwLock::new(HashMap::new()),
            target_door_callbacks: RwLock::new(HashMap::new()),
            obstruction_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for current door state changes.
    ///
    /// The callback receives the previous and the new value.
    pub fn on_current_door_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CurrentDoorState, CurrentDoorState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.current_door_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for target door state changes.
    ///
    /// The callback receives the previous value, the new value, and the
    /// origin of the update (command or reactive propagation).
    pub fn on_target_door_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(TargetDoorState, TargetDoorState, UpdateOrigin) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.target_door_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for obstruction flag changes.
    pub fn on_obstruction_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.obstruction_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for all state changes.
    ///
    /// This is useful for logging or debugging, as it receives every change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.current_door_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.target_door_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.obstruction_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.state_changed_callbacks.write().remove(&id).is_some() {
            return true;
        }
        false
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.current_door_callbacks.write().clear();
        self.target_door_callbacks.write().clear();
        self.obstruction_callbacks.write().clear();
        self.state_changed_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches a state change to relevant callbacks.
    ///
    /// This method calls all registered callbacks that match the change type.
    /// Callbacks are called synchronously in an arbitrary order.
    pub fn dispatch(&self, change: &StateChange) {
        // Always dispatch to generic state_changed callbacks
        {
            let callbacks = self.state_changed_callbacks.read();
            for callback in callbacks.values() {
                callback(change);
            }
        }

        match change {
            StateChange::CurrentDoor { from, to } => {
                let callbacks = self.current_door_callbacks.read();
                for callback in callbacks.values() {
                    callback(*from, *to);
                }
            }
            StateChange::TargetDoor { from, to, origin } => {
                let callbacks = self.target_door_callbacks.read();
                for callback in callbacks.values() {
                    callback(*from, *to, *origin);
                }
            }
            StateChange::Obstruction { to, .. } => {
                let callbacks = self.obstruction_callbacks.read();
                for callback in callbacks.values() {
                    callback(*to);
                }
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.current_door_callbacks.read().len()
            + self.target_door_callbacks.read().len()
            + self.obstruction_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
