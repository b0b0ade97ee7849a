// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription interface for accessory state-change notifications.
//!
//! The accessory notifies observers of every observable property change
//! through registered callbacks. Each registration returns a
//! [`SubscriptionId`] that can be used to unsubscribe later.

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
