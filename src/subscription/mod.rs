// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener fan-out shared by every event source in the library.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`ListenerRegistry`] - Generic registry that stores listeners and dispatches events
//!
//! Edge sources, debouncers and the tag poller each own one registry for the
//! event type they emit. Subscribers never see each other: a slow or failing
//! listener only affects itself.
//!
//! # Usage
//!
//! ```
//! use tagbox_lib::subscription::ListenerRegistry;
//! use tagbox_lib::types::TagId;
//!
//! let registry = ListenerRegistry::<Option<TagId>>::new();
//! let id = registry.add(|tag| println!("tag now {tag:?}"));
//!
//! registry.notify_all(&None);
//! registry.remove(id);
//! ```

mod registry;

pub use registry::{ListenerRegistry, SubscriptionId};
