// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic listener registry with snapshot dispatch.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`ListenerRegistry`] - Stores listeners for one event type and fans events out

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Unique identifier for a subscription.
///
/// Returned by [`ListenerRegistry::add`] and used to remove the listener
/// later. IDs are unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
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

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registry of listeners for events of type `E`.
///
/// Listeners may be added or removed at any time, including from inside a
/// listener that is currently being notified. [`notify_all`](Self::notify_all)
/// works on a snapshot taken when it starts and holds no lock while a
/// listener runs, so re-entrant calls cannot deadlock:
///
/// - a listener added during a notification is first called on the next one;
/// - a listener removed during a notification is skipped if its turn has not
///   come yet.
///
/// A listener that panics is logged and skipped; the remaining listeners
/// still receive the event.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use tagbox_lib::subscription::ListenerRegistry;
///
/// let registry = ListenerRegistry::<u32>::new();
/// let total = Arc::new(AtomicU32::new(0));
/// let total_clone = Arc::clone(&total);
///
/// let id = registry.add(move |value| {
///     total_clone.fetch_add(*value, Ordering::SeqCst);
/// });
///
/// assert_eq!(registry.notify_all(&5), 1);
/// assert!(registry.remove(id));
/// assert_eq!(registry.notify_all(&5), 0);
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
pub struct ListenerRegistry<E> {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Registered listeners in insertion order.
    listeners: RwLock<BTreeMap<SubscriptionId, Listener<E>>>,
}

impl<E> ListenerRegistry<E> {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a listener and returns its subscription ID.
    pub fn add<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.listeners.write().insert(id, Arc::new(listener));
        tracing::trace!(subscription = %id, "Listener added");
        id
    }

    /// Removes a listener.
    ///
    /// Returns `true` if the listener was registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners.write().remove(&id).is_some();
        if removed {
            tracing::trace!(subscription = %id, "Listener removed");
        }
        removed
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Returns `true` if the listener is registered.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.listeners.read().contains_key(&id)
    }

    /// Delivers `event` to every registered listener.
    ///
    /// Returns the number of listeners that ran to completion.
    pub fn notify_all(&self, event: &E) -> usize {
        let snapshot: Vec<(SubscriptionId, Listener<E>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            if !self.contains(id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::warn!(
                        subscription = %id,
                        reason = panic_message(payload.as_ref()),
                        "Listener panicked, continuing with remaining listeners"
                    );
                }
            }
        }
        delivered
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if there are no registered listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    fn counter_listener(counter: &Arc<AtomicU32>) -> impl Fn(&u8) + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = ListenerRegistry::<u8>::new();
        assert!(registry.is_empty());
        assert_eq!(registry.notify_all(&1), 0);
    }

    #[test]
    fn unique_ids() {
        let registry = ListenerRegistry::<u8>::new();
        let id1 = registry.add(|_| {});
        let id2 = registry.add(|_| {});
        assert_ne!(id1, id2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn notify_reaches_every_listener() {
        let registry = ListenerRegistry::<u8>::new();
        let counter = Arc::new(AtomicU32::new(0));
        registry.add(counter_listener(&counter));
        registry.add(counter_listener(&counter));

        assert_eq!(registry.notify_all(&7), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listeners_receive_the_event() {
        let registry = ListenerRegistry::<String>::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        registry.add(move |event: &String| received_clone.lock().push(event.clone()));

        registry.notify_all(&"first".to_string());
        registry.notify_all(&"second".to_string());

        assert_eq!(*received.lock(), vec!["first", "second"]);
    }

    #[test]
    fn remove_unknown_returns_false() {
        let registry = ListenerRegistry::<u8>::new();
        assert!(!registry.remove(SubscriptionId::new(999)));
    }

    #[test]
    fn clear_removes_everything() {
        let registry = ListenerRegistry::<u8>::new();
        registry.add(|_| {});
        registry.add(|_| {});
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn listener_can_remove_itself() {
        let registry = Arc::new(ListenerRegistry::<u8>::new());
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        let counter = Arc::new(AtomicU32::new(0));

        let registry_clone = Arc::clone(&registry);
        let own_id_clone = Arc::clone(&own_id);
        let counter_clone = Arc::clone(&counter);
        let id = registry.add(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *own_id_clone.lock() {
                registry_clone.remove(id);
            }
        });
        *own_id.lock() = Some(id);

        assert_eq!(registry.notify_all(&1), 1);
        assert_eq!(registry.notify_all(&1), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn removal_before_turn_skips_listener() {
        let registry = Arc::new(ListenerRegistry::<u8>::new());
        let victim = Arc::new(Mutex::new(None::<SubscriptionId>));
        let victim_calls = Arc::new(AtomicU32::new(0));

        // Registered first, so it runs before the victim.
        let registry_clone = Arc::clone(&registry);
        let victim_clone = Arc::clone(&victim);
        registry.add(move |_| {
            if let Some(id) = *victim_clone.lock() {
                registry_clone.remove(id);
            }
        });
        let victim_id = registry.add(counter_listener(&victim_calls));
        *victim.lock() = Some(victim_id);

        assert_eq!(registry.notify_all(&1), 1);
        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn removal_after_turn_is_harmless() {
        let registry = Arc::new(ListenerRegistry::<u8>::new());
        let earlier_calls = Arc::new(AtomicU32::new(0));
        let earlier_id = registry.add(counter_listener(&earlier_calls));

        let registry_clone = Arc::clone(&registry);
        registry.add(move |_| {
            registry_clone.remove(earlier_id);
        });

        assert_eq!(registry.notify_all(&1), 2);
        assert_eq!(earlier_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listener_added_during_notify_runs_next_time() {
        let registry = Arc::new(ListenerRegistry::<u8>::new());
        let late_calls = Arc::new(AtomicU32::new(0));
        let added = Arc::new(AtomicU32::new(0));

        let registry_clone = Arc::clone(&registry);
        let late_clone = Arc::clone(&late_calls);
        let added_clone = Arc::clone(&added);
        registry.add(move |_| {
            if added_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                registry_clone.add(counter_listener(&late_clone));
            }
        });

        registry.notify_all(&1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        registry.notify_all(&1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let registry = ListenerRegistry::<u8>::new();
        let counter = Arc::new(AtomicU32::new(0));

        registry.add(|_| panic!("listener failure"));
        registry.add(counter_listener(&counter));

        assert_eq!(registry.notify_all(&1), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        // The failing listener stays registered.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_debug() {
        let registry = ListenerRegistry::<u8>::new();
        registry.add(|_| {});
        let debug = format!("{registry:?}");
        assert!(debug.contains("ListenerRegistry"));
        assert!(debug.contains("listener_count: 1"));
    }
}
