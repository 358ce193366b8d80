// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owner of one acquired input pin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::input::{DigitalInput, PinHandle, RawTransition};
use crate::error::HardwareError;
use crate::subscription::{ListenerRegistry, SubscriptionId};
use crate::types::{PinId, PullMode};

/// State shared between an [`EdgeSource`] and the driver callback.
pub(crate) struct SourceShared {
    pin: PinId,
    released: AtomicBool,
    listeners: ListenerRegistry<RawTransition>,
}

impl SourceShared {
    fn deliver(&self, transition: RawTransition) {
        if self.released.load(Ordering::Acquire) {
            tracing::trace!(pin = %self.pin, "Dropping transition after release");
            return;
        }
        self.listeners.notify_all(&transition);
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }
}

/// Exclusive owner of one physical input pin.
///
/// The pin is acquired on construction and released by
/// [`release`](Self::release) or, at the latest, when the source is dropped.
/// Every raw level change is forwarded synchronously, on the driver's
/// thread, to all subscribers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tagbox_lib::gpio::EdgeSource;
/// use tagbox_lib::sim::SimulatedGpio;
/// use tagbox_lib::types::{Level, PinId, PullMode};
///
/// let gpio = Arc::new(SimulatedGpio::new());
/// let source = EdgeSource::acquire(gpio.clone(), PinId::new(3), PullMode::PullDown)?;
///
/// source.subscribe(|transition| println!("pin went {}", transition.level()));
/// gpio.set_level(PinId::new(3), Level::High);
///
/// // A second owner for the same pin is refused.
/// assert!(EdgeSource::acquire(gpio.clone(), PinId::new(3), PullMode::PullDown).is_err());
///
/// source.release();
/// source.release(); // no-op
/// # Ok::<(), tagbox_lib::error::HardwareError>(())
/// ```
pub struct EdgeSource {
    input: Arc<dyn DigitalInput>,
    handle: PinHandle,
    shared: Arc<SourceShared>,
}

impl EdgeSource {
    /// Acquires `pin` and starts forwarding its transitions.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Unavailable` if the pin is already claimed or
    /// cannot be configured. Nothing stays acquired on failure.
    pub fn acquire(
        input: Arc<dyn DigitalInput>,
        pin: PinId,
        pull: PullMode,
    ) -> Result<Self, HardwareError> {
        tracing::debug!(%pin, %pull, "Configuring pin as input");
        let handle = input.acquire(pin, pull)?;

        let shared = Arc::new(SourceShared {
            pin,
            released: AtomicBool::new(false),
            listeners: ListenerRegistry::new(),
        });

        let forward: Weak<SourceShared> = Arc::downgrade(&shared);
        let registered = input.on_transition(
            &handle,
            Arc::new(move |transition| {
                if let Some(shared) = forward.upgrade() {
                    shared.deliver(transition);
                }
            }),
        );
        if let Err(e) = registered {
            input.release(&handle);
            return Err(e);
        }

        Ok(Self {
            input,
            handle,
            shared,
        })
    }

    /// Returns the pin owned by this source.
    #[must_use]
    pub fn pin(&self) -> PinId {
        self.handle.pin()
    }

    /// Returns the pull configuration of the pin.
    #[must_use]
    pub fn pull(&self) -> PullMode {
        self.handle.pull()
    }

    /// Registers a callback for every raw transition.
    ///
    /// The callback runs on whatever thread the driver delivers interrupts on.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RawTransition) + Send + Sync + 'static,
    {
        let id = self.shared.listeners.add(callback);
        tracing::debug!(pin = %self.pin(), subscription = %id, "Registered raw transition listener");
        id
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Returns `true` once the pin has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }

    /// Releases the pin.
    ///
    /// Transitions still in flight are dropped. Calling this more than once
    /// is a no-op.
    pub fn release(&self) {
        if self.shared.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.input.release(&self.handle);
        self.shared.listeners.clear();
        tracing::debug!(pin = %self.pin(), "Released pin");
    }

    pub(crate) fn shared(&self) -> &Arc<SourceShared> {
        &self.shared
    }
}

impl Drop for EdgeSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for EdgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeSource")
            .field("pin", &self.pin())
            .field("pull", &self.pull())
            .field("released", &self.is_released())
            .field("subscriber_count", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
