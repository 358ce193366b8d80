// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Digital input capability.
//!
//! [`DigitalInput`] is the seam between this library and whatever driver
//! talks to the GPIO controller. The library never reads pin registers
//! itself: it acquires a pin, asks to be called back on every level change,
//! and releases the pin when done.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::HardwareError;
use crate::types::{Edge, Level, PinId, PullMode};

/// One raw level change reported by the hardware.
///
/// Raw transitions include contact bounce; they are only kept long enough
/// for a [`Debouncer`](super::Debouncer) to decide whether they start a new
/// logical edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTransition {
    level: Level,
    at: Instant,
}

impl RawTransition {
    /// Creates a transition to `level` observed at `at`.
    #[must_use]
    pub const fn new(level: Level, at: Instant) -> Self {
        Self { level, at }
    }

    /// Creates a transition to `level` observed now.
    #[must_use]
    pub fn now(level: Level) -> Self {
        Self::new(level, Instant::now())
    }

    /// Returns the level the pin changed to.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Returns when the change was observed.
    #[must_use]
    pub const fn at(&self) -> Instant {
        self.at
    }

    /// Returns the direction of this transition.
    ///
    /// Never returns [`Edge::Both`].
    #[must_use]
    pub const fn edge(&self) -> Edge {
        match self.level {
            Level::High => Edge::Rising,
            Level::Low => Edge::Falling,
        }
    }
}

/// Callback invoked by a [`DigitalInput`] for every raw transition of a pin.
pub type TransitionCallback = Arc<dyn Fn(RawTransition) + Send + Sync>;

/// Handle of an acquired input pin.
///
/// Handles are created by [`DigitalInput::acquire`] and are deliberately not
/// `Clone`: exactly one owner is responsible for releasing the pin.
///
/// A handle also carries the acquisition it belongs to. Drivers that hand
/// out a new generation on every acquisition can ignore a handle left over
/// from an earlier one, so it cannot release the pin from under its
/// current owner.
#[derive(PartialEq, Eq)]
pub struct PinHandle {
    pin: PinId,
    pull: PullMode,
    generation: u64,
}

impl PinHandle {
    /// Creates a handle. Intended for [`DigitalInput`] implementations.
    #[must_use]
    pub const fn new(pin: PinId, pull: PullMode) -> Self {
        Self::with_generation(pin, pull, 0)
    }

    /// Creates a handle for a numbered acquisition of `pin`.
    #[must_use]
    pub const fn with_generation(pin: PinId, pull: PullMode, generation: u64) -> Self {
        Self {
            pin,
            pull,
            generation,
        }
    }

    /// Returns the pin this handle refers to.
    #[must_use]
    pub const fn pin(&self) -> PinId {
        self.pin
    }

    /// Returns the pull configuration applied on acquisition.
    #[must_use]
    pub const fn pull(&self) -> PullMode {
        self.pull
    }

    /// Returns the acquisition this handle belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for PinHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinHandle({}, {})", self.pin, self.pull)
    }
}

/// Driver-level access to digital input pins.
///
/// Implementations must be usable from any thread. Callbacks registered
/// with [`on_transition`](Self::on_transition) may be invoked on a thread
/// owned by the driver, concurrently with any other code in the process.
pub trait DigitalInput: Send + Sync {
    /// Claims `pin` as an input with the given pull configuration.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Unavailable` if the pin is already claimed
    /// or the controller refuses the configuration.
    fn acquire(&self, pin: PinId, pull: PullMode) -> Result<PinHandle, HardwareError>;

    /// Registers a callback for every level change of an acquired pin.
    ///
    /// Several callbacks may be registered for one pin.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::NotAcquired` if the handle was released, or
    /// `HardwareError::Unavailable` if the interrupt cannot be configured.
    fn on_transition(
        &self,
        handle: &PinHandle,
        callback: TransitionCallback,
    ) -> Result<(), HardwareError>;

    /// Releases an acquired pin and drops its callbacks.
    ///
    /// Releasing an already released handle does nothing, even if the pin
    /// has been acquired again since.
    fn release(&self, handle: &PinHandle);
}
