// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-window debouncing of raw pin transitions.
//!
//! A mechanical button produces a burst of level changes for every press.
//! The debouncer accepts the first transition in the configured direction,
//! ignores everything that follows for one settle window, and then emits a
//! single [`LogicalEdge`] carrying the timestamp of the accepted transition.
//!
//! ```text
//!            matching transition
//!   Idle ─────────────────────────▶ Settling ──┐ matching transition
//!    ▲                                 │  ▲     │ (bounce, ignored)
//!    │      settle window elapsed      │  └─────┘
//!    └──────── emit LogicalEdge ◀──────┘
//! ```
//!
//! Transitions in the other direction never start, extend or cancel a
//! settle window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::edge_source::{EdgeSource, SourceShared};
use super::input::RawTransition;
use crate::error::Error;
use crate::subscription::{ListenerRegistry, SubscriptionId};
use crate::types::{Edge, Level, PinId};

/// Default settle window.
///
/// Typical push buttons stop bouncing well within 20 ms; 50 ms leaves
/// headroom for worn contacts and still feels instant to a user.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Configuration of a [`Debouncer`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagbox_lib::gpio::DebounceConfig;
/// use tagbox_lib::types::Edge;
///
/// let config = DebounceConfig::new(Edge::Falling).with_window(Duration::from_millis(30));
/// assert_eq!(config.edge, Edge::Falling);
///
/// let default = DebounceConfig::default();
/// assert_eq!(default.edge, Edge::Rising);
/// assert_eq!(default.window, Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Direction of the transitions that produce events.
    pub edge: Edge,
    /// How long transitions are ignored after an accepted one.
    pub window: Duration,
}

impl DebounceConfig {
    /// Creates a configuration for `edge` with the default window.
    #[must_use]
    pub const fn new(edge: Edge) -> Self {
        Self {
            edge,
            window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }

    /// Sets the settle window.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(Edge::Rising)
    }
}

/// A debounced edge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalEdge {
    /// The pin the edge occurred on.
    pub pin: PinId,
    /// The direction the debouncer was configured to watch.
    pub edge: Edge,
    /// The level of the accepted raw transition.
    pub level: Level,
    /// When the accepted raw transition was observed.
    pub at: Instant,
}

#[derive(Debug)]
enum DebounceState {
    Idle,
    Settling {
        generation: u64,
        transition: RawTransition,
        timer: AbortHandle,
    },
}

struct SourceLink {
    source: Weak<SourceShared>,
    subscription: SubscriptionId,
}

impl SourceLink {
    fn unlink(self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.subscription);
        }
    }
}

struct DebouncerInner {
    pin: PinId,
    config: DebounceConfig,
    runtime: Handle,
    state: Mutex<DebounceState>,
    generation: AtomicU64,
    listeners: ListenerRegistry<LogicalEdge>,
    source: Mutex<Option<SourceLink>>,
}

impl DebouncerInner {
    fn feed(self: &Arc<Self>, transition: RawTransition) {
        if !self.config.edge.matches(transition.level()) {
            tracing::trace!(pin = %self.pin, level = %transition.level(), "Ignoring transition in other direction");
            return;
        }

        let mut state = self.state.lock();
        if matches!(*state, DebounceState::Settling { .. }) {
            tracing::trace!(pin = %self.pin, "Ignoring bounce while settling");
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let deadline = transition.at() + self.config.window;
        let inner = Arc::clone(self);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.settle(generation);
        });

        *state = DebounceState::Settling {
            generation,
            transition,
            timer: timer.abort_handle(),
        };
    }

    fn settle(&self, generation: u64) {
        let transition = {
            let mut state = self.state.lock();
            match *state {
                DebounceState::Settling {
                    generation: current,
                    transition,
                    ..
                } if current == generation => {
                    *state = DebounceState::Idle;
                    transition
                }
                _ => return,
            }
        };

        let event = LogicalEdge {
            pin: self.pin,
            edge: self.config.edge,
            level: transition.level(),
            at: transition.at(),
        };
        tracing::debug!(pin = %self.pin, edge = %self.config.edge, "Debounced edge");
        self.listeners.notify_all(&event);
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        if let DebounceState::Settling { timer, .. } = &*state {
            timer.abort();
        }
        *state = DebounceState::Idle;
    }
}

impl Drop for DebouncerInner {
    fn drop(&mut self) {
        // The source only holds a weak forwarder; take it out of the
        // source's registry once nothing can be fed through it.
        if let Some(link) = self.source.get_mut().take() {
            tracing::trace!(pin = %self.pin, "Dropped debouncer leaves its source");
            link.unlink();
        }
    }
}

/// Debouncer for the raw transitions of one pin.
///
/// State is guarded by a mutex, so [`feed`](Self::feed) may be called from
/// any thread, including concurrently. The settle timer runs on the tokio
/// runtime captured at construction; listeners are called from that timer
/// task.
///
/// `Debouncer` is cheaply cloneable; clones share state and listeners.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tagbox_lib::gpio::{DebounceConfig, Debouncer, EdgeSource};
/// use tagbox_lib::sim::SimulatedGpio;
/// use tagbox_lib::types::{PinId, PullMode};
///
/// # #[tokio::main]
/// # async fn main() -> tagbox_lib::Result<()> {
/// let gpio = Arc::new(SimulatedGpio::new());
/// let source = EdgeSource::acquire(gpio, PinId::new(3), PullMode::PullDown)?;
///
/// let debouncer = Debouncer::attach(&source, DebounceConfig::default())?;
/// debouncer.subscribe(|edge| println!("button pressed at {:?}", edge.at));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebouncerInner>,
}

impl Debouncer {
    /// Creates a standalone debouncer fed through [`feed`](Self::feed).
    ///
    /// # Errors
    ///
    /// Returns `Error::RuntimeUnavailable` when called outside a tokio
    /// runtime.
    pub fn new(pin: PinId, config: DebounceConfig) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;
        Ok(Self::with_runtime(pin, config, runtime))
    }

    /// Creates a standalone debouncer whose timers run on `runtime`.
    #[must_use]
    pub fn with_runtime(pin: PinId, config: DebounceConfig, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                pin,
                config,
                runtime,
                state: Mutex::new(DebounceState::Idle),
                generation: AtomicU64::new(0),
                listeners: ListenerRegistry::new(),
                source: Mutex::new(None),
            }),
        }
    }

    /// Creates a debouncer fed by the transitions of `source`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RuntimeUnavailable` when called outside a tokio
    /// runtime.
    pub fn attach(source: &EdgeSource, config: DebounceConfig) -> Result<Self, Error> {
        let debouncer = Self::new(source.pin(), config)?;
        debouncer.link(source);
        Ok(debouncer)
    }

    fn link(&self, source: &EdgeSource) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = source.subscribe(move |transition| {
            if let Some(inner) = weak.upgrade() {
                inner.feed(*transition);
            }
        });
        *self.inner.source.lock() = Some(SourceLink {
            source: Arc::downgrade(source.shared()),
            subscription,
        });
        tracing::debug!(
            pin = %self.inner.pin,
            edge = %self.inner.config.edge,
            window = ?self.inner.config.window,
            "Debouncer attached"
        );
    }

    /// Feeds one raw transition.
    pub fn feed(&self, transition: RawTransition) {
        self.inner.feed(transition);
    }

    /// Stops receiving transitions from the attached source and drops any
    /// pending settle window without emitting it.
    pub fn detach(&self) {
        let link = self.inner.source.lock().take();
        if let Some(link) = link {
            link.unlink();
        }
        self.inner.reset();
    }

    /// Registers a listener for debounced edges.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&LogicalEdge) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Returns the pin this debouncer watches.
    #[must_use]
    pub fn pin(&self) -> PinId {
        self.inner.pin
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> DebounceConfig {
        self.inner.config
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    /// Returns `true` while a settle window is running.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        matches!(*self.inner.state.lock(), DebounceState::Settling { .. })
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("pin", &self.inner.pin)
            .field("config", &self.inner.config)
            .field("settling", &self.is_settling())
            .field("listener_count", &self.listener_count())
            .finish_non_exhaustive()
    }
}
