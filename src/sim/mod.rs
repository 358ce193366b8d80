// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory stand-ins for the jukebox hardware.
//!
//! These implement the library's capability traits without touching real
//! devices, so the event pipeline can be exercised on any machine:
//!
//! - [`SimulatedGpio`] - a [`DigitalInput`] whose pin levels are set by hand
//! - [`ScriptedReader`] - an [`RfidReader`] that replays a list of reads
//! - [`RecordingPlayback`] - a [`PlaybackControl`] that records commands

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{HardwareError, PlaybackError, ReadError};
use crate::gpio::{DigitalInput, PinHandle, RawTransition, TransitionCallback};
use crate::playback::{PlaybackCommand, PlaybackControl};
use crate::rfid::RfidReader;
use crate::types::{Level, PinId, PullMode, TagId};

struct SimPin {
    acquired: bool,
    generation: u64,
    failing: bool,
    level: Level,
    callbacks: Vec<TransitionCallback>,
    releases: usize,
}

impl SimPin {
    fn new() -> Self {
        Self {
            acquired: false,
            generation: 0,
            failing: false,
            level: Level::Low,
            callbacks: Vec::new(),
            releases: 0,
        }
    }

    fn is_held_by(&self, handle: &PinHandle) -> bool {
        self.acquired && self.generation == handle.generation()
    }
}

/// Simulated GPIO controller.
///
/// Each pin can be acquired by one owner at a time, and every acquisition
/// gets a new handle generation: a handle kept after its release no longer
/// controls the pin. Changing a pin's level
/// with [`set_level`](Self::set_level) invokes its callbacks synchronously
/// on the calling thread, the way an interrupt thread would.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tagbox_lib::gpio::DigitalInput;
/// use tagbox_lib::sim::SimulatedGpio;
/// use tagbox_lib::types::{Level, PinId, PullMode};
///
/// let gpio = SimulatedGpio::new();
/// let handle = gpio.acquire(PinId::new(3), PullMode::PullDown).unwrap();
/// gpio.on_transition(&handle, Arc::new(|t| println!("now {}", t.level()))).unwrap();
///
/// gpio.set_level(PinId::new(3), Level::High);
/// gpio.release(&handle);
/// assert!(!gpio.is_acquired(PinId::new(3)));
/// ```
#[derive(Default)]
pub struct SimulatedGpio {
    pins: Mutex<HashMap<PinId, SimPin>>,
}

impl SimulatedGpio {
    /// Creates a controller with every pin free and low.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next interrupt configuration of `pin` fail.
    ///
    /// The pin can still be acquired, which lets callers check that a
    /// half-configured pin is released again.
    pub fn fail_pin(&self, pin: PinId) {
        self.pins.lock().entry(pin).or_insert_with(SimPin::new).failing = true;
    }

    /// Returns `true` if `pin` is currently acquired.
    #[must_use]
    pub fn is_acquired(&self, pin: PinId) -> bool {
        self.pins.lock().get(&pin).is_some_and(|p| p.acquired)
    }

    /// Returns how many times `pin` has been released.
    #[must_use]
    pub fn release_count(&self, pin: PinId) -> usize {
        self.pins.lock().get(&pin).map_or(0, |p| p.releases)
    }

    /// Returns the current level of `pin`.
    #[must_use]
    pub fn level(&self, pin: PinId) -> Level {
        self.pins.lock().get(&pin).map_or(Level::Low, |p| p.level)
    }

    /// Returns the callbacks currently registered for `pin`.
    ///
    /// Holding on to them simulates a driver that still has an interrupt in
    /// flight when the pin is released.
    #[must_use]
    pub fn callbacks(&self, pin: PinId) -> Vec<TransitionCallback> {
        self.pins
            .lock()
            .get(&pin)
            .map(|p| p.callbacks.clone())
            .unwrap_or_default()
    }

    /// Drives `pin` to `level`.
    ///
    /// Callbacks fire only if the level actually changes.
    pub fn set_level(&self, pin: PinId, level: Level) {
        let callbacks = {
            let mut pins = self.pins.lock();
            let state = pins.entry(pin).or_insert_with(SimPin::new);
            if state.level == level {
                return;
            }
            state.level = level;
            state.callbacks.clone()
        };
        let transition = RawTransition::now(level);
        for callback in callbacks {
            callback(transition);
        }
    }

    /// Delivers an arbitrary raw transition to the callbacks of `pin`.
    ///
    /// Unlike [`set_level`](Self::set_level) this does not check for a
    /// level change, so it can reproduce glitches a real contact produces.
    pub fn inject(&self, pin: PinId, transition: RawTransition) {
        let callbacks = {
            let mut pins = self.pins.lock();
            let state = pins.entry(pin).or_insert_with(SimPin::new);
            state.level = transition.level();
            state.callbacks.clone()
        };
        for callback in callbacks {
            callback(transition);
        }
    }
}

impl DigitalInput for SimulatedGpio {
    fn acquire(&self, pin: PinId, pull: PullMode) -> Result<PinHandle, HardwareError> {
        let mut pins = self.pins.lock();
        let state = pins.entry(pin).or_insert_with(SimPin::new);
        if state.acquired {
            return Err(HardwareError::unavailable(pin, "already acquired"));
        }
        state.acquired = true;
        state.generation += 1;
        state.level = match pull {
            PullMode::PullUp => Level::High,
            PullMode::PullDown | PullMode::Floating => Level::Low,
        };
        Ok(PinHandle::with_generation(pin, pull, state.generation))
    }

    fn on_transition(
        &self,
        handle: &PinHandle,
        callback: TransitionCallback,
    ) -> Result<(), HardwareError> {
        let mut pins = self.pins.lock();
        let state = pins
            .get_mut(&handle.pin())
            .filter(|p| p.is_held_by(handle))
            .ok_or(HardwareError::NotAcquired(handle.pin()))?;
        if state.failing {
            state.failing = false;
            return Err(HardwareError::unavailable(
                handle.pin(),
                "interrupt configuration failed",
            ));
        }
        state.callbacks.push(callback);
        Ok(())
    }

    fn release(&self, handle: &PinHandle) {
        let mut pins = self.pins.lock();
        if let Some(state) = pins.get_mut(&handle.pin())
            && state.is_held_by(handle)
        {
            state.acquired = false;
            state.callbacks.clear();
            state.releases += 1;
        }
    }
}

impl std::fmt::Debug for SimulatedGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pins = self.pins.lock();
        let mut acquired: Vec<PinId> = pins
            .iter()
            .filter(|(_, p)| p.acquired)
            .map(|(pin, _)| *pin)
            .collect();
        acquired.sort();
        f.debug_struct("SimulatedGpio")
            .field("acquired", &acquired)
            .finish()
    }
}

/// RFID reader that replays a script of reads.
///
/// Once the script is exhausted the reader keeps reporting the last
/// successfully read value, like a tag that stays on the reader.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    script: Mutex<VecDeque<Result<Option<TagId>, ReadError>>>,
    last: Mutex<Option<TagId>>,
    reads: AtomicUsize,
}

impl ScriptedReader {
    /// Creates a reader that returns `reads` in order.
    #[must_use]
    pub fn new(reads: impl IntoIterator<Item = Option<TagId>>) -> Self {
        Self {
            script: Mutex::new(reads.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Creates a reader that never sees a tag.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a read to the script.
    pub fn push(&self, read: Option<TagId>) {
        self.script.lock().push_back(Ok(read));
    }

    /// Appends a failing read to the script.
    pub fn push_error(&self, error: ReadError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns how many reads have been performed.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn next_read(&self) -> Result<Option<TagId>, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        match self.script.lock().pop_front() {
            Some(Ok(tag)) => {
                *last = tag;
                Ok(tag)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*last),
        }
    }
}

impl RfidReader for ScriptedReader {
    async fn read_tag(&self) -> Result<Option<TagId>, ReadError> {
        self.next_read()
    }
}

/// Playback backend that records every command it accepts.
#[derive(Debug, Default)]
pub struct RecordingPlayback {
    commands: Mutex<Vec<PlaybackCommand>>,
    stalled: Mutex<BTreeSet<&'static str>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPlayback {
    /// Creates a backend that accepts every command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent commands fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every later `command` hang forever, like a player that accepts
    /// the connection and never answers.
    ///
    /// Stalled commands count as attempts but are never recorded.
    pub fn stall(&self, command: PlaybackCommand) {
        self.stalled.lock().insert(command.as_str());
    }

    /// Returns the accepted commands in the order they arrived.
    #[must_use]
    pub fn commands(&self) -> Vec<PlaybackCommand> {
        self.commands.lock().clone()
    }

    /// Returns how many commands were attempted, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn record(&self, command: PlaybackCommand) -> Result<(), PlaybackError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let stalled = self.stalled.lock().contains(command.as_str());
        if stalled {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlaybackError::ConnectionFailed(
                "simulated backend offline".to_string(),
            ));
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

impl PlaybackControl for RecordingPlayback {
    async fn play_pause_toggle(&self) -> Result<(), PlaybackError> {
        self.record(PlaybackCommand::PlayPauseToggle).await
    }

    async fn volume_up(&self) -> Result<(), PlaybackError> {
        self.record(PlaybackCommand::VolumeUp).await
    }

    async fn volume_down(&self) -> Result<(), PlaybackError> {
        self.record(PlaybackCommand::VolumeDown).await
    }

    async fn skip_next(&self) -> Result<(), PlaybackError> {
        self.record(PlaybackCommand::SkipNext).await
    }
}
