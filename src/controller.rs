// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Jukebox wiring: buttons, tag poller and playback backend in one place.

use std::sync::Arc;

use crate::config::{ButtonConfig, JukeboxConfig};
use crate::error::Error;
use crate::gpio::{ActionBinding, Debouncer, DigitalInput, EdgeSource};
use crate::playback::{PlaybackCommand, PlaybackControl};
use crate::rfid::{RfidReader, TagChange, TagPoller};
use crate::subscription::SubscriptionId;
use crate::types::PinId;

/// One wired button: pin, debouncer and command binding.
pub struct Button {
    // Field order is drop order: unbind, then stop debouncing, then release.
    binding: ActionBinding,
    debouncer: Debouncer,
    source: EdgeSource,
    config: ButtonConfig,
}

impl Button {
    fn wire<P: PlaybackControl>(
        input: &Arc<dyn DigitalInput>,
        config: &ButtonConfig,
        playback: &Arc<P>,
    ) -> Result<Self, Error> {
        let source = EdgeSource::acquire(Arc::clone(input), config.pin, config.pull)?;
        let debouncer = Debouncer::attach(&source, config.debounce_config())?;
        let binding = ActionBinding::bind(&debouncer, config.command, Arc::clone(playback));

        Ok(Self {
            binding,
            debouncer,
            source,
            config: config.clone(),
        })
    }

    /// Returns the pin.
    #[must_use]
    pub fn pin(&self) -> PinId {
        self.config.pin
    }

    /// Returns the bound command.
    #[must_use]
    pub fn command(&self) -> PlaybackCommand {
        self.binding.command()
    }

    /// Returns the configuration the button was wired from.
    #[must_use]
    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    /// Returns the button's debouncer, e.g. to observe presses.
    #[must_use]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Returns the pin owner.
    #[must_use]
    pub fn source(&self) -> &EdgeSource {
        &self.source
    }

    fn shutdown(&mut self) {
        self.binding.unbind();
        self.debouncer.detach();
        self.source.release();
    }
}

impl std::fmt::Debug for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Button")
            .field("pin", &self.pin())
            .field("command", &self.command())
            .field("edge", &self.config.edge)
            .field("released", &self.source.is_released())
            .finish_non_exhaustive()
    }
}

/// A running jukebox.
///
/// Owns every acquired pin and the tag poller. Pins are released by
/// [`shutdown`](Self::shutdown) or when the jukebox is dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tagbox_lib::config::JukeboxConfig;
/// use tagbox_lib::controller::Jukebox;
/// use tagbox_lib::sim::{RecordingPlayback, ScriptedReader, SimulatedGpio};
///
/// # #[tokio::main]
/// # async fn main() -> tagbox_lib::Result<()> {
/// let gpio = Arc::new(SimulatedGpio::new());
/// let playback = Arc::new(RecordingPlayback::new());
///
/// let mut jukebox = Jukebox::wire(&JukeboxConfig::default(), gpio, playback)?;
/// jukebox.on_tag_changed(|change| println!("tag: {change}"));
/// jukebox.start_polling(ScriptedReader::empty())?;
///
/// assert_eq!(jukebox.buttons().len(), 4);
/// jukebox.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Jukebox {
    buttons: Vec<Button>,
    poller: TagPoller,
    config: JukeboxConfig,
}

impl Jukebox {
    /// Wires all buttons and starts polling `reader`.
    ///
    /// Tag listeners added after this call may miss the first change; use
    /// [`wire`](Self::wire) and [`start_polling`](Self::start_polling) to
    /// subscribe first.
    ///
    /// # Errors
    ///
    /// See [`wire`](Self::wire) and [`start_polling`](Self::start_polling).
    pub fn start<R: RfidReader, P: PlaybackControl>(
        config: &JukeboxConfig,
        input: Arc<dyn DigitalInput>,
        reader: R,
        playback: Arc<P>,
    ) -> Result<Self, Error> {
        let jukebox = Self::wire(config, input, playback)?;
        jukebox.start_polling(reader)?;
        Ok(jukebox)
    }

    /// Acquires and wires every configured button without polling tags.
    ///
    /// Buttons are wired in configuration order. If any of them fails,
    /// the pins already acquired are released before the error returns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration,
    /// `Error::Hardware` if a pin cannot be acquired, and
    /// `Error::RuntimeUnavailable` outside a tokio runtime.
    pub fn wire<P: PlaybackControl>(
        config: &JukeboxConfig,
        input: Arc<dyn DigitalInput>,
        playback: Arc<P>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let mut buttons = Vec::with_capacity(config.buttons.len());
        for button in &config.buttons {
            match Button::wire(&input, button, &playback) {
                Ok(wired) => {
                    tracing::debug!(pin = %wired.pin(), command = %wired.command(), "Button wired");
                    buttons.push(wired);
                }
                Err(e) => {
                    tracing::warn!(pin = %button.pin, error = %e, "Failed to wire button, releasing pins");
                    for wired in &mut buttons {
                        wired.shutdown();
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(buttons = buttons.len(), "Jukebox wired");
        Ok(Self {
            buttons,
            poller: TagPoller::new(),
            config: config.clone(),
        })
    }

    /// Starts polling `reader` at the configured interval.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` if polling is active, or
    /// `Error::RuntimeUnavailable` outside a tokio runtime.
    pub fn start_polling<R: RfidReader>(&self, reader: R) -> Result<(), Error> {
        self.poller.start(reader, self.config.poller.interval())
    }

    /// Registers a listener for tag changes.
    pub fn on_tag_changed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TagChange) + Send + Sync + 'static,
    {
        self.poller.subscribe(listener)
    }

    /// Removes a tag listener. Returns `false` if it was not registered.
    pub fn remove_tag_listener(&self, id: SubscriptionId) -> bool {
        self.poller.unsubscribe(id)
    }

    /// Returns the wired buttons, in configuration order.
    #[must_use]
    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Returns the button wired to `pin`.
    #[must_use]
    pub fn button(&self, pin: PinId) -> Option<&Button> {
        self.buttons.iter().find(|b| b.pin() == pin)
    }

    /// Returns `true` while tags are being polled.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Returns the configuration the jukebox was wired from.
    #[must_use]
    pub fn config(&self) -> &JukeboxConfig {
        &self.config
    }

    /// Stops polling, unbinds every button and releases every pin.
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&mut self) {
        self.poller.shutdown().await;
        for button in &mut self.buttons {
            button.shutdown();
        }
        if !self.buttons.is_empty() {
            tracing::info!(buttons = self.buttons.len(), "Jukebox shut down");
        }
        self.buttons.clear();
    }
}

impl std::fmt::Debug for Jukebox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jukebox")
            .field("buttons", &self.buttons)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, HardwareError};
    use crate::sim::{RecordingPlayback, ScriptedReader, SimulatedGpio};
    use crate::types::{Level, PullMode, TagId};
    use parking_lot::Mutex;
    use std::time::Duration;

    const TAG: TagId = TagId::new([0x04, 0xa2, 0x19, 0x7f, 0x30]);

    /// Lets paused time run on until every spawned command has finished.
    async fn elapse(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn press(gpio: &SimulatedGpio, pin: u8) {
        gpio.set_level(PinId::new(pin), Level::High);
        gpio.set_level(PinId::new(pin), Level::Low);
    }

    fn rig() -> (Arc<SimulatedGpio>, Arc<RecordingPlayback>) {
        (
            Arc::new(SimulatedGpio::new()),
            Arc::new(RecordingPlayback::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn buttons_issue_their_commands() {
        let (gpio, playback) = rig();
        let mut jukebox =
            Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback.clone()).unwrap();

        for pin in 3..=6 {
            assert!(gpio.is_acquired(PinId::new(pin)));
        }

        press(&gpio, 6);
        elapse(60).await;
        press(&gpio, 3);
        elapse(60).await;

        assert_eq!(
            playback.commands(),
            vec![PlaybackCommand::SkipNext, PlaybackCommand::PlayPauseToggle]
        );
        jukebox.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_player_does_not_stall_buttons_or_tags() {
        let (gpio, playback) = rig();
        playback.stall(PlaybackCommand::SkipNext);
        let mut jukebox =
            Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback.clone()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        jukebox.on_tag_changed(move |change| sink.lock().push(*change));
        jukebox
            .start_polling(ScriptedReader::new([None, Some(TAG)]))
            .unwrap();

        press(&gpio, 6);
        elapse(60).await;
        press(&gpio, 4);
        elapse(1_500).await;

        assert_eq!(playback.commands(), vec![PlaybackCommand::VolumeUp]);
        assert_eq!(*seen.lock(), vec![TagChange::new(None, Some(TAG))]);
        jukebox.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pin_releases_earlier_ones() {
        let (gpio, playback) = rig();
        gpio.fail_pin(PinId::new(5));

        let result = Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback);

        assert!(matches!(
            result,
            Err(Error::Hardware(HardwareError::Unavailable { pin, .. })) if pin == PinId::new(5)
        ));
        for pin in 3..=6 {
            assert!(!gpio.is_acquired(PinId::new(pin)));
        }
        assert_eq!(gpio.release_count(PinId::new(3)), 1);
        assert_eq!(gpio.release_count(PinId::new(4)), 1);
        assert_eq!(gpio.release_count(PinId::new(6)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pin_claimed_elsewhere_fails_wiring() {
        let (gpio, playback) = rig();
        let _held = gpio.acquire(PinId::new(4), PullMode::PullDown).unwrap();

        let result = Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback);

        assert!(result.is_err());
        assert!(!gpio.is_acquired(PinId::new(3)));
        assert!(gpio.is_acquired(PinId::new(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_touches_no_pin() {
        let (gpio, playback) = rig();
        let config = JukeboxConfig::default().with_button(ButtonConfig::new(
            PinId::new(3),
            PlaybackCommand::SkipNext,
        ));

        let result = Jukebox::wire(&config, gpio.clone(), playback);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DuplicatePin(_)))
        ));
        assert!(!gpio.is_acquired(PinId::new(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn tag_listener_sees_presented_tag() {
        let (gpio, playback) = rig();
        let mut jukebox =
            Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        jukebox.on_tag_changed(move |change| sink.lock().push(*change));

        jukebox
            .start_polling(ScriptedReader::new([None, Some(TAG)]))
            .unwrap();
        assert!(jukebox.is_polling());
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(*seen.lock(), vec![TagChange::new(None, Some(TAG))]);
        jukebox.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_everything() {
        let (gpio, playback) = rig();
        let mut jukebox = Jukebox::start(
            &JukeboxConfig::default(),
            gpio.clone(),
            ScriptedReader::empty(),
            playback.clone(),
        )
        .unwrap();

        jukebox.shutdown().await;
        jukebox.shutdown().await;

        assert!(!jukebox.is_polling());
        assert!(jukebox.buttons().is_empty());
        for pin in 3..=6 {
            assert!(!gpio.is_acquired(PinId::new(pin)));
            assert_eq!(gpio.release_count(PinId::new(pin)), 1);
        }

        press(&gpio, 6);
        elapse(60).await;
        assert!(playback.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_pins() {
        let (gpio, playback) = rig();
        {
            let _jukebox =
                Jukebox::wire(&JukeboxConfig::default(), gpio.clone(), playback).unwrap();
        }
        for pin in 3..=6 {
            assert!(!gpio.is_acquired(PinId::new(pin)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn button_lookup() {
        let (gpio, playback) = rig();
        let jukebox = Jukebox::wire(&JukeboxConfig::default(), gpio, playback).unwrap();

        let button = jukebox.button(PinId::new(4)).unwrap();
        assert_eq!(button.command(), PlaybackCommand::VolumeUp);
        assert_eq!(button.debouncer().pin(), PinId::new(4));
        assert!(!button.source().is_released());
        assert!(jukebox.button(PinId::new(17)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_twice_is_rejected() {
        let (gpio, playback) = rig();
        let mut jukebox = Jukebox::start(
            &JukeboxConfig::default(),
            gpio,
            ScriptedReader::empty(),
            playback,
        )
        .unwrap();

        let again = jukebox.start_polling(ScriptedReader::empty());
        assert!(matches!(again, Err(Error::AlreadyRunning)));
        jukebox.shutdown().await;
    }
}
