// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Jukebox configuration.
//!
//! Configuration is plain data, loadable from JSON. Every section has
//! defaults matching the stock build: four buttons on pins 3 to 6, a tag
//! poll every second, and MPD on `localhost:6600`.
//!
//! ```json
//! {
//!   "buttons": [
//!     { "pin": 3, "command": "play_pause_toggle" },
//!     { "pin": 6, "command": "skip_next", "edge": "rising", "debounce_ms": 80 }
//!   ],
//!   "poller": { "interval_ms": 500 },
//!   "mpd": { "host": "music.local", "port": 6600 }
//! }
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gpio::DebounceConfig;
use crate::playback::PlaybackCommand;
use crate::types::{Edge, PinId, PullMode};

const DEFAULT_DEBOUNCE_MS: u64 = 50;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_MPD_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_VOLUME_STEP: u8 = 5;

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_mpd_host() -> String {
    "localhost".to_string()
}

fn default_mpd_port() -> u16 {
    6600
}

fn default_mpd_timeout_ms() -> u64 {
    DEFAULT_MPD_TIMEOUT_MS
}

fn default_volume_step() -> u8 {
    DEFAULT_VOLUME_STEP
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

/// One physical button and the command it triggers.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagbox_lib::config::ButtonConfig;
/// use tagbox_lib::playback::PlaybackCommand;
/// use tagbox_lib::types::{Edge, PinId};
///
/// let button = ButtonConfig::new(PinId::new(6), PlaybackCommand::SkipNext)
///     .with_debounce(Duration::from_millis(80));
/// assert_eq!(button.edge, Edge::Rising);
/// assert_eq!(button.debounce_config().window, Duration::from_millis(80));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    /// The input pin the button is wired to.
    pub pin: PinId,
    /// Internal resistor applied to the pin.
    #[serde(default)]
    pub pull: PullMode,
    /// Direction that counts as a press.
    #[serde(default)]
    pub edge: Edge,
    /// Settle window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Command issued on every press.
    pub command: PlaybackCommand,
}

impl ButtonConfig {
    /// Creates a pull-down, rising-edge button with the default window.
    #[must_use]
    pub fn new(pin: PinId, command: PlaybackCommand) -> Self {
        Self {
            pin,
            pull: PullMode::default(),
            edge: Edge::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            command,
        }
    }

    /// Sets the edge that counts as a press.
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edge = edge;
        self
    }

    /// Sets the pull configuration.
    #[must_use]
    pub fn with_pull(mut self, pull: PullMode) -> Self {
        self.pull = pull;
        self
    }

    /// Sets the settle window. Sub-millisecond parts are dropped.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the settle window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the debouncer configuration for this button.
    #[must_use]
    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig::new(self.edge).with_window(self.debounce())
    }
}

/// Tag poller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Time between two reads, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl PollerConfig {
    /// Returns the poll interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Connection settings for the MPD backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MpdConfig {
    /// Host name or address of the daemon.
    #[serde(default = "default_mpd_host")]
    pub host: String,
    /// TCP port of the daemon.
    #[serde(default = "default_mpd_port")]
    pub port: u16,
    /// Connect, read and write timeout in milliseconds.
    #[serde(default = "default_mpd_timeout_ms")]
    pub timeout_ms: u64,
    /// Volume change per press, in percent.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

impl MpdConfig {
    /// Returns the I/O timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MpdConfig {
    fn default() -> Self {
        Self {
            host: default_mpd_host(),
            port: default_mpd_port(),
            timeout_ms: DEFAULT_MPD_TIMEOUT_MS,
            volume_step: DEFAULT_VOLUME_STEP,
        }
    }
}

/// Complete jukebox configuration.
///
/// # Examples
///
/// ```
/// use tagbox_lib::config::JukeboxConfig;
/// use tagbox_lib::playback::PlaybackCommand;
///
/// let config = JukeboxConfig::from_json(r#"{
///     "buttons": [{ "pin": 17, "command": "skip_next" }],
///     "poller": { "interval_ms": 250 }
/// }"#)?;
///
/// assert_eq!(config.buttons.len(), 1);
/// assert_eq!(config.buttons[0].command, PlaybackCommand::SkipNext);
/// assert_eq!(config.mpd.port, 6600);
/// # Ok::<(), tagbox_lib::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JukeboxConfig {
    /// Buttons to wire, in acquisition order.
    #[serde(default = "default_buttons")]
    pub buttons: Vec<ButtonConfig>,
    /// Tag poller settings.
    #[serde(default)]
    pub poller: PollerConfig,
    /// MPD backend settings.
    #[serde(default)]
    pub mpd: MpdConfig,
}

fn default_buttons() -> Vec<ButtonConfig> {
    vec![
        ButtonConfig::new(PinId::new(3), PlaybackCommand::PlayPauseToggle),
        ButtonConfig::new(PinId::new(4), PlaybackCommand::VolumeUp),
        ButtonConfig::new(PinId::new(5), PlaybackCommand::VolumeDown),
        ButtonConfig::new(PinId::new(6), PlaybackCommand::SkipNext),
    ]
}

impl JukeboxConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` for malformed JSON or unknown fields, and
    /// the errors of [`validate`](Self::validate) otherwise.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Adds a button.
    #[must_use]
    pub fn with_button(mut self, button: ButtonConfig) -> Self {
        self.buttons.push(button);
        self
    }

    /// Replaces all buttons.
    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<ButtonConfig>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Sets the tag poll interval. Sub-millisecond parts are dropped.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the MPD settings.
    #[must_use]
    pub fn with_mpd(mut self, mpd: MpdConfig) -> Self {
        self.mpd = mpd;
        self
    }

    /// Checks value ranges and pin uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero window, interval or
    /// timeout, an empty MPD host or a volume step outside `1..=100`, and
    /// `ConfigError::DuplicatePin` if two buttons share a pin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut pins = BTreeSet::new();
        for (index, button) in self.buttons.iter().enumerate() {
            if button.debounce_ms == 0 {
                return Err(invalid(
                    format!("buttons[{index}].debounce_ms"),
                    "must be greater than zero",
                ));
            }
            if !pins.insert(button.pin) {
                return Err(ConfigError::DuplicatePin(button.pin));
            }
        }

        if self.poller.interval_ms == 0 {
            return Err(invalid("poller.interval_ms", "must be greater than zero"));
        }
        if self.mpd.host.trim().is_empty() {
            return Err(invalid("mpd.host", "must not be empty"));
        }
        if self.mpd.timeout_ms == 0 {
            return Err(invalid("mpd.timeout_ms", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.mpd.volume_step) {
            return Err(invalid("mpd.volume_step", "must be between 1 and 100"));
        }
        Ok(())
    }
}

impl Default for JukeboxConfig {
    fn default() -> Self {
        Self {
            buttons: default_buttons(),
            poller: PollerConfig::default(),
            mpd: MpdConfig::default(),
        }
    }
}
