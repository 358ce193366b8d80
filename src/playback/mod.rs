// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Playback commands and the backend they are sent to.
//!
//! Buttons only ever issue one-way commands: the library fires a command
//! and moves on, it never waits for the player to report a new state.
//!
//! # Commands
//!
//! | Command                                | MPD equivalent |
//! |----------------------------------------|----------------|
//! | [`PlaybackCommand::PlayPauseToggle`]   | `pause`        |
//! | [`PlaybackCommand::VolumeUp`]          | `volume +N`    |
//! | [`PlaybackCommand::VolumeDown`]        | `volume -N`    |
//! | [`PlaybackCommand::SkipNext`]          | `next`         |

#[cfg(feature = "mpd")]
mod mpd;

#[cfg(feature = "mpd")]
pub use mpd::{DEFAULT_MPD_PORT, MpdClient};

use std::fmt;
use std::str::FromStr;

use crate::error::{PlaybackError, ValueError};

/// Music player backend driven by the jukebox buttons.
///
/// Commands are async so a slow or unreachable player never holds up the
/// tasks that debounce buttons or poll tags. Implementations can use
/// `async fn` directly:
///
/// ```
/// use tagbox_lib::error::PlaybackError;
/// use tagbox_lib::playback::PlaybackControl;
///
/// struct Silent;
///
/// impl PlaybackControl for Silent {
///     async fn play_pause_toggle(&self) -> Result<(), PlaybackError> { Ok(()) }
///     async fn volume_up(&self) -> Result<(), PlaybackError> { Ok(()) }
///     async fn volume_down(&self) -> Result<(), PlaybackError> { Ok(()) }
///     async fn skip_next(&self) -> Result<(), PlaybackError> { Ok(()) }
/// }
/// ```
pub trait PlaybackControl: Send + Sync + 'static {
    /// Toggles between playing and paused.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend did not accept the command.
    fn play_pause_toggle(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send;

    /// Raises the volume by one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend did not accept the command.
    fn volume_up(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send;

    /// Lowers the volume by one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend did not accept the command.
    fn volume_down(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send;

    /// Skips to the next track.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend did not accept the command.
    fn skip_next(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send;
}

/// A playback command that can be bound to a button.
///
/// # Examples
///
/// ```
/// use tagbox_lib::playback::PlaybackCommand;
///
/// let command: PlaybackCommand = "skip_next".parse().unwrap();
/// assert_eq!(command, PlaybackCommand::SkipNext);
/// assert_eq!(command.to_string(), "skip_next");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackCommand {
    /// Toggle play/pause.
    PlayPauseToggle,
    /// Raise the volume.
    VolumeUp,
    /// Lower the volume.
    VolumeDown,
    /// Skip to the next track.
    SkipNext,
}

impl PlaybackCommand {
    /// All commands, in a stable order.
    pub const ALL: [Self; 4] = [
        Self::PlayPauseToggle,
        Self::VolumeUp,
        Self::VolumeDown,
        Self::SkipNext,
    ];

    /// Returns the snake-case name of the command.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlayPauseToggle => "play_pause_toggle",
            Self::VolumeUp => "volume_up",
            Self::VolumeDown => "volume_down",
            Self::SkipNext => "skip_next",
        }
    }

    /// Sends the command to `backend`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    pub async fn execute<P: PlaybackControl>(self, backend: &P) -> Result<(), PlaybackError> {
        match self {
            Self::PlayPauseToggle => backend.play_pause_toggle().await,
            Self::VolumeUp => backend.volume_up().await,
            Self::VolumeDown => backend.volume_down().await,
            Self::SkipNext => backend.skip_next().await,
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackCommand {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "play_pause_toggle" | "play_pause" | "toggle" => Ok(Self::PlayPauseToggle),
            "volume_up" => Ok(Self::VolumeUp),
            "volume_down" => Ok(Self::VolumeDown),
            "skip_next" | "next" => Ok(Self::SkipNext),
            _ => Err(ValueError::InvalidCommand(s.to_string())),
        }
    }
}
