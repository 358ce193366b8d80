// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pin identity and pull configuration.

use std::fmt;

/// Identity of one physical digital input pin.
///
/// The numbering scheme is whatever the [`DigitalInput`](crate::gpio::DigitalInput)
/// implementation uses; the library only compares and displays it.
///
/// # Examples
///
/// ```
/// use tagbox_lib::types::PinId;
///
/// let pin = PinId::new(3);
/// assert_eq!(pin.value(), 3);
/// assert_eq!(pin.to_string(), "3");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PinId(u8);

impl PinId {
    /// Creates a pin identity.
    #[must_use]
    pub const fn new(pin: u8) -> Self {
        Self(pin)
    }

    /// Returns the raw pin number.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PinId {
    fn from(pin: u8) -> Self {
        Self(pin)
    }
}

/// Internal resistor configuration applied when a pin is acquired.
///
/// Jukebox buttons connect the pin to 3.3V when pressed, so they use
/// [`PullMode::PullDown`] and a press shows up as a rising edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullMode {
    /// Pin is pulled to ground when idle.
    #[default]
    PullDown,
    /// Pin is pulled to the supply voltage when idle.
    PullUp,
    /// No internal resistor.
    Floating,
}

impl PullMode {
    /// Returns the short name of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PullDown => "pull_down",
            Self::PullUp => "pull_up",
            Self::Floating => "floating",
        }
    }
}

impl fmt::Display for PullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
