// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the GPIO and RFID sides of the library.
//!
//! # Types
//!
//! - [`PinId`] - Identity of one physical digital input
//! - [`PullMode`] - Internal resistor configuration of an input pin
//! - [`Level`] - Logic level of a pin (low/high)
//! - [`Edge`] - Edge direction a debouncer watches (rising/falling/both)
//! - [`TagId`] - Five-byte identifier of a presented RFID tag

mod edge;
mod pin;
mod tag;

pub use edge::{Edge, Level};
pub use pin::{PinId, PullMode};
pub use tag::{TAG_ID_LEN, TagId};
