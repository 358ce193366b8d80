// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RFID tag detection.
//!
//! A [`TagPoller`] asks an [`RfidReader`] for the presented tag once per
//! interval and reports a [`TagChange`] whenever the answer differs from
//! the previous one. Presence is sampled, so a tag that comes and goes
//! within one interval is never seen.

mod poller;
mod reader;
mod tracker;

pub use poller::{DEFAULT_POLL_INTERVAL, TagPoller};
pub use reader::RfidReader;
pub use tracker::{TagChange, TagTracker};
