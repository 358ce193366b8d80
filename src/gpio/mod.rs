// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Button input: from raw pin interrupts to playback commands.
//!
//! # Pipeline
//!
//! ```text
//! DigitalInput ──raw──▶ EdgeSource ──raw──▶ Debouncer ──edge──▶ ActionBinding ──▶ PlaybackControl
//! ```
//!
//! - [`DigitalInput`] - driver capability: acquire, watch and release a pin
//! - [`EdgeSource`] - exclusive owner of one pin, forwards raw transitions
//! - [`Debouncer`] - filters contact bounce into [`LogicalEdge`] events
//! - [`ActionBinding`] - runs a [`PlaybackCommand`](crate::playback::PlaybackCommand) per edge
//!
//! Raw transitions arrive on the driver's thread. Debounce state is
//! mutex-guarded and settle timers run on the tokio runtime, so nothing in
//! this pipeline assumes single-threaded delivery.

mod binding;
mod debouncer;
mod edge_source;
mod input;

pub use binding::ActionBinding;
pub use debouncer::{DEFAULT_DEBOUNCE_WINDOW, DebounceConfig, Debouncer, LogicalEdge};
pub use edge_source::EdgeSource;
pub use input::{DigitalInput, PinHandle, RawTransition, TransitionCallback};
