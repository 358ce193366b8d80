// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `TagBox` Lib - the hardware event core of a Raspberry Pi jukebox.
//!
//! Kids put an RFID card on the box to pick an album and press physical
//! buttons to pause, change the volume or skip a track. This library turns
//! both kinds of input into clean events:
//!
//! - **Buttons**: raw GPIO interrupts are debounced into one event per
//!   press and mapped to playback commands.
//! - **Tags**: an RFID reader is polled periodically and listeners are told
//!   whenever the presented tag changes.
//!
//! Hardware access goes through small capability traits
//! ([`DigitalInput`], [`RfidReader`], [`PlaybackControl`]). The [`sim`]
//! module implements all three in memory.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tagbox_lib::{Jukebox, JukeboxConfig, MpdClient};
//! use tagbox_lib::sim::{ScriptedReader, SimulatedGpio};
//!
//! #[tokio::main]
//! async fn main() -> tagbox_lib::Result<()> {
//!     let config = JukeboxConfig::default();
//!     let playback = Arc::new(MpdClient::from_config(&config.mpd));
//!
//!     let mut jukebox = Jukebox::wire(&config, Arc::new(SimulatedGpio::new()), playback)?;
//!     jukebox.on_tag_changed(|change| match change.current {
//!         Some(tag) => println!("play album for {tag}"),
//!         None => println!("tag removed"),
//!     });
//!     jukebox.start_polling(ScriptedReader::empty())?;
//!
//!     tokio::time::sleep(Duration::from_secs(3600)).await;
//!     jukebox.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Single Button
//!
//! The building blocks can be used on their own:
//!
//! ```
//! use std::sync::Arc;
//! use tagbox_lib::gpio::{ActionBinding, DebounceConfig, Debouncer, EdgeSource};
//! use tagbox_lib::playback::PlaybackCommand;
//! use tagbox_lib::sim::{RecordingPlayback, SimulatedGpio};
//! use tagbox_lib::types::{PinId, PullMode};
//!
//! # #[tokio::main]
//! # async fn main() -> tagbox_lib::Result<()> {
//! let gpio = Arc::new(SimulatedGpio::new());
//! let playback = Arc::new(RecordingPlayback::new());
//!
//! let source = EdgeSource::acquire(gpio, PinId::new(6), PullMode::PullDown)?;
//! let debouncer = Debouncer::attach(&source, DebounceConfig::default())?;
//! let _binding = ActionBinding::bind(&debouncer, PlaybackCommand::SkipNext, playback);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod gpio;
pub mod playback;
pub mod rfid;
pub mod sim;
pub mod subscription;
pub mod types;

pub use config::{ButtonConfig, JukeboxConfig, MpdConfig, PollerConfig};
pub use controller::{Button, Jukebox};
pub use error::{
    ConfigError, Error, HardwareError, PlaybackError, ReadError, Result, ValueError,
};
pub use gpio::{
    ActionBinding, DebounceConfig, Debouncer, DigitalInput, EdgeSource, LogicalEdge, PinHandle,
    RawTransition,
};
#[cfg(feature = "mpd")]
pub use playback::MpdClient;
pub use playback::{PlaybackCommand, PlaybackControl};
pub use rfid::{RfidReader, TagChange, TagPoller};
pub use subscription::{ListenerRegistry, SubscriptionId};
pub use types::{Edge, Level, PinId, PullMode, TagId};
