// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `TagBox` library.
//!
//! Failures are grouped by the collaborator they come from: the GPIO
//! interface, the RFID reader, the playback backend and the configuration
//! layer. Only [`HardwareError`] and [`ConfigError`] ever reach a caller of
//! the long-running components; reader and playback failures are logged
//! where they happen and degrade to "no event this cycle".

use thiserror::Error;

use crate::types::PinId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation or parsing.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A GPIO pin could not be acquired or used.
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The playback backend failed to execute a command.
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// The configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A timer or background task was requested outside a tokio runtime.
    #[error("no tokio runtime available")]
    RuntimeUnavailable,

    /// The component is already running.
    #[error("already running")]
    AlreadyRunning,
}

/// Errors related to parsing and validating value types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A tag identifier is not five hex-encoded bytes.
    #[error("invalid tag id: {0}")]
    InvalidTagId(String),

    /// An edge name is not one of `rising`, `falling` or `both`.
    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    /// A playback command name is not recognized.
    #[error("invalid playback command: {0}")]
    InvalidCommand(String),
}

/// Errors raised by the digital input interface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// The pin is already claimed or cannot be configured.
    #[error("pin {pin} unavailable: {reason}")]
    Unavailable {
        /// The pin that could not be acquired.
        pin: PinId,
        /// Why the interface refused the pin.
        reason: String,
    },

    /// An operation was attempted on a pin that is not acquired.
    #[error("pin {0} is not acquired")]
    NotAcquired(PinId),
}

impl HardwareError {
    /// Creates an [`HardwareError::Unavailable`] error.
    #[must_use]
    pub fn unavailable(pin: PinId, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            pin,
            reason: reason.into(),
        }
    }
}

/// Transient failures of an RFID read.
///
/// The tag poller treats every variant as "no tag present".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The reader did not answer the request.
    #[error("reader did not respond")]
    NoResponse,

    /// The read did not complete in time.
    #[error("read timed out after {0} ms")]
    Timeout(u64),

    /// The bus transfer to the reader failed.
    #[error("reader communication failed: {0}")]
    Communication(String),
}

/// Errors returned by a playback backend.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The backend could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// I/O with the backend failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The backend answered with something that is not part of its protocol.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The backend did not answer in time (timeout in milliseconds).
    #[error("backend did not answer within {0} ms")]
    Timeout(u64),
}

/// Errors related to configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// Two buttons are configured on the same pin.
    #[error("pin {0} is configured more than once")]
    DuplicatePin(PinId),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
