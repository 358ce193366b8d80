// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MPD backend over the plain-text protocol.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::PlaybackControl;
use crate::config::MpdConfig;
use crate::error::PlaybackError;

/// Default MPD port.
pub const DEFAULT_MPD_PORT: u16 = 6600;

/// Playback backend talking to a Music Player Daemon.
///
/// Each command opens a short-lived connection: MPD drops idle clients,
/// and buttons are pressed rarely enough that reconnecting is cheaper than
/// keeping a session alive. All I/O is async and every step (connect,
/// greeting, command, reply) is bounded by the client timeout.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagbox_lib::playback::MpdClient;
///
/// let client = MpdClient::new("localhost", 6600)
///     .with_timeout(Duration::from_secs(1))
///     .with_volume_step(10);
/// assert_eq!(client.volume_step(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct MpdClient {
    host: String,
    port: u16,
    timeout: Duration,
    volume_step: u8,
}

impl MpdClient {
    /// Default timeout of each connect, read and write.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    /// Default volume change per button press, in percent.
    pub const DEFAULT_VOLUME_STEP: u8 = 5;

    /// Creates a client for the daemon at `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Self::DEFAULT_TIMEOUT,
            volume_step: Self::DEFAULT_VOLUME_STEP,
        }
    }

    /// Creates a client from a configuration section.
    #[must_use]
    pub fn from_config(config: &MpdConfig) -> Self {
        Self::new(config.host.clone(), config.port)
            .with_timeout(config.timeout())
            .with_volume_step(config.volume_step)
    }

    /// Sets the timeout of each connect, read and write.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the volume change per press, in percent.
    #[must_use]
    pub fn with_volume_step(mut self, step: u8) -> Self {
        self.volume_step = step;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the volume step.
    #[must_use]
    pub fn volume_step(&self) -> u8 {
        self.volume_step
    }

    async fn connect(&self) -> Result<TcpStream, PlaybackError> {
        let endpoint = format!("{}:{}", self.host, self.port);
        match timeout(self.timeout, TcpStream::connect((self.host.as_str(), self.port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(PlaybackError::ConnectionFailed(format!("{endpoint}: {e}"))),
            Err(_) => Err(PlaybackError::ConnectionFailed(format!(
                "{endpoint}: no answer within {} ms",
                millis(self.timeout)
            ))),
        }
    }

    async fn send(&self, command: &str) -> Result<(), PlaybackError> {
        tracing::debug!(host = %self.host, port = self.port, command, "Sending MPD command");

        let stream = self.connect().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let greeting = read_line(&mut reader, self.timeout).await?;
        if !greeting.starts_with("OK MPD") {
            return Err(PlaybackError::UnexpectedResponse(greeting));
        }

        let line = format!("{command}\n");
        timeout(self.timeout, write_half.write_all(line.as_bytes()))
            .await
            .map_err(|_| PlaybackError::Timeout(millis(self.timeout)))??;

        let reply = read_line(&mut reader, self.timeout).await?;
        parse_reply(&reply)
    }
}

impl Default for MpdClient {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_MPD_PORT)
    }
}

impl PlaybackControl for MpdClient {
    async fn play_pause_toggle(&self) -> Result<(), PlaybackError> {
        self.send("pause").await
    }

    async fn volume_up(&self) -> Result<(), PlaybackError> {
        self.send(&format!("volume +{}", self.volume_step)).await
    }

    async fn volume_down(&self) -> Result<(), PlaybackError> {
        self.send(&format!("volume -{}", self.volume_step)).await
    }

    async fn skip_next(&self) -> Result<(), PlaybackError> {
        self.send("next").await
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn read_line<R>(reader: &mut R, limit: Duration) -> Result<String, PlaybackError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = timeout(limit, reader.read_line(&mut line))
        .await
        .map_err(|_| PlaybackError::Timeout(millis(limit)))??;
    if read == 0 {
        return Err(PlaybackError::UnexpectedResponse(
            "connection closed".to_string(),
        ));
    }
    Ok(line.trim_end().to_string())
}

fn parse_reply(reply: &str) -> Result<(), PlaybackError> {
    if reply == "OK" {
        Ok(())
    } else if let Some(message) = reply.strip_prefix("ACK ") {
        Err(PlaybackError::Rejected(message.to_string()))
    } else {
        Err(PlaybackError::UnexpectedResponse(reply.to_string()))
    }
}
