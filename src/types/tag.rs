// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RFID tag identity.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Number of bytes in a tag identifier as reported by the reader.
pub const TAG_ID_LEN: usize = 5;

/// Identifier of a physically presented RFID tag.
///
/// The reader reports the UID together with its check byte, five bytes in
/// total. Two identities are equal when all five bytes are equal. "No tag
/// present" is expressed as `Option::<TagId>::None`, never as a special
/// byte pattern.
///
/// The text form is colon separated lower-case hex.
///
/// # Examples
///
/// ```
/// use tagbox_lib::types::TagId;
///
/// let tag = TagId::new([0xde, 0xad, 0xbe, 0xef, 0x01]);
/// assert_eq!(tag.to_string(), "de:ad:be:ef:01");
///
/// let parsed: TagId = "DE:AD:BE:EF:01".parse().unwrap();
/// assert_eq!(parsed, tag);
///
/// let compact: TagId = "deadbeef01".parse().unwrap();
/// assert_eq!(compact, tag);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId([u8; TAG_ID_LEN]);

impl TagId {
    /// Creates a tag identity from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; TAG_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates a tag identity from a slice.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTagId` if the slice is not exactly
    /// [`TAG_ID_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        let bytes: [u8; TAG_ID_LEN] = bytes.try_into().map_err(|_| {
            ValueError::InvalidTagId(format!(
                "expected {TAG_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TAG_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for TagId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| !matches!(c, ':' | '-')).collect();
        // from_str_radix alone would let a leading '+' through.
        if hex.len() != TAG_ID_LEN * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValueError::InvalidTagId(s.to_string()));
        }

        let mut bytes = [0u8; TAG_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| ValueError::InvalidTagId(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; TAG_ID_LEN]> for TagId {
    fn from(bytes: [u8; TAG_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl serde::Serialize for TagId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TagId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
