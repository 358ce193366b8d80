// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logic levels and edge directions.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Logic level of a digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Pin reads 0.
    Low,
    /// Pin reads 1.
    High,
}

impl Level {
    /// Returns `true` for [`Level::High`].
    #[must_use]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Self::High } else { Self::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::High => "high",
        })
    }
}

/// Edge direction a debouncer reacts to.
///
/// A transition to [`Level::High`] is a rising edge, a transition to
/// [`Level::Low`] is a falling edge.
///
/// # Examples
///
/// ```
/// use tagbox_lib::types::{Edge, Level};
///
/// assert!(Edge::Rising.matches(Level::High));
/// assert!(!Edge::Rising.matches(Level::Low));
/// assert!(Edge::Both.matches(Level::Low));
///
/// let edge: Edge = "falling".parse().unwrap();
/// assert_eq!(edge, Edge::Falling);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Low-to-high transition.
    #[default]
    Rising,
    /// High-to-low transition.
    Falling,
    /// Either transition.
    Both,
}

impl Edge {
    /// Returns `true` if a transition to `level` is an edge of this direction.
    #[must_use]
    pub const fn matches(&self, level: Level) -> bool {
        match self {
            Self::Rising => matches!(level, Level::High),
            Self::Falling => matches!(level, Level::Low),
            Self::Both => true,
        }
    }

    /// Returns the lower-case name of the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edge {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rising" | "up" => Ok(Self::Rising),
            "falling" | "down" => Ok(Self::Falling),
            "both" | "any" => Ok(Self::Both),
            _ => Err(ValueError::InvalidEdge(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_matches_low_only() {
        assert!(Edge::Falling.matches(Level::Low));
        assert!(!Edge::Falling.matches(Level::High));
    }

    #[test]
    fn both_matches_everything() {
        assert!(Edge::Both.matches(Level::High));
        assert!(Edge::Both.matches(Level::Low));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("RISING".parse::<Edge>().unwrap(), Edge::Rising);
        assert_eq!("Both".parse::<Edge>().unwrap(), Edge::Both);
    }

    #[test]
    fn parse_unknown_edge_fails() {
        let err = "sideways".parse::<Edge>().unwrap_err();
        assert_eq!(err, ValueError::InvalidEdge("sideways".to_string()));
    }

    #[test]
    fn edge_serde_names() {
        assert_eq!(serde_json::to_string(&Edge::Falling).unwrap(), "\"falling\"");
        let edge: Edge = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(edge, Edge::Both);
    }

    #[test]
    fn level_from_bool() {
        assert_eq!(Level::from(true), Level::High);
        assert!(!Level::from(false).is_high());
    }
}
