// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change detection between consecutive tag reads.

use std::fmt;

use crate::types::TagId;

/// A change of the presented tag between two poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagChange {
    /// The tag seen before the change, if any.
    pub previous: Option<TagId>,
    /// The tag seen now, if any.
    pub current: Option<TagId>,
}

impl TagChange {
    /// Creates a change from `previous` to `current`.
    #[must_use]
    pub const fn new(previous: Option<TagId>, current: Option<TagId>) -> Self {
        Self { previous, current }
    }

    /// Returns `true` if a tag is present after the change.
    #[must_use]
    pub const fn is_presented(&self) -> bool {
        self.current.is_some()
    }

    /// Returns `true` if the change removed the tag without a replacement.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.previous.is_some() && self.current.is_none()
    }
}

impl fmt::Display for TagChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(tag: Option<&TagId>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match tag {
                Some(tag) => write!(f, "{tag}"),
                None => f.write_str("none"),
            }
        }
        side(self.previous.as_ref(), f)?;
        f.write_str(" -> ")?;
        side(self.current.as_ref(), f)
    }
}

/// Remembers the last read tag and reports when a read differs from it.
///
/// A tag swapped within one poll interval shows up as a single change from
/// the old tag directly to the new one; the empty reader in between is
/// never seen.
///
/// # Examples
///
/// ```
/// use tagbox_lib::rfid::{TagChange, TagTracker};
/// use tagbox_lib::types::TagId;
///
/// let tag = TagId::new([1, 2, 3, 4, 5]);
/// let mut tracker = TagTracker::new();
///
/// assert_eq!(tracker.observe(None), None);
/// assert_eq!(tracker.observe(Some(tag)), Some(TagChange::new(None, Some(tag))));
/// assert_eq!(tracker.observe(Some(tag)), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagTracker {
    last: Option<TagId>,
}

impl TagTracker {
    /// Creates a tracker that starts with no tag present.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Records a read and returns the change it represents, if any.
    pub fn observe(&mut self, read: Option<TagId>) -> Option<TagChange> {
        if read == self.last {
            return None;
        }
        let change = TagChange::new(self.last, read);
        self.last = read;
        Some(change)
    }

    /// Returns the last known tag.
    #[must_use]
    pub const fn current(&self) -> Option<TagId> {
        self.last
    }
}
