// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RFID reader capability.

use std::future::Future;
use std::sync::Arc;

use crate::error::ReadError;
use crate::types::TagId;

/// Access to an RFID reader that can report the currently presented tag.
///
/// `Ok(None)` means the reader answered and no tag is in the field. An
/// `Err` means the reader itself failed or timed out; the poller logs the
/// error and treats it exactly like `Ok(None)`.
///
/// Reads on SPI readers are blocking; implementations should move them off
/// the async worker (for example with `tokio::task::spawn_blocking`).
pub trait RfidReader: Send + Sync + 'static {
    /// Reads the identity of the tag currently presented to the reader.
    fn read_tag(&self) -> impl Future<Output = Result<Option<TagId>, ReadError>> + Send;
}

impl<R: RfidReader> RfidReader for Arc<R> {
    fn read_tag(&self) -> impl Future<Output = Result<Option<TagId>, ReadError>> + Send {
        (**self).read_tag()
    }
}
