// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic RFID polling.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::reader::RfidReader;
use super::tracker::{TagChange, TagTracker};
use crate::error::Error;
use crate::subscription::{ListenerRegistry, SubscriptionId};

/// Default time between two reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct Worker {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Polls an RFID reader and notifies listeners when the presented tag
/// changes.
///
/// The poller reads once per interval on a background tokio task. Reads
/// that fail are logged at debug level and count as "no tag". Listeners run
/// on the polling task, in subscription order.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagbox_lib::rfid::TagPoller;
/// use tagbox_lib::sim::ScriptedReader;
/// use tagbox_lib::types::TagId;
///
/// # #[tokio::main]
/// # async fn main() -> tagbox_lib::Result<()> {
/// let poller = TagPoller::new();
/// poller.subscribe(|change| println!("tag changed: {change}"));
///
/// let reader = ScriptedReader::new([Some(TagId::new([1, 2, 3, 4, 5]))]);
/// poller.start(reader, Duration::from_millis(10))?;
/// assert!(poller.is_running());
///
/// poller.shutdown().await;
/// assert!(!poller.is_running());
/// # Ok(())
/// # }
/// ```
pub struct TagPoller {
    listeners: Arc<ListenerRegistry<TagChange>>,
    worker: Mutex<Option<Worker>>,
}

impl TagPoller {
    /// Creates a stopped poller with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(ListenerRegistry::new()),
            worker: Mutex::new(None),
        }
    }

    /// Registers a listener for tag changes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TagChange) + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Starts polling `reader` every `interval`.
    ///
    /// The first read happens immediately. A poller that was stopped can be
    /// started again; tracking restarts from "no tag".
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the poller is running, or
    /// [`Error::RuntimeUnavailable`] outside a tokio runtime.
    pub fn start<R: RfidReader>(&self, reader: R, interval: Duration) -> Result<(), Error> {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.task.is_finished()) {
            return Err(Error::AlreadyRunning);
        }
        let runtime = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let listeners = Arc::clone(&self.listeners);
        let task = runtime.spawn(async move {
            poll_loop(reader, interval, listeners, stop_rx).await;
        });

        tracing::info!(interval = ?interval, "Tag poller started");
        *worker = Some(Worker { stop_tx, task });
        Ok(())
    }

    /// Asks the polling task to stop.
    ///
    /// A sleep in progress is interrupted; a read in progress completes and
    /// its change, if any, is still delivered. Use
    /// [`shutdown`](Self::shutdown) to wait for the task to finish.
    pub fn stop(&self) {
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.stop_tx.send_replace(true);
        }
    }

    /// Stops polling and waits for the polling task to finish.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };
        worker.stop_tx.send_replace(true);
        if let Err(e) = worker.task.await {
            tracing::warn!(error = %e, "Tag poller task ended abnormally");
        }
    }

    /// Returns `true` while the polling task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.task.is_finished())
    }
}

impl Default for TagPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TagPoller {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.stop_tx.send_replace(true);
        }
    }
}

impl std::fmt::Debug for TagPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagPoller")
            .field("running", &self.is_running())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

async fn poll_loop<R: RfidReader>(
    reader: R,
    interval: Duration,
    listeners: Arc<ListenerRegistry<TagChange>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut tracker = TagTracker::new();

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let read = match reader.read_tag().await {
            Ok(tag) => tag,
            Err(e) => {
                tracing::debug!(error = %e, "RFID read failed, assuming no tag");
                None
            }
        };

        if let Some(change) = tracker.observe(read) {
            tracing::info!(previous = ?change.previous, current = ?change.current, "Tag changed");
            listeners.notify_all(&change);
        }

        if *stop_rx.borrow() {
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                // Sender gone means the poller was dropped.
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("Tag poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::sim::ScriptedReader;
    use crate::types::TagId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    const A: TagId = TagId::new([0xaa, 0, 0, 0, 1]);
    const B: TagId = TagId::new([0xbb, 0, 0, 0, 2]);

    /// Reader that takes `delay` to answer and always sees tag `A`.
    struct SlowReader {
        delay: Duration,
        reads: AtomicUsize,
    }

    impl RfidReader for SlowReader {
        async fn read_tag(&self) -> Result<Option<TagId>, ReadError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Some(A))
        }
    }

    fn record(poller: &TagPoller) -> Arc<Mutex<Vec<TagChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        poller.subscribe(move |change| sink.lock().push(*change));
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn notifies_each_change_once() {
        let poller = TagPoller::new();
        let seen = record(&poller);
        let reader = Arc::new(ScriptedReader::new([
            None,
            Some(A),
            Some(A),
            Some(B),
            None,
            None,
            Some(A),
        ]));

        poller.start(Arc::clone(&reader), DEFAULT_POLL_INTERVAL).unwrap();
        tokio::time::sleep(Duration::from_millis(6_500)).await;
        poller.shutdown().await;

        assert_eq!(reader.read_count(), 7);
        assert_eq!(
            *seen.lock(),
            vec![
                TagChange::new(None, Some(A)),
                TagChange::new(Some(A), Some(B)),
                TagChange::new(Some(B), None),
                TagChange::new(None, Some(A)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_errors_count_as_no_tag() {
        let poller = TagPoller::new();
        let seen = record(&poller);
        let reader = ScriptedReader::new([Some(A)]);
        reader.push_error(ReadError::Timeout(100));
        reader.push(Some(A));

        poller.start(reader, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        poller.shutdown().await;

        assert_eq!(
            *seen.lock(),
            vec![
                TagChange::new(None, Some(A)),
                TagChange::new(Some(A), None),
                TagChange::new(None, Some(A)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected() {
        let poller = TagPoller::new();
        poller
            .start(ScriptedReader::empty(), DEFAULT_POLL_INTERVAL)
            .unwrap();

        let result = poller.start(ScriptedReader::empty(), DEFAULT_POLL_INTERVAL);
        assert!(matches!(result, Err(Error::AlreadyRunning)));

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_sleep() {
        let poller = TagPoller::new();
        let reader = Arc::new(ScriptedReader::empty());
        poller
            .start(Arc::clone(&reader), Duration::from_secs(3_600))
            .unwrap();
        tokio::task::yield_now().await;

        let before = Instant::now();
        poller.shutdown().await;

        assert!(before.elapsed() < Duration::from_secs(1));
        assert!(!poller.is_running());
        assert_eq!(reader.read_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_polling_without_waiting() {
        let poller = TagPoller::new();
        let seen = record(&poller);
        let reader = Arc::new(ScriptedReader::new([None, Some(A)]));
        poller
            .start(Arc::clone(&reader), DEFAULT_POLL_INTERVAL)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        poller.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!poller.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(reader.read_count(), 2);
        assert_eq!(*seen.lock(), vec![TagChange::new(None, Some(A))]);

        // A stopped poller can be started again without a shutdown.
        poller
            .start(ScriptedReader::empty(), DEFAULT_POLL_INTERVAL)
            .unwrap();
        assert!(poller.is_running());
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_read_in_progress_finish() {
        let poller = TagPoller::new();
        let seen = record(&poller);
        let reader = Arc::new(SlowReader {
            delay: Duration::from_millis(100),
            reads: AtomicUsize::new(0),
        });
        poller
            .start(Arc::clone(&reader), DEFAULT_POLL_INTERVAL)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.stop();
        poller.stop();
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!poller.is_running());
        assert_eq!(*seen.lock(), vec![TagChange::new(None, Some(A))]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let poller = TagPoller::new();
        poller.stop();
        assert!(!poller.is_running());
        poller
            .start(ScriptedReader::empty(), DEFAULT_POLL_INTERVAL)
            .unwrap();
        assert!(poller.is_running());
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_shutdown() {
        let poller = TagPoller::new();
        let seen = record(&poller);

        poller
            .start(ScriptedReader::new([Some(A)]), DEFAULT_POLL_INTERVAL)
            .unwrap();
        tokio::task::yield_now().await;
        poller.shutdown().await;

        poller
            .start(ScriptedReader::new([Some(A)]), DEFAULT_POLL_INTERVAL)
            .unwrap();
        tokio::task::yield_now().await;
        poller.shutdown().await;

        // Tracking starts over, so the same tag is announced again.
        assert_eq!(
            *seen.lock(),
            vec![TagChange::new(None, Some(A)), TagChange::new(None, Some(A))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_does_not_stop_polling() {
        let poller = TagPoller::new();
        poller.subscribe(|_| panic!("listener failure"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        poller.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        poller
            .start(
                ScriptedReader::new([Some(A), Some(B), None]),
                Duration::from_millis(100),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(poller.is_running());
        poller.shutdown().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unsubscribed_listener_is_not_called() {
        let poller = TagPoller::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = poller.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(poller.unsubscribe(id));
        assert_eq!(poller.listener_count(), 0);

        poller
            .start(ScriptedReader::new([Some(A)]), DEFAULT_POLL_INTERVAL)
            .unwrap();
        tokio::task::yield_now().await;
        poller.shutdown().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_outside_runtime_fails() {
        let poller = TagPoller::new();
        let result = poller.start(ScriptedReader::empty(), DEFAULT_POLL_INTERVAL);
        assert!(matches!(result, Err(Error::RuntimeUnavailable)));
    }
}
