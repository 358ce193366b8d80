// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binding of debounced edges to playback commands.

use std::sync::Arc;

use super::debouncer::Debouncer;
use crate::playback::{PlaybackCommand, PlaybackControl};
use crate::subscription::SubscriptionId;
use crate::types::PinId;

/// Runs one playback command for every debounced edge of a button.
///
/// The command is fire-and-forget: each edge spawns the command as its own
/// task on the debouncer's runtime, so a player that is slow to answer
/// never delays other buttons or tag polling. A failure is logged and the
/// binding stays active. Dropping the binding unsubscribes it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tagbox_lib::gpio::{ActionBinding, DebounceConfig, Debouncer};
/// use tagbox_lib::playback::PlaybackCommand;
/// use tagbox_lib::sim::RecordingPlayback;
/// use tagbox_lib::types::PinId;
///
/// # #[tokio::main]
/// # async fn main() -> tagbox_lib::Result<()> {
/// let backend = Arc::new(RecordingPlayback::new());
/// let debouncer = Debouncer::new(PinId::new(6), DebounceConfig::default())?;
///
/// let binding = ActionBinding::bind(&debouncer, PlaybackCommand::SkipNext, backend);
/// assert_eq!(binding.command(), PlaybackCommand::SkipNext);
/// # Ok(())
/// # }
/// ```
pub struct ActionBinding {
    debouncer: Debouncer,
    command: PlaybackCommand,
    subscription: Option<SubscriptionId>,
}

impl ActionBinding {
    /// Binds `command` to the edges emitted by `debouncer`.
    #[must_use]
    pub fn bind<P: PlaybackControl>(
        debouncer: &Debouncer,
        command: PlaybackCommand,
        backend: Arc<P>,
    ) -> Self {
        let runtime = debouncer.runtime().clone();
        let subscription = debouncer.subscribe(move |edge| {
            let pin = edge.pin;
            let backend = Arc::clone(&backend);
            tracing::debug!(%pin, %command, "Dispatching bound command");
            runtime.spawn(async move {
                if let Err(e) = command.execute(backend.as_ref()).await {
                    tracing::warn!(%pin, %command, error = %e, "Playback command failed");
                }
            });
        });
        tracing::debug!(pin = %debouncer.pin(), %command, subscription = %subscription, "Bound command");

        Self {
            debouncer: debouncer.clone(),
            command,
            subscription: Some(subscription),
        }
    }

    /// Returns the bound command.
    #[must_use]
    pub fn command(&self) -> PlaybackCommand {
        self.command
    }

    /// Returns the pin of the bound debouncer.
    #[must_use]
    pub fn pin(&self) -> PinId {
        self.debouncer.pin()
    }

    /// Returns `true` until [`unbind`](Self::unbind) is called.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stops running the command. Returns `false` if already unbound.
    pub fn unbind(&mut self) -> bool {
        match self.subscription.take() {
            Some(id) => self.debouncer.unsubscribe(id),
            None => false,
        }
    }
}

impl Drop for ActionBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl std::fmt::Debug for ActionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBinding")
            .field("pin", &self.pin())
            .field("command", &self.command)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{DebounceConfig, RawTransition};
    use crate::sim::RecordingPlayback;
    use crate::types::Level;
    use std::time::Duration;

    /// Lets paused time run on until every spawned command has finished.
    async fn elapse(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn press(debouncer: &Debouncer) {
        debouncer.feed(RawTransition::now(Level::High));
    }

    #[tokio::test(start_paused = true)]
    async fn command_runs_once_per_edge() {
        let backend = Arc::new(RecordingPlayback::new());
        let debouncer = Debouncer::new(PinId::new(3), DebounceConfig::default()).unwrap();
        let _binding =
            ActionBinding::bind(&debouncer, PlaybackCommand::PlayPauseToggle, backend.clone());

        press(&debouncer);
        press(&debouncer);
        elapse(60).await;
        press(&debouncer);
        elapse(60).await;

        assert_eq!(
            backend.commands(),
            vec![PlaybackCommand::PlayPauseToggle, PlaybackCommand::PlayPauseToggle]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_command_keeps_binding_alive() {
        let backend = Arc::new(RecordingPlayback::new());
        backend.set_failing(true);
        let debouncer = Debouncer::new(PinId::new(4), DebounceConfig::default()).unwrap();
        let binding = ActionBinding::bind(&debouncer, PlaybackCommand::VolumeUp, backend.clone());

        press(&debouncer);
        elapse(60).await;
        backend.set_failing(false);
        press(&debouncer);
        elapse(60).await;

        assert!(binding.is_bound());
        assert_eq!(backend.attempts(), 2);
        assert_eq!(backend.commands(), vec![PlaybackCommand::VolumeUp]);
    }

    #[tokio::test(start_paused = true)]
    async fn unbind_stops_commands() {
        let backend = Arc::new(RecordingPlayback::new());
        let debouncer = Debouncer::new(PinId::new(5), DebounceConfig::default()).unwrap();
        let mut binding =
            ActionBinding::bind(&debouncer, PlaybackCommand::VolumeDown, backend.clone());

        assert!(binding.unbind());
        assert!(!binding.unbind());
        assert_eq!(debouncer.listener_count(), 0);

        press(&debouncer);
        elapse(60).await;
        assert!(backend.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_unbinds() {
        let backend = Arc::new(RecordingPlayback::new());
        let debouncer = Debouncer::new(PinId::new(6), DebounceConfig::default()).unwrap();
        {
            let _binding =
                ActionBinding::bind(&debouncer, PlaybackCommand::SkipNext, backend.clone());
            assert_eq!(debouncer.listener_count(), 1);
        }
        assert_eq!(debouncer.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_command_does_not_hold_up_others() {
        let backend = Arc::new(RecordingPlayback::new());
        backend.stall(PlaybackCommand::SkipNext);
        let skip = Debouncer::new(PinId::new(6), DebounceConfig::default()).unwrap();
        let pause = Debouncer::new(PinId::new(3), DebounceConfig::default()).unwrap();
        let _skip = ActionBinding::bind(&skip, PlaybackCommand::SkipNext, backend.clone());
        let _pause =
            ActionBinding::bind(&pause, PlaybackCommand::PlayPauseToggle, backend.clone());

        press(&skip);
        elapse(60).await;
        press(&pause);
        elapse(60).await;
        press(&skip);
        press(&pause);
        elapse(60).await;

        assert_eq!(backend.attempts(), 4);
        assert_eq!(
            backend.commands(),
            vec![PlaybackCommand::PlayPauseToggle, PlaybackCommand::PlayPauseToggle]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn several_bindings_on_one_debouncer() {
        let backend = Arc::new(RecordingPlayback::new());
        let debouncer = Debouncer::new(PinId::new(7), DebounceConfig::default()).unwrap();
        let _skip = ActionBinding::bind(&debouncer, PlaybackCommand::SkipNext, backend.clone());
        let _louder = ActionBinding::bind(&debouncer, PlaybackCommand::VolumeUp, backend.clone());

        press(&debouncer);
        elapse(60).await;

        let mut commands = backend.commands();
        commands.sort_by_key(PlaybackCommand::as_str);
        assert_eq!(
            commands,
            vec![PlaybackCommand::SkipNext, PlaybackCommand::VolumeUp]
        );
    }
}
