//! Typing and read-receipt signaling for the active conversation.
//!
//! Local side: every keystroke reports `is_typing: true` right away and
//! arms a single idle timer; once the input goes quiet the timer reports
//! `is_typing: false`. Retriggering replaces the timer, so at most one is
//! ever pending.
//!
//! Remote side: a counterpart's typing indicator is held with an expiry
//! deadline. The transport is at-least-once, so a lost `is_typing: false`
//! must not wedge the indicator; a periodic [`PresenceSignaler::sweep_expired`]
//! tick clears it once the deadline passes. A `messages_seen` receipt from
//! the counterpart clears it early.
//!
//! All signals are fire-and-forget. There is no retry and no ordering
//! beyond what the channel already provides per direction.

use crate::channel::EventChannel;
use crate::chat::types::UserId;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Emits local presence signals and tracks the counterpart's.
pub struct PresenceSignaler {
    channel: Arc<dyn EventChannel>,
    counterpart: Option<UserId>,
    idle_after: Duration,
    expiry: Duration,
    idle_timer: Option<JoinHandle<()>>,
    remote_typing_until: Option<Instant>,
}

impl PresenceSignaler {
    /// Create a signaler over the given channel.
    ///
    /// `idle_after` is how long the local input must stay quiet before the
    /// automatic `is_typing: false`; `expiry` is how long a remote typing
    /// indicator is trusted without a fresh signal.
    pub fn new(channel: Arc<dyn EventChannel>, idle_after: Duration, expiry: Duration) -> Self {
        Self {
            channel,
            counterpart: None,
            idle_after,
            expiry,
            idle_timer: None,
            remote_typing_until: None,
        }
    }

    /// Point the signaler at a new counterpart (or none).
    ///
    /// Cancels any pending idle timer and drops the previous counterpart's
    /// typing indicator; presence state never carries across conversations.
    pub fn set_counterpart(&mut self, counterpart: Option<UserId>) {
        self.cancel_idle_timer();
        self.remote_typing_until = None;
        self.counterpart = counterpart;
    }

    /// Report local input activity.
    ///
    /// Emits `is_typing: true` immediately and arms the idle timer that
    /// will emit `is_typing: false` after [`Self::new`]'s `idle_after` of
    /// silence. No-op when no conversation is active.
    pub async fn input_activity(&mut self) -> Result<()> {
        let Some(to) = self.counterpart.clone() else {
            return Ok(());
        };

        self.channel.send_typing(&to, true).await?;
        self.cancel_idle_timer();

        let channel = Arc::clone(&self.channel);
        let idle_after = self.idle_after;
        self.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(idle_after).await;
            if let Err(err) = channel.send_typing(&to, false).await {
                tracing::debug!(error = %err, "typing reset not delivered");
            }
        }));
        Ok(())
    }

    /// Tell the counterpart their messages have been seen.
    ///
    /// The controller calls this once per selection, after history has
    /// loaded. No-op when no conversation is active.
    pub async fn mark_seen(&self) -> Result<()> {
        match &self.counterpart {
            Some(other) => self.channel.send_mark_seen(other).await,
            None => Ok(()),
        }
    }

    /// Apply a remote `typing_update`.
    ///
    /// Signals from anyone but the active counterpart are ignored, not
    /// queued. Returns the new indicator state when it changed.
    pub fn handle_typing_update(&mut self, from_id: &UserId, is_typing: bool) -> Option<bool> {
        if self.counterpart.as_ref() != Some(from_id) {
            return None;
        }

        let was_typing = self.remote_typing_until.is_some();
        self.remote_typing_until = is_typing.then(|| Instant::now() + self.expiry);
        (was_typing != is_typing).then_some(is_typing)
    }

    /// Apply a remote `messages_seen` receipt.
    ///
    /// A receipt from the active counterpart clears their typing indicator.
    /// Returns true when the indicator was showing and is now cleared.
    pub fn handle_messages_seen(&mut self, by: &UserId) -> bool {
        if self.counterpart.as_ref() != Some(by) {
            return false;
        }
        self.remote_typing_until.take().is_some()
    }

    /// Clear the remote typing indicator once its deadline has passed.
    /// Returns true when this tick cleared it.
    pub fn sweep_expired(&mut self) -> bool {
        match self.remote_typing_until {
            Some(deadline) if Instant::now() >= deadline => {
                self.remote_typing_until = None;
                true
            }
            _ => false,
        }
    }

    /// Whether the active counterpart is currently shown as typing.
    pub fn is_remote_typing(&self) -> bool {
        self.remote_typing_until.is_some()
    }

    fn cancel_idle_timer(&mut self) {
        if let Some(timer) = self.idle_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for PresenceSignaler {
    fn drop(&mut self) {
        self.cancel_idle_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, MemoryServer, SentFrame};

    const IDLE: Duration = Duration::from_millis(1200);
    const EXPIRY: Duration = Duration::from_millis(5000);

    fn signaler_with(counterpart: &str) -> (PresenceSignaler, MemoryServer) {
        let (channel, _events, server) = MemoryChannel::open("me".into());
        let mut signaler = PresenceSignaler::new(channel, IDLE, EXPIRY);
        signaler.set_counterpart(Some(counterpart.into()));
        (signaler, server)
    }

    fn typing_frame(frame: SentFrame) -> (UserId, bool) {
        match frame {
            SentFrame::Typing { to_id, is_typing } => (to_id, is_typing),
            other => panic!("expected typing frame, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_true_then_automatic_false() {
        let (mut signaler, mut server) = signaler_with("mentor-1");

        signaler.input_activity().await.unwrap();
        let (to, typing) = typing_frame(server.next_frame().await.unwrap());
        assert_eq!(to.as_str(), "mentor-1");
        assert!(typing);

        tokio::time::sleep(IDLE + Duration::from_millis(100)).await;
        let (to, typing) = typing_frame(server.next_frame().await.unwrap());
        assert_eq!(to.as_str(), "mentor-1");
        assert!(!typing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_replaces_idle_timer() {
        let (mut signaler, mut server) = signaler_with("mentor-1");

        signaler.input_activity().await.unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        signaler.input_activity().await.unwrap();

        // Two immediate `true` reports, one per activity burst.
        assert!(typing_frame(server.next_frame().await.unwrap()).1);
        assert!(typing_frame(server.next_frame().await.unwrap()).1);

        // 1600 ms after the first activity the original timer would have
        // fired; the retrigger at 800 ms replaced it.
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(server.try_next_frame().is_none());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!typing_frame(server.next_frame().await.unwrap()).1);
        assert!(server.try_next_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counterpart_switch_cancels_idle_timer() {
        let (mut signaler, mut server) = signaler_with("mentor-1");

        signaler.input_activity().await.unwrap();
        assert!(typing_frame(server.next_frame().await.unwrap()).1);

        signaler.set_counterpart(Some("mentor-2".into()));
        tokio::time::sleep(IDLE * 2).await;
        assert!(server.try_next_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_without_counterpart_is_silent() {
        let (channel, _events, mut server) = MemoryChannel::open("me".into());
        let mut signaler = PresenceSignaler::new(channel, IDLE, EXPIRY);

        signaler.input_activity().await.unwrap();
        tokio::time::sleep(IDLE * 2).await;
        assert!(server.try_next_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_typing_expires_without_fresh_signal() {
        let (mut signaler, _server) = signaler_with("mentor-1");

        assert_eq!(
            signaler.handle_typing_update(&"mentor-1".into(), true),
            Some(true)
        );
        assert!(signaler.is_remote_typing());

        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert!(!signaler.sweep_expired());
        assert!(signaler.is_remote_typing());

        // A fresh signal pushes the deadline out.
        assert_eq!(signaler.handle_typing_update(&"mentor-1".into(), true), None);
        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert!(!signaler.sweep_expired());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(signaler.sweep_expired());
        assert!(!signaler.is_remote_typing());
        assert!(!signaler.sweep_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_from_other_users_ignored() {
        let (mut signaler, _server) = signaler_with("mentor-1");

        assert_eq!(signaler.handle_typing_update(&"stranger".into(), true), None);
        assert!(!signaler.is_remote_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_false_clears_indicator() {
        let (mut signaler, _server) = signaler_with("mentor-1");

        signaler.handle_typing_update(&"mentor-1".into(), true);
        assert_eq!(
            signaler.handle_typing_update(&"mentor-1".into(), false),
            Some(false)
        );
        assert!(!signaler.is_remote_typing());

        // A false while already idle is not a change.
        assert_eq!(signaler.handle_typing_update(&"mentor-1".into(), false), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seen_receipt_clears_indicator() {
        let (mut signaler, _server) = signaler_with("mentor-1");

        signaler.handle_typing_update(&"mentor-1".into(), true);
        assert!(!signaler.handle_messages_seen(&"stranger".into()));
        assert!(signaler.is_remote_typing());

        assert!(signaler.handle_messages_seen(&"mentor-1".into()));
        assert!(!signaler.is_remote_typing());
        assert!(!signaler.handle_messages_seen(&"mentor-1".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_seen_targets_counterpart() {
        let (signaler, mut server) = signaler_with("mentor-1");

        signaler.mark_seen().await.unwrap();
        match server.next_frame().await.unwrap() {
            SentFrame::MarkSeen { other_id } => assert_eq!(other_id.as_str(), "mentor-1"),
            other => panic!("expected mark_seen frame, got {other:?}"),
        }
    }
}
