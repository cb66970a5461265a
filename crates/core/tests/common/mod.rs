//! Common test utilities for integration tests.
//!
//! Shared helpers for driving a full conversation session over the
//! in-memory channel, with no server process involved.

use chrono::{TimeZone, Utc};
use mentorlink_core::{ConversationEvent, Message};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default timeout for test operations.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize test logging with appropriate filters.
///
/// Call this at the start of tests that need debug output.
/// Safe to call multiple times (subsequent calls are no-ops).
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mentorlink_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Run an async operation with a timeout.
///
/// Returns the result if the operation completes within the timeout,
/// or panics with a timeout message if it doesn't.
#[allow(dead_code)]
pub async fn with_timeout<T, F>(fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, fut)
        .await
        .expect("Test operation timed out")
}

/// Build a message row the way the server would emit it, with a stable
/// timestamp offset in whole seconds.
#[allow(dead_code)]
pub fn row(sender: &str, receiver: &str, body: &str, secs: i64) -> Message {
    Message {
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        body: body.to_string(),
        created_at: Utc.timestamp_opt(1_741_944_000 + secs, 0).unwrap(),
    }
}

/// Collect every controller event currently queued.
#[allow(dead_code)]
pub fn drain_events(
    events: &mut mpsc::UnboundedReceiver<ConversationEvent>,
) -> Vec<ConversationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
