/// "Content added" notifications: one lightweight event per top-level
/// object created by a bulk add, delivered fire-and-forget.
///
/// The engine emits while it still holds its lock, so sinks must never
/// block. The channel sink uses `try_send` and drops (with a log line)
/// when the receiver falls behind.
use crate::model::CaseObject;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::path::PathBuf;
use tracing::warn;

/// Maximum number of content events that may queue up in a channel sink.
///
/// A bulk add emits one event per root, so this only fills if the
/// receiver stops draining entirely.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// A top-level object was added to the case.
#[derive(Debug, Clone)]
pub struct ContentEvent {
    /// The object created for the source root.
    pub object: CaseObject,
    /// The source path it was created from.
    pub source_path: PathBuf,
}

/// Receiver of content-added notifications.
pub trait ContentSink: Send + Sync {
    fn content_added(&self, event: ContentEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ContentSink for NullSink {
    fn content_added(&self, _event: ContentEvent) {}
}

impl ContentSink for Sender<ContentEvent> {
    fn content_added(&self, event: ContentEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Content event channel full, dropping event for {}",
                    event.source_path.display()
                );
            }
            // Nobody is listening any more.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Create a bounded channel suitable for use as a [`ContentSink`].
pub fn content_channel() -> (Sender<ContentEvent>, Receiver<ContentEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
