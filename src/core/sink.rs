//! Event-plane delivery to the UI layer
//!
//! Fire-and-forget: `deliver` never blocks the tick task and nothing is
//! retried. A dropped SHOW/HIDE is only corrected by the next transition.

use tokio::sync::broadcast;
use tracing::debug;
use crate::types::OverlayMessage;
use crate::SIGNAL_CHANNEL_CAPACITY;

/// Receives overlay messages from the monitor
pub trait SignalSink: Send + Sync {
    fn deliver(&self, message: OverlayMessage);
}

/// Broadcast channel fanning out to every subscribed UI loop
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<OverlayMessage>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// New UI-side receiver; sees messages sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayMessage> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSink for BroadcastSink {
    fn deliver(&self, message: OverlayMessage) {
        if let Err(broadcast::error::SendError(dropped)) = self.tx.send(message) {
            debug!(message = ?dropped, "no UI listener, overlay message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_without_listener_does_not_fail() {
        let sink = BroadcastSink::new();
        sink.deliver(OverlayMessage::HideOverlay);
        assert_eq!(sink.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives() {
        let sink = BroadcastSink::new();
        let mut rx = sink.subscribe();
        sink.deliver(OverlayMessage::show("com.game"));
        assert_eq!(
            rx.recv().await.unwrap(),
            OverlayMessage::show("com.game")
        );
    }
}
