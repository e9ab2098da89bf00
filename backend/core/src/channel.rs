use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::Message;

/// Default channel buffer size for inbound events.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Carries inbound events from transport adapters to the scheduler.
///
/// Adapters clone `events_tx`; the scheduler takes the single receiver.
/// Built on a bounded Tokio mpsc channel so a slow ledger applies backpressure
/// to the transport instead of growing memory.
pub struct EventBus {
    pub events_tx: mpsc::Sender<Message>,
    events_rx: Option<mpsc::Receiver<Message>>,
}

impl EventBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "EventBus initialized");
        Self {
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Take the receiver (can only be called once).
    pub fn take_events_rx(&mut self) -> Option<mpsc::Receiver<Message>> {
        debug!("Event receiver taken");
        self.events_rx.take()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ActivityEvent;
    use crate::types::{ChannelId, MemberId};
    use chrono::Utc;

    fn activity() -> Message {
        Message::Activity(ActivityEvent {
            channel_id: ChannelId(-1),
            member_id: MemberId(1),
            timestamp: Utc::now(),
            is_bot: false,
        })
    }

    #[tokio::test]
    async fn test_bus_send_receive() {
        let mut bus = EventBus::new();
        let mut rx = bus.take_events_rx().unwrap();
        bus.events_tx.send(activity()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), "activity");
    }

    #[tokio::test]
    async fn test_bus_take_rx_once() {
        let mut bus = EventBus::new();
        assert!(bus.take_events_rx().is_some());
        assert!(bus.take_events_rx().is_none());
    }

    #[tokio::test]
    async fn test_bus_backpressure() {
        let mut bus = EventBus::with_buffer_size(2);
        let _rx = bus.take_events_rx().unwrap();
        for _ in 0..2 {
            bus.events_tx.send(activity()).await.unwrap();
        }
        assert!(bus.events_tx.try_send(activity()).is_err());
    }
}
