use async_trait::async_trait;
use idlewatch_core::Message;
use tokio::sync::mpsc;

pub mod telegram;
pub mod telegram_gateway;
pub mod telegram_groups;

pub use telegram::TelegramAdapter;
pub use telegram_gateway::TelegramGateway;

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Start the adapter's background work (polling loop, WS connection, etc.),
    /// forwarding inbound activity and membership events to `events_tx`.
    async fn start(&self, events_tx: mpsc::Sender<Message>) -> anyhow::Result<()>;
}
