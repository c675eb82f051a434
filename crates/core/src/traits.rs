use crate::error::{BrokerError, FeedError, StrategyError};
use crate::events::{OrderId, OrderTicket, OrderUpdate, SnapshotUpdate, TradeIntent};
use crate::position::Position;
use crate::snapshot::SnapshotView;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Inbound market-data source. The core treats this purely as an event
/// stream; wire format and authentication belong to the adapter.
#[async_trait]
pub trait FeedAdapter: Send {
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Next update in feed-arrival order. `Ok(None)` means the feed ended
    /// cleanly; `Err(Disconnected)` triggers the dispatcher's reconnect loop.
    async fn next_update(&mut self) -> Result<Option<SnapshotUpdate>, FeedError>;
}

/// Order transport to the broker. Status transitions for a placed order are
/// pushed into `updates` asynchronously until a terminal state.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn place_order(
        &self,
        ticket: &OrderTicket,
        updates: mpsc::Sender<OrderUpdate>,
    ) -> Result<(), BrokerError>;

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), BrokerError>;
}

/// One trade policy. Pure function of the snapshot view, the position, the
/// clock, and the strategy's own internal state: identical inputs must yield
/// the identical intent sequence, so cycles can be replayed in tests.
pub trait Strategy: Send {
    fn evaluate(
        &mut self,
        view: &SnapshotView<'_>,
        position: &Position,
        clock: DateTime<Utc>,
    ) -> Result<Vec<TradeIntent>, StrategyError>;

    fn name(&self) -> &str;
}
