//! Order gateway: the single path from trade intents to the broker.
//!
//! Submission is awaited in the owning asset's task, so one asset's orders
//! are never reordered relative to each other; fill watching is spawned, so
//! no asset blocks another while waiting on the broker.

use assetflow_core::{
    AssetId, BrokerAdapter, GatewayConfig, OrderId, OrderState, OrderTicket, OrderUpdate,
    TradeIntent,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

pub struct OrderGateway {
    adapter: Arc<dyn BrokerAdapter>,
    config: GatewayConfig,
    next_id: AtomicU64,
    open: Arc<Mutex<HashMap<OrderId, AssetId>>>,
}

impl OrderGateway {
    #[must_use]
    pub fn new(adapter: Arc<dyn BrokerAdapter>, config: GatewayConfig) -> Self {
        Self {
            adapter,
            config,
            next_id: AtomicU64::new(1),
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submits one intent. Transient broker errors are retried with
    /// exponential backoff up to `max_attempts`; exhaustion or an outright
    /// rejection surfaces as a terminal `Rejected` update carrying the
    /// causing error. Status transitions for an accepted order are forwarded
    /// into `updates` until terminal.
    pub async fn submit(
        &self,
        asset_id: &str,
        intent: TradeIntent,
        updates: mpsc::Sender<OrderUpdate>,
    ) -> OrderTicket {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let ticket = OrderTicket {
            id,
            asset_id: asset_id.to_string(),
            intent,
            submitted_at: Utc::now(),
        };

        let mut attempt = 0u32;
        let mut delay = Duration::from_millis(self.config.initial_backoff_ms);
        let max_delay = Duration::from_millis(self.config.max_backoff_ms);

        loop {
            attempt += 1;
            let (tx, rx) = mpsc::channel(32);
            match self.adapter.place_order(&ticket, tx).await {
                Ok(()) => {
                    self.open.lock().await.insert(id, asset_id.to_string());
                    tracing::info!(
                        asset_id,
                        order_id = id,
                        vehicle = %ticket.intent.vehicle,
                        quantity = %ticket.intent.signed_quantity(),
                        attempt,
                        "order placed"
                    );
                    tokio::spawn(forward_updates(rx, updates, Arc::clone(&self.open), id));
                    return ticket;
                }
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    tracing::warn!(
                        asset_id,
                        order_id = id,
                        attempt,
                        error = %e,
                        backoff_ms = delay.as_millis() as u64,
                        "transient submission failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
                Err(e) => {
                    tracing::warn!(
                        asset_id,
                        order_id = id,
                        attempt,
                        error = %e,
                        "order rejected"
                    );
                    // Sent from a task: the submitting asset is awaiting this
                    // call and must not block against its own update channel.
                    let rejection = OrderUpdate {
                        order_id: id,
                        state: OrderState::Rejected,
                        fill: None,
                        cumulative_filled: Decimal::ZERO,
                        error: Some(e.to_string()),
                        timestamp: Utc::now(),
                    };
                    tokio::spawn(async move {
                        let _ = updates.send(rejection).await;
                    });
                    return ticket;
                }
            }
        }
    }

    /// Cancels every open order belonging to `asset_id` at the broker and
    /// reports each as `Canceled` into `updates`. Used during shutdown drain.
    pub async fn cancel_all(&self, asset_id: &str, updates: &mpsc::Sender<OrderUpdate>) {
        let ids: Vec<OrderId> = {
            let open = self.open.lock().await;
            open.iter()
                .filter(|(_, owner)| owner.as_str() == asset_id)
                .map(|(id, _)| *id)
                .collect()
        };

        for id in ids {
            if let Err(e) = self.adapter.cancel_order(id).await {
                tracing::warn!(asset_id, order_id = id, error = %e, "cancel failed at broker");
            }
            self.open.lock().await.remove(&id);
            let _ = updates
                .send(OrderUpdate {
                    order_id: id,
                    state: OrderState::Canceled,
                    fill: None,
                    cumulative_filled: Decimal::ZERO,
                    error: None,
                    timestamp: Utc::now(),
                })
                .await;
            tracing::info!(asset_id, order_id = id, "order canceled");
        }
    }

    /// Number of orders not yet terminal, across all assets.
    pub async fn open_orders(&self) -> usize {
        self.open.lock().await.len()
    }
}

async fn forward_updates(
    mut rx: mpsc::Receiver<OrderUpdate>,
    updates: mpsc::Sender<OrderUpdate>,
    open: Arc<Mutex<HashMap<OrderId, AssetId>>>,
    id: OrderId,
) {
    while let Some(update) = rx.recv().await {
        let terminal = update.state.is_terminal();
        if updates.send(update).await.is_err() {
            break;
        }
        if terminal {
            break;
        }
    }
    open.lock().await.remove(&id);
}
