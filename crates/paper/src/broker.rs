use assetflow_core::{
    BrokerAdapter, BrokerError, Fill, OrderId, OrderState, OrderTicket, OrderUpdate,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Paper trading broker. Fills every limit order at its limit price, locally.
///
/// Makes zero external calls; it is impossible to execute a real trade
/// through this adapter. Fill slicing and injectable transient failures
/// exist to exercise the partial-fill and retry paths.
pub struct PaperBroker {
    fill_slices: u32,
    fill_delay: Duration,
    transient_failures: AtomicU32,
    canceled: Arc<Mutex<HashSet<OrderId>>>,
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fill_slices: 1,
            fill_delay: Duration::ZERO,
            transient_failures: AtomicU32::new(0),
            canceled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Splits each fill into `slices` partial fills. The last slice carries
    /// any rounding remainder so the slices always sum to the order quantity.
    #[must_use]
    pub fn with_fill_slices(mut self, slices: u32) -> Self {
        self.fill_slices = slices.max(1);
        self
    }

    /// Delay between successive fill slices.
    #[must_use]
    pub fn with_fill_delay(mut self, delay: Duration) -> Self {
        self.fill_delay = delay;
        self
    }

    /// The next `n` placements fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrokerAdapter for PaperBroker {
    async fn place_order(
        &self,
        ticket: &OrderTicket,
        updates: mpsc::Sender<OrderUpdate>,
    ) -> Result<(), BrokerError> {
        if self.transient_failures.load(Ordering::SeqCst) > 0 {
            self.transient_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(BrokerError::Transient("injected link failure".into()));
        }

        let Some(price) = ticket.intent.limit else {
            return Err(BrokerError::Rejected(
                "paper broker requires a limit price".into(),
            ));
        };

        updates
            .send(OrderUpdate {
                order_id: ticket.id,
                state: OrderState::Pending,
                fill: None,
                cumulative_filled: Decimal::ZERO,
                error: None,
                timestamp: Utc::now(),
            })
            .await
            .map_err(|_| BrokerError::Transient("update channel closed".into()))?;

        tracing::debug!(
            order_id = ticket.id,
            vehicle = %ticket.intent.vehicle,
            quantity = %ticket.intent.signed_quantity(),
            price = %price,
            "paper order accepted"
        );

        let order_id = ticket.id;
        let vehicle = ticket.intent.vehicle.clone();
        let total = ticket.intent.quantity;
        let signed_total = ticket.intent.signed_quantity();
        let sign = if signed_total.is_sign_negative() {
            Decimal::NEGATIVE_ONE
        } else {
            Decimal::ONE
        };
        let slices = self.fill_slices;
        let delay = self.fill_delay;
        let canceled = Arc::clone(&self.canceled);

        tokio::spawn(async move {
            let per_slice = total / Decimal::from(slices);
            let mut cumulative = Decimal::ZERO;
            for i in 0..slices {
                if delay > Duration::ZERO {
                    tokio::time::sleep(delay).await;
                }
                if canceled.lock().await.contains(&order_id) {
                    return;
                }
                let slice = if i + 1 == slices {
                    total - cumulative
                } else {
                    per_slice
                };
                cumulative += slice;
                let state = if cumulative == total {
                    OrderState::Filled
                } else {
                    OrderState::PartiallyFilled
                };
                let sent = updates
                    .send(OrderUpdate {
                        order_id,
                        state,
                        fill: Some(Fill {
                            order_id,
                            vehicle: vehicle.clone(),
                            quantity: slice * sign,
                            price,
                            timestamp: Utc::now(),
                        }),
                        cumulative_filled: cumulative,
                        error: None,
                        timestamp: Utc::now(),
                    })
                    .await;
                if sent.is_err() {
                    return;
                }
            }
        });

        Ok(())
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), BrokerError> {
        self.canceled.lock().await.insert(order_id);
        tracing::debug!(order_id, "paper order canceled");
        Ok(())
    }
}
