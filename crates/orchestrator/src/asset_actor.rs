use crate::messages::{AssetCommand, AssetState, AssetStatus};
use assetflow_core::{
    AssetConfig, Fill, Ledger, LedgerError, OrderId, OrderUpdate, SeriesKind, SessionWindow,
    Snapshot, SnapshotCache, Strategy, TradeDirection, TradeIntent, Vehicle,
};
use assetflow_gateway::OrderGateway;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Source of the actor's wall-clock time. Session gating reads it instead of
/// calling `Utc::now()` directly so a simulated clock can drive it.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One asset's event loop. Owns its strategy and ledger exclusively; all
/// mutation happens inside this task, so no locking is needed around
/// position state.
pub struct AssetActor {
    config: AssetConfig,
    vehicle: Vehicle,
    state: AssetState,
    strategy: Box<dyn Strategy>,
    ledger: Ledger,
    cache: Arc<SnapshotCache>,
    gateway: Arc<OrderGateway>,
    cmd_rx: mpsc::Receiver<AssetCommand>,
    updates_rx: mpsc::Receiver<OrderUpdate>,
    updates_tx: mpsc::Sender<OrderUpdate>,
    status_tx: watch::Sender<AssetStatus>,
    session: Option<SessionWindow>,
    drain_timeout: Duration,
    clock: Clock,
    /// Booked cumulative fill quantity per open order. Replayed updates are
    /// detected by comparing against the update's own cumulative total.
    open_orders: HashMap<OrderId, Decimal>,
    reeval_pending: bool,
    draining: bool,
    last_flatten: Option<NaiveDate>,
}

impl AssetActor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AssetConfig,
        strategy: Box<dyn Strategy>,
        cache: Arc<SnapshotCache>,
        gateway: Arc<OrderGateway>,
        cmd_rx: mpsc::Receiver<AssetCommand>,
        updates_rx: mpsc::Receiver<OrderUpdate>,
        updates_tx: mpsc::Sender<OrderUpdate>,
        status_tx: watch::Sender<AssetStatus>,
        drain_timeout: Duration,
    ) -> Self {
        let vehicle = config.vehicle();
        let ledger = Ledger::new(config.id.clone(), config.budget, config.reinvest_profit);
        let session = config.session.map(SessionWindow::new);
        let state = if config.enabled {
            AssetState::Idle
        } else {
            AssetState::Disabled
        };
        Self {
            config,
            vehicle,
            state,
            strategy,
            ledger,
            cache,
            gateway,
            cmd_rx,
            updates_rx,
            updates_tx,
            status_tx,
            session,
            drain_timeout,
            clock: Arc::new(Utc::now),
            open_orders: HashMap::new(),
            reeval_pending: false,
            draining: false,
            last_flatten: None,
        }
    }

    /// Replaces the wall clock, e.g. to drive session windows from a
    /// simulated time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(mut self) {
        if self.state == AssetState::Disabled {
            tracing::info!(asset_id = %self.config.id, "asset disabled by config");
        }
        self.publish_status();

        let mut tick = self.config.timeframe.period().map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(AssetCommand::Trigger) => self.on_trigger().await,
                    Some(AssetCommand::GetStatus(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    Some(AssetCommand::Shutdown) | None => break,
                },
                update = self.updates_rx.recv() => {
                    if let Some(update) = update {
                        self.on_order_update(update).await;
                    }
                }
                () = next_tick(&mut tick) => self.on_trigger().await,
            }
        }

        self.drain().await;
        tracing::info!(asset_id = %self.config.id, "asset stopped");
    }

    /// One evaluation request. Deferred (and coalesced) while orders are in
    /// flight; dropped outside the session window except for the single
    /// closing flatten.
    async fn on_trigger(&mut self) {
        match self.state {
            AssetState::Disabled => return,
            AssetState::OrdersPending | AssetState::Reconciling => {
                self.reeval_pending = true;
                return;
            }
            AssetState::Idle | AssetState::Evaluating => {}
        }
        if self.draining {
            return;
        }

        let now = (self.clock)();
        if let Some(session) = self.session {
            if !session.contains(now) {
                if session.flatten_on_close()
                    && session.is_past_close(now)
                    && self.last_flatten != Some(now.date_naive())
                    && !self.ledger.position().is_flat()
                {
                    self.last_flatten = Some(now.date_naive());
                    let intents = self.closing_intents();
                    tracing::info!(
                        asset_id = %self.config.id,
                        intents = intents.len(),
                        "session closed, flattening position"
                    );
                    self.submit_intents(intents).await;
                }
                return;
            }
        }

        self.state = AssetState::Evaluating;
        self.publish_status();

        let cache = Arc::clone(&self.cache);
        let vehicle = self.vehicle.clone();
        let view = cache.view(&vehicle);
        match self.strategy.evaluate(&view, self.ledger.position(), now) {
            Ok(intents) if intents.is_empty() => {
                self.state = AssetState::Idle;
                self.publish_status();
            }
            Ok(intents) => {
                tracing::info!(
                    asset_id = %self.config.id,
                    strategy = self.strategy.name(),
                    intents = intents.len(),
                    "evaluation produced trade intents"
                );
                self.submit_intents(intents).await;
            }
            Err(e) => {
                // Aborts this cycle only; the ledger is untouched.
                tracing::warn!(
                    asset_id = %self.config.id,
                    strategy = self.strategy.name(),
                    error = %e,
                    "evaluation failed"
                );
                self.state = AssetState::Idle;
                self.publish_status();
            }
        }
    }

    async fn submit_intents(&mut self, intents: Vec<TradeIntent>) {
        for intent in intents {
            let ticket = self
                .gateway
                .submit(&self.config.id, intent, self.updates_tx.clone())
                .await;
            self.open_orders.insert(ticket.id, Decimal::ZERO);
        }
        self.state = if self.open_orders.is_empty() {
            AssetState::Idle
        } else {
            AssetState::OrdersPending
        };
        self.publish_status();
    }

    async fn on_order_update(&mut self, update: OrderUpdate) {
        if self.state == AssetState::Disabled {
            self.open_orders.remove(&update.order_id);
            return;
        }
        let Some(&booked) = self.open_orders.get(&update.order_id) else {
            tracing::debug!(
                asset_id = %self.config.id,
                order_id = update.order_id,
                "update for unknown order ignored"
            );
            return;
        };

        self.state = AssetState::Reconciling;

        if let Some(fill) = &update.fill {
            let delta = update.cumulative_filled - booked;
            if delta > Decimal::ZERO {
                self.open_orders.insert(update.order_id, update.cumulative_filled);
                let sign = if fill.quantity.is_sign_negative() {
                    Decimal::NEGATIVE_ONE
                } else {
                    Decimal::ONE
                };
                let increment = Fill {
                    order_id: update.order_id,
                    vehicle: fill.vehicle.clone(),
                    quantity: delta * sign,
                    price: fill.price,
                    timestamp: fill.timestamp,
                };
                match self.ledger.apply_fill(&increment) {
                    Ok(position) => {
                        tracing::info!(
                            asset_id = %self.config.id,
                            order_id = update.order_id,
                            quantity = %increment.quantity,
                            price = %increment.price,
                            committed = %position.cash_committed,
                            realized_pnl = %position.realized_pnl,
                            "fill booked"
                        );
                    }
                    Err(e @ LedgerError::BudgetExceeded { .. }) => {
                        tracing::warn!(asset_id = %self.config.id, error = %e, "fill skipped");
                    }
                    Err(e @ LedgerError::Integrity { .. }) => {
                        tracing::error!(
                            asset_id = %self.config.id,
                            error = %e,
                            "halting asset on ledger integrity failure"
                        );
                        self.state = AssetState::Disabled;
                        self.open_orders.remove(&update.order_id);
                        self.publish_status();
                        return;
                    }
                }
            } else {
                tracing::debug!(
                    asset_id = %self.config.id,
                    order_id = update.order_id,
                    "replayed fill ignored"
                );
            }
        }

        if update.state.is_terminal() {
            if let Some(error) = &update.error {
                tracing::warn!(
                    asset_id = %self.config.id,
                    order_id = update.order_id,
                    error,
                    "order finished in failure"
                );
            }
            self.open_orders.remove(&update.order_id);
        }

        if self.open_orders.is_empty() {
            self.state = AssetState::Idle;
            self.publish_status();
            if self.reeval_pending && !self.draining {
                self.reeval_pending = false;
                Box::pin(self.on_trigger()).await;
            }
        } else {
            self.state = AssetState::OrdersPending;
            self.publish_status();
        }
    }

    /// Market-closing intents for every held lot, priced off the latest
    /// quote. Lots without a quote are left alone and logged.
    fn closing_intents(&self) -> Vec<TradeIntent> {
        let mut intents = Vec::new();
        for (vehicle, lot) in self.ledger.position().lots() {
            if lot.quantity.is_zero() {
                continue;
            }
            let quote = self.cache.get(vehicle, SeriesKind::Quote);
            let Some(quote) = quote.as_deref().and_then(Snapshot::as_quote) else {
                tracing::warn!(
                    asset_id = %self.config.id,
                    vehicle = %vehicle,
                    "no quote available to price closing order"
                );
                continue;
            };
            let (direction, limit) = if lot.quantity > Decimal::ZERO {
                (TradeDirection::Sell, quote.bid)
            } else {
                (TradeDirection::Buy, quote.ask)
            };
            intents.push(TradeIntent {
                vehicle: vehicle.clone(),
                direction,
                quantity: lot.quantity.abs(),
                limit: Some(limit),
            });
        }
        intents
    }

    /// Shutdown drain: wait for in-flight orders up to the configured
    /// timeout, then cancel whatever remains.
    async fn drain(&mut self) {
        self.draining = true;
        if self.open_orders.is_empty() {
            self.publish_status();
            return;
        }

        tracing::info!(
            asset_id = %self.config.id,
            open = self.open_orders.len(),
            "draining open orders"
        );
        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        while !self.open_orders.is_empty() {
            match tokio::time::timeout_at(deadline, self.updates_rx.recv()).await {
                Ok(Some(update)) => self.on_order_update(update).await,
                Ok(None) | Err(_) => break,
            }
        }

        if !self.open_orders.is_empty() {
            tracing::warn!(
                asset_id = %self.config.id,
                remaining = self.open_orders.len(),
                "drain timed out, canceling remaining orders"
            );
            self.gateway.cancel_all(&self.config.id, &self.updates_tx).await;
            while !self.open_orders.is_empty() {
                match tokio::time::timeout(Duration::from_secs(1), self.updates_rx.recv()).await {
                    Ok(Some(update)) => self.on_order_update(update).await,
                    Ok(None) | Err(_) => break,
                }
            }
        }
        self.publish_status();
    }

    fn status(&self) -> AssetStatus {
        AssetStatus {
            asset_id: self.config.id.clone(),
            state: self.state,
            position: self.ledger.position().clone(),
            open_orders: self.open_orders.len(),
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }
}

async fn next_tick(tick: &mut Option<tokio::time::Interval>) {
    match tick {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
