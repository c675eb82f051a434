use crate::registry::AssetRegistry;
use assetflow_core::{FeedAdapter, FeedConfig, SnapshotCache};
use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Fan-out loop between the feed and the asset actors.
///
/// Every snapshot lands in the cache first, then matching assets get a
/// non-blocking trigger, so a slow asset can never hold back the stream.
/// Feed errors are handled with capped exponential backoff plus jitter;
/// accumulated positions are untouched across reconnects.
pub struct Dispatcher {
    cache: Arc<SnapshotCache>,
    registry: Arc<AssetRegistry>,
    config: FeedConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(cache: Arc<SnapshotCache>, registry: Arc<AssetRegistry>, config: FeedConfig) -> Self {
        Self {
            cache,
            registry,
            config,
        }
    }

    /// Runs until the feed ends cleanly or `shutdown` flips to true.
    ///
    /// # Errors
    /// Currently infallible; the signature leaves room for fatal feed setup
    /// errors to propagate.
    pub async fn run(
        &self,
        mut feed: Box<dyn FeedAdapter>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let initial = Duration::from_millis(self.config.initial_backoff_ms);
        let max = Duration::from_millis(self.config.max_backoff_ms);
        let mut backoff = initial;

        if let Err(e) = feed.connect().await {
            tracing::warn!(error = %e, "initial feed connect failed");
            if !self.reconnect(feed.as_mut(), &mut shutdown, &mut backoff, max).await {
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("dispatcher shutting down");
                        break;
                    }
                }
                result = feed.next_update() => match result {
                    Ok(Some(update)) => {
                        backoff = initial;
                        let kind = update.snapshot.kind();
                        tracing::debug!(vehicle = %update.vehicle, ?kind, "snapshot received");
                        self.cache.publish(update.vehicle.clone(), update.snapshot);
                        self.registry.route(&update.vehicle, kind).await;
                    }
                    Ok(None) => {
                        tracing::info!("feed ended");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "feed error");
                        if !self.reconnect(feed.as_mut(), &mut shutdown, &mut backoff, max).await {
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Reconnect loop: sleep with jitter, try to connect, double the backoff
    /// on failure. Returns false when shutdown was requested instead.
    async fn reconnect(
        &self,
        feed: &mut dyn FeedAdapter,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Duration,
        max: Duration,
    ) -> bool {
        loop {
            let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 4 + 1);
            let wait = *backoff + Duration::from_millis(jitter_ms);
            tracing::info!(wait_ms = wait.as_millis() as u64, "reconnecting feed");

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                    continue;
                }
            }

            match feed.connect().await {
                Ok(()) => {
                    tracing::info!("feed reconnected");
                    *backoff = Duration::from_millis(self.config.initial_backoff_ms);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reconnect failed");
                    *backoff = (*backoff * 2).min(max);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetflow_core::{
        AssetConfig, BrokerAdapter, BrokerError, FeedError, GatewayConfig, OrderId, OrderTicket,
        OrderUpdate, Position, QuoteSnapshot, SeriesKind, Snapshot, SnapshotUpdate, SnapshotView,
        Strategy, StrategyError, Timeframe, TradeIntent, Vehicle, VehicleKind,
    };
    use assetflow_gateway::OrderGateway;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc;

    enum FeedStep {
        Update(SnapshotUpdate),
        Fail,
        End,
    }

    /// Plays back a scripted sequence of updates, failures, and a clean end.
    struct ScriptedFeed {
        steps: VecDeque<FeedStep>,
        connects: Arc<AtomicU32>,
    }

    #[async_trait]
    impl FeedAdapter for ScriptedFeed {
        async fn connect(&mut self) -> Result<(), FeedError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn next_update(&mut self) -> Result<Option<SnapshotUpdate>, FeedError> {
            match self.steps.pop_front() {
                Some(FeedStep::Update(update)) => Ok(Some(update)),
                Some(FeedStep::Fail) => Err(FeedError::Disconnected("scripted drop".into())),
                Some(FeedStep::End) | None => Ok(None),
            }
        }
    }

    /// Never yields an update; used to exercise shutdown.
    struct SilentFeed;

    #[async_trait]
    impl FeedAdapter for SilentFeed {
        async fn connect(&mut self) -> Result<(), FeedError> {
            Ok(())
        }

        async fn next_update(&mut self) -> Result<Option<SnapshotUpdate>, FeedError> {
            std::future::pending().await
        }
    }

    struct CountingStrategy {
        evaluations: Arc<AtomicU32>,
    }

    impl Strategy for CountingStrategy {
        fn evaluate(
            &mut self,
            _view: &SnapshotView<'_>,
            _position: &Position,
            _clock: DateTime<Utc>,
        ) -> Result<Vec<TradeIntent>, StrategyError> {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct NullBroker;

    #[async_trait]
    impl BrokerAdapter for NullBroker {
        async fn place_order(
            &self,
            _ticket: &OrderTicket,
            _updates: mpsc::Sender<OrderUpdate>,
        ) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn cancel_order(&self, _order_id: OrderId) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    fn quote_update(symbol: &str, bid: rust_decimal::Decimal) -> SnapshotUpdate {
        SnapshotUpdate {
            vehicle: Vehicle::equity(symbol),
            snapshot: Snapshot::quote(
                Utc::now(),
                QuoteSnapshot {
                    bid,
                    ask: bid + dec!(0.02),
                    last: bid,
                    mark: bid + dec!(0.01),
                },
            ),
        }
    }

    fn asset_config(id: &str, vehicle: &str) -> AssetConfig {
        AssetConfig {
            id: id.to_string(),
            strategy: "counting".to_string(),
            params: None,
            vehicle: vehicle.to_string(),
            vehicle_kind: VehicleKind::Equity,
            budget: dec!(10000),
            enabled: true,
            reinvest_profit: false,
            timeframe: Timeframe::OnQuote,
            session: None,
        }
    }

    fn setup() -> (Arc<SnapshotCache>, Arc<AssetRegistry>, Dispatcher) {
        let cache = Arc::new(SnapshotCache::new());
        let gateway = Arc::new(OrderGateway::new(
            Arc::new(NullBroker),
            GatewayConfig::default(),
        ));
        let registry = Arc::new(AssetRegistry::new(
            Arc::clone(&cache),
            gateway,
            Duration::from_secs(1),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            FeedConfig {
                initial_backoff_ms: 10,
                max_backoff_ms: 100,
            },
        );
        (cache, registry, dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_land_in_the_cache_and_trigger_assets() {
        let (cache, registry, dispatcher) = setup();
        let evaluations = Arc::new(AtomicU32::new(0));
        registry
            .spawn_asset(
                asset_config("alpha", "SPY"),
                Box::new(CountingStrategy {
                    evaluations: Arc::clone(&evaluations),
                }),
            )
            .await
            .unwrap();

        let feed = ScriptedFeed {
            steps: VecDeque::from([
                FeedStep::Update(quote_update("SPY", dec!(400))),
                FeedStep::Update(quote_update("SPY", dec!(401))),
                FeedStep::Update(quote_update("QQQ", dec!(300))),
                FeedStep::End,
            ]),
            connects: Arc::new(AtomicU32::new(0)),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        dispatcher.run(Box::new(feed), shutdown_rx).await.unwrap();

        // Latest SPY quote won; the QQQ snapshot cached but triggered nobody.
        let spy = cache
            .get(&Vehicle::equity("SPY"), SeriesKind::Quote)
            .unwrap();
        assert_eq!(spy.as_quote().unwrap().bid, dec!(401));
        assert!(cache.get(&Vehicle::equity("QQQ"), SeriesKind::Quote).is_some());

        // Give the actor a moment to drain its mailbox.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stream_resumes_after_a_feed_drop() {
        let (cache, registry, dispatcher) = setup();
        let connects = Arc::new(AtomicU32::new(0));
        let feed = ScriptedFeed {
            steps: VecDeque::from([
                FeedStep::Update(quote_update("SPY", dec!(400))),
                FeedStep::Fail,
                FeedStep::Update(quote_update("SPY", dec!(405))),
                FeedStep::End,
            ]),
            connects: Arc::clone(&connects),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        dispatcher.run(Box::new(feed), shutdown_rx).await.unwrap();

        // Initial connect plus one reconnect.
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        let spy = cache
            .get(&Vehicle::equity("SPY"), SeriesKind::Quote)
            .unwrap();
        assert_eq!(spy.as_quote().unwrap().bid, dec!(405));
        registry.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_signal_stops_a_silent_feed() {
        let (_cache, _registry, dispatcher) = setup();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let run = tokio::spawn(async move { dispatcher.run(Box::new(SilentFeed), shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown_tx.send(true).unwrap();
        run.await.unwrap().unwrap();
    }
}
