use assetflow_core::{FeedAdapter, FeedError, QuoteSnapshot, Snapshot, SnapshotUpdate, Vehicle};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// Simulated quote feed: a random walk per vehicle, one update per tick,
/// vehicles served round-robin.
pub struct SimFeed {
    vehicles: Vec<Vehicle>,
    tick: Duration,
    prices: HashMap<Vehicle, Decimal>,
    rng: StdRng,
    cursor: usize,
    connected: bool,
    drop_after: Option<u32>,
}

impl SimFeed {
    #[must_use]
    pub fn new(vehicles: Vec<Vehicle>, tick: Duration) -> Self {
        Self {
            vehicles,
            tick,
            prices: HashMap::new(),
            rng: StdRng::from_entropy(),
            cursor: 0,
            connected: false,
            drop_after: None,
        }
    }

    /// Fixed seed for reproducible walks.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Starting price for a vehicle. Unseeded vehicles start at 100.
    #[must_use]
    pub fn with_price(mut self, vehicle: Vehicle, price: Decimal) -> Self {
        self.prices.insert(vehicle, price);
        self
    }

    /// Simulates a cut link: after `n` more updates the feed errors out
    /// once and must be reconnected.
    #[must_use]
    pub fn drop_after(mut self, n: u32) -> Self {
        self.drop_after = Some(n);
        self
    }

    fn walk(&mut self, vehicle: &Vehicle) -> Decimal {
        let current = self
            .prices
            .get(vehicle)
            .copied()
            .unwrap_or_else(|| Decimal::from(100));
        // Step in the range [-0.50, 0.50], floored at 1.00.
        let step = Decimal::new(self.rng.gen_range(-50..=50), 2);
        let next = (current + step).max(Decimal::ONE);
        self.prices.insert(vehicle.clone(), next);
        next
    }
}

#[async_trait]
impl FeedAdapter for SimFeed {
    async fn connect(&mut self) -> Result<(), FeedError> {
        self.connected = true;
        tracing::info!(vehicles = self.vehicles.len(), "sim feed connected");
        Ok(())
    }

    async fn next_update(&mut self) -> Result<Option<SnapshotUpdate>, FeedError> {
        if !self.connected {
            return Err(FeedError::Disconnected("not connected".into()));
        }
        if self.vehicles.is_empty() {
            return Ok(None);
        }
        if let Some(remaining) = self.drop_after {
            if remaining == 0 {
                self.drop_after = None;
                self.connected = false;
                return Err(FeedError::Disconnected("simulated link drop".into()));
            }
            self.drop_after = Some(remaining - 1);
        }

        tokio::time::sleep(self.tick).await;

        let vehicle = self.vehicles[self.cursor % self.vehicles.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);

        let mark = self.walk(&vehicle);
        let half_spread = Decimal::new(1, 2);
        let quote = QuoteSnapshot {
            bid: mark - half_spread,
            ask: mark + half_spread,
            last: mark,
            mark,
        };
        Ok(Some(SnapshotUpdate {
            vehicle,
            snapshot: Snapshot::quote(chrono::Utc::now(), quote),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn serves_vehicles_round_robin() {
        let mut feed = SimFeed::new(
            vec![Vehicle::equity("SPY"), Vehicle::equity("QQQ")],
            Duration::from_millis(10),
        )
        .with_seed(42);
        feed.connect().await.unwrap();

        let first = feed.next_update().await.unwrap().unwrap();
        let second = feed.next_update().await.unwrap().unwrap();
        assert_eq!(first.vehicle, Vehicle::equity("SPY"));
        assert_eq!(second.vehicle, Vehicle::equity("QQQ"));
    }

    #[tokio::test(start_paused = true)]
    async fn quotes_keep_a_positive_spread() {
        let mut feed = SimFeed::new(vec![Vehicle::equity("SPY")], Duration::from_millis(10))
            .with_seed(7)
            .with_price(Vehicle::equity("SPY"), dec!(50));
        feed.connect().await.unwrap();

        for _ in 0..20 {
            let update = feed.next_update().await.unwrap().unwrap();
            let quote = update.snapshot.as_quote().unwrap();
            assert!(quote.ask > quote.bid);
            assert!(quote.mark >= Decimal::ONE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_a_simulated_drop() {
        let mut feed = SimFeed::new(vec![Vehicle::equity("SPY")], Duration::from_millis(10))
            .with_seed(3)
            .drop_after(2);
        feed.connect().await.unwrap();

        assert!(feed.next_update().await.is_ok());
        assert!(feed.next_update().await.is_ok());
        assert!(feed.next_update().await.is_err());
        // A reconnect restores the stream.
        feed.connect().await.unwrap();
        assert!(feed.next_update().await.unwrap().is_some());
    }
}
