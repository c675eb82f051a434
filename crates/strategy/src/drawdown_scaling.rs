use assetflow_core::{
    Position, SnapshotView, Strategy, StrategyError, TradeDirection, TradeIntent, Vehicle,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Scale into drawdowns: track the all-time-high ask and keep the invested
/// fraction of the budget in line with the market's current drawdown. A 20%
/// drawdown with 5% of budget deployed buys the missing 15%.
pub struct DrawdownScalingStrategy {
    vehicle: Vehicle,
    budget: Decimal,
    ath: Option<Decimal>,
}

impl DrawdownScalingStrategy {
    #[must_use]
    pub const fn new(vehicle: Vehicle, budget: Decimal) -> Self {
        Self {
            vehicle,
            budget,
            ath: None,
        }
    }
}

impl Strategy for DrawdownScalingStrategy {
    fn evaluate(
        &mut self,
        view: &SnapshotView<'_>,
        position: &Position,
        _clock: DateTime<Utc>,
    ) -> Result<Vec<TradeIntent>, StrategyError> {
        let snapshot = view
            .quote()
            .ok_or_else(|| StrategyError::MissingData(format!("quote for {}", self.vehicle)))?;
        let quote = snapshot
            .as_quote()
            .ok_or_else(|| StrategyError::Evaluation("quote snapshot without quote".into()))?;
        let ask = quote.ask;
        if ask <= Decimal::ZERO || self.budget <= Decimal::ZERO {
            return Ok(Vec::new());
        }

        let ath = match self.ath {
            Some(prev) if prev >= ask => prev,
            _ => {
                self.ath = Some(ask);
                ask
            }
        };

        let drawdown = Decimal::ONE - ask / ath;
        let invested = position.cash_committed / self.budget;
        if drawdown <= invested {
            return Ok(Vec::new());
        }

        let quantity = ((drawdown - invested) * self.budget / ask).floor();
        if quantity < Decimal::ONE {
            return Ok(Vec::new());
        }

        tracing::debug!(
            vehicle = %self.vehicle,
            %drawdown,
            %invested,
            %quantity,
            "scaling into drawdown"
        );
        Ok(vec![TradeIntent {
            vehicle: self.vehicle.clone(),
            direction: TradeDirection::Buy,
            quantity,
            limit: Some(ask),
        }])
    }

    fn name(&self) -> &str {
        "drawdown_scaling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetflow_core::{QuoteSnapshot, Snapshot, SnapshotCache};
    use rust_decimal_macros::dec;

    fn publish_ask(cache: &SnapshotCache, vehicle: &Vehicle, ask: Decimal) {
        cache.publish(
            vehicle.clone(),
            Snapshot::quote(
                Utc::now(),
                QuoteSnapshot {
                    bid: ask - dec!(0.01),
                    ask,
                    last: ask,
                    mark: ask,
                },
            ),
        );
    }

    #[test]
    fn no_buying_at_the_high() {
        let spy = Vehicle::equity("SPY");
        let cache = SnapshotCache::new();
        publish_ask(&cache, &spy, dec!(100));

        let mut strategy = DrawdownScalingStrategy::new(spy.clone(), dec!(10000));
        let intents = strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();
        assert!(intents.is_empty());
    }

    #[test]
    fn buys_the_drawdown_gap_when_uninvested() {
        let spy = Vehicle::equity("SPY");
        let cache = SnapshotCache::new();
        let mut strategy = DrawdownScalingStrategy::new(spy.clone(), dec!(10000));

        publish_ask(&cache, &spy, dec!(100));
        strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();

        // 20% drawdown, nothing invested: deploy 20% of budget at $80.
        publish_ask(&cache, &spy, dec!(80));
        let intents = strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].quantity, dec!(25));
    }

    #[test]
    fn recovery_does_not_trigger_buys() {
        let spy = Vehicle::equity("SPY");
        let cache = SnapshotCache::new();
        let mut strategy = DrawdownScalingStrategy::new(spy.clone(), dec!(10000));

        publish_ask(&cache, &spy, dec!(100));
        strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();

        // New high resets the reference; no drawdown, no trade.
        publish_ask(&cache, &spy, dec!(110));
        let intents = strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();
        assert!(intents.is_empty());
    }
}
