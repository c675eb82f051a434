use assetflow_core::{
    Position, SnapshotView, Strategy, StrategyError, TradeDirection, TradeIntent, Vehicle,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Buy whatever the budget still covers at the ask, then hold.
pub struct BuyAndHoldStrategy {
    vehicle: Vehicle,
    budget: Decimal,
}

impl BuyAndHoldStrategy {
    #[must_use]
    pub const fn new(vehicle: Vehicle, budget: Decimal) -> Self {
        Self { vehicle, budget }
    }
}

impl Strategy for BuyAndHoldStrategy {
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

        if quote.ask <= Decimal::ZERO {
            return Err(StrategyError::Evaluation(format!(
                "non-positive ask for {}",
                self.vehicle
            )));
        }

        let headroom = self.budget - position.cash_committed;
        let quantity = (headroom / quote.ask).floor();
        if quantity < Decimal::ONE {
            return Ok(Vec::new());
        }

        Ok(vec![TradeIntent {
            vehicle: self.vehicle.clone(),
            direction: TradeDirection::Buy,
            quantity,
            limit: Some(quote.ask),
        }])
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetflow_core::{Fill, Ledger, QuoteSnapshot, Snapshot, SnapshotCache};
    use rust_decimal_macros::dec;

    fn cache_with_quote(vehicle: &Vehicle, ask: Decimal) -> SnapshotCache {
        let cache = SnapshotCache::new();
        cache.publish(
            vehicle.clone(),
            Snapshot::quote(
                Utc::now(),
                QuoteSnapshot {
                    bid: ask - dec!(0.02),
                    ask,
                    last: ask,
                    mark: ask,
                },
            ),
        );
        cache
    }

    #[test]
    fn sizes_to_the_full_budget() {
        // $10,000 at $50/share buys 200 shares.
        let spy = Vehicle::equity("SPY");
        let cache = cache_with_quote(&spy, dec!(50));
        let mut strategy = BuyAndHoldStrategy::new(spy.clone(), dec!(10000));

        let intents = strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap();

        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].direction, TradeDirection::Buy);
        assert_eq!(intents[0].quantity, dec!(200));
        assert_eq!(intents[0].limit, Some(dec!(50)));
    }

    #[test]
    fn holds_once_budget_is_committed() {
        let spy = Vehicle::equity("SPY");
        let cache = cache_with_quote(&spy, dec!(50));
        let mut ledger = Ledger::new("a1".into(), dec!(10000), false);
        ledger
            .apply_fill(&Fill {
                order_id: 1,
                vehicle: spy.clone(),
                quantity: dec!(200),
                price: dec!(50),
                timestamp: Utc::now(),
            })
            .unwrap();

        let mut strategy = BuyAndHoldStrategy::new(spy.clone(), dec!(10000));
        let intents = strategy
            .evaluate(&cache.view(&spy), ledger.position(), Utc::now())
            .unwrap();
        assert!(intents.is_empty());
    }

    #[test]
    fn missing_quote_is_a_missing_data_error() {
        let spy = Vehicle::equity("SPY");
        let cache = SnapshotCache::new();
        let mut strategy = BuyAndHoldStrategy::new(spy.clone(), dec!(10000));
        let err = strategy
            .evaluate(&cache.view(&spy), &Position::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StrategyError::MissingData(_)));
    }

    #[test]
    fn identical_inputs_produce_identical_intents() {
        let spy = Vehicle::equity("SPY");
        let cache = cache_with_quote(&spy, dec!(50));
        let clock = Utc::now();
        let mut a = BuyAndHoldStrategy::new(spy.clone(), dec!(10000));
        let mut b = BuyAndHoldStrategy::new(spy.clone(), dec!(10000));

        let ia = a.evaluate(&cache.view(&spy), &Position::default(), clock).unwrap();
        let ib = b.evaluate(&cache.view(&spy), &Position::default(), clock).unwrap();
        assert_eq!(ia, ib);
    }
}
