use assetflow_core::{
    Position, SnapshotView, Strategy, StrategyError, TradeDirection, TradeIntent, Vehicle,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimedAccumulationParams {
    /// Shares bought per timer firing.
    pub quantity: Decimal,
}

impl Default for TimedAccumulationParams {
    fn default() -> Self {
        Self {
            quantity: Decimal::ONE,
        }
    }
}

/// Dollar-cost averaging on the asset's own clock: each periodic trigger
/// buys a fixed quantity until the budget is consumed. Intended for
/// `Every`-timeframe assets, so it keeps accumulating through feed outages.
pub struct TimedAccumulationStrategy {
    vehicle: Vehicle,
    budget: Decimal,
    params: TimedAccumulationParams,
}

impl TimedAccumulationStrategy {
    #[must_use]
    pub const fn new(vehicle: Vehicle, budget: Decimal, params: TimedAccumulationParams) -> Self {
        Self {
            vehicle,
            budget,
            params,
        }
    }
}

impl Strategy for TimedAccumulationStrategy {
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

        let cost = self.params.quantity * quote.ask;
        if position.cash_committed + cost > self.budget {
            return Ok(Vec::new());
        }

        Ok(vec![TradeIntent {
            vehicle: self.vehicle.clone(),
            direction: TradeDirection::Buy,
            quantity: self.params.quantity,
            limit: Some(quote.ask),
        }])
    }

    fn name(&self) -> &str {
        "timed_accumulation"
    }
}
