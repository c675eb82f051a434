use assetflow_core::{
    Position, SnapshotView, Strategy, StrategyError, TradeDirection, TradeIntent, Vehicle,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceTargetParams {
    /// Number of most-recent bars in the regression window.
    pub window: usize,
    /// Shares per trade.
    pub quantity: Decimal,
    /// Resistance-to-exhaustion coefficient. Positive values push targets
    /// further out as the budget fills; zero disables the effect.
    pub alpha: f64,
}

impl Default for PriceTargetParams {
    fn default() -> Self {
        Self {
            window: 20,
            quantity: Decimal::ONE,
            alpha: 1.0,
        }
    }
}

/// Buy oversold and sell overbought around a linear-regression channel.
///
/// A regression over the bar window anchors the channel; buy and sell
/// targets sit one residual-scaled offset below and above the anchor,
/// weighted by how much of the budget is deployed. Trades fire on the close
/// crossing a target, not on sitting beyond it.
pub struct PriceTargetStrategy {
    vehicle: Vehicle,
    budget: Decimal,
    params: PriceTargetParams,
}

struct Channel {
    anchor: f64,
    residual: f64,
}

impl PriceTargetStrategy {
    #[must_use]
    pub const fn new(vehicle: Vehicle, budget: Decimal, params: PriceTargetParams) -> Self {
        Self {
            vehicle,
            budget,
            params,
        }
    }

    /// Least-squares fit over the window; anchor is the fitted value at the
    /// latest bar, residual the root-mean-square error of the fit.
    fn fit(closes: &[f64]) -> Channel {
        let n = closes.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = closes.iter().sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (i, y) in closes.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (y - mean_y);
        }
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let intercept = mean_y - slope * mean_x;

        let mut sse = 0.0;
        for (i, y) in closes.iter().enumerate() {
            let fit = intercept + slope * i as f64;
            sse += (y - fit) * (y - fit);
        }
        Channel {
            anchor: intercept + slope * (n - 1.0),
            residual: (sse / n).sqrt(),
        }
    }
}

impl Strategy for PriceTargetStrategy {
    fn evaluate(
        &mut self,
        view: &SnapshotView<'_>,
        position: &Position,
        _clock: DateTime<Utc>,
    ) -> Result<Vec<TradeIntent>, StrategyError> {
        let snapshot = view
            .bars()
            .ok_or_else(|| StrategyError::MissingData(format!("bars for {}", self.vehicle)))?;
        let bars = snapshot
            .as_bars()
            .ok_or_else(|| StrategyError::Evaluation("bars snapshot without bars".into()))?;
        if bars.len() < 2 {
            return Ok(Vec::new());
        }

        let window = self.params.window.min(bars.len()).max(2);
        let closes: Vec<f64> = bars[bars.len() - window..]
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(0.0))
            .collect();
        let channel = Self::fit(&closes);

        let current = closes[closes.len() - 1];
        let previous = closes[closes.len() - 2];
        let min_offset = channel.residual.max(0.0001 * current);

        let invested = if self.budget > Decimal::ZERO {
            (position.cash_committed / self.budget)
                .to_f64()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        } else {
            1.0
        };
        let bullish_vacancy = 1.0 - invested;
        let bearish_vacancy = invested;

        let sell_pt = channel.anchor + min_offset * (1.0 + self.params.alpha * bullish_vacancy);
        let buy_pt = channel.anchor - min_offset * (1.0 + self.params.alpha * bearish_vacancy);

        // Limits come from the quote when one is cached, otherwise the close.
        let close_price = bars[bars.len() - 1].close;
        let (bid, ask) = view
            .quote()
            .as_deref()
            .and_then(assetflow_core::Snapshot::as_quote)
            .map_or((close_price, close_price), |q| (q.bid, q.ask));

        tracing::debug!(
            vehicle = %self.vehicle,
            current,
            sell_pt,
            buy_pt,
            anchor = channel.anchor,
            residual = channel.residual,
            "price targets"
        );

        if previous > sell_pt && current <= sell_pt {
            let held = position.quantity(&self.vehicle);
            let quantity = self.params.quantity.min(held);
            if quantity >= Decimal::ONE {
                return Ok(vec![TradeIntent {
                    vehicle: self.vehicle.clone(),
                    direction: TradeDirection::Sell,
                    quantity,
                    limit: Some(bid),
                }]);
            }
        } else if previous < buy_pt && current >= buy_pt {
            let cost = self.params.quantity * ask;
            if position.cash_committed + cost <= self.budget {
                return Ok(vec![TradeIntent {
                    vehicle: self.vehicle.clone(),
                    direction: TradeDirection::Buy,
                    quantity: self.params.quantity,
                    limit: Some(ask),
                }]);
            }
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "price_target"
    }
}
