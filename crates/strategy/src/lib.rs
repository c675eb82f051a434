pub mod buy_and_hold;
pub mod drawdown_scaling;
pub mod price_target;
pub mod timed_accumulation;

pub use buy_and_hold::BuyAndHoldStrategy;
pub use drawdown_scaling::DrawdownScalingStrategy;
pub use price_target::PriceTargetStrategy;
pub use timed_accumulation::TimedAccumulationStrategy;

use anyhow::{bail, Context, Result};
use assetflow_core::{AssetConfig, Strategy};

/// Resolves an asset's strategy binding by name. New variants register here;
/// the dispatcher and ledger never learn their identity.
///
/// # Errors
///
/// Returns an error for an unknown binding or malformed parameters.
pub fn create_strategy(config: &AssetConfig) -> Result<Box<dyn Strategy>> {
    let vehicle = config.vehicle();
    let params = config
        .params
        .clone()
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

    let strategy: Box<dyn Strategy> = match config.strategy.as_str() {
        "buy_and_hold" => Box::new(BuyAndHoldStrategy::new(vehicle, config.budget)),
        "price_target" => {
            let params = serde_json::from_value(params)
                .with_context(|| format!("bad price_target params for asset {}", config.id))?;
            Box::new(PriceTargetStrategy::new(vehicle, config.budget, params))
        }
        "timed_accumulation" => {
            let params = serde_json::from_value(params).with_context(|| {
                format!("bad timed_accumulation params for asset {}", config.id)
            })?;
            Box::new(TimedAccumulationStrategy::new(vehicle, config.budget, params))
        }
        "drawdown_scaling" => {
            Box::new(DrawdownScalingStrategy::new(vehicle, config.budget))
        }
        other => bail!("unknown strategy binding '{other}' for asset {}", config.id),
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetflow_core::Timeframe;
    use rust_decimal::Decimal;

    fn config(strategy: &str) -> AssetConfig {
        AssetConfig {
            id: "a1".into(),
            strategy: strategy.into(),
            params: None,
            vehicle: "SPY".into(),
            vehicle_kind: assetflow_core::VehicleKind::Equity,
            budget: Decimal::from(10_000),
            enabled: true,
            reinvest_profit: false,
            timeframe: Timeframe::OnQuote,
            session: None,
        }
    }

    #[test]
    fn resolves_every_registered_binding() {
        for name in [
            "buy_and_hold",
            "price_target",
            "timed_accumulation",
            "drawdown_scaling",
        ] {
            let strategy = create_strategy(&config(name)).unwrap();
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn unknown_binding_is_an_error() {
        assert!(create_strategy(&config("premium_selling")).is_err());
    }
}
