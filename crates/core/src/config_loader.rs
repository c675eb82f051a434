use crate::config::AppConfig;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::collections::HashSet;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the application configuration by merging the TOML file with
    /// `ASSETFLOW_`-prefixed environment variables. Loaded once at startup;
    /// there is no hot reload.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// asset list fails validation.
    pub fn load(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ASSETFLOW_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &AppConfig) -> Result<()> {
        let mut seen = HashSet::new();
        for asset in &config.assets {
            if asset.id.is_empty() {
                bail!("asset with empty id");
            }
            if !seen.insert(asset.id.as_str()) {
                bail!("duplicate asset id: {}", asset.id);
            }
            if asset.budget.is_sign_negative() {
                bail!("asset {} has a negative budget", asset.id);
            }
            if let Some(session) = &asset.session {
                if session.start >= session.end {
                    bail!("asset {} session window start is not before end", asset.id);
                }
            }
        }
        if config.gateway.max_attempts == 0 {
            bail!("gateway.max_attempts must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeframe;
    use crate::model::SeriesKind;
    use figment::providers::Format;

    fn from_toml(doc: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(figment::providers::Toml::string(doc))
            .extract()?;
        ConfigLoader::validate(&config)?;
        Ok(config)
    }

    #[test]
    fn loads_minimal_asset_list() {
        let config = from_toml(
            r#"
            [[assets]]
            id = "spy-hold"
            strategy = "buy_and_hold"
            vehicle = "SPY"
            budget = "10000"
            timeframe = "on_quote"
            "#,
        )
        .unwrap();

        assert_eq!(config.assets.len(), 1);
        let asset = &config.assets[0];
        assert!(asset.enabled);
        assert_eq!(asset.timeframe, Timeframe::OnQuote);
        assert!(asset.timeframe.triggers_on(SeriesKind::Quote));
        assert!(!asset.timeframe.triggers_on(SeriesKind::Bars));
        assert_eq!(config.gateway.max_attempts, 3);
    }

    #[test]
    fn parses_periodic_timeframe_and_session() {
        let config = from_toml(
            r#"
            [[assets]]
            id = "drip"
            strategy = "timed_accumulation"
            vehicle = "QQQ"
            budget = "5000"
            timeframe = { every = { secs = 3600 } }
            session = { start = "14:30:00", end = "20:45:00", flatten_on_close = true }
            "#,
        )
        .unwrap();

        let asset = &config.assets[0];
        assert_eq!(
            asset.timeframe.period(),
            Some(std::time::Duration::from_secs(3600))
        );
        assert!(asset.session.unwrap().flatten_on_close);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = from_toml(
            r#"
            [[assets]]
            id = "a"
            strategy = "buy_and_hold"
            vehicle = "SPY"
            budget = "1"
            timeframe = "on_quote"

            [[assets]]
            id = "a"
            strategy = "buy_and_hold"
            vehicle = "QQQ"
            budget = "1"
            timeframe = "on_quote"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate asset id"));
    }

    #[test]
    fn inverted_session_window_is_rejected() {
        let err = from_toml(
            r#"
            [[assets]]
            id = "a"
            strategy = "buy_and_hold"
            vehicle = "SPY"
            budget = "1"
            timeframe = "on_quote"
            session = { start = "20:00:00", end = "14:00:00" }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("session window"));
    }
}
