use crate::model::{SeriesKind, Vehicle, VehicleKind};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default = "default_drain_timeout_secs")]
    pub shutdown_drain_timeout_secs: u64,
    pub assets: Vec<AssetConfig>,
}

impl AppConfig {
    #[must_use]
    pub const fn shutdown_drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_timeout_secs)
    }
}

/// Reconnect policy for the feed subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_feed_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_feed_initial_backoff_ms(),
            max_backoff_ms: default_feed_max_backoff_ms(),
        }
    }
}

/// Retry policy for order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_gateway_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_gateway_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_gateway_max_attempts(),
            initial_backoff_ms: default_gateway_initial_backoff_ms(),
            max_backoff_ms: default_gateway_max_backoff_ms(),
        }
    }
}

/// What schedules an asset's evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Evaluate on every quote snapshot for the asset's vehicle.
    OnQuote,
    /// Evaluate on every bars snapshot for the asset's vehicle.
    OnBars,
    /// Evaluate on the asset's own clock, independent of the feed.
    Every { secs: u64 },
}

impl Timeframe {
    /// Whether a snapshot of `kind` should trigger an evaluation. Snapshots
    /// that don't trigger still refresh the cache for the asset.
    #[must_use]
    pub const fn triggers_on(self, kind: SeriesKind) -> bool {
        match self {
            Self::OnQuote => matches!(kind, SeriesKind::Quote),
            Self::OnBars => matches!(kind, SeriesKind::Bars),
            Self::Every { .. } => false,
        }
    }

    #[must_use]
    pub const fn period(self) -> Option<Duration> {
        match self {
            Self::Every { secs } => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }
}

/// Optional per-asset trading window, stated in UTC. Weekends are always
/// outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub flatten_on_close: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: String,
    /// Strategy binding, resolved by name through the strategy factory.
    pub strategy: String,
    /// Strategy-specific parameters, passed through opaquely.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    pub vehicle: String,
    #[serde(default = "default_vehicle_kind")]
    pub vehicle_kind: VehicleKind,
    pub budget: Decimal,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub reinvest_profit: bool,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub session: Option<SessionConfig>,
}

impl AssetConfig {
    #[must_use]
    pub fn vehicle(&self) -> Vehicle {
        Vehicle {
            symbol: self.vehicle.clone(),
            kind: self.vehicle_kind,
        }
    }
}

const fn default_drain_timeout_secs() -> u64 {
    10
}

const fn default_feed_initial_backoff_ms() -> u64 {
    500
}

const fn default_feed_max_backoff_ms() -> u64 {
    30_000
}

const fn default_gateway_max_attempts() -> u32 {
    3
}

const fn default_gateway_initial_backoff_ms() -> u64 {
    250
}

const fn default_gateway_max_backoff_ms() -> u64 {
    5_000
}

const fn default_vehicle_kind() -> VehicleKind {
    VehicleKind::Equity
}

const fn default_enabled() -> bool {
    true
}
