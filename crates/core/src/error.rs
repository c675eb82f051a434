use crate::events::AssetId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Feed-side failures. Disconnects are retriable with bounded backoff.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed disconnected: {0}")]
    Disconnected(String),
    #[error("feed protocol error: {0}")]
    Protocol(String),
}

/// A strategy evaluation failure. Aborts the current cycle only; the
/// position is left untouched.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("market data not yet available: {0}")]
    MissingData(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Broker-side failures surfaced through the order gateway.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport-level failure; the gateway retries these with backoff.
    #[error("transient broker error: {0}")]
    Transient(String),
    /// The broker refused the order outright. Not retried.
    #[error("order rejected by broker: {0}")]
    Rejected(String),
}

impl BrokerError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The fill would push committed cash past the asset's budget ceiling.
    /// Rejected and logged, never applied.
    #[error("budget exceeded for {asset_id}: committed {projected} > ceiling {ceiling}")]
    BudgetExceeded {
        asset_id: AssetId,
        projected: Decimal,
        ceiling: Decimal,
    },
    /// Position state no longer adds up. Fatal for the affected asset:
    /// it must be halted rather than continue with suspect state.
    #[error("ledger integrity violation for {asset_id}: {reason}")]
    Integrity { asset_id: AssetId, reason: String },
}
