use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable instrument. Immutable once referenced by an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    pub symbol: String,
    pub kind: VehicleKind,
}

impl Vehicle {
    #[must_use]
    pub fn equity(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            kind: VehicleKind::Equity,
        }
    }
}

impl std::fmt::Display for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Equity,
    OptionContract,
}

/// Which of the per-vehicle series a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Quote,
    Bars,
    OptionChain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub mark: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub strike: Decimal,
    pub contract_type: OptionType,
    pub bid: Decimal,
    pub ask: Decimal,
    pub mark: Decimal,
    pub delta: f64,
    pub open_interest: u64,
    pub volume: u64,
}

/// The tabular payload of one snapshot. Historical bars arrive as a single
/// table value, not as increments the cache must merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotData {
    Quote(QuoteSnapshot),
    Bars(Vec<Bar>),
    OptionChain(Vec<OptionContract>),
}

/// An immutable, timestamped market-data record for one vehicle.
/// A new feed update produces a new `Snapshot`; published values are never
/// mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub data: SnapshotData,
}

impl Snapshot {
    #[must_use]
    pub fn quote(taken_at: DateTime<Utc>, quote: QuoteSnapshot) -> Self {
        Self {
            taken_at,
            data: SnapshotData::Quote(quote),
        }
    }

    #[must_use]
    pub fn bars(taken_at: DateTime<Utc>, bars: Vec<Bar>) -> Self {
        Self {
            taken_at,
            data: SnapshotData::Bars(bars),
        }
    }

    #[must_use]
    pub fn option_chain(taken_at: DateTime<Utc>, contracts: Vec<OptionContract>) -> Self {
        Self {
            taken_at,
            data: SnapshotData::OptionChain(contracts),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SeriesKind {
        match self.data {
            SnapshotData::Quote(_) => SeriesKind::Quote,
            SnapshotData::Bars(_) => SeriesKind::Bars,
            SnapshotData::OptionChain(_) => SeriesKind::OptionChain,
        }
    }

    #[must_use]
    pub const fn as_quote(&self) -> Option<&QuoteSnapshot> {
        match &self.data {
            SnapshotData::Quote(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bars(&self) -> Option<&[Bar]> {
        match &self.data {
            SnapshotData::Bars(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_option_chain(&self) -> Option<&[OptionContract]> {
        match &self.data {
            SnapshotData::OptionChain(c) => Some(c),
            _ => None,
        }
    }
}
