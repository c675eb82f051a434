use crate::model::{Snapshot, Vehicle};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifies one configured asset. Unique across the process.
pub type AssetId = String;

/// Identifies one submitted order. Allocated by the order gateway.
pub type OrderId = u64;

/// One inbound feed update: a fresh snapshot for a vehicle's series.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub vehicle: Vehicle,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// A proposed action emitted by a strategy evaluation. Purely intra-process;
/// becomes an order only once the gateway accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub vehicle: Vehicle,
    pub direction: TradeDirection,
    pub quantity: Decimal,
    pub limit: Option<Decimal>,
}

impl TradeIntent {
    /// Quantity with direction applied: positive for buys, negative for sells.
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        match self.direction {
            TradeDirection::Buy => self.quantity,
            TradeDirection::Sell => -self.quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    PartiallyFilled,
    Filled,
    Rejected,
    Canceled,
}

impl OrderState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Canceled)
    }
}

/// An accepted intent with its gateway-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub id: OrderId,
    pub asset_id: AssetId,
    pub intent: TradeIntent,
    pub submitted_at: DateTime<Utc>,
}

/// A broker-confirmed execution increment. `quantity` is signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub vehicle: Vehicle,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An asynchronous order status transition, pushed from the gateway into the
/// owning asset's reconcile channel.
///
/// `cumulative_filled` is the unsigned total filled so far for this order;
/// consumers use it to make replayed updates idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub state: OrderState,
    pub fill: Option<Fill>,
    pub cumulative_filled: Decimal,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
