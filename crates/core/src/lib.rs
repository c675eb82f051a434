pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod model;
pub mod position;
pub mod session;
pub mod snapshot;
pub mod traits;

pub use config::{AppConfig, AssetConfig, FeedConfig, GatewayConfig, SessionConfig, Timeframe};
pub use config_loader::ConfigLoader;
pub use error::{BrokerError, FeedError, LedgerError, StrategyError};
pub use events::{
    AssetId, Fill, OrderId, OrderState, OrderTicket, OrderUpdate, SnapshotUpdate, TradeDirection,
    TradeIntent,
};
pub use model::{
    Bar, OptionContract, OptionType, QuoteSnapshot, SeriesKind, Snapshot, SnapshotData, Vehicle,
    VehicleKind,
};
pub use position::{Ledger, Position};
pub use session::SessionWindow;
pub use snapshot::{SnapshotCache, SnapshotView};
pub use traits::{BrokerAdapter, FeedAdapter, Strategy};
