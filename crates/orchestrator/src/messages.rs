use assetflow_core::{AssetId, Position};
use tokio::sync::oneshot;

/// Commands accepted by an asset actor.
#[derive(Debug)]
pub enum AssetCommand {
    /// Re-evaluate when convenient. Triggers arriving while orders are in
    /// flight coalesce into a single deferred evaluation.
    Trigger,
    GetStatus(oneshot::Sender<AssetStatus>),
    Shutdown,
}

/// Lifecycle state of one asset actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Idle,
    Evaluating,
    OrdersPending,
    Reconciling,
    /// Halted: disabled by config or after a ledger integrity failure.
    /// Never re-enters the evaluation loop.
    Disabled,
}

/// Point-in-time view of one asset, published on the actor's status channel.
#[derive(Debug, Clone)]
pub struct AssetStatus {
    pub asset_id: AssetId,
    pub state: AssetState,
    pub position: Position,
    pub open_orders: usize,
}
