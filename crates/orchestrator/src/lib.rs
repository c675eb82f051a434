//! Per-asset actors and the feed dispatcher.
//!
//! Each configured asset runs as its own tokio task owning its strategy and
//! ledger exclusively; the dispatcher fans feed snapshots out to the shared
//! cache and nudges the interested actors. Nothing here blocks one asset on
//! another.

mod asset_actor;
mod asset_handle;
mod dispatcher;
mod messages;
mod registry;

pub use asset_actor::AssetActor;
pub use asset_handle::AssetHandle;
pub use dispatcher::Dispatcher;
pub use messages::{AssetCommand, AssetState, AssetStatus};
pub use registry::AssetRegistry;
