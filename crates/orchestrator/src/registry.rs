use crate::asset_actor::AssetActor;
use crate::asset_handle::AssetHandle;
use crate::messages::{AssetState, AssetStatus};
use assetflow_core::{
    AssetConfig, AssetId, Position, SeriesKind, SnapshotCache, Strategy, Vehicle,
};
use assetflow_gateway::OrderGateway;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Owns every running asset actor and routes feed triggers to the ones that
/// asked for them.
pub struct AssetRegistry {
    assets: RwLock<HashMap<AssetId, AssetHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cache: Arc<SnapshotCache>,
    gateway: Arc<OrderGateway>,
    drain_timeout: Duration,
}

impl AssetRegistry {
    #[must_use]
    pub fn new(
        cache: Arc<SnapshotCache>,
        gateway: Arc<OrderGateway>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            assets: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            cache,
            gateway,
            drain_timeout,
        }
    }

    /// Spawns one asset actor on its own task.
    ///
    /// # Errors
    /// Returns an error for a duplicate asset id.
    pub async fn spawn_asset(
        &self,
        config: AssetConfig,
        strategy: Box<dyn Strategy>,
    ) -> Result<AssetHandle> {
        let asset_id = config.id.clone();
        if self.assets.read().await.contains_key(&asset_id) {
            bail!("asset {asset_id} is already registered");
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (updates_tx, updates_rx) = mpsc::channel(64);
        let initial = AssetStatus {
            asset_id: asset_id.clone(),
            state: if config.enabled {
                AssetState::Idle
            } else {
                AssetState::Disabled
            },
            position: Position::default(),
            open_orders: 0,
        };
        let (status_tx, status_rx) = watch::channel(initial);

        let handle = AssetHandle::new(cmd_tx, status_rx, config.vehicle(), config.timeframe);
        let actor = AssetActor::new(
            config,
            strategy,
            Arc::clone(&self.cache),
            Arc::clone(&self.gateway),
            cmd_rx,
            updates_rx,
            updates_tx,
            status_tx,
            self.drain_timeout,
        );
        let task = tokio::spawn(actor.run());

        self.tasks.lock().await.push(task);
        self.assets.write().await.insert(asset_id.clone(), handle.clone());
        tracing::info!(asset_id, "asset spawned");

        Ok(handle)
    }

    /// Triggers every asset whose vehicle and timeframe match the snapshot.
    /// Non-blocking; a busy asset coalesces.
    pub async fn route(&self, vehicle: &Vehicle, kind: SeriesKind) {
        for handle in self.assets.read().await.values() {
            if handle.wants(vehicle, kind) {
                handle.trigger();
            }
        }
    }

    #[must_use]
    pub async fn get_asset(&self, asset_id: &str) -> Option<AssetHandle> {
        self.assets.read().await.get(asset_id).cloned()
    }

    #[must_use]
    pub async fn list_assets(&self) -> Vec<AssetId> {
        let mut ids: Vec<_> = self.assets.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Latest published status of every asset, sorted by id.
    #[must_use]
    pub async fn statuses(&self) -> Vec<AssetStatus> {
        let mut statuses: Vec<_> = self
            .assets
            .read()
            .await
            .values()
            .map(AssetHandle::latest_status)
            .collect();
        statuses.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        statuses
    }

    /// Asks every actor to drain and waits for all of them to finish.
    pub async fn shutdown_all(&self) {
        let handles: Vec<_> = self.assets.read().await.values().cloned().collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "asset task panicked");
            }
        }
        tracing::info!("all assets stopped");
    }
}
