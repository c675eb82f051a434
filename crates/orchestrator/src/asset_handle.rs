use crate::messages::{AssetCommand, AssetStatus};
use assetflow_core::{SeriesKind, Timeframe, Vehicle};
use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle to one asset actor. Carries enough routing metadata for
/// the dispatcher to decide interest without asking the actor.
#[derive(Clone, Debug)]
pub struct AssetHandle {
    tx: mpsc::Sender<AssetCommand>,
    status_rx: watch::Receiver<AssetStatus>,
    vehicle: Vehicle,
    timeframe: Timeframe,
}

impl AssetHandle {
    #[must_use]
    pub(crate) const fn new(
        tx: mpsc::Sender<AssetCommand>,
        status_rx: watch::Receiver<AssetStatus>,
        vehicle: Vehicle,
        timeframe: Timeframe,
    ) -> Self {
        Self {
            tx,
            status_rx,
            vehicle,
            timeframe,
        }
    }

    /// Whether a snapshot of `kind` for `vehicle` should trigger this asset.
    #[must_use]
    pub fn wants(&self, vehicle: &Vehicle, kind: SeriesKind) -> bool {
        self.vehicle == *vehicle && self.timeframe.triggers_on(kind)
    }

    /// Non-blocking trigger. A full mailbox means a trigger is already
    /// queued, so dropping this one loses nothing.
    pub fn trigger(&self) {
        if let Err(mpsc::error::TrySendError::Closed(_)) =
            self.tx.try_send(AssetCommand::Trigger)
        {
            tracing::debug!("trigger for stopped asset dropped");
        }
    }

    /// Round-trip status query answered by the actor itself.
    ///
    /// # Errors
    /// Returns an error if the actor has stopped.
    pub async fn get_status(&self) -> Result<AssetStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(AssetCommand::GetStatus(tx)).await?;
        Ok(rx.await?)
    }

    /// Last status the actor published, without a round trip.
    #[must_use]
    pub fn latest_status(&self) -> AssetStatus {
        self.status_rx.borrow().clone()
    }

    /// Asks the actor to drain and stop.
    ///
    /// # Errors
    /// Returns an error if the actor has already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(AssetCommand::Shutdown).await?;
        Ok(())
    }
}
