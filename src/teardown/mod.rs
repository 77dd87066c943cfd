//! Topology delete/archive with compensating rollback.
//!
//! Removing a topology first tears down every physical link it holds. The
//! record only goes away when every link was cleared; otherwise the listing
//! and the record are put back the way they were. Device bookings stay with
//! the requester until the record is gone, so a rollback never has to win
//! them back.

use serde::Serialize;
use thiserror::Error;

use crate::booking::ReservationManager;
use crate::db::Store;
use crate::links::{LinkError, LinkOrchestrator};
use crate::models::{AccountType, LinkOperationResult, Topology};

#[derive(Error, Debug)]
pub enum TeardownError {
    #[error("Topology not found: {0}")]
    TopologyNotFound(i64),

    #[error("Not allowed to modify topology {0}")]
    Forbidden(i64),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type TeardownResult<T> = Result<T, TeardownError>;

/// A caller's ordered view of their topologies
#[derive(Debug, Clone, Default)]
pub struct TopologyListing {
    entries: Vec<Topology>,
}

impl TopologyListing {
    pub fn new(entries: Vec<Topology>) -> Self {
        Self { entries }
    }

    /// Remove a topology, returning the index it occupied
    pub fn withdraw(&mut self, topology_id: i64) -> Option<usize> {
        let idx = self.entries.iter().position(|t| t.id == topology_id)?;
        self.entries.remove(idx);
        Some(idx)
    }

    /// Put a topology back at `index` (clamped to the end)
    pub fn restore(&mut self, index: usize, topology: Topology) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, topology);
    }

    pub fn into_inner(self) -> Vec<Topology> {
        self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownAction {
    Delete,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownOutcome {
    /// Every link was cleared and the record deleted or archived
    Completed,
    /// Some links could not be cleared; nothing was removed
    RolledBack,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownReport {
    pub topology_id: i64,
    pub action: TeardownAction,
    pub outcome: TeardownOutcome,
    pub num_failed: usize,
    pub num_succeeded: usize,
    pub results: Vec<LinkOperationResult>,
    pub listing: Vec<Topology>,
    /// Devices whose booking was released after the record went away
    pub released_devices: Vec<i64>,
}

/// Runs the delete/archive chain for a topology
#[derive(Clone)]
pub struct TopologyTeardown {
    store: Store,
    links: LinkOrchestrator,
    reservations: ReservationManager,
}

impl TopologyTeardown {
    pub fn new(store: Store, links: LinkOrchestrator, reservations: ReservationManager) -> Self {
        Self {
            store,
            links,
            reservations,
        }
    }

    pub async fn delete(
        &self,
        listing: TopologyListing,
        topology_id: i64,
        requester: i64,
        role: AccountType,
    ) -> TeardownResult<TeardownReport> {
        self.tear_down(listing, topology_id, requester, role, TeardownAction::Delete)
            .await
    }

    pub async fn archive(
        &self,
        listing: TopologyListing,
        topology_id: i64,
        requester: i64,
        role: AccountType,
    ) -> TeardownResult<TeardownReport> {
        self.tear_down(listing, topology_id, requester, role, TeardownAction::Archive)
            .await
    }

    /// Bring an archived topology back; no link work is involved
    pub async fn unarchive(&self, topology_id: i64, requester: i64, role: AccountType) -> TeardownResult<Topology> {
        self.authorized(topology_id, requester, role).await?;
        Ok(self.store.set_topology_archived(topology_id, false).await?)
    }

    async fn authorized(&self, topology_id: i64, requester: i64, role: AccountType) -> TeardownResult<Topology> {
        let topology = self
            .store
            .get_topology(topology_id)
            .await?
            .ok_or(TeardownError::TopologyNotFound(topology_id))?;
        if topology.owner_id != requester && !role.is_elevated() {
            return Err(TeardownError::Forbidden(topology_id));
        }
        Ok(topology)
    }

    async fn tear_down(
        &self,
        mut listing: TopologyListing,
        topology_id: i64,
        requester: i64,
        role: AccountType,
        action: TeardownAction,
    ) -> TeardownResult<TeardownReport> {
        let topology = self.authorized(topology_id, requester, role).await?;

        let position = listing.withdraw(topology_id);
        let device_ids = topology.graph.device_ids();

        let report = match self.links.delete_topology_links(topology_id, &[]).await {
            Ok(report) => report,
            Err(e) => {
                self.roll_back(&mut listing, position, topology).await;
                return Err(e.into());
            }
        };

        let (outcome, released_devices) = if report.summary.all_succeeded() {
            match action {
                TeardownAction::Delete => self.store.delete_topology(topology_id).await?,
                TeardownAction::Archive => {
                    self.store.set_topology_archived(topology_id, true).await?;
                }
            }
            let released = self.reservations.release_all(&device_ids, requester).await;
            tracing::info!(
                "Topology {} {:?} completed, released {} device(s)",
                topology_id,
                action,
                released.len()
            );
            (TeardownOutcome::Completed, released)
        } else {
            tracing::warn!(
                "Topology {} {:?} rolled back: {} link(s) could not be cleared",
                topology_id,
                action,
                report.summary.num_failed
            );
            self.roll_back(&mut listing, position, topology).await;
            (TeardownOutcome::RolledBack, Vec::new())
        };

        Ok(TeardownReport {
            topology_id,
            action,
            outcome,
            num_failed: report.summary.num_failed,
            num_succeeded: report.summary.num_succeeded,
            results: report.summary.results,
            listing: listing.into_inner(),
            released_devices,
        })
    }

    async fn roll_back(&self, listing: &mut TopologyListing, position: Option<usize>, snapshot: Topology) {
        if let Some(index) = position {
            // Prefer the stored record so failed edges show up in the listing
            let current = match self.store.get_topology(snapshot.id).await {
                Ok(Some(t)) => t,
                Ok(None) => snapshot,
                Err(e) => {
                    tracing::warn!("Failed to reload topology {}: {}", snapshot.id, e);
                    snapshot
                }
            };
            listing.restore(index, current);
        }
    }
}
