//! Link provisioning orchestration.
//!
//! A logical link joins two lab device ports. Each lab port is cabled to a
//! port on one of the two interconnect switches; creating the link asks the
//! interconnect API to bridge those two switch ports.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

use crate::db::Store;
use crate::geometry::{layout_document, EdgeLayout};
use crate::models::ports::split_port;
use crate::models::*;
use crate::provisioning::{LinkProvisioner, ProvisionRequest};
use crate::ws::Hub;

/// Port numbers on interconnect #2 follow the 44 ports of interconnect #1
pub const INTERCONNECT_PORT_STRIDE: u32 = 44;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("No connection configured for {device} port {port}")]
    ConnectionNotFound { device: String, port: String },

    #[error("Interconnect device not found: {0}")]
    InterconnectNotFound(String),

    #[error("Interconnect device {name} is missing {field}")]
    InterconnectMisconfigured { name: String, field: &'static str },

    #[error("Interconnect port has no port number: {0}")]
    InvalidPort(String),

    #[error("Topology not found: {0}")]
    TopologyNotFound(i64),

    #[error("Link provisioning failed: {0}")]
    Provisioning(String),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type LinkResult<T> = Result<T, LinkError>;

/// Offset of an interconnect port in the combined 1..88 numbering
pub fn port_offset(port: &str, device_number: i32) -> Option<u32> {
    let (_, number) = split_port(port)?;
    if device_number == 2 {
        number.checked_add(INTERCONNECT_PORT_STRIDE)
    } else {
        Some(number)
    }
}

/// One side of a link, resolved down to interconnect addressing
#[derive(Debug, Clone)]
struct ResolvedSide {
    device_number: i32,
    ip: String,
    prefix: String,
    port_id: u32,
    username: String,
    password: String,
    secret: String,
}

/// Result of a topology-scoped link operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyLinkReport {
    pub topology_id: i64,
    #[serde(flatten)]
    pub summary: BulkSummary,
    pub graph: GraphDocument,
    pub layout: Vec<EdgeLayout>,
}

/// Resolves link pairs and drives the interconnect API
#[derive(Clone)]
pub struct LinkOrchestrator {
    store: Store,
    provisioner: Arc<dyn LinkProvisioner>,
    hub: Option<Arc<Hub>>,
}

impl LinkOrchestrator {
    pub fn new(store: Store, provisioner: Arc<dyn LinkProvisioner>, hub: Option<Arc<Hub>>) -> Self {
        Self {
            store,
            provisioner,
            hub,
        }
    }

    /// Build the interconnect request for a pair.
    ///
    /// `None` means one of the lab devices no longer exists and there is
    /// nothing to do.
    pub async fn resolve(&self, pair: &LinkPair) -> LinkResult<Option<ProvisionRequest>> {
        let first_conn = self.connection(&pair.first_device, &pair.first_port).await?;
        let second_conn = self.connection(&pair.second_device, &pair.second_port).await?;

        let first_ic = self.interconnect(&first_conn.0).await?;
        let second_ic = self.interconnect(&second_conn.0).await?;

        if self.store.get_device_by_name(&pair.first_device).await?.is_none()
            || self.store.get_device_by_name(&pair.second_device).await?.is_none()
        {
            tracing::info!("Lab device vanished, skipping link {}", pair);
            return Ok(None);
        }

        let mut first = resolve_side(&first_ic, &first_conn.1)?;
        let mut second = resolve_side(&second_ic, &second_conn.1)?;

        // Interconnect #1 always goes first; equal numbers keep caller order
        if second.device_number < first.device_number {
            std::mem::swap(&mut first, &mut second);
        }

        Ok(Some(ProvisionRequest {
            interconnect1_ip: first.ip,
            interconnect1_prefix: first.prefix,
            interconnect2_ip: second.ip,
            interconnect2_prefix: second.prefix,
            interconnect_port_id1: first.port_id,
            interconnect_port_id2: second.port_id,
            username: first.username,
            password: first.password,
            secret: first.secret,
        }))
    }

    /// Interconnect name and port cabled to a lab device port
    async fn connection(&self, device: &str, port: &str) -> LinkResult<(String, String)> {
        let missing = || LinkError::ConnectionNotFound {
            device: device.to_string(),
            port: port.to_string(),
        };
        let conn = self.store.get_connection(device, port).await?.ok_or_else(missing)?;
        let (name, ic_port) = conn.interconnect().ok_or_else(missing)?;
        Ok((name.to_string(), ic_port.to_string()))
    }

    async fn interconnect(&self, name: &str) -> LinkResult<Device> {
        self.store
            .get_device_by_name(name)
            .await?
            .filter(Device::is_interconnect)
            .ok_or_else(|| LinkError::InterconnectNotFound(name.to_string()))
    }

    /// Run one link operation against the interconnect API
    pub async fn execute(&self, pair: &LinkPair, op: LinkOp) -> LinkResult<()> {
        let Some(req) = self.resolve(pair).await? else {
            return Ok(());
        };

        let result = match op {
            LinkOp::Create => self.provisioner.create_link(&req).await,
            LinkOp::Delete => self.provisioner.clear_link(&req).await,
        };

        match result {
            Ok(resp) if resp.is_success() => Ok(()),
            Ok(resp) => {
                let message = if resp.message.is_empty() {
                    format!("interconnect API returned status {:?}", resp.status)
                } else {
                    resp.message
                };
                Err(LinkError::Provisioning(message))
            }
            Err(e) => Err(LinkError::Provisioning(e.to_string())),
        }
    }

    /// Single link operation; true when the link is in the requested state
    pub async fn perform(&self, pair: &LinkPair, op: LinkOp) -> bool {
        match self.execute(pair, op).await {
            Ok(()) => {
                tracing::info!("Link {} {} succeeded", op, pair);
                true
            }
            Err(e) => {
                tracing::warn!("Link {} {} failed: {}", op, pair, e);
                false
            }
        }
    }

    /// Run every pair concurrently; individual failures never stop the rest
    pub async fn perform_bulk(&self, pairs: &[LinkPair], op: LinkOp) -> BulkSummary {
        let results = join_all(pairs.iter().map(|pair| self.outcome(pair.clone(), op))).await;
        let summary = BulkSummary::from_results(results);
        tracing::info!(
            "Bulk link {} finished: numFailed={} numSucceeded={}",
            op,
            summary.num_failed,
            summary.num_succeeded
        );
        summary
    }

    async fn outcome(&self, pair: LinkPair, op: LinkOp) -> LinkOperationResult {
        match self.execute(&pair, op).await {
            Ok(()) => LinkOperationResult {
                pair,
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Link {} {} failed: {}", op, pair, e);
                LinkOperationResult {
                    pair,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn load_graph(&self, topology_id: i64) -> LinkResult<GraphDocument> {
        self.store
            .get_topology(topology_id)
            .await?
            .map(|t| t.graph)
            .ok_or(LinkError::TopologyNotFound(topology_id))
    }

    /// Create links and add them to a topology's graph.
    ///
    /// Each new edge is added as `pending` before dispatch, becomes `success`
    /// when the link comes up, and is removed again when it fails. A pair
    /// whose edge is already in the graph fails without being dispatched.
    pub async fn create_topology_links(&self, topology_id: i64, pairs: &[LinkPair]) -> LinkResult<TopologyLinkReport> {
        let mut graph = self.load_graph(topology_id).await?;

        let mut results: Vec<Option<LinkOperationResult>> = Vec::with_capacity(pairs.len());
        let mut dispatch: Vec<(usize, String, LinkPair)> = Vec::new();
        for (idx, pair) in pairs.iter().enumerate() {
            let source = graph.node_for_device(&pair.first_device).map(|n| n.id.clone());
            let target = graph.node_for_device(&pair.second_device).map(|n| n.id.clone());
            let (Some(source), Some(target)) = (source, target) else {
                results.push(Some(LinkOperationResult {
                    pair: pair.clone(),
                    success: false,
                    error: Some("device is not placed in this topology".to_string()),
                }));
                continue;
            };

            let edge = GraphEdge::new(&source, &pair.first_port, &target, &pair.second_port);
            let edge_id = edge.id.clone();
            if !graph.insert_edge(edge) {
                // Existing edges belong to an earlier request; never dispatch or remove them here
                tracing::warn!("Edge {} already present in topology {}", edge_id, topology_id);
                results.push(Some(LinkOperationResult {
                    pair: pair.clone(),
                    success: false,
                    error: Some("link already present in this topology".to_string()),
                }));
                continue;
            }
            graph.set_edge_status(&edge_id, EdgeStatus::Pending);
            results.push(None);
            dispatch.push((idx, edge_id, pair.clone()));
        }
        self.store.update_topology_graph(topology_id, &graph).await?;

        let outcomes = join_all(dispatch.iter().map(|(_, _, pair)| self.outcome(pair.clone(), LinkOp::Create))).await;

        let mut graph = self.load_graph(topology_id).await?;
        for ((idx, edge_id, _), outcome) in dispatch.iter().zip(outcomes) {
            if outcome.success {
                graph.set_edge_status(edge_id, EdgeStatus::Success);
            } else {
                graph.remove_edge(edge_id);
            }
            results[*idx] = Some(outcome);
        }

        self.finish(topology_id, graph, results.into_iter().flatten().collect()).await
    }

    /// Clear links and drop their edges from a topology's graph.
    ///
    /// Edges are marked `deleting` before dispatch; cleared edges are removed
    /// and edges whose link could not be cleared stay behind as `failed`.
    /// An empty `edge_ids` selects every edge.
    pub async fn delete_topology_links(&self, topology_id: i64, edge_ids: &[String]) -> LinkResult<TopologyLinkReport> {
        let mut graph = self.load_graph(topology_id).await?;

        let targets: Vec<String> = if edge_ids.is_empty() {
            graph.edges.iter().map(|e| e.id.clone()).collect()
        } else {
            edge_ids.to_vec()
        };

        let mut dispatch: Vec<(String, LinkPair)> = Vec::new();
        for edge_id in targets {
            let Some(edge) = graph.edge(&edge_id) else {
                tracing::warn!("Edge {} not found in topology {}", edge_id, topology_id);
                continue;
            };
            let pair = LinkPair::new(
                &graph.device_name_for(&edge.source),
                &edge.data.source_port,
                &graph.device_name_for(&edge.target),
                &edge.data.target_port,
            );
            graph.set_edge_status(&edge_id, EdgeStatus::Deleting);
            dispatch.push((edge_id, pair));
        }
        self.store.update_topology_graph(topology_id, &graph).await?;

        let outcomes = join_all(dispatch.iter().map(|(_, pair)| self.outcome(pair.clone(), LinkOp::Delete))).await;

        let mut graph = self.load_graph(topology_id).await?;
        for ((edge_id, _), outcome) in dispatch.iter().zip(outcomes.iter()) {
            if outcome.success {
                graph.remove_edge(edge_id);
            } else {
                graph.set_edge_status(edge_id, EdgeStatus::Failed);
            }
        }

        self.finish(topology_id, graph, outcomes).await
    }

    async fn finish(
        &self,
        topology_id: i64,
        graph: GraphDocument,
        results: Vec<LinkOperationResult>,
    ) -> LinkResult<TopologyLinkReport> {
        self.store.update_topology_graph(topology_id, &graph).await?;

        let summary = BulkSummary::from_results(results);
        tracing::info!(
            "Topology {} links updated: numFailed={} numSucceeded={}",
            topology_id,
            summary.num_failed,
            summary.num_succeeded
        );
        if let Some(hub) = &self.hub {
            hub.broadcast_topology_links(topology_id, &summary).await;
        }

        Ok(TopologyLinkReport {
            topology_id,
            layout: layout_document(&graph),
            summary,
            graph,
        })
    }
}

fn resolve_side(ic: &Device, port: &str) -> LinkResult<ResolvedSide> {
    let misconfigured = |field| LinkError::InterconnectMisconfigured {
        name: ic.name.clone(),
        field,
    };

    let device_number = ic.device_number.ok_or_else(|| misconfigured("device number"))?;
    let ip = ic
        .ip_address
        .clone()
        .filter(|ip| !ip.eq_ignore_ascii_case("none"))
        .ok_or_else(|| misconfigured("IP address"))?;
    let username = ic.username.clone().ok_or_else(|| misconfigured("username"))?;
    let password = ic.password.clone().ok_or_else(|| misconfigured("password"))?;
    let secret = ic.secret_password.clone().ok_or_else(|| misconfigured("secret"))?;

    let (prefix, _) = split_port(port).ok_or_else(|| LinkError::InvalidPort(port.to_string()))?;
    let port_id = port_offset(port, device_number).ok_or_else(|| LinkError::InvalidPort(port.to_string()))?;

    Ok(ResolvedSide {
        device_number,
        ip,
        prefix: prefix.to_string(),
        port_id,
        username,
        password,
        secret,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::models::fixtures;
    use crate::provisioning::ProvisionResponse;

    /// Provisioner that fails any request touching one of `fail_ports`
    #[derive(Default)]
    pub struct ScriptedProvisioner {
        pub fail_ports: HashSet<u32>,
        pub calls: Mutex<Vec<ProvisionRequest>>,
    }

    impl ScriptedProvisioner {
        pub fn failing(ports: &[u32]) -> Self {
            Self {
                fail_ports: ports.iter().copied().collect(),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn reply(&self, req: &ProvisionRequest) -> Result<ProvisionResponse> {
            self.calls.lock().unwrap().push(req.clone());
            if self.fail_ports.contains(&req.interconnect_port_id1)
                || self.fail_ports.contains(&req.interconnect_port_id2)
            {
                Ok(ProvisionResponse::error("port is down"))
            } else {
                Ok(ProvisionResponse::success())
            }
        }
    }

    #[async_trait]
    impl LinkProvisioner for ScriptedProvisioner {
        async fn create_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse> {
            self.reply(req)
        }

        async fn clear_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse> {
            self.reply(req)
        }
    }

    pub fn interconnect(name: &str, number: i32, ip: &str) -> CreateDeviceRequest {
        let mut req = CreateDeviceRequest::lab(name, "Gi1/0/|1-44");
        req.kind = DeviceKind::Interconnect;
        req.device_number = Some(number);
        req.ip_address = Some(ip.to_string());
        req.username = Some(format!("{}-user", name));
        req.password = Some("secret-pw".to_string());
        req.secret_password = Some("enable".to_string());
        req
    }

    /// Two interconnects and three lab devices r1..r3, each with Gi0/1 and
    /// Gi0/2 cabled:
    ///
    /// | lab port  | interconnect port | offset |
    /// |-----------|-------------------|--------|
    /// | r1 Gi0/1  | ic-1 Gi1/0/1      | 1      |
    /// | r1 Gi0/2  | ic-1 Gi1/0/2      | 2      |
    /// | r2 Gi0/1  | ic-2 Gi1/0/1      | 45     |
    /// | r2 Gi0/2  | ic-2 Gi1/0/2      | 46     |
    /// | r3 Gi0/1  | ic-1 Gi1/0/3      | 3      |
    /// | r3 Gi0/2  | ic-2 Gi1/0/3      | 47     |
    pub async fn seed_lab(store: &Store) -> Vec<Device> {
        store.create_device(&interconnect("ic-1", 1, "10.0.0.1")).await.unwrap();
        store.create_device(&interconnect("ic-2", 2, "10.0.0.2")).await.unwrap();

        let mut labs = Vec::new();
        for name in ["r1", "r2", "r3"] {
            labs.push(store.create_device(&CreateDeviceRequest::lab(name, "Gi0/|0-3")).await.unwrap());
        }

        let cabling = [
            ("r1", "Gi0/1", "ic-1", "Gi1/0/1"),
            ("r1", "Gi0/2", "ic-1", "Gi1/0/2"),
            ("r2", "Gi0/1", "ic-2", "Gi1/0/1"),
            ("r2", "Gi0/2", "ic-2", "Gi1/0/2"),
            ("r3", "Gi0/1", "ic-1", "Gi1/0/3"),
            ("r3", "Gi0/2", "ic-2", "Gi1/0/3"),
        ];
        for (lab, lab_port, ic, ic_port) in cabling {
            store
                .set_connection(&SetConnectionRequest::new(lab, lab_port, ic, ic_port))
                .await
                .unwrap();
        }
        labs
    }

    /// Topology for `owner` with one node per lab device (n1..n3)
    pub async fn seed_topology(store: &Store, owner: i64, labs: &[Device]) -> Topology {
        let topo = store
            .create_topology(owner, &CreateTopologyRequest { name: "lab".to_string(), expires_on: None })
            .await
            .unwrap();
        let mut graph = GraphDocument::default();
        for (i, d) in labs.iter().enumerate() {
            graph
                .nodes
                .push(fixtures::node(&format!("n{}", i + 1), d.id, &d.name, i as f64 * 100.0, 0.0));
        }
        store.update_topology_graph(topo.id, &graph).await.unwrap()
    }

    /// Graph edges for three live links: n1-n2 (1/45), n1-n3 (2/3), n2-n3 (46/47)
    pub fn three_edges() -> Vec<GraphEdge> {
        let mut edges = vec![
            GraphEdge::new("n1", "Gi0/1", "n2", "Gi0/1"),
            GraphEdge::new("n1", "Gi0/2", "n3", "Gi0/1"),
            GraphEdge::new("n2", "Gi0/2", "n3", "Gi0/2"),
        ];
        for e in &mut edges {
            e.data.status = Some(EdgeStatus::Success);
        }
        edges
    }
}
