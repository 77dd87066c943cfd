mod connections;
mod devices;
pub(crate) mod row_helpers;
mod topologies;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;

pub use connections::ConnectionRepo;
pub use devices::{DeviceRepo, HolderUpdate};
pub use topologies::TopologyRepo;

/// Typed error for "resource not found", recoverable via downcast
/// in the API error handler instead of fragile string matching.
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Typed error for writes rejected by a uniqueness or range rule
#[derive(Debug)]
pub struct ConflictError {
    pub message: String,
}

impl ConflictError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConflictError {}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = if db_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", db_path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database; a single connection so every query sees the same data
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_size(":memory:", 1).await
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== Device Operations ==========

    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        DeviceRepo::list(&self.pool).await
    }

    pub async fn list_devices_by_kind(&self, kind: DeviceKind) -> Result<Vec<Device>> {
        DeviceRepo::list_by_kind(&self.pool, kind).await
    }

    pub async fn get_device(&self, id: i64) -> Result<Option<Device>> {
        DeviceRepo::get(&self.pool, id).await
    }

    pub async fn get_device_by_name(&self, name: &str) -> Result<Option<Device>> {
        DeviceRepo::get_by_name(&self.pool, name).await
    }

    pub async fn create_device(&self, req: &CreateDeviceRequest) -> Result<Device> {
        if self.get_device_by_name(&req.name).await?.is_some() {
            return Err(ConflictError::new(format!("Device with name {} already exists", req.name)).into());
        }
        DeviceRepo::create(&self.pool, req).await
    }

    pub async fn delete_device(&self, id: i64) -> Result<()> {
        DeviceRepo::delete(&self.pool, id).await
    }

    pub async fn book_device(&self, id: i64, user_id: i64) -> Result<HolderUpdate> {
        DeviceRepo::book(&self.pool, id, user_id).await
    }

    pub async fn unbook_device(&self, id: i64, user_id: i64, force: bool) -> Result<HolderUpdate> {
        DeviceRepo::unbook(&self.pool, id, user_id, force).await
    }

    // ========== Connection Operations ==========

    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        ConnectionRepo::list(&self.pool).await
    }

    pub async fn list_connections_for_device(&self, lab_device_name: &str) -> Result<Vec<Connection>> {
        ConnectionRepo::list_for_lab_device(&self.pool, lab_device_name).await
    }

    pub async fn get_connection(&self, lab_device_name: &str, lab_device_port: &str) -> Result<Option<Connection>> {
        ConnectionRepo::get_by_lab_port(&self.pool, lab_device_name, lab_device_port).await
    }

    /// Record which interconnect port a lab device port is cabled to
    pub async fn set_connection(&self, req: &SetConnectionRequest) -> Result<Connection> {
        let lab = self
            .get_device_by_name(&req.lab_device_name)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", &req.lab_device_name))?;
        if !lab.has_port(&req.lab_device_port) {
            return Err(NotFoundError::new("Port", &format!("{} {}", lab.name, req.lab_device_port)).into());
        }
        ConnectionRepo::set(&self.pool, req).await
    }

    pub async fn delete_connection(&self, id: i64) -> Result<()> {
        ConnectionRepo::delete(&self.pool, id).await
    }

    // ========== Topology Operations ==========

    pub async fn list_topologies_for_owner(&self, owner_id: i64, archived: bool) -> Result<Vec<Topology>> {
        TopologyRepo::list_for_owner(&self.pool, owner_id, archived).await
    }

    pub async fn list_all_topologies(&self, archived: bool) -> Result<Vec<Topology>> {
        TopologyRepo::list_all(&self.pool, archived).await
    }

    pub async fn get_topology(&self, id: i64) -> Result<Option<Topology>> {
        TopologyRepo::get(&self.pool, id).await
    }

    pub async fn create_topology(&self, owner_id: i64, req: &CreateTopologyRequest) -> Result<Topology> {
        TopologyRepo::create(&self.pool, owner_id, req).await
    }

    pub async fn update_topology_graph(&self, id: i64, graph: &GraphDocument) -> Result<Topology> {
        TopologyRepo::update_graph(&self.pool, id, graph).await
    }

    pub async fn set_topology_archived(&self, id: i64, archived: bool) -> Result<Topology> {
        TopologyRepo::set_archived(&self.pool, id, archived).await
    }

    pub async fn delete_topology(&self, id: i64) -> Result<()> {
        TopologyRepo::delete(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_device() -> (Store, Device) {
        let store = Store::in_memory().await.unwrap();
        let device = store
            .create_device(&CreateDeviceRequest::lab("lab-1", "Gi0/|0-3"))
            .await
            .unwrap();
        (store, device)
    }

    #[tokio::test]
    async fn test_book_is_exclusive_and_idempotent() {
        let (store, device) = store_with_device().await;

        match store.book_device(device.id, 7).await.unwrap() {
            HolderUpdate::Applied(d) => assert_eq!(d.booking_holder, Some(7)),
            other => panic!("expected Applied, got {:?}", other),
        }
        // Same holder again returns the stored row untouched
        let booked = store.get_device(device.id).await.unwrap().unwrap();
        match store.book_device(device.id, 7).await.unwrap() {
            HolderUpdate::Unchanged(d) => {
                assert_eq!(d.booking_holder, Some(7));
                assert_eq!(d.updated_at, booked.updated_at);
            }
            other => panic!("expected Unchanged, got {:?}", other),
        }

        match store.book_device(device.id, 8).await.unwrap() {
            HolderUpdate::Rejected(d) => assert_eq!(d.booking_holder, Some(7)),
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert!(matches!(store.book_device(999, 7).await.unwrap(), HolderUpdate::Missing));
    }

    #[tokio::test]
    async fn test_unbook_requires_holder_unless_forced() {
        let (store, device) = store_with_device().await;
        store.book_device(device.id, 7).await.unwrap();

        assert!(matches!(store.unbook_device(device.id, 8, false).await.unwrap(), HolderUpdate::Rejected(_)));
        match store.unbook_device(device.id, 8, true).await.unwrap() {
            HolderUpdate::Applied(d) => assert_eq!(d.booking_holder, None),
            other => panic!("expected Applied, got {:?}", other),
        }
        // Already free
        assert!(matches!(store.unbook_device(device.id, 7, false).await.unwrap(), HolderUpdate::Rejected(_)));
    }

    #[tokio::test]
    async fn test_device_number_rules() {
        let store = Store::in_memory().await.unwrap();
        let mut req = CreateDeviceRequest::lab("ic-1", "Gi1/0/|1-48");
        req.kind = DeviceKind::Interconnect;
        req.device_number = Some(1);
        store.create_device(&req).await.unwrap();

        req.name = "ic-2".to_string();
        let err = store.create_device(&req).await.unwrap_err();
        assert!(err.downcast_ref::<ConflictError>().is_some());

        req.device_number = Some(3);
        let err = store.create_device(&req).await.unwrap_err();
        assert!(err.downcast_ref::<ConflictError>().is_some());

        let mut lab = CreateDeviceRequest::lab("lab-9", "");
        lab.device_number = Some(2);
        let err = store.create_device(&lab).await.unwrap_err();
        assert!(err.downcast_ref::<ConflictError>().is_some());
    }

    #[tokio::test]
    async fn test_at_most_two_numbered_interconnects() {
        let store = Store::in_memory().await.unwrap();
        let interconnect = |name: &str, number: Option<i32>| {
            let mut req = CreateDeviceRequest::lab(name, "Gi1/0/|1-44");
            req.kind = DeviceKind::Interconnect;
            req.device_number = number;
            req
        };

        store.create_device(&interconnect("ic-1", Some(1))).await.unwrap();
        store.create_device(&interconnect("ic-2", Some(2))).await.unwrap();
        for (name, number) in [("ic-3", None), ("ic-4", None), ("ic-5", Some(1))] {
            let err = store.create_device(&interconnect(name, number)).await.unwrap_err();
            assert!(err.downcast_ref::<ConflictError>().is_some(), "{} accepted", name);
        }

        let stored = store.list_devices_by_kind(DeviceKind::Interconnect).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_set_connection_upserts() {
        let (store, _) = store_with_device().await;
        store
            .set_connection(&SetConnectionRequest::new("lab-1", "Gi0/1", "ic-1", "Gi1/0/12"))
            .await
            .unwrap();
        store
            .set_connection(&SetConnectionRequest::new("lab-1", "Gi0/1", "ic-2", "Gi1/0/5"))
            .await
            .unwrap();

        let conn = store.get_connection("lab-1", "Gi0/1").await.unwrap().unwrap();
        assert_eq!(conn.interconnect(), Some(("ic-2", "Gi1/0/5")));
        assert_eq!(store.list_connections().await.unwrap().len(), 1);

        let err = store
            .set_connection(&SetConnectionRequest::new("lab-1", "Gi0/9", "ic-1", "Gi1/0/1"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_topology_graph_persists() {
        let store = Store::in_memory().await.unwrap();
        let topo = store
            .create_topology(3, &CreateTopologyRequest { name: "core".to_string(), expires_on: None })
            .await
            .unwrap();
        assert!(topo.graph.nodes.is_empty());

        let mut graph = GraphDocument::default();
        graph.nodes.push(crate::models::fixtures::node("n1", 1, "lab-1", 0.0, 0.0));
        store.update_topology_graph(topo.id, &graph).await.unwrap();

        let reloaded = store.get_topology(topo.id).await.unwrap().unwrap();
        assert_eq!(reloaded.graph.nodes.len(), 1);
        assert_eq!(store.list_topologies_for_owner(3, false).await.unwrap().len(), 1);

        store.set_topology_archived(topo.id, true).await.unwrap();
        assert!(store.list_topologies_for_owner(3, false).await.unwrap().is_empty());
        assert_eq!(store.list_topologies_for_owner(3, true).await.unwrap().len(), 1);
    }
}
