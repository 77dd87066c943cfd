use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::models::{BulkSummary, Device};

/// Event types for WebSocket messages
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BookDevice,
    UnbookDevice,
    TopologyLinksChanged,
}

/// WebSocket event message
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

/// Payload for booking events
#[derive(Debug, Clone, Serialize)]
pub struct DevicePayload<'a> {
    pub device: &'a Device,
}

/// Payload for topology link changes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyLinksPayload<'a> {
    pub topology_id: i64,
    pub summary: &'a BulkSummary,
}

/// WebSocket hub manages connections and broadcasts events
pub struct Hub {
    tx: broadcast::Sender<String>,
    client_count: Arc<RwLock<usize>>,
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            client_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Broadcast an event to all connected clients
    pub async fn broadcast_event(&self, event: Event) {
        let data = match serde_json::to_string(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error serializing WebSocket event: {}", e);
                return;
            }
        };

        let count = *self.client_count.read().await;
        if count > 0 {
            if let Err(e) = self.tx.send(data) {
                tracing::warn!("Error broadcasting WebSocket event: {}", e);
            } else {
                tracing::debug!("Broadcasting {:?} to {} clients", event.event_type, count);
            }
        }
    }

    /// Broadcast that a device was booked
    pub async fn broadcast_device_booked(&self, device: &Device) {
        self.broadcast_device(EventType::BookDevice, device).await;
    }

    /// Broadcast that a device was released
    pub async fn broadcast_device_unbooked(&self, device: &Device) {
        self.broadcast_device(EventType::UnbookDevice, device).await;
    }

    async fn broadcast_device(&self, event_type: EventType, device: &Device) {
        self.broadcast_event(Event {
            event_type,
            payload: serde_json::to_value(DevicePayload { device }).unwrap_or_default(),
        })
        .await;
    }

    /// Broadcast the outcome of a topology-scoped link operation
    pub async fn broadcast_topology_links(&self, topology_id: i64, summary: &BulkSummary) {
        self.broadcast_event(Event {
            event_type: EventType::TopologyLinksChanged,
            payload: serde_json::to_value(TopologyLinksPayload { topology_id, summary })
                .unwrap_or_default(),
        })
        .await;
    }

    /// Get the number of connected clients
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Subscribe to events
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub(crate) async fn increment_clients(&self) {
        let mut count = self.client_count.write().await;
        *count += 1;
        tracing::info!("WebSocket client connected. Total clients: {}", *count);
    }

    async fn decrement_clients(&self) {
        let mut count = self.client_count.write().await;
        *count = count.saturating_sub(1);
        tracing::info!("WebSocket client disconnected. Total clients: {}", *count);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for axum
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<Hub>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sender, mut receiver) = socket.split();

    hub.increment_clients().await;

    // Subscribe to broadcast events
    let mut rx = hub.subscribe();

    // Task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Task to receive messages from client (just to keep connection alive)
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    hub.decrement_clients().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.increment_clients().await;

        let summary = BulkSummary::from_results(Vec::new());
        hub.broadcast_topology_links(4, &summary).await;

        let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["type"], "topology_links_changed");
        assert_eq!(msg["payload"]["topologyId"], 4);
        assert_eq!(msg["payload"]["summary"]["numFailed"], 0);
    }

    #[test]
    fn test_broadcast_without_clients_is_dropped() {
        tokio_test::block_on(async {
            let hub = Hub::new();
            let mut rx = hub.subscribe();
            hub.broadcast_topology_links(1, &BulkSummary::default()).await;
            assert!(rx.try_recv().is_err());
            assert_eq!(hub.client_count().await, 0);
        });
    }
}
