use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // Device routes
        .route("/api/devices", get(handlers::devices::list_devices))
        .route("/api/devices", post(handlers::devices::create_device))
        .route("/api/devices/:id", get(handlers::devices::get_device))
        .route("/api/devices/:id", delete(handlers::devices::delete_device))
        .route("/api/devices/:id/book", put(handlers::devices::book_device))
        .route("/api/devices/:id/unbook", put(handlers::devices::unbook_device))
        .route("/api/devices/:id/connections", get(handlers::devices::list_device_connections))
        // Connection routes
        .route("/api/connections", get(handlers::devices::list_connections))
        .route("/api/connections", put(handlers::devices::set_connection))
        .route("/api/connections/:id", delete(handlers::devices::delete_connection))
        // Link routes
        .route("/api/links", post(handlers::links::create_link))
        .route("/api/links", delete(handlers::links::delete_link))
        .route("/api/links/bulk", post(handlers::links::create_links_bulk))
        .route("/api/links/bulk-delete", post(handlers::links::delete_links_bulk))
        // Topology routes
        .route("/api/topologies", get(handlers::topologies::list_topologies))
        .route("/api/topologies", post(handlers::topologies::create_topology))
        .route("/api/topologies/:id", get(handlers::topologies::get_topology))
        .route("/api/topologies/:id", delete(handlers::topologies::delete_topology))
        .route("/api/topologies/:id/graph", put(handlers::topologies::save_graph))
        .route("/api/topologies/:id/layout", get(handlers::topologies::get_layout))
        .route("/api/topologies/:id/links", post(handlers::topologies::create_links))
        .route("/api/topologies/:id/links/delete", post(handlers::topologies::delete_links))
        .route("/api/topologies/:id/archive", post(handlers::topologies::archive_topology))
        .route("/api/topologies/:id/unarchive", post(handlers::topologies::unarchive_topology))
        // WebSocket route
        .route("/api/ws", get(crate::ws_upgrade_handler))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::Store;
    use crate::links::testing::ScriptedProvisioner;
    use crate::models::{AccountType, Claims, CreateDeviceRequest};

    const SECRET: &str = "test-secret";

    async fn app() -> (Router, Store) {
        let store = Store::in_memory().await.unwrap();
        let config = Config {
            jwt_secret: SECRET.to_string(),
            ..Config::default()
        };
        let state = Arc::new(AppState::new(
            store.clone(),
            config,
            None,
            Arc::new(ScriptedProvisioner::default()),
        ));
        (build(state), store)
    }

    fn token(user_id: i64) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            username: format!("user{}", user_id),
            account_type: AccountType::User,
            exp: now + 3600,
            iat: now,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn put(uri: &str, user_id: i64) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("authorization", format!("Bearer {}", token(user_id)))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = app().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_routes_require_token() {
        let (app, _) = app().await;
        let resp = app
            .oneshot(Request::builder().uri("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_book_and_unbook_over_http() {
        let (app, store) = app().await;
        let device = store
            .create_device(&CreateDeviceRequest::lab("r1", ""))
            .await
            .unwrap();
        let book = format!("/api/devices/{}/book", device.id);
        let unbook = format!("/api/devices/{}/unbook", device.id);

        let resp = app.clone().oneshot(put(&book, 1)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["booking_holder"], 1);

        let resp = app.clone().oneshot(put(&book, 2)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = app.clone().oneshot(put(&unbook, 2)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app.oneshot(put(&unbook, 1)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
