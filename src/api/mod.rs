//! Management HTTP API
//!
//! Thin axum layer over [`RconProxy`]: each handler makes one facade call
//! and renders the result as JSON. Failures become `{error, detail}` bodies
//! (see [`ApiError`]).

mod error;
mod handlers;
mod models;

pub use error::ApiError;
pub use models::{CommandRequest, CommandResponse, HealthResponse, RegisterBackend, SayRequest};

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::proxy::RconProxy;

/// All management routes, sharing one proxy
pub fn router(proxy: RconProxy) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/backends",
            post(handlers::create_backend).get(handlers::list_backends),
        )
        .route(
            "/backends/:name",
            get(handlers::get_backend).delete(handlers::delete_backend),
        )
        .route("/backends/:name/command", post(handlers::send_command))
        .route("/backends/:name/players", get(handlers::players))
        .route("/backends/:name/say", post(handlers::say))
        .with_state(proxy)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::{MockRcon, PASSWORD};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app() -> (RconProxy, Router) {
        let proxy = RconProxy::new(Config::default()).await.unwrap();
        (proxy.clone(), router(proxy))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn register_body(mock: &MockRcon, name: &str, password: &str) -> Value {
        json!({
            "name": name,
            "host": "127.0.0.1",
            "port": mock.port,
            "credential": password,
            "description": "test server",
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (_, app) = app().await;
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_backend_lifecycle() {
        let mock = MockRcon::with_reply(|cmd| {
            Some(match cmd {
                "list" => "There are 2 of a max of 20 players online: alice, bob".to_string(),
                other => format!("ran {}", other),
            })
        })
        .await;
        let (_, app) = app().await;

        let (status, body) = call(
            &app,
            "POST",
            "/backends",
            Some(register_body(&mock, "lobby", PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "lobby");
        assert_eq!(body["status"], "online");
        assert_eq!(body["onlineCount"], 2);

        let (status, body) = call(&app, "GET", "/backends", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["description"], "test server");

        let (status, body) = call(
            &app,
            "POST",
            "/backends/lobby/command",
            Some(json!({"command": "time query daytime"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "ran time query daytime");

        let (status, body) = call(&app, "GET", "/backends/lobby/players", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["players"], json!(["alice", "bob"]));
        assert_eq!(body["max"], 20);

        let (status, body) = call(
            &app,
            "POST",
            "/backends/lobby/say",
            Some(json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "ran say hi");

        let (status, _) = call(&app, "DELETE", "/backends/lobby", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, "GET", "/backends/lobby", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UnknownBackend");
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let mock = MockRcon::echo().await;
        let (_, app) = app().await;
        let body = register_body(&mock, "lobby", PASSWORD);

        let (status, _) = call(&app, "POST", "/backends", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(&app, "POST", "/backends", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "DuplicateName");
    }

    #[tokio::test]
    async fn test_failed_connect_not_kept() {
        let mock = MockRcon::echo().await;
        let (proxy, app) = app().await;

        let (status, body) = call(
            &app,
            "POST",
            "/backends",
            Some(register_body(&mock, "lobby", "wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "AuthFailed");
        assert!(proxy.list().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_descriptor() {
        let (_, app) = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/backends",
            Some(json!({"name": "a", "host": "h", "port": 0, "credential": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidDescriptor");
    }

    #[tokio::test]
    async fn test_command_to_unknown_backend() {
        let (_, app) = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/backends/ghost/command",
            Some(json!({"command": "list"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UnknownBackend");
    }

    #[tokio::test]
    async fn test_empty_command_is_protocol_error() {
        let mock = MockRcon::echo().await;
        let (_, app) = app().await;
        call(
            &app,
            "POST",
            "/backends",
            Some(register_body(&mock, "lobby", PASSWORD)),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/backends/lobby/command",
            Some(json!({"command": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "ProtocolError");
    }
}
