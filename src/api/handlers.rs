//! Route handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::error::ApiError;
use super::models::{
    CommandRequest, CommandResponse, HealthResponse, RegisterBackend, SayRequest,
};
use crate::protocol::PlayerList;
use crate::proxy::{BackendStatus, RconProxy};

type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Register a backend; it is only kept if its first session opens
pub async fn create_backend(
    State(proxy): State<RconProxy>,
    Json(body): Json<RegisterBackend>,
) -> ApiResult<(StatusCode, Json<BackendStatus>)> {
    let descriptor = body.into_descriptor(proxy.dispatcher_config())?;
    let descriptor = proxy.register_backend(descriptor, true).await?;
    let status = proxy.status(&descriptor.name).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn list_backends(State(proxy): State<RconProxy>) -> Json<Vec<BackendStatus>> {
    Json(proxy.statuses().await)
}

pub async fn get_backend(
    State(proxy): State<RconProxy>,
    Path(name): Path<String>,
) -> ApiResult<Json<BackendStatus>> {
    Ok(Json(proxy.status(&name).await?))
}

pub async fn delete_backend(
    State(proxy): State<RconProxy>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    proxy.unregister_backend(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_command(
    State(proxy): State<RconProxy>,
    Path(name): Path<String>,
    Json(body): Json<CommandRequest>,
) -> ApiResult<Json<CommandResponse>> {
    let response = proxy.execute(&name, body.command).await?;
    Ok(Json(CommandResponse { response }))
}

pub async fn players(
    State(proxy): State<RconProxy>,
    Path(name): Path<String>,
) -> ApiResult<Json<PlayerList>> {
    Ok(Json(proxy.players(&name).await?))
}

pub async fn say(
    State(proxy): State<RconProxy>,
    Path(name): Path<String>,
    Json(body): Json<SayRequest>,
) -> ApiResult<Json<CommandResponse>> {
    let response = proxy.say(&name, &body.message).await?;
    Ok(Json(CommandResponse { response }))
}
