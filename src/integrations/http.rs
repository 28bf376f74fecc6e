//! HTTP 前端：/api/browser/*
//!
//! 请求体先按 `serde_json::Value` 取出再逐字段校验，以便给出和字段对应的 400 错误信息。

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::core::AgentError;
use crate::gateway::SessionRegistry;

type ApiResponse = (StatusCode, Json<Value>);

pub struct HttpState {
    pub registry: Arc<SessionRegistry>,
}

pub fn create_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/api/browser/interact", post(interact))
        .route("/api/browser/reset", post(reset))
        .route("/api/browser/close", post(close))
        .route("/api/browser/cleanup", post(cleanup))
        .route("/api/browser/status", get(status))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

fn error(code: StatusCode, message: impl Into<String>) -> ApiResponse {
    (
        code,
        Json(json!({ "status": "error", "message": message.into() })),
    )
}

fn ok(message: impl Into<String>) -> ApiResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "message": message.into() })),
    )
}

fn agent_error(e: AgentError) -> ApiResponse {
    let code = match &e {
        AgentError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match e {
        AgentError::SessionNotFound(_) => "Session not found".to_string(),
        other => other.to_string(),
    };
    error(code, message)
}

/// 请求体必须是 JSON 对象
fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiResponse> {
    match payload {
        Ok(Json(value)) if value.is_object() => Ok(value),
        _ => Err(error(StatusCode::BAD_REQUEST, "Request body is required")),
    }
}

/// 非空字符串字段
fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, ApiResponse> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, format!("{field} is required")))
}

/// max_turns 可为整数或整数字符串；缺省为 None（沿用会话当前值）
pub(crate) fn parse_max_turns(value: Option<&Value>) -> Result<Option<usize>, String> {
    let raw = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    let n = raw.ok_or_else(|| "max_turns must be a valid integer".to_string())?;
    if n < 1 {
        return Err("max_turns must be at least 1".to_string());
    }
    Ok(Some(n as usize))
}

async fn interact(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let body = match body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let session_id = match required_str(&body, "session_id") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let command = match required_str(&body, "command") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let max_turns = match parse_max_turns(body.get("max_turns")) {
        Ok(n) => n,
        Err(msg) => return error(StatusCode::BAD_REQUEST, msg),
    };

    tracing::info!(session_id, "interact request");
    let result = state
        .registry
        .interact(session_id, command, max_turns)
        .await;
    match serde_json::to_value(&result) {
        Ok(value) => (StatusCode::OK, Json(value)),
        Err(e) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing command: {e}"),
        ),
    }
}

async fn reset(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let body = match body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let session_id = match required_str(&body, "session_id") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let close_browser = body
        .get("close_browser")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match state.registry.reset(session_id, close_browser).await {
        Ok(message) => ok(message),
        Err(e) => agent_error(e),
    }
}

async fn close(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let body = match body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let session_id = match required_str(&body, "session_id") {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match state.registry.close(session_id).await {
        Ok(()) => ok("Session closed."),
        Err(e) => agent_error(e),
    }
}

/// 空体、缺省或空列表都表示关闭全部会话
async fn cleanup(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let ids: Vec<String> = payload
        .ok()
        .and_then(|Json(v)| v.get("session_ids").cloned())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let cleaned = if ids.is_empty() {
        state.registry.close_all().await
    } else {
        state.registry.bulk_close(Some(&ids)).await
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": format!("Cleaned up {} sessions", cleaned.len()),
            "cleaned_sessions": cleaned,
        })),
    )
}

async fn status(State(state): State<Arc<HttpState>>) -> ApiResponse {
    let sessions = state.registry.status().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "active_sessions": sessions,
        })),
    )
}
