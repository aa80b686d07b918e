// FICHIER : src-server/src/api/http.rs

//! Liaison HTTP (axum) : un seul point d'accès `/api/data?action=&type=`.

use super::request::{ApiRequest, ApiResponse, UNKNOWN_CALLER};
use crate::datasets::Engine;
use crate::utils::error::{AnyResult, Context};
use crate::utils::AppError;
use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Taille maximale acceptée pour un corps de requête.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct DataQuery {
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "type")]
    dataset: Option<String>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/data", any(data_handler))
        .route("/health", get(health))
        .with_state(engine)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Démarre le serveur et bloque jusqu'à Ctrl+C.
pub async fn serve(engine: Arc<Engine>, bind_addr: &str) -> AnyResult<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Impossible d'écouter sur {bind_addr}"))?;
    info!("🌍 API SAFD en écoute sur http://{}/api/data", listener.local_addr()?);

    axum::serve(
        listener,
        router(engine).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Serveur HTTP interrompu")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Arrêt demandé, fermeture du serveur");
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn data_handler(State(engine): State<Arc<Engine>>, req: Request) -> Response {
    let query = Query::<DataQuery>::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();
    let method = req.method().as_str().to_string();
    let caller = caller_address(&req);

    let body = match to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let err = AppError::InvalidRequestBody("request body unreadable".to_string());
            return into_http(ApiResponse::from_error(&err));
        }
    };

    let mut api_req = ApiRequest::new(method, query.action.unwrap_or_default()).with_caller(caller);
    api_req.dataset = query.dataset;
    if !body.is_empty() {
        api_req.body = Some(body.to_vec());
    }

    into_http(engine.handle(&api_req).await)
}

/// Pair TCP, sinon premier `X-Forwarded-For`, sinon "unknown".
fn caller_address(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_for(req.headers()).unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn into_http(resp: ApiResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp.body)).into_response()
}
