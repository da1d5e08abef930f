//! ThirdLayer 指标上报端点
//!
//! 启动: cargo run --bin thirdlayer-web --features web
//! 浏览器访问 http://127.0.0.1:8000
//!
//! 只读薄壳：直接读 SQLite 里的转移表与操作日志，不参与决策。

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use thirdlayer::config::load_config;
use thirdlayer::storage::{TransitionRow, TransitionStore};
use thirdlayer::AgentError;

struct AppState {
    store: TransitionStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    thirdlayer::observability::init();

    let cfg = load_config(None)?;
    let store = TransitionStore::open(cfg.app.db_path())?;
    tracing::info!("Serving metrics for {}", store.db_path());

    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/", get(index))
        .route("/metrics", get(api_metrics))
        .route("/transitions/top", get(api_top_transitions))
        .with_state(Arc::clone(&state));

    let port = std::env::var("THIRDLAYER_WEB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(cfg.web.port);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ThirdLayer metrics endpoint: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /：服务说明与端点列表
async fn index() -> Json<Value> {
    Json(json!({
        "service": "ThirdLayer",
        "description": "Agentic browser workflow predictor",
        "endpoints": ["/metrics", "/transitions/top?k=10"],
    }))
}

/// GET /metrics：学习进度快照
async fn api_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let total = state.store.total_transition_count().map_err(internal)?;
    let recent = state.store.recent_actions(5).map_err(internal)?;
    Ok(Json(json!({
        "total_transitions_learned": total,
        "recent_actions_count": recent.len(),
        "database_path": state.store.db_path(),
    })))
}

#[derive(Deserialize)]
struct TopQuery {
    k: Option<usize>,
}

/// GET /transitions/top?k=10：计数最高的转移
async fn api_top_transitions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TransitionRow>>, (StatusCode, String)> {
    let k = query.k.unwrap_or(10);
    let rows = state.store.top_transitions(k).map_err(internal)?;
    Ok(Json(rows))
}

fn internal(e: AgentError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
