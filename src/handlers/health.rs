use super::AppState;
use crate::models::HealthStatus;
use axum::{extract::State, Json};
use chrono::Utc;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let block_number = match state.chain.block_number().await {
        Ok(number) => Some(number),
        Err(e) => {
            tracing::warn!("Chain RPC health probe failed: {}", e);
            None
        }
    };

    let status = if block_number.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain_rpc: block_number.is_some(),
        block_number,
        uptime_seconds: state.analytics.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
