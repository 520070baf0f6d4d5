use super::AppState;
use crate::dispatch::ModelCatalog;
use crate::middleware::PAYMENT_HEADER;
use crate::models::{GatewayInfo, ModelInfo, ModelListing, PaymentInfo};
use crate::services::pricing::TOKEN_DECIMALS;
use axum::{extract::State, Json};
use std::collections::BTreeMap;

pub async fn gateway_info(State(state): State<AppState>) -> Json<GatewayInfo> {
    let settings = state.gate.verifier().settings();

    Json(GatewayInfo {
        message: "x402 Payment Gateway Running".to_string(),
        payment_info: PaymentInfo {
            currency: "USDC".to_string(),
            chain_id: state.chain_id,
            contract: format!("{:?}", settings.token_contract),
            receiver: format!("{:?}", settings.receiving_address),
            decimals: TOKEN_DECIMALS,
            header: PAYMENT_HEADER.to_string(),
        },
    })
}

fn identifier(catalog: &ModelCatalog, name: &str) -> String {
    catalog
        .get(name)
        .map(|entry| entry.model_ref.as_str().to_string())
        .unwrap_or_default()
}

fn listing(available_models: BTreeMap<String, ModelInfo>) -> Json<ModelListing> {
    Json(ModelListing {
        total_models: available_models.len(),
        available_models,
    })
}

pub async fn list_image_models(State(state): State<AppState>) -> Json<ModelListing> {
    let catalog = state.dispatcher.catalog();
    listing(
        state
            .prices
            .image
            .iter()
            .map(|(name, price)| {
                let info = ModelInfo {
                    cost_usd: Some(price.cost_usd),
                    cost_per_1000_chars: None,
                    identifier: identifier(catalog, name),
                };
                (name.clone(), info)
            })
            .collect(),
    )
}

pub async fn list_video_models(State(state): State<AppState>) -> Json<ModelListing> {
    let catalog = state.dispatcher.catalog();
    listing(
        state
            .prices
            .video
            .iter()
            .map(|(name, price)| {
                let info = ModelInfo {
                    cost_usd: Some(price.cost_usd),
                    cost_per_1000_chars: None,
                    identifier: identifier(catalog, name),
                };
                (name.clone(), info)
            })
            .collect(),
    )
}

pub async fn list_speech_models(State(state): State<AppState>) -> Json<ModelListing> {
    let catalog = state.dispatcher.catalog();
    listing(
        state
            .prices
            .speech
            .iter()
            .map(|(name, price)| {
                let info = ModelInfo {
                    cost_usd: None,
                    cost_per_1000_chars: Some(price.cost_per_1000_chars),
                    identifier: identifier(catalog, name),
                };
                (name.clone(), info)
            })
            .collect(),
    )
}
