pub mod generate;
pub mod health;
pub mod info;
pub mod stats;

pub use generate::*;
pub use health::*;
pub use info::*;
pub use stats::*;

use crate::{
    dispatch::Dispatcher,
    middleware::PaymentGate,
    services::{Analytics, ChainClient, PriceTable},
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<PaymentGate>,
    pub prices: Arc<PriceTable>,
    pub dispatcher: Arc<Dispatcher>,
    pub chain: Arc<dyn ChainClient>,
    pub analytics: Arc<Analytics>,
    pub chain_id: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public endpoints
        .route("/", get(gateway_info))
        .route("/models", get(list_image_models))
        .route("/video-models", get(list_video_models))
        .route("/tts-models", get(list_speech_models))
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        // Paid endpoints
        .route("/generate", post(generate_image))
        .route("/generate-video", post(generate_video))
        .route("/generate-tts", post(generate_speech))
        .with_state(state)
}
