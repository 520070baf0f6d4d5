use super::AppState;
use crate::{
    error::GatewayError,
    models::{
        GenerationInput, GenerationResponse, ImageGenerationRequest, SpeechRequest,
        VideoGenerationRequest,
    },
    services::{Operation, PaymentProof, Quote},
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use std::time::Instant;

fn require_prompt(prompt: &str) -> Result<(), GatewayError> {
    if prompt.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("prompt must not be empty".to_string()));
    }
    Ok(())
}

/// Dispatch a request that has already been paid for.
async fn run_paid(
    state: &AppState,
    quote: Quote,
    proof: PaymentProof,
    input: GenerationInput,
) -> impl IntoResponse {
    let started = Instant::now();
    let results = state.dispatcher.run_all(&quote, &input).await;
    let run_time = started.elapsed().as_secs_f64();

    let response = GenerationResponse::new(results, quote.total_units, proof.tx_hash.to_string());

    tracing::info!(
        "Generation finished for {}: {}/{} models succeeded in {:.2}s",
        proof.tx_hash,
        response.successful,
        response.total_models,
        run_time
    );

    (
        [
            ("X-Cost", format!("{}", quote.total_usd)),
            ("X-Run-Time", format!("{:.3}", run_time)),
        ],
        Json(response),
    )
}

pub async fn generate_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ImageGenerationRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.analytics.record_request();
    require_prompt(&request.prompt)?;

    let quote = state.prices.quote(&Operation::Image {
        models: &request.models,
    })?;
    let proof = state.gate.charge(&headers, &quote, "/generate").await?;

    Ok(run_paid(&state, quote, proof, GenerationInput::from(&request)).await)
}

pub async fn generate_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VideoGenerationRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.analytics.record_request();
    require_prompt(&request.prompt)?;

    let quote = state.prices.quote(&Operation::Video {
        models: &request.models,
    })?;
    let proof = state.gate.charge(&headers, &quote, "/generate-video").await?;

    Ok(run_paid(&state, quote, proof, GenerationInput::from(&request)).await)
}

pub async fn generate_speech(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SpeechRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.analytics.record_request();

    let quote = state.prices.quote(&Operation::Speech {
        models: &request.models,
        text: &request.text,
    })?;
    let proof = state.gate.charge(&headers, &quote, "/generate-tts").await?;

    Ok(run_paid(&state, quote, proof, GenerationInput::from(&request)).await)
}
