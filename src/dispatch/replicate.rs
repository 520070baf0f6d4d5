//! Replicate HTTP API backend.

use crate::dispatch::catalog::ModelRef;
use crate::dispatch::output::GenerationOutput;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Prediction {status}: {message}")]
    PredictionFailed { status: String, message: String },

    #[error("Unrecognised prediction output: {0}")]
    InvalidOutput(String),

    #[error("Prediction did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Model not dispatchable: {0}")]
    UnknownModel(String),
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one model to completion and return its output.
    async fn run(&self, model: &ModelRef, input: Value) -> Result<GenerationOutput, DispatchError>;
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "succeeded" | "failed" | "canceled" | "aborted"
        )
    }
}

pub struct ReplicateBackend {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReplicateBackend {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            timeout,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn create_target(&self, model: &ModelRef, input: Value) -> (String, Value) {
        match model {
            ModelRef::Version(reference) => {
                let version = reference
                    .split_once(':')
                    .map(|(_, version)| version)
                    .unwrap_or(reference.as_str());
                (
                    format!("{}/predictions", self.base_url),
                    json!({ "version": version, "input": input }),
                )
            }
            ModelRef::Identifier(identifier) => (
                format!("{}/models/{}/predictions", self.base_url, identifier),
                json!({ "input": input }),
            ),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Prediction, DispatchError> {
        let response = request.bearer_auth(&self.api_token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn run_to_completion(
        &self,
        model: &ModelRef,
        input: Value,
    ) -> Result<GenerationOutput, DispatchError> {
        let (url, body) = self.create_target(model, input);
        let mut prediction = self
            .send(self.client.post(&url).header("Prefer", "wait").json(&body))
            .await?;

        tracing::debug!(
            "Prediction {:?} for {} created with status {}",
            prediction.id,
            model.as_str(),
            prediction.status
        );

        while !prediction.is_terminal() {
            let poll_url = match (&prediction.urls, &prediction.id) {
                (Some(PredictionUrls { get: Some(get) }), _) => get.clone(),
                (_, Some(id)) => format!("{}/predictions/{}", self.base_url, id),
                _ => {
                    return Err(DispatchError::InvalidOutput(
                        "pending prediction without id".to_string(),
                    ))
                }
            };

            tokio::time::sleep(self.poll_interval).await;
            prediction = self.send(self.client.get(&poll_url)).await?;
        }

        if prediction.status != "succeeded" {
            let message = match prediction.error {
                Value::Null => "no error message".to_string(),
                Value::String(message) => message,
                other => other.to_string(),
            };
            return Err(DispatchError::PredictionFailed {
                status: prediction.status,
                message,
            });
        }

        serde_json::from_value(prediction.output.clone())
            .map_err(|_| DispatchError::InvalidOutput(prediction.output.to_string()))
    }
}

#[async_trait]
impl GenerationBackend for ReplicateBackend {
    async fn run(&self, model: &ModelRef, input: Value) -> Result<GenerationOutput, DispatchError> {
        tokio::time::timeout(self.timeout, self.run_to_completion(model, input))
            .await
            .map_err(|_| DispatchError::Timeout(self.timeout))?
    }
}
