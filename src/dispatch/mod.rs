//! Generation dispatch: runs paid requests against the model provider.

pub mod catalog;
pub mod output;
pub mod replicate;

pub use catalog::{ModelCatalog, ModelKind, ModelRef};
pub use output::{FileRef, GenerationOutput};
pub use replicate::{DispatchError, GenerationBackend, ReplicateBackend};

use crate::models::{GenerationInput, GenerationResult, ResultStatus};
use crate::services::pricing::{Quote, QuoteLine};
use futures::future::join_all;
use std::sync::Arc;

pub struct Dispatcher {
    backend: Arc<dyn GenerationBackend>,
    catalog: ModelCatalog,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn GenerationBackend>, catalog: ModelCatalog) -> Self {
        Self { backend, catalog }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Run every quoted model concurrently. Results follow the quote's order and a
    /// failing model only marks its own result.
    pub async fn run_all(&self, quote: &Quote, input: &GenerationInput) -> Vec<GenerationResult> {
        join_all(quote.lines.iter().map(|line| self.run_one(line, input))).await
    }

    async fn run_one(&self, line: &QuoteLine, input: &GenerationInput) -> GenerationResult {
        let outcome = match self.catalog.get(&line.model) {
            Some(entry) => self.backend.run(&entry.model_ref, (entry.adapter)(input)).await,
            None => Err(DispatchError::UnknownModel(line.model.clone())),
        };

        let (output_urls, status, error_message) = match outcome {
            Ok(output) => (output.into_urls(), ResultStatus::Success, None),
            Err(e) => {
                tracing::warn!("Generation failed for {}: {}", line.model, e);
                (Vec::new(), ResultStatus::Error, Some(e.to_string()))
            }
        };

        GenerationResult {
            model_name: line.model.clone(),
            output_urls,
            cost_usd: line.cost_usd,
            characters: line.characters,
            status,
            error_message,
        }
    }
}
