//! Price table and quoting for generation requests.
//!
//! Prices are kept in USD and converted to settlement-token units (6 decimals)
//! exactly once, on the request total.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Decimal places of the settlement token (USDC convention).
pub const TOKEN_DECIMALS: u32 = 6;

/// Upper bound on models compared in a single request.
pub const MAX_MODELS_PER_REQUEST: usize = 12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No models selected")]
    NoModelsSelected,

    #[error("Too many models selected: {count} > {max}")]
    TooManyModels { count: usize, max: usize },

    #[error("Text to synthesize is empty")]
    EmptyText,

    #[error("Invalid USD amount: {0}")]
    InvalidAmount(f64),
}

impl PricingError {
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::UnknownModel(_) => "UNKNOWN_MODEL",
            PricingError::NoModelsSelected
            | PricingError::TooManyModels { .. }
            | PricingError::EmptyText => "INVALID_REQUEST",
            PricingError::InvalidAmount(_) => "SERVER_MISCONFIGURED",
        }
    }
}

/// Convert a USD amount into settlement-token smallest units, rounding to nearest.
pub fn usd_to_units(amount_usd: f64) -> Result<u64, PricingError> {
    if !amount_usd.is_finite() || amount_usd < 0.0 {
        return Err(PricingError::InvalidAmount(amount_usd));
    }

    let units = (amount_usd * 10f64.powi(TOKEN_DECIMALS as i32)).round();
    if units >= u64::MAX as f64 {
        return Err(PricingError::InvalidAmount(amount_usd));
    }

    Ok(units as u64)
}

pub fn units_to_usd(units: u64) -> f64 {
    units as f64 / 10f64.powi(TOKEN_DECIMALS as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPrice {
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechPrice {
    #[serde(alias = "cost_per_1000_tokens")]
    pub cost_per_1000_chars: f64,
}

/// Per-model costs, one section per operation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    pub image: BTreeMap<String, FixedPrice>,
    #[serde(default)]
    pub video: BTreeMap<String, FixedPrice>,
    #[serde(default)]
    pub speech: BTreeMap<String, SpeechPrice>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let speech = [
            ("minimax-speech-turbo", 0.06),
            ("chatterbox", 0.025),
            ("kokoro-82m", 0.01),
        ]
        .into_iter()
        .map(|(name, rate)| (name.to_string(), SpeechPrice { cost_per_1000_chars: rate }))
        .collect();

        Self {
            image: fixed_prices(&[("sdxl", 0.03), ("flux-schnell", 0.003), ("flux-dev", 0.025)]),
            video: fixed_prices(&[("wan-i2v-fast", 0.05), ("ltx-video", 0.08)]),
            speech,
        }
    }
}

fn fixed_prices(entries: &[(&str, f64)]) -> BTreeMap<String, FixedPrice> {
    entries
        .iter()
        .map(|(name, cost_usd)| (name.to_string(), FixedPrice { cost_usd: *cost_usd }))
        .collect()
}

/// Shape of a priced request.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Image { models: &'a [String] },
    Video { models: &'a [String] },
    Speech { models: &'a [String], text: &'a str },
}

impl Operation<'_> {
    fn models(&self) -> &[String] {
        match self {
            Operation::Image { models }
            | Operation::Video { models }
            | Operation::Speech { models, .. } => models,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteLine {
    pub model: String,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
}

/// Result of pricing one request. Lines follow the request's model order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub total_usd: f64,
    pub total_units: u64,
    pub lines: Vec<QuoteLine>,
}

impl PriceTable {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read price table {}", path.display()))?;
        let table: PriceTable = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid price table {}", path.display()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        let fixed = self.image.iter().chain(self.video.iter()).map(|(n, p)| (n, p.cost_usd));
        let speech = self.speech.iter().map(|(n, p)| (n, p.cost_per_1000_chars));

        for (name, cost) in fixed.chain(speech) {
            if !cost.is_finite() || cost < 0.0 {
                bail!("Price for model {} must be a non-negative number, got {}", name, cost);
            }
        }

        if self.image.is_empty() && self.video.is_empty() && self.speech.is_empty() {
            bail!("Price table has no models");
        }

        Ok(())
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.image
            .keys()
            .chain(self.video.keys())
            .chain(self.speech.keys())
            .map(String::as_str)
    }

    /// Price a request. Every model is checked before anything is summed, so an
    /// unknown name fails the whole request.
    pub fn quote(&self, operation: &Operation<'_>) -> Result<Quote, PricingError> {
        let models = operation.models();
        if models.is_empty() {
            return Err(PricingError::NoModelsSelected);
        }
        if models.len() > MAX_MODELS_PER_REQUEST {
            return Err(PricingError::TooManyModels {
                count: models.len(),
                max: MAX_MODELS_PER_REQUEST,
            });
        }

        let lines = match operation {
            Operation::Image { models } => Self::fixed_lines(&self.image, models)?,
            Operation::Video { models } => Self::fixed_lines(&self.video, models)?,
            Operation::Speech { models, text } => self.speech_lines(models, text)?,
        };

        let total_usd: f64 = lines.iter().map(|line| line.cost_usd).sum();
        let total_units = usd_to_units(total_usd)?;

        Ok(Quote {
            total_usd,
            total_units,
            lines,
        })
    }

    fn fixed_lines(
        section: &BTreeMap<String, FixedPrice>,
        models: &[String],
    ) -> Result<Vec<QuoteLine>, PricingError> {
        models
            .iter()
            .map(|model| {
                let price = section
                    .get(model)
                    .ok_or_else(|| PricingError::UnknownModel(model.clone()))?;
                Ok(QuoteLine {
                    model: model.clone(),
                    cost_usd: price.cost_usd,
                    characters: None,
                })
            })
            .collect()
    }

    fn speech_lines(&self, models: &[String], text: &str) -> Result<Vec<QuoteLine>, PricingError> {
        if text.is_empty() {
            return Err(PricingError::EmptyText);
        }

        // One character is billed as one unit; no tokenizer involved.
        let characters = text.chars().count();

        models
            .iter()
            .map(|model| {
                let price = self
                    .speech
                    .get(model)
                    .ok_or_else(|| PricingError::UnknownModel(model.clone()))?;
                Ok(QuoteLine {
                    model: model.clone(),
                    cost_usd: characters as f64 / 1000.0 * price.cost_per_1000_chars,
                    characters: Some(characters),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_single_image_model() {
        let models = names(&["sdxl"]);
        let quote = PriceTable::default()
            .quote(&Operation::Image { models: &models })
            .unwrap();

        assert!((quote.total_usd - 0.03).abs() < 1e-12);
        assert_eq!(quote.total_units, 30_000);
    }

    #[test]
    fn test_multi_model_sum() {
        let models = names(&["sdxl", "flux-schnell"]);
        let quote = PriceTable::default()
            .quote(&Operation::Image { models: &models })
            .unwrap();

        assert!((quote.total_usd - 0.033).abs() < 1e-12);
        assert_eq!(quote.total_units, 33_000);
        assert_eq!(quote.lines.len(), 2);
        assert_eq!(quote.lines[1].model, "flux-schnell");
    }

    #[test]
    fn test_unknown_model_fails_whole_request() {
        let models = names(&["sdxl", "unknown-model"]);
        let err = PriceTable::default()
            .quote(&Operation::Image { models: &models })
            .unwrap_err();

        assert_eq!(err, PricingError::UnknownModel("unknown-model".to_string()));
        assert_eq!(err.kind(), "UNKNOWN_MODEL");
    }

    #[test]
    fn test_sections_do_not_leak_between_kinds() {
        let models = names(&["ltx-video"]);
        let err = PriceTable::default()
            .quote(&Operation::Image { models: &models })
            .unwrap_err();

        assert!(matches!(err, PricingError::UnknownModel(_)));
    }

    #[test]
    fn test_selection_limits() {
        let table = PriceTable::default();

        let err = table.quote(&Operation::Video { models: &[] }).unwrap_err();
        assert_eq!(err, PricingError::NoModelsSelected);

        let many = vec!["sdxl".to_string(); MAX_MODELS_PER_REQUEST + 1];
        let err = table.quote(&Operation::Image { models: &many }).unwrap_err();
        assert!(matches!(err, PricingError::TooManyModels { count: 13, max: 12 }));
    }

    #[test]
    fn test_speech_priced_per_character() {
        let models = names(&["kokoro-82m", "minimax-speech-turbo"]);
        let text = "a".repeat(2500);
        let quote = PriceTable::default()
            .quote(&Operation::Speech {
                models: &models,
                text: &text,
            })
            .unwrap();

        // 2.5 * 0.01 + 2.5 * 0.06
        assert!((quote.total_usd - 0.175).abs() < 1e-12);
        assert_eq!(quote.total_units, 175_000);
        assert_eq!(quote.lines[0].characters, Some(2500));
    }

    #[test]
    fn test_speech_counts_characters_not_bytes() {
        let models = names(&["chatterbox"]);
        let quote = PriceTable::default()
            .quote(&Operation::Speech {
                models: &models,
                text: "héllo wörld",
            })
            .unwrap();

        assert_eq!(quote.lines[0].characters, Some(11));
    }

    #[test]
    fn test_speech_rejects_empty_text() {
        let models = names(&["kokoro-82m"]);
        let err = PriceTable::default()
            .quote(&Operation::Speech {
                models: &models,
                text: "",
            })
            .unwrap_err();

        assert_eq!(err, PricingError::EmptyText);
    }

    #[test]
    fn test_usd_to_units_rounds_to_nearest() {
        assert_eq!(usd_to_units(0.03).unwrap(), 30_000);
        assert_eq!(usd_to_units(0.0000004).unwrap(), 0);
        assert_eq!(usd_to_units(0.0000006).unwrap(), 1);
        assert_eq!(usd_to_units(0.0).unwrap(), 0);
        assert!(usd_to_units(-0.01).is_err());
        assert!(usd_to_units(f64::NAN).is_err());
        assert!((units_to_usd(30_000) - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_price_table_from_json_file() {
        let path = std::env::temp_dir().join(format!("paygate-prices-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"image": {{"sdxl": {{"cost_usd": 0.05}}}},
                "speech": {{"kokoro-82m": {{"cost_per_1000_tokens": 0.02}}}}}}"#
        )
        .unwrap();
        drop(file);

        let table = PriceTable::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.image["sdxl"].cost_usd, 0.05);
        assert_eq!(table.speech["kokoro-82m"].cost_per_1000_chars, 0.02);
        assert!(table.video.is_empty());
    }

    #[test]
    fn test_price_table_rejects_negative_prices() {
        let mut table = PriceTable::default();
        table.image.insert("broken".to_string(), FixedPrice { cost_usd: -1.0 });

        assert!(table.validate().is_err());
    }
}
