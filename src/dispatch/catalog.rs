//! Provider references and request adapters for every supported model.
//!
//! Each model maps the normalised [`GenerationInput`] to the parameter object its
//! provider expects. Lookups go through the table; there is no per-name branching
//! at call sites.

use crate::models::GenerationInput;
use crate::services::PriceTable;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Image,
    Video,
    Speech,
}

/// How a model is addressed on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    /// Pinned `owner/name:version` reference.
    Version(String),
    /// Latest official `owner/name` deployment.
    Identifier(String),
}

impl ModelRef {
    pub fn as_str(&self) -> &str {
        match self {
            ModelRef::Version(v) => v,
            ModelRef::Identifier(id) => id,
        }
    }
}

pub type Adapter = fn(&GenerationInput) -> Value;

#[derive(Clone)]
pub struct CatalogEntry {
    pub kind: ModelKind,
    pub model_ref: ModelRef,
    pub adapter: Adapter,
}

#[derive(Clone)]
pub struct ModelCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, kind: ModelKind, model_ref: ModelRef, adapter: Adapter) {
        self.entries.insert(
            name.to_string(),
            CatalogEntry {
                kind,
                model_ref,
                adapter,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Every priced model must be dispatchable with the matching kind.
    pub fn ensure_covers(&self, prices: &PriceTable) -> Result<(), String> {
        let sections = [
            (ModelKind::Image, prices.image.keys().collect::<Vec<_>>()),
            (ModelKind::Video, prices.video.keys().collect()),
            (ModelKind::Speech, prices.speech.keys().collect()),
        ];

        for (kind, names) in sections {
            for name in names {
                match self.get(name) {
                    Some(entry) if entry.kind == kind => {}
                    Some(entry) => {
                        return Err(format!(
                            "model {} is priced as {:?} but registered as {:?}",
                            name, kind, entry.kind
                        ))
                    }
                    None => return Err(format!("model {} has a price but no adapter", name)),
                }
            }
        }

        Ok(())
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        use ModelKind::*;
        use ModelRef::*;

        let mut catalog = Self::empty();
        catalog.register(
            "sdxl",
            Image,
            Version("stability-ai/sdxl:7762fd07cf82c948538e41f63f77d685e02b063e37e496e96eefd46c929f9bdc".into()),
            diffusion_image,
        );
        catalog.register(
            "flux-schnell",
            Image,
            Identifier("black-forest-labs/flux-schnell".into()),
            flux_image,
        );
        catalog.register(
            "flux-dev",
            Image,
            Identifier("black-forest-labs/flux-dev".into()),
            flux_image,
        );
        catalog.register(
            "wan-i2v-fast",
            Video,
            Identifier("wan-video/wan-2.2-i2v-fast".into()),
            image_to_video,
        );
        catalog.register(
            "ltx-video",
            Video,
            Version("lightricks/ltx-video:8c47da666861d081eeb4d1261853087de23923a268a69b63febdf5dc1dee08e4".into()),
            text_to_video,
        );
        catalog.register(
            "minimax-speech-turbo",
            Speech,
            Identifier("minimax/speech-02-turbo".into()),
            minimax_speech,
        );
        catalog.register(
            "chatterbox",
            Speech,
            Identifier("resemble-ai/chatterbox".into()),
            chatterbox_speech,
        );
        catalog.register(
            "kokoro-82m",
            Speech,
            Version("jaaari/kokoro-82m:f559560eb822dc509045f3921a1921234918b91739db4bf3daab2169b71c7a13".into()),
            kokoro_speech,
        );
        catalog
    }
}

fn put<T: Into<Value>>(params: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.into());
    }
}

fn diffusion_image(input: &GenerationInput) -> Value {
    let mut params = Map::new();
    put(&mut params, "prompt", input.prompt.clone());
    put(&mut params, "negative_prompt", input.negative_prompt.clone());
    put(&mut params, "width", input.width);
    put(&mut params, "height", input.height);
    put(&mut params, "num_inference_steps", input.num_inference_steps);
    Value::Object(params)
}

// Flux picks its own resolution and step count.
fn flux_image(input: &GenerationInput) -> Value {
    let mut params = Map::new();
    put(&mut params, "prompt", input.prompt.clone());
    put(&mut params, "aspect_ratio", input.aspect_ratio.clone());
    Value::Object(params)
}

fn video_common(input: &GenerationInput) -> Map<String, Value> {
    let mut params = Map::new();
    put(&mut params, "prompt", input.prompt.clone());
    put(&mut params, "aspect_ratio", input.aspect_ratio.clone());
    put(&mut params, "negative_prompt", input.negative_prompt.clone());
    put(&mut params, "duration", input.duration);
    put(&mut params, "fps", input.fps);
    put(&mut params, "motion_bucket_id", input.motion_bucket_id);
    params
}

fn image_to_video(input: &GenerationInput) -> Value {
    let mut params = video_common(input);
    put(&mut params, "image", input.image.clone());
    Value::Object(params)
}

fn text_to_video(input: &GenerationInput) -> Value {
    Value::Object(video_common(input))
}

fn minimax_speech(input: &GenerationInput) -> Value {
    let mut params = Map::new();
    put(&mut params, "text", input.text.clone());
    put(&mut params, "voice_id", input.voice_id.clone());
    put(&mut params, "emotion", input.emotion.clone());
    put(&mut params, "language_boost", input.language_boost.clone());
    put(&mut params, "english_normalization", input.english_normalization);
    Value::Object(params)
}

fn chatterbox_speech(input: &GenerationInput) -> Value {
    let mut params = Map::new();
    // Chatterbox reads its script from `prompt`; only the priced text is spoken.
    put(&mut params, "prompt", input.text.clone());
    Value::Object(params)
}

fn kokoro_speech(input: &GenerationInput) -> Value {
    let mut params = Map::new();
    put(&mut params, "text", input.text.clone());
    put(&mut params, "voice", input.voice.clone());
    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::FixedPrice;
    use serde_json::json;

    fn adapt(name: &str, input: &GenerationInput) -> Value {
        let catalog = ModelCatalog::default();
        (catalog.get(name).unwrap().adapter)(input)
    }

    #[test]
    fn test_default_catalog_covers_default_prices() {
        assert!(ModelCatalog::default()
            .ensure_covers(&PriceTable::default())
            .is_ok());
    }

    #[test]
    fn test_priced_model_without_adapter_is_reported() {
        let mut prices = PriceTable::default();
        prices
            .image
            .insert("mystery".to_string(), FixedPrice { cost_usd: 0.1 });

        let err = ModelCatalog::default().ensure_covers(&prices).unwrap_err();
        assert!(err.contains("mystery"));
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let mut prices = PriceTable::default();
        prices
            .video
            .insert("sdxl".to_string(), FixedPrice { cost_usd: 0.1 });

        assert!(ModelCatalog::default().ensure_covers(&prices).is_err());
    }

    #[test]
    fn test_sdxl_adapter_passes_dimensions() {
        let input = GenerationInput {
            prompt: Some("a fox".into()),
            width: Some(768),
            height: Some(512),
            num_inference_steps: Some(25),
            ..Default::default()
        };

        assert_eq!(
            adapt("sdxl", &input),
            json!({"prompt": "a fox", "width": 768, "height": 512, "num_inference_steps": 25})
        );
        assert_eq!(adapt("flux-schnell", &input), json!({"prompt": "a fox"}));
    }

    #[test]
    fn test_image_only_sent_to_image_to_video_models() {
        let input = GenerationInput {
            prompt: Some("waves".into()),
            image: Some("https://x/frame.png".into()),
            fps: Some(24),
            ..Default::default()
        };

        assert_eq!(
            adapt("wan-i2v-fast", &input),
            json!({"prompt": "waves", "image": "https://x/frame.png", "fps": 24})
        );
        assert_eq!(adapt("ltx-video", &input), json!({"prompt": "waves", "fps": 24}));
    }

    #[test]
    fn test_speech_adapters_use_provider_field_names() {
        let input = GenerationInput {
            text: Some("hello".into()),
            voice: Some("af_nicole".into()),
            voice_id: Some("Deep_Voice_Man".into()),
            english_normalization: Some(true),
            ..Default::default()
        };

        assert_eq!(adapt("chatterbox", &input), json!({"prompt": "hello"}));
        assert_eq!(
            adapt("kokoro-82m", &input),
            json!({"text": "hello", "voice": "af_nicole"})
        );
        assert_eq!(
            adapt("minimax-speech-turbo", &input),
            json!({"text": "hello", "voice_id": "Deep_Voice_Man", "english_normalization": true})
        );
    }

    #[test]
    fn test_chatterbox_speaks_text_not_prompt() {
        let input = GenerationInput {
            text: Some("hello".into()),
            prompt: Some("hello, and a great deal more".into()),
            ..Default::default()
        };

        assert_eq!(adapt("chatterbox", &input), json!({"prompt": "hello"}));
    }
}
