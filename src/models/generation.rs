use serde::{Deserialize, Serialize};

fn default_image_models() -> Vec<String> {
    vec!["sdxl".to_string()]
}

fn default_video_models() -> Vec<String> {
    vec!["ltx-video".to_string()]
}

fn default_speech_models() -> Vec<String> {
    vec!["kokoro-82m".to_string()]
}

fn default_dimension() -> u32 {
    768
}

fn default_steps() -> u32 {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    #[serde(default = "default_image_models")]
    pub models: Vec<String>,
    pub negative_prompt: Option<String>,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_steps")]
    pub num_inference_steps: u32,
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    #[serde(default = "default_video_models")]
    pub models: Vec<String>,
    /// Source image URL for image-to-video models.
    pub image: Option<String>,
    pub aspect_ratio: Option<String>,
    pub negative_prompt: Option<String>,
    pub duration: Option<u32>,
    pub fps: Option<u32>,
    pub motion_bucket_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default = "default_speech_models")]
    pub models: Vec<String>,
    pub voice: Option<String>,
    pub voice_id: Option<String>,
    pub emotion: Option<String>,
    pub language_boost: Option<String>,
    pub english_normalization: Option<bool>,
}

/// Provider-neutral view of a generation request, fed to per-model adapters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationInput {
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub image: Option<String>,
    pub duration: Option<u32>,
    pub fps: Option<u32>,
    pub motion_bucket_id: Option<u32>,
    pub text: Option<String>,
    pub voice: Option<String>,
    pub voice_id: Option<String>,
    pub emotion: Option<String>,
    pub language_boost: Option<String>,
    pub english_normalization: Option<bool>,
}

impl From<&ImageGenerationRequest> for GenerationInput {
    fn from(request: &ImageGenerationRequest) -> Self {
        Self {
            prompt: Some(request.prompt.clone()),
            negative_prompt: request.negative_prompt.clone(),
            width: Some(request.width),
            height: Some(request.height),
            num_inference_steps: Some(request.num_inference_steps),
            aspect_ratio: request.aspect_ratio.clone(),
            ..Default::default()
        }
    }
}

impl From<&VideoGenerationRequest> for GenerationInput {
    fn from(request: &VideoGenerationRequest) -> Self {
        Self {
            prompt: Some(request.prompt.clone()),
            negative_prompt: request.negative_prompt.clone(),
            aspect_ratio: request.aspect_ratio.clone(),
            image: request.image.clone(),
            duration: request.duration,
            fps: request.fps,
            motion_bucket_id: request.motion_bucket_id,
            ..Default::default()
        }
    }
}

impl From<&SpeechRequest> for GenerationInput {
    fn from(request: &SpeechRequest) -> Self {
        Self {
            text: Some(request.text.clone()),
            voice: request.voice.clone(),
            voice_id: request.voice_id.clone(),
            emotion: request.emotion.clone(),
            language_boost: request.language_boost.clone(),
            english_normalization: request.english_normalization,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub model_name: String,
    pub output_urls: Vec<String>,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub results: Vec<GenerationResult>,
    pub total_cost_usd: f64,
    pub total_units: u64,
    pub total_models: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_characters: Option<usize>,
    pub payment_tx: String,
}

impl GenerationResponse {
    pub fn new(results: Vec<GenerationResult>, total_units: u64, payment_tx: String) -> Self {
        let successful = results
            .iter()
            .filter(|r| r.status == ResultStatus::Success)
            .count();
        let characters: Vec<usize> = results.iter().filter_map(|r| r.characters).collect();

        Self {
            total_cost_usd: results.iter().map(|r| r.cost_usd).sum(),
            total_units,
            total_models: results.len(),
            successful,
            failed: results.len() - successful,
            total_characters: (!characters.is_empty()).then(|| characters.iter().sum()),
            results,
            payment_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let image: ImageGenerationRequest =
            serde_json::from_str(r#"{"prompt": "a lighthouse"}"#).unwrap();
        assert_eq!(image.models, vec!["sdxl"]);
        assert_eq!((image.width, image.height, image.num_inference_steps), (768, 768, 25));

        let speech: SpeechRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(speech.models, vec!["kokoro-82m"]);

        let video: VideoGenerationRequest =
            serde_json::from_str(r#"{"prompt": "waves", "models": ["wan-i2v-fast"]}"#).unwrap();
        assert_eq!(video.models, vec!["wan-i2v-fast"]);
    }

    #[test]
    fn test_speech_input_carries_only_billed_text() {
        let speech: SpeechRequest = serde_json::from_str(
            r#"{"text": "hi", "models": ["chatterbox"], "prompt": "a much longer script"}"#,
        )
        .unwrap();

        let input = GenerationInput::from(&speech);

        assert_eq!(input.text.as_deref(), Some("hi"));
        assert_eq!(input.prompt, None);
    }

    #[test]
    fn test_response_totals() {
        let result = |status, characters| GenerationResult {
            model_name: "kokoro-82m".to_string(),
            output_urls: vec![],
            cost_usd: 0.01,
            characters,
            status,
            error_message: None,
        };

        let response = GenerationResponse::new(
            vec![
                result(ResultStatus::Success, Some(1000)),
                result(ResultStatus::Error, Some(1000)),
            ],
            20_000,
            "0xabc".to_string(),
        );

        assert_eq!(response.total_models, 2);
        assert_eq!(response.successful, 1);
        assert_eq!(response.failed, 1);
        assert_eq!(response.total_characters, Some(2000));
        assert!((response.total_cost_usd - 0.02).abs() < 1e-12);
    }
}
