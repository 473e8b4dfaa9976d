use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use infographic_contracts::research::GroundingChunk;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const IMAGE_TEMPERATURE: f64 = 0.4;
pub const IMAGE_TOP_K: u64 = 32;
pub const IMAGE_TOP_P: f64 = 0.9;
pub const IMAGE_ASPECT_RATIO: &str = "16:9";

/// One `generateContent` round trip against a model.
pub trait GenerativeClient {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value>;
}

/// Produces a fresh client for every pipeline call.
pub trait ClientFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn GenerativeClient>>;
}

/// Reads credentials and endpoint settings from the environment each time a
/// client is created, so a rotated key is picked up on the next call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvClientFactory;

impl ClientFactory for EnvClientFactory {
    fn create(&self) -> Result<Box<dyn GenerativeClient>> {
        Ok(Box::new(GeminiClient::from_env()?))
    }
}

pub struct GeminiClient {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        let api_base: String = api_base.into();
        Ok(Self {
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            api_key: api_key
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            http,
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = Self::api_key();
        if api_key.is_none() {
            log::warn!("GEMINI_API_KEY or GOOGLE_API_KEY not set; sending unauthenticated request");
        }
        let api_base = non_empty_env("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        Self::new(api_base, api_key, Self::request_timeout())
    }

    fn api_key() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    fn request_timeout() -> Option<Duration> {
        let raw = non_empty_env("GEMINI_REQUEST_TIMEOUT_S")?;
        match raw.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => {
                Some(Duration::from_secs_f64(seconds))
            }
            _ => {
                log::warn!("ignoring invalid GEMINI_REQUEST_TIMEOUT_S={raw:?}");
                None
            }
        }
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerativeClient for GeminiClient {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        let mut request = self.http.post(&endpoint).json(payload);
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.query(&[("key", api_key)]);
        }
        log::debug!("POST {endpoint}");
        let response = request
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

/// Inline image attached to edit and fix requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

pub fn research_payload(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "tools": [{ "googleSearch": {} }],
    })
}

pub fn image_payload(prompt: &str, source: Option<&InlineImage>) -> Value {
    let mut parts = Vec::new();
    if let Some(source) = source {
        parts.push(json!({
            "inlineData": {
                "mimeType": source.mime_type,
                "data": source.data,
            }
        }));
    }
    parts.push(json!({ "text": prompt }));

    let mut generation_config = Map::new();
    generation_config.insert("temperature".to_string(), json!(IMAGE_TEMPERATURE));
    generation_config.insert("topK".to_string(), json!(IMAGE_TOP_K));
    generation_config.insert("topP".to_string(), json!(IMAGE_TOP_P));
    generation_config.insert("responseModalities".to_string(), json!(["IMAGE", "TEXT"]));
    generation_config.insert(
        "imageConfig".to_string(),
        json!({ "aspectRatio": IMAGE_ASPECT_RATIO }),
    );

    json!({
        "contents": [{
            "role": "user",
            "parts": parts,
        }],
        "generationConfig": Value::Object(generation_config),
    })
}

fn first_candidate_parts(response: &Value) -> Vec<Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Concatenated answer text of the first candidate, skipping thought parts.
pub fn response_text(response: &Value) -> String {
    first_candidate_parts(response)
        .iter()
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<&str>>()
        .join("")
}

pub fn grounding_chunks(response: &Value) -> Vec<GroundingChunk> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| {
            candidate
                .get("groundingMetadata")
                .or_else(|| candidate.get("grounding_metadata"))
        })
        .and_then(|metadata| {
            metadata
                .get("groundingChunks")
                .or_else(|| metadata.get("grounding_chunks"))
        })
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| serde_json::from_value::<GroundingChunk>(row.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Base64 payload of the first inline image part across all candidates,
/// passed through untouched.
pub fn first_inline_image(response: &Value) -> Option<String> {
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for part in parts {
            let Some(inline) = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            if !mime_type.to_ascii_lowercase().starts_with("image/") {
                continue;
            }
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            return Some(data.to_string());
        }
    }

    None
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
