//! Gemini-backed research and image operations for infographic generation.

mod gemini;

use std::fmt;

use anyhow::Result;
use infographic_contracts::data_uri::{
    data_uri_mime, png_data_uri, strip_data_uri_prefix, DEFAULT_IMAGE_MIME,
};
use infographic_contracts::events::{
    EventPayload, EventWriter, ACCURACY_CHECK_BYPASSED, IMAGE_MISSING, IMAGE_PRODUCED,
    IMAGE_REQUESTED, RESEARCH_FINISHED, RESEARCH_STARTED,
};
use infographic_contracts::models::{ModelRegistry, ModelRole};
use infographic_contracts::prompts::{
    build_edit_prompt, build_fix_prompt, build_generation_prompt, build_research_prompt,
    ComplexityLevel, VisualStyle,
};
use infographic_contracts::research::{parse_research_response, ResearchResult};
use infographic_contracts::verification::verify_accuracy_bypassed;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub use gemini::{
    first_inline_image, grounding_chunks, image_payload, research_payload, response_text,
    ClientFactory, EnvClientFactory, GeminiClient, GenerativeClient, InlineImage,
    DEFAULT_API_BASE, IMAGE_ASPECT_RATIO, IMAGE_TEMPERATURE, IMAGE_TOP_K, IMAGE_TOP_P,
};

pub const RESEARCH_MODEL_ENV: &str = "INFOGRAPHIC_RESEARCH_MODEL";
pub const IMAGE_MODEL_ENV: &str = "INFOGRAPHIC_IMAGE_MODEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOperation {
    Generate,
    Edit,
    Fix,
}

impl ImageOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageOperation::Generate => "generate",
            ImageOperation::Edit => "edit",
            ImageOperation::Fix => "fix",
        }
    }
}

impl fmt::Display for ImageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider answered but no part carried inline image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNotProduced {
    pub operation: ImageOperation,
    pub model: String,
}

impl fmt::Display for ImageNotProduced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image {} with {} produced no image",
            self.operation, self.model
        )
    }
}

impl std::error::Error for ImageNotProduced {}

/// Stateless entry point for the four pipeline operations.
///
/// A new client is requested from the factory on every call; the engine keeps
/// only model names and an optional event log, so it can be shared across
/// threads.
pub struct InfographicEngine {
    clients: Box<dyn ClientFactory>,
    research_model: String,
    image_model: String,
    events: Option<EventWriter>,
}

impl InfographicEngine {
    pub fn new(clients: impl ClientFactory + 'static) -> Result<Self> {
        let mut engine = Self {
            clients: Box::new(clients),
            research_model: String::new(),
            image_model: String::new(),
            events: None,
        };
        engine.set_models(None, None)?;
        Ok(engine)
    }

    /// Engine over `EnvClientFactory`, with models taken from
    /// `INFOGRAPHIC_RESEARCH_MODEL` / `INFOGRAPHIC_IMAGE_MODEL` when set.
    pub fn from_env() -> Result<Self> {
        let mut engine = Self::new(EnvClientFactory)?;
        engine.set_models(
            gemini::non_empty_env(RESEARCH_MODEL_ENV).as_deref(),
            gemini::non_empty_env(IMAGE_MODEL_ENV).as_deref(),
        )?;
        Ok(engine)
    }

    /// Resolves requested model names against the registry. Unknown or
    /// unsuitable names fall back to the role default with a warning.
    pub fn set_models(&mut self, research: Option<&str>, image: Option<&str>) -> Result<()> {
        let registry = ModelRegistry::default();
        let research = registry.select(ModelRole::Research, research)?;
        let image = registry.select(ModelRole::Image, image)?;
        for reason in [&research.fallback_reason, &image.fallback_reason]
            .into_iter()
            .flatten()
        {
            log::warn!("{reason}");
        }
        self.research_model = research.model.name;
        self.image_model = image.model.name;
        Ok(())
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn research_model(&self) -> &str {
        &self.research_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn event_writer(&self) -> Option<&EventWriter> {
        self.events.as_ref()
    }

    /// Researches `topic` with search grounding and returns parsed facts,
    /// citations and a ready-to-use image prompt.
    pub fn research_topic_for_prompt(
        &self,
        topic: &str,
        level: &ComplexityLevel,
        style: &VisualStyle,
        language: &str,
    ) -> Result<ResearchResult> {
        let prompt = build_research_prompt(topic, level, style, language);
        self.emit(
            RESEARCH_STARTED,
            json!({
                "model": self.research_model,
                "topic": topic,
                "level": level.label(),
                "style": style.label(),
                "language": language,
                "prompt_sha256": prompt_digest(&prompt),
            }),
        );
        log::info!(
            "researching {topic:?} with {} (level={level}, style={style})",
            self.research_model
        );

        let client = self.clients.create()?;
        let response = client.generate_content(&self.research_model, &research_payload(&prompt))?;
        let text = response_text(&response);
        let chunks = grounding_chunks(&response);
        let result = parse_research_response(&text, &chunks, topic, level, style);

        self.emit(
            RESEARCH_FINISHED,
            json!({
                "model": self.research_model,
                "response_chars": text.chars().count(),
                "facts": result.facts.len(),
                "search_results": result.search_results.len(),
                "grounding_chunks": chunks.len(),
                "image_prompt_sha256": prompt_digest(&result.image_prompt),
            }),
        );
        Ok(result)
    }

    pub fn generate_infographic_image(&self, prompt: &str) -> Result<String> {
        let request = build_generation_prompt(prompt);
        self.request_image(ImageOperation::Generate, &request, None)
    }

    /// Simplifies and corrects an existing infographic. The accuracy gate in
    /// front of this path is a bypass and never blocks the request.
    pub fn fix_infographic_image(&self, image: &str, correction: &str) -> Result<String> {
        let verdict = verify_accuracy_bypassed(image, correction);
        self.emit(
            ACCURACY_CHECK_BYPASSED,
            json!({
                "accurate": verdict.accurate,
                "verified": verdict.verified,
                "feedback": verdict.feedback,
            }),
        );
        let source = inline_source(image);
        let request = build_fix_prompt(correction);
        self.request_image(ImageOperation::Fix, &request, Some(&source))
    }

    pub fn edit_infographic_image(&self, image: &str, instruction: &str) -> Result<String> {
        let source = inline_source(image);
        let request = build_edit_prompt(instruction);
        self.request_image(ImageOperation::Edit, &request, Some(&source))
    }

    fn request_image(
        &self,
        operation: ImageOperation,
        prompt: &str,
        source: Option<&InlineImage>,
    ) -> Result<String> {
        self.emit(
            IMAGE_REQUESTED,
            json!({
                "operation": operation.as_str(),
                "model": self.image_model,
                "prompt_sha256": prompt_digest(prompt),
                "prompt_chars": prompt.chars().count(),
                "source_mime": source.map(|image| image.mime_type.as_str()),
            }),
        );
        log::info!("requesting image {operation} from {}", self.image_model);

        let client = self.clients.create()?;
        let response = client.generate_content(&self.image_model, &image_payload(prompt, source))?;
        let Some(payload) = first_inline_image(&response) else {
            self.emit(
                IMAGE_MISSING,
                json!({
                    "operation": operation.as_str(),
                    "model": self.image_model,
                    "finish_reason": response
                        .pointer("/candidates/0/finishReason")
                        .cloned()
                        .unwrap_or(Value::Null),
                }),
            );
            return Err(ImageNotProduced {
                operation,
                model: self.image_model.clone(),
            }
            .into());
        };

        self.emit(
            IMAGE_PRODUCED,
            json!({
                "operation": operation.as_str(),
                "model": self.image_model,
                "payload_chars": payload.len(),
            }),
        );
        Ok(png_data_uri(&payload))
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: EventPayload = payload.as_object().cloned().unwrap_or_default();
        if let Err(err) = events.emit(event_type, payload) {
            log::warn!("failed to record {event_type} event: {err:#}");
        }
    }
}

fn inline_source(image: &str) -> InlineImage {
    InlineImage {
        mime_type: data_uri_mime(image).unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
        data: strip_data_uri_prefix(image).to_string(),
    }
}

fn prompt_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use infographic_contracts::events::EventWriter;
    use infographic_contracts::prompts::{
        ComplexityLevel, VisualStyle, QUALITY_SUFFIX, WIDESCREEN_MANDATE,
    };
    use serde_json::{json, Value};

    use super::{
        ClientFactory, GenerativeClient, ImageNotProduced, ImageOperation, InfographicEngine,
    };

    #[derive(Default)]
    struct Script {
        responses: VecDeque<Result<Value, String>>,
        requests: Vec<(String, Value)>,
        clients_created: usize,
    }

    #[derive(Clone, Default)]
    struct ScriptedFactory {
        script: Arc<Mutex<Script>>,
    }

    impl ScriptedFactory {
        fn with_responses(responses: Vec<Result<Value, String>>) -> Self {
            let factory = Self::default();
            if let Ok(mut script) = factory.script.lock() {
                script.responses = responses.into();
            }
            factory
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.script
                .lock()
                .map(|script| script.requests.clone())
                .unwrap_or_default()
        }

        fn clients_created(&self) -> usize {
            self.script
                .lock()
                .map(|script| script.clients_created)
                .unwrap_or_default()
        }
    }

    struct ScriptedClient {
        script: Arc<Mutex<Script>>,
    }

    impl ClientFactory for ScriptedFactory {
        fn create(&self) -> Result<Box<dyn GenerativeClient>> {
            let mut script = self.script.lock().map_err(|_| anyhow!("poisoned"))?;
            script.clients_created += 1;
            Ok(Box::new(ScriptedClient {
                script: Arc::clone(&self.script),
            }))
        }
    }

    impl GenerativeClient for ScriptedClient {
        fn generate_content(&self, model: &str, payload: &Value) -> Result<Value> {
            let mut script = self.script.lock().map_err(|_| anyhow!("poisoned"))?;
            script.requests.push((model.to_string(), payload.clone()));
            match script.responses.pop_front() {
                Some(Ok(value)) => Ok(value),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted response")),
            }
        }
    }

    fn image_response(data: &str) -> Value {
        json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is the infographic."},
                {"inlineData": {"mimeType": "image/png", "data": data}},
            ]}}]
        })
    }

    fn text_only_response() -> Value {
        json!({
            "candidates": [{
                "content": {"parts": [{"text": "I cannot draw that."}]},
                "finishReason": "STOP",
            }]
        })
    }

    fn engine(factory: &ScriptedFactory) -> Result<InfographicEngine> {
        InfographicEngine::new(factory.clone())
    }

    #[test]
    fn research_parses_response_and_dedupes_citations() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![Ok(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "FACTS:\n- Water covers 71% of Earth\n- Oceans hold 97% of it\n"},
                    {"text": "IMAGE_PROMPT:\nA cross-section of the water cycle"},
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "u1", "title": "T1"}},
                    {"web": {"uri": "u1", "title": "T2"}},
                    {"web": {"uri": "u2", "title": "T3"}},
                ]},
            }]
        }))]);
        let result = engine(&factory)?.research_topic_for_prompt(
            "Water cycle",
            &ComplexityLevel::Elementary,
            &VisualStyle::Cartoon,
            "French",
        )?;

        assert_eq!(
            result.facts,
            vec!["Water covers 71% of Earth", "Oceans hold 97% of it"]
        );
        assert_eq!(
            result.image_prompt,
            format!("{WIDESCREEN_MANDATE} A cross-section of the water cycle {QUALITY_SUFFIX}")
        );
        assert_eq!(result.search_results.len(), 2);
        assert_eq!(result.search_results[0].title, "T1");
        assert_eq!(result.search_results[1].url, "u2");

        let requests = factory.requests();
        assert_eq!(requests.len(), 1);
        let (model, payload) = &requests[0];
        assert_eq!(model, "gemini-2.5-flash");
        assert_eq!(payload["tools"], json!([{ "googleSearch": {} }]));
        let prompt = payload["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        assert!(prompt.contains("Water cycle"));
        assert!(prompt.contains("French"));
        Ok(())
    }

    #[test]
    fn research_with_empty_response_falls_back_to_defaults() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![Ok(json!({"candidates": []}))]);
        let result = engine(&factory)?.research_topic_for_prompt(
            "Plate tectonics",
            &ComplexityLevel::Other("curious adults".to_string()),
            &VisualStyle::Other("noir".to_string()),
            "English",
        )?;
        assert!(result.facts.is_empty());
        assert!(result.search_results.is_empty());
        assert!(result.image_prompt.contains("Plate tectonics"));
        assert!(result.image_prompt.ends_with(QUALITY_SUFFIX));
        Ok(())
    }

    #[test]
    fn generate_returns_png_data_uri_with_requirements_block() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![Ok(image_response("UE5HREFUQQ=="))]);
        let uri = engine(&factory)?.generate_infographic_image("A widescreen map of rivers")?;
        assert_eq!(uri, "data:image/png;base64,UE5HREFUQQ==");

        let requests = factory.requests();
        let (model, payload) = &requests[0];
        assert_eq!(model, "gemini-3-pro-image-preview");
        let parts = payload["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        assert_eq!(parts.len(), 1);
        let text = parts[0]["text"].as_str().unwrap_or_default();
        assert!(text.starts_with("A widescreen map of rivers"));
        assert!(text.contains("CRITICAL REQUIREMENTS:"));
        assert_eq!(payload["generationConfig"]["temperature"], json!(0.4));
        assert_eq!(payload["generationConfig"]["topP"], json!(0.9));
        Ok(())
    }

    #[test]
    fn every_image_operation_reports_missing_output() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![
            Ok(text_only_response()),
            Ok(text_only_response()),
            Ok(text_only_response()),
        ]);
        let engine = engine(&factory)?;
        let source = "data:image/png;base64,QUJD";
        let outcomes = [
            (ImageOperation::Generate, engine.generate_infographic_image("chart")),
            (ImageOperation::Edit, engine.edit_infographic_image(source, "bigger title")),
            (ImageOperation::Fix, engine.fix_infographic_image(source, "wrong year")),
        ];
        for (operation, outcome) in outcomes {
            let err = outcome.err().ok_or_else(|| anyhow!("{operation} succeeded"))?;
            let missing = err
                .downcast_ref::<ImageNotProduced>()
                .ok_or_else(|| anyhow!("unexpected error: {err:#}"))?;
            assert_eq!(missing.operation, operation);
        }
        Ok(())
    }

    #[test]
    fn edit_and_fix_strip_data_uri_prefixes() -> Result<()> {
        let variants = [
            ("data:image/png;base64,UE5H", "image/png"),
            ("data:image/jpeg;base64,UE5H", "image/jpeg"),
            ("data:image/jpg;base64,UE5H", "image/jpeg"),
            ("UE5H", "image/png"),
        ];
        for (source, expected_mime) in variants {
            let factory = ScriptedFactory::with_responses(vec![
                Ok(image_response("RURJVA==")),
                Ok(image_response("RklY")),
            ]);
            let engine = engine(&factory)?;
            assert_eq!(
                engine.edit_infographic_image(source, "add a legend")?,
                "data:image/png;base64,RURJVA=="
            );
            assert_eq!(
                engine.fix_infographic_image(source, "Pluto is a dwarf planet")?,
                "data:image/png;base64,RklY"
            );

            let requests = factory.requests();
            assert_eq!(requests.len(), 2);
            for (_, payload) in &requests {
                let inline = &payload["contents"][0]["parts"][0]["inlineData"];
                assert_eq!(inline["data"], "UE5H", "{source}");
                assert_eq!(inline["mimeType"], expected_mime, "{source}");
            }
            let edit_text = requests[0].1["contents"][0]["parts"][1]["text"]
                .as_str()
                .unwrap_or_default();
            assert!(edit_text.contains("add a legend"));
            assert!(edit_text.contains("Keep the 16:9 widescreen aspect ratio."));
            let fix_text = requests[1].1["contents"][0]["parts"][1]["text"]
                .as_str()
                .unwrap_or_default();
            assert!(fix_text.starts_with("Simplify and fix"));
            assert!(fix_text.contains("Pluto is a dwarf planet"));
            assert_eq!(
                requests[0].1["generationConfig"],
                requests[1].1["generationConfig"]
            );
        }
        Ok(())
    }

    #[test]
    fn provider_errors_propagate_unchanged() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![Err(
            "Gemini request failed (429): quota exhausted".to_string(),
        )]);
        let err = engine(&factory)?
            .generate_infographic_image("chart")
            .err()
            .ok_or_else(|| anyhow!("expected failure"))?;
        assert!(err.downcast_ref::<ImageNotProduced>().is_none());
        assert_eq!(err.to_string(), "Gemini request failed (429): quota exhausted");
        Ok(())
    }

    #[test]
    fn each_call_builds_a_fresh_client() -> Result<()> {
        let factory = ScriptedFactory::with_responses(vec![
            Ok(image_response("QQ==")),
            Ok(image_response("Qg==")),
        ]);
        let engine = engine(&factory)?;
        engine.generate_infographic_image("one")?;
        engine.generate_infographic_image("two")?;
        assert_eq!(factory.clients_created(), 2);
        Ok(())
    }

    #[test]
    fn set_models_falls_back_for_unsuitable_names() -> Result<()> {
        let mut engine = engine(&ScriptedFactory::default())?;
        engine.set_models(Some("gemini-3-pro-preview"), Some("gemini-2.5-flash"))?;
        assert_eq!(engine.research_model(), "gemini-3-pro-preview");
        assert_eq!(engine.image_model(), "gemini-3-pro-image-preview");
        Ok(())
    }

    #[test]
    fn events_record_fix_pipeline_including_bypass() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let factory = ScriptedFactory::with_responses(vec![Ok(text_only_response())]);
        let engine = engine(&factory)?.with_events(EventWriter::new(&events_path, "run-test"));
        let err = engine
            .fix_infographic_image("data:image/png;base64,QUJD", "typo in title")
            .err()
            .ok_or_else(|| anyhow!("fix succeeded without an image"))?;
        let missing = err
            .downcast_ref::<ImageNotProduced>()
            .ok_or_else(|| anyhow!("unexpected error: {err:#}"))?;
        assert_eq!(missing.operation, ImageOperation::Fix);
        assert_eq!(missing.model, "gemini-3-pro-image-preview");

        let raw = fs::read_to_string(&events_path)?;
        let rows: Vec<Value> = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .collect();
        let types: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get("type").and_then(Value::as_str))
            .collect();
        assert_eq!(
            types,
            vec!["accuracy_check_bypassed", "image_requested", "image_missing"]
        );
        assert_eq!(rows[0]["accurate"], true);
        assert_eq!(rows[0]["verified"], false);
        assert_eq!(rows[1]["operation"], "fix");
        assert_eq!(rows[1]["source_mime"], "image/png");
        assert_eq!(rows[1]["prompt_sha256"].as_str().map(str::len), Some(64));
        assert_eq!(rows[2]["finish_reason"], "STOP");
        Ok(())
    }
}
