use std::sync::OnceLock;

use regex::Regex;

use super::citations::{collect_search_results, GroundingChunk};
use super::ResearchResult;
use crate::prompts::{fallback_image_prompt, finalize_image_prompt, ComplexityLevel, VisualStyle};

pub const MAX_FACTS: usize = 5;

fn facts_section() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)FACTS:(.*?)(?:IMAGE_PROMPT:|\z)").expect("facts pattern is valid")
    })
}

fn image_prompt_section() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)IMAGE_PROMPT:(.*)\z").expect("image prompt pattern is valid")
    })
}

/// Bullet lines of the `FACTS:` section, first `MAX_FACTS` kept in order.
pub fn extract_facts(text: &str) -> Vec<String> {
    let Some(section) = facts_section()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str())
    else {
        return Vec::new();
    };
    section
        .lines()
        .map(fact_text)
        .filter(|line| !line.is_empty())
        .take(MAX_FACTS)
        .map(str::to_string)
        .collect()
}

/// A bare `-` counts as a marker with nothing after it.
fn fact_text(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix('-').filter(|rest| rest.trim().is_empty()))
        .unwrap_or(line)
        .trim()
}

/// Raw `IMAGE_PROMPT:` body, `None` when the section is missing or blank.
pub fn extract_image_prompt(text: &str) -> Option<String> {
    image_prompt_section()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().trim().to_string())
        .filter(|prompt| !prompt.is_empty())
}

/// Turns research output into a `ResearchResult`. Never fails: missing
/// sections fall back to an empty fact list and a prompt built from the inputs.
pub fn parse_research_response(
    text: &str,
    grounding_chunks: &[GroundingChunk],
    topic: &str,
    level: &ComplexityLevel,
    style: &VisualStyle,
) -> ResearchResult {
    let facts = extract_facts(text);
    let raw_prompt = extract_image_prompt(text)
        .unwrap_or_else(|| fallback_image_prompt(topic, level, style));
    ResearchResult {
        image_prompt: finalize_image_prompt(&raw_prompt),
        facts,
        search_results: collect_search_results(grounding_chunks),
    }
}
