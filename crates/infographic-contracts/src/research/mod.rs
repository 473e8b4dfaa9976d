mod citations;
mod parser;

use serde::{Deserialize, Serialize};

pub use citations::{collect_search_results, GroundingChunk, WebReference};
pub use parser::{extract_facts, extract_image_prompt, parse_research_response, MAX_FACTS};

/// One deduplicated web citation returned alongside the research text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub image_prompt: String,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub search_results: Vec<SearchResultItem>,
}
