use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::SearchResultItem;

/// `groundingMetadata.groundingChunks[]` entry as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WebReference {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GroundingChunk {
    fn citation(&self) -> Option<SearchResultItem> {
        let web = self.web.as_ref()?;
        let url = web.uri.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let title = web
            .title
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())?;
        Some(SearchResultItem {
            title: title.to_string(),
            url: url.to_string(),
        })
    }
}

/// Citations keyed by URL. A repeated URL keeps its first position and title.
pub fn collect_search_results(chunks: &[GroundingChunk]) -> Vec<SearchResultItem> {
    let mut by_url: IndexMap<String, SearchResultItem> = IndexMap::new();
    for item in chunks.iter().filter_map(GroundingChunk::citation) {
        by_url.entry(item.url.clone()).or_insert(item);
    }
    by_url.into_values().collect()
}
