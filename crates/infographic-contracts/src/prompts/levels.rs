use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Audience tier an infographic is written for.
///
/// Anything outside the four known tiers is carried as `Other` so callers can
/// pass user input straight through; it maps to the general-public instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ComplexityLevel {
    Elementary,
    HighSchool,
    College,
    Expert,
    Other(String),
}

const LEVEL_ALIASES: &[(&str, ComplexityLevel)] = &[
    ("elementary", ComplexityLevel::Elementary),
    ("elementary school", ComplexityLevel::Elementary),
    ("kids", ComplexityLevel::Elementary),
    ("high school", ComplexityLevel::HighSchool),
    ("highschool", ComplexityLevel::HighSchool),
    ("college", ComplexityLevel::College),
    ("university", ComplexityLevel::College),
    ("expert", ComplexityLevel::Expert),
    ("professional", ComplexityLevel::Expert),
];

impl ComplexityLevel {
    pub const KNOWN: [ComplexityLevel; 4] = [
        ComplexityLevel::Elementary,
        ComplexityLevel::HighSchool,
        ComplexityLevel::College,
        ComplexityLevel::Expert,
    ];

    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        LEVEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, level)| level.clone())
            .unwrap_or_else(|| ComplexityLevel::Other(raw.trim().to_string()))
    }

    pub fn label(&self) -> &str {
        match self {
            ComplexityLevel::Elementary => "Elementary",
            ComplexityLevel::HighSchool => "High School",
            ComplexityLevel::College => "College",
            ComplexityLevel::Expert => "Expert",
            ComplexityLevel::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ComplexityLevel::Other(_))
    }
}

impl FromStr for ComplexityLevel {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(raw))
    }
}

impl From<String> for ComplexityLevel {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ComplexityLevel> for String {
    fn from(level: ComplexityLevel) -> Self {
        level.label().to_string()
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audience guidance embedded verbatim into research and fallback prompts.
pub fn level_instruction(level: &ComplexityLevel) -> &'static str {
    match level {
        ComplexityLevel::Elementary => {
            "Target audience: elementary school students (ages 6-10). Use very large, \
             friendly text with short words and simple sentences. Favor bright, cheerful \
             colors, big icons and playful illustrations with almost no jargon. Show at \
             most 3 key points."
        }
        ComplexityLevel::HighSchool => {
            "Target audience: high school students (ages 14-18). Use clear, large headings \
             and readable body text. Combine vivid colors with labeled diagrams, introduce \
             key terms with short definitions and keep layouts moderately detailed. Show at \
             most 4 key points."
        }
        ComplexityLevel::College => {
            "Target audience: college and university students (ages 18-24). Use medium text \
             sizes with a clear typographic hierarchy. Allow a professional color scheme, \
             detailed diagrams, data visualizations and correct technical terminology. \
             Show at most 5 key points."
        }
        ComplexityLevel::Expert => {
            "Target audience: domain experts and professionals. Compact text is acceptable \
             as long as it stays legible. Use a restrained, sophisticated palette, dense \
             technical diagrams, precise notation and quantitative detail. Show at most 5 \
             key points with depth."
        }
        ComplexityLevel::Other(_) => {
            "Target audience: the general public. Use clear, readable text, a balanced \
             color scheme and accessible explanations with minimal jargon. Show at most \
             4 key points."
        }
    }
}
