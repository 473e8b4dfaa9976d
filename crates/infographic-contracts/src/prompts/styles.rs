use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aesthetic preset applied to the generated infographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum VisualStyle {
    Minimalist,
    Realistic,
    Cartoon,
    Vintage,
    Futuristic,
    Render3d,
    Sketch,
    Other(String),
}

const STYLE_ALIASES: &[(&str, VisualStyle)] = &[
    ("minimalist", VisualStyle::Minimalist),
    ("minimal", VisualStyle::Minimalist),
    ("flat", VisualStyle::Minimalist),
    ("realistic", VisualStyle::Realistic),
    ("photorealistic", VisualStyle::Realistic),
    ("cartoon", VisualStyle::Cartoon),
    ("comic", VisualStyle::Cartoon),
    ("vintage", VisualStyle::Vintage),
    ("retro", VisualStyle::Vintage),
    ("futuristic", VisualStyle::Futuristic),
    ("sci fi", VisualStyle::Futuristic),
    ("3d render", VisualStyle::Render3d),
    ("3d", VisualStyle::Render3d),
    ("render 3d", VisualStyle::Render3d),
    ("sketch", VisualStyle::Sketch),
    ("hand drawn", VisualStyle::Sketch),
];

impl VisualStyle {
    pub const KNOWN: [VisualStyle; 7] = [
        VisualStyle::Minimalist,
        VisualStyle::Realistic,
        VisualStyle::Cartoon,
        VisualStyle::Vintage,
        VisualStyle::Futuristic,
        VisualStyle::Render3d,
        VisualStyle::Sketch,
    ];

    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        STYLE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, style)| style.clone())
            .unwrap_or_else(|| VisualStyle::Other(raw.trim().to_string()))
    }

    pub fn label(&self) -> &str {
        match self {
            VisualStyle::Minimalist => "Minimalist",
            VisualStyle::Realistic => "Realistic",
            VisualStyle::Cartoon => "Cartoon",
            VisualStyle::Vintage => "Vintage",
            VisualStyle::Futuristic => "Futuristic",
            VisualStyle::Render3d => "3D Render",
            VisualStyle::Sketch => "Sketch",
            VisualStyle::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, VisualStyle::Other(_))
    }
}

impl FromStr for VisualStyle {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(raw))
    }
}

impl From<String> for VisualStyle {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<VisualStyle> for String {
    fn from(style: VisualStyle) -> Self {
        style.label().to_string()
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn style_instruction(style: &VisualStyle) -> &'static str {
    match style {
        VisualStyle::Minimalist => {
            "Visual style: clean minimalist flat design. Use a limited palette of two or \
             three muted colors with one accent, thin uniform lines, no shading or \
             gradients, generous white space and simple geometric icons."
        }
        VisualStyle::Realistic => {
            "Visual style: photorealistic scientific illustration. Use natural, true-to-life \
             colors, soft realistic lighting and shading, detailed textures and accurate \
             proportions arranged around a central hero illustration."
        }
        VisualStyle::Cartoon => {
            "Visual style: friendly cartoon illustration. Use saturated primary colors, bold \
             black outlines, cel shading, expressive characters and speech-bubble callouts."
        }
        VisualStyle::Vintage => {
            "Visual style: vintage retro poster. Use a faded sepia, cream and muted teal \
             palette, halftone textures, engraved linework and decorative borders with \
             ribbon banners."
        }
        VisualStyle::Futuristic => {
            "Visual style: futuristic sci-fi interface. Use a dark navy background with neon \
             cyan and magenta highlights, glowing thin lines, holographic gradients and \
             circuit-board or HUD grid motifs."
        }
        VisualStyle::Render3d => {
            "Visual style: polished 3D render. Use soft pastel materials, smooth ambient \
             occlusion shading, subtle depth of field and isometric 3D objects floating on \
             clean platforms."
        }
        VisualStyle::Sketch => {
            "Visual style: hand-drawn notebook sketch. Use graphite and ink on off-white \
             paper with a single highlighter accent color, cross-hatched shading, loose \
             pencil lines and doodled arrows and annotations."
        }
        VisualStyle::Other(_) => {
            "Visual style: modern scientific infographic. Use a clean professional palette \
             of blues and teals, crisp vector lines, light flat shading and clear data \
             visualization motifs."
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{style_instruction, VisualStyle};

    #[test]
    fn known_styles_map_to_distinct_instructions() {
        let texts: HashSet<&str> = VisualStyle::KNOWN.iter().map(style_instruction).collect();
        assert_eq!(texts.len(), 7);
        assert!(texts.iter().all(|text| !text.trim().is_empty()));
    }

    #[test]
    fn unrecognized_style_uses_modern_scientific_instruction() {
        let style = VisualStyle::parse("Baroque");
        assert!(!style.is_known());
        assert!(style_instruction(&style).contains("modern scientific infographic"));
    }

    #[test]
    fn parse_round_trips_labels() {
        for style in VisualStyle::KNOWN {
            assert_eq!(VisualStyle::parse(style.label()), style);
        }
        assert_eq!(VisualStyle::parse("3d_render"), VisualStyle::Render3d);
        assert_eq!(VisualStyle::parse("Hand-Drawn"), VisualStyle::Sketch);
    }
}
