use super::levels::{level_instruction, ComplexityLevel};
use super::styles::{style_instruction, VisualStyle};

pub const WIDESCREEN_MANDATE: &str =
    "Create a 16:9 widescreen landscape infographic (wider than tall).";

pub const QUALITY_SUFFIX: &str = "Render in ultra high resolution with crisp, clear details, \
     sharp legible text and a well-balanced composition.";

const GENERATION_REQUIREMENTS: &str = "CRITICAL REQUIREMENTS:
- Aspect ratio: 16:9 widescreen landscape orientation.
- Resolution: high resolution, suitable for presentation slides and print.
- Text: every label must be large, sharp, correctly spelled and fully legible.
- Layout: clear visual hierarchy with organized sections and consistent spacing.
- Graphics: crisp vector-quality icons and illustrations with no blur or artifacts.
- Background: clean and uncluttered so content stands out.
- Quality: polished, professional, publication-ready finish.";

const EDIT_PRESERVATION: &str = "Maintain these qualities in the edited image:
- Keep the 16:9 widescreen aspect ratio.
- Keep high resolution with crisp details.
- Keep all text sharp and legible.
- Keep the overall composition balanced and professional.";

pub fn build_research_prompt(
    topic: &str,
    level: &ComplexityLevel,
    style: &VisualStyle,
    language: &str,
) -> String {
    let language = normalize_language(language);
    format!(
        "You are an expert researcher and information designer.

Research the topic \"{topic}\" using Google Search to find accurate, current and \
verifiable facts. Then design an educational infographic about it.

AUDIENCE:
{level_text}

STYLE:
{style_text}

LANGUAGE: Write every piece of output text, including all text that will appear \
inside the infographic, in {language}.

Respond using exactly this format and nothing else:

FACTS:
- <key fact 1>
- <key fact 2>
- <key fact 3>
- <key fact 4>
- <key fact 5>

IMAGE_PROMPT:
<one detailed image-generation prompt for the infographic>

The IMAGE_PROMPT must:
1. Explicitly request a 16:9 widescreen landscape format.
2. Describe the composition and layout: title placement, sections and reading flow.
3. Describe the visual elements: icons, diagrams, illustrations and charts.
4. Specify the color palette.
5. Specify the typography, with all infographic text written in {language}.
6. Describe the background treatment.
7. Include patterns and motifs appropriate to the requested style.
Do not include citation markers, reference numbers or source links in the IMAGE_PROMPT.",
        topic = topic.trim(),
        level_text = level_instruction(level),
        style_text = style_instruction(style),
        language = language,
    )
}

/// Prompt used when the model response carries no usable `IMAGE_PROMPT:` section.
pub fn fallback_image_prompt(topic: &str, level: &ComplexityLevel, style: &VisualStyle) -> String {
    format!(
        "Create an educational infographic about \"{}\". {} {}",
        topic.trim(),
        level_instruction(level),
        style_instruction(style)
    )
}

/// Applies the aspect-ratio assertion and the trailing quality sentence.
///
/// The quality sentence is always appended; copies already present are removed
/// first so the result ends with it exactly once. The body keeps its line
/// structure and is only trimmed.
pub fn finalize_image_prompt(prompt: &str) -> String {
    let body = prompt.replace(QUALITY_SUFFIX, "");
    let body = body.trim();
    let lowered = body.to_ascii_lowercase();
    let mut out = String::new();
    if !lowered.contains("16:9") && !lowered.contains("widescreen") {
        out.push_str(WIDESCREEN_MANDATE);
        out.push(' ');
    }
    if !body.is_empty() {
        out.push_str(body);
        out.push(' ');
    }
    out.push_str(QUALITY_SUFFIX);
    out
}

pub fn build_generation_prompt(prompt: &str) -> String {
    format!("{}\n\n{GENERATION_REQUIREMENTS}", prompt.trim())
}

pub fn build_edit_prompt(instruction: &str) -> String {
    format!(
        "Edit this infographic as follows: {}\n\n{EDIT_PRESERVATION}",
        instruction.trim()
    )
}

pub fn build_fix_prompt(correction: &str) -> String {
    format!(
        "Simplify and fix this infographic. Apply this correction: {} \
         Remove clutter, correct any inaccurate or misspelled text, keep the 16:9 \
         widescreen layout and keep every label sharp and legible.",
        correction.trim()
    )
}

fn normalize_language(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "English";
    }
    trimmed
}
