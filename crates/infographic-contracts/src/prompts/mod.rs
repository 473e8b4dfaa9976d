mod levels;
mod styles;
mod templates;

pub use levels::{level_instruction, ComplexityLevel};
pub use styles::{style_instruction, VisualStyle};
pub use templates::{
    build_edit_prompt, build_fix_prompt, build_generation_prompt, build_research_prompt,
    fallback_image_prompt, finalize_image_prompt, QUALITY_SUFFIX, WIDESCREEN_MANDATE,
};
