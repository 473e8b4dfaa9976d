//! Prompt construction, response parsing and shared types for the infographic
//! research and image pipeline. Everything here is pure apart from the JSONL
//! event writer; network calls live in `infographic-engine`.

pub mod data_uri;
pub mod events;
pub mod models;
pub mod prompts;
pub mod research;
pub mod verification;
