use std::sync::OnceLock;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

fn image_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*data:image/([a-z0-9.+-]+);base64,")
            .expect("data uri pattern is valid")
    })
}

/// Base64 payload of an image data URI, or the input unchanged when it has no
/// `data:image/...;base64,` header.
pub fn strip_data_uri_prefix(image: &str) -> &str {
    match image_prefix().find(image) {
        Some(found) => image[found.end()..].trim(),
        None => image.trim(),
    }
}

/// MIME type named by a data URI header, with `jpg` normalized to `image/jpeg`.
pub fn data_uri_mime(image: &str) -> Option<String> {
    let subtype = image_prefix()
        .captures(image)
        .and_then(|caps| caps.get(1))?
        .as_str()
        .to_ascii_lowercase();
    let subtype = if subtype == "jpg" {
        "jpeg".to_string()
    } else {
        subtype
    };
    Some(format!("image/{subtype}"))
}

pub fn png_data_uri(payload_b64: &str) -> String {
    format!("data:{DEFAULT_IMAGE_MIME};base64,{payload_b64}")
}

pub fn bytes_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

pub fn decode_data_uri(image: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(strip_data_uri_prefix(image).as_bytes())
        .context("image data is not valid base64")
}
