//! Validation of operator inputs before they turn into requests.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::sync_engine::types::SlotIndex;

/// Largest local image the client will upload.
pub const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Validate a slot number typed by the operator.
pub fn validate_slot(n: i64) -> Result<SlotIndex> {
    SlotIndex::new(n).map_err(anyhow::Error::from)
}

/// Validate the server base URL.
///
/// Only plain http(s) endpoints make sense for the drive server.
pub fn validate_server_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        bail!("Server URL cannot be empty");
    }

    let parsed = reqwest::Url::parse(trimmed)
        .with_context(|| format!("Invalid server URL '{trimmed}'"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => bail!("Unsupported URL scheme '{other}' (expected http or https)"),
    }

    if parsed.host_str().is_none() {
        bail!("Server URL has no host: '{trimmed}'");
    }

    Ok(())
}

/// Clamp a rumble level to what the device accepts.
pub fn clamp_rumble_level(level: i64) -> u8 {
    level.clamp(0, 255) as u8
}

/// Descriptive hint shown next to a rumble level.
pub fn rumble_hint(level: Option<u8>) -> String {
    let Some(v) = level else {
        return "-".to_string();
    };

    let h = match v {
        0 => "off",
        1..=20 => "faint",
        21..=30 => "quiet",
        31..=45 => "mellow",
        46..=70 => "assertive",
        71..=110 => "noisy",
        111..=160 => "ridiculous",
        161..=200 => "ludicrous",
        _ => "insane",
    };
    format!("{v} - {h}")
}

/// Validate a local image file before reading it into memory.
pub fn verify_image_file(path: &Path) -> Result<u64> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Image file not accessible: {}", path.display()))?;

    if !meta.is_file() {
        bail!("Not a regular file: {}", path.display());
    }

    if meta.len() > MAX_IMAGE_BYTES {
        bail!(
            "Image too large: {} bytes (max: {})",
            meta.len(),
            MAX_IMAGE_BYTES
        );
    }

    Ok(meta.len())
}
