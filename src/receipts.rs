// receipts.rs
// Receipt images arrive already resized by the client as base64 data URLs.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::DomainError;

pub const MAX_RECEIPT_BYTES: usize = 1024 * 1024;

const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Checks a `data:image/...;base64,` URL and returns it trimmed.
pub fn validate_receipt(data_url: &str) -> Result<String, DomainError> {
    let trimmed = data_url.trim();
    let rest = trimmed
        .strip_prefix("data:")
        .ok_or_else(|| DomainError::validation("receipt must be a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| DomainError::validation("receipt data URL has no payload"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| DomainError::validation("receipt data URL must be base64 encoded"))?;
    if !ALLOWED_MIME.contains(&mime.to_lowercase().as_str()) {
        return Err(DomainError::validation(format!(
            "unsupported receipt type {mime}"
        )));
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| DomainError::validation("receipt payload is not valid base64"))?;
    if bytes.is_empty() {
        return Err(DomainError::validation("receipt image is empty"));
    }
    if bytes.len() > MAX_RECEIPT_BYTES {
        return Err(DomainError::validation(format!(
            "receipt image is {} bytes; limit is {MAX_RECEIPT_BYTES}",
            bytes.len()
        )));
    }
    Ok(trimmed.to_string())
}

/// Empty strings mean "no receipt".
pub fn validate_optional_receipt(value: Option<String>) -> Result<Option<String>, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => validate_receipt(&v).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_url(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn accepts_small_png() {
        let url = data_url("image/png", &[0x89, b'P', b'N', b'G']);
        assert_eq!(validate_receipt(&url).unwrap(), url);
    }

    #[test]
    fn rejects_non_images_and_garbage() {
        assert!(validate_receipt(&data_url("application/pdf", b"%PDF")).is_err());
        assert!(validate_receipt("data:image/png;base64,***").is_err());
        assert!(validate_receipt("https://example.com/r.png").is_err());
        assert!(validate_receipt("data:image/png,plain").is_err());
    }

    #[test]
    fn rejects_oversized_payload() {
        let big = vec![0u8; MAX_RECEIPT_BYTES + 1];
        assert!(validate_receipt(&data_url("image/jpeg", &big)).is_err());
    }

    #[test]
    fn blank_means_none() {
        assert_eq!(validate_optional_receipt(Some("  ".into())).unwrap(), None);
        assert_eq!(validate_optional_receipt(None).unwrap(), None);
    }
}
