//! # Upload Extraction
//!
//! Pulls the image payload out of a `/predict` request body. Browsers post a
//! `multipart/form-data` form with a `file` part; other clients may post the
//! image bytes directly.

use std::convert::Infallible;

use bytes::Bytes;
use futures_util::stream;

/// Name of the form field carrying the image
pub const FILE_FIELD: &str = "file";

/// Reasons an upload cannot be handed to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum UploadError {
    /// Body larger than the configured limit
    TooLarge { limit: usize },
    /// Multipart body without a `file` part
    MissingFile,
    /// Malformed multipart body or content type
    Malformed(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::TooLarge { limit } => {
                write!(f, "Upload exceeds the {} byte limit", limit)
            }
            UploadError::MissingFile => {
                write!(f, "Multipart upload has no '{}' part", FILE_FIELD)
            }
            UploadError::Malformed(msg) => write!(f, "Malformed upload: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// Rejects a declared `Content-Length` above the limit before reading the body
pub fn check_content_length(content_length: Option<&str>, limit: usize) -> Result<(), UploadError> {
    match content_length.and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(length) if length > limit as u64 => Err(UploadError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Whether a content type denotes a multipart form
pub fn is_multipart(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Image bytes carried by a request body.
///
/// Multipart bodies yield the `file` part (the first one if repeated); any
/// other body is returned as-is. An empty payload is passed through so the
/// decoder reports it.
pub async fn extract_image(
    content_type: Option<&str>,
    body: Bytes,
    limit: usize,
) -> Result<Bytes, UploadError> {
    if body.len() > limit {
        return Err(UploadError::TooLarge { limit });
    }

    let content_type = match content_type {
        Some(ct) if is_multipart(Some(ct)) => ct,
        _ => return Ok(body),
    };

    let boundary =
        multer::parse_boundary(content_type).map_err(|e| UploadError::Malformed(e.to_string()))?;
    let body_stream = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body_stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        if field.name() == Some(FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| UploadError::Malformed(e.to_string()));
        }
    }

    Err(UploadError::MissingFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_body(parts: &[(&str, &[u8])]) -> Bytes {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"leaf.png\"\r\n",
                    name
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Bytes::from(body)
    }

    fn multipart_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    #[tokio::test]
    async fn test_extracts_file_part() {
        let body = multipart_body(&[("note", b"hello"), ("file", b"\x89PNG data")]);

        let bytes = extract_image(Some(&multipart_type()), body, 1024)
            .await
            .expect("file part should be extracted");

        assert_eq!(&bytes[..], b"\x89PNG data");
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let body = multipart_body(&[("image", b"data")]);

        let err = extract_image(Some(&multipart_type()), body, 1024)
            .await
            .unwrap_err();

        assert_eq!(err, UploadError::MissingFile);
    }

    #[tokio::test]
    async fn test_raw_body_passthrough() {
        let body = Bytes::from_static(b"raw image bytes");

        let bytes = extract_image(Some("image/png"), body.clone(), 1024)
            .await
            .expect("raw body should pass through");
        assert_eq!(bytes, body);

        let bytes = extract_image(None, body.clone(), 1024)
            .await
            .expect("untyped body should pass through");
        assert_eq!(bytes, body);
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let err = extract_image(None, Bytes::from(vec![0u8; 11]), 10)
            .await
            .unwrap_err();
        assert_eq!(err, UploadError::TooLarge { limit: 10 });
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_is_malformed() {
        let err = extract_image(Some("multipart/form-data"), Bytes::from_static(b"x"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Malformed(_)));
    }

    #[test]
    fn test_content_length_check() {
        assert!(check_content_length(Some("100"), 100).is_ok());
        assert!(check_content_length(Some("101"), 100).is_err());
        assert!(check_content_length(None, 100).is_ok());
        assert!(check_content_length(Some("garbage"), 100).is_ok());
    }

    #[test]
    fn test_is_multipart() {
        assert!(is_multipart(Some("Multipart/Form-Data; boundary=abc")));
        assert!(!is_multipart(Some("image/jpeg")));
        assert!(!is_multipart(None));
    }
}
