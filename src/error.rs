//! Error types for image editing.

use std::time::Duration;

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unexpected error occurred while generating the image.";

/// Longest API error body we keep in a message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while preparing uploads or editing images.
#[derive(Debug, thiserror::Error)]
pub enum MirageError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A file whose declared type is not an image was offered for upload.
    #[error("Please upload an image file (got {0})")]
    UnsupportedMediaType(String),

    /// An image required by the selected mode has not been uploaded.
    #[error("{0}")]
    MissingImage(String),

    /// A generation is already in flight.
    #[error("a generation is already in progress")]
    Busy,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading an upload or saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirageError {
    /// Returns true for errors raised before any remote call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingImage(_) | Self::UnsupportedMediaType(_) | Self::Busy
        )
    }

    /// Returns the single human-readable line shown in the error banner.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::MissingImage(msg) => msg.trim().to_string(),
            Self::RateLimited {
                retry_after: Some(delay),
            } => format!("Rate limited; try again in {}s.", delay.as_secs().max(1)),
            Self::RateLimited { retry_after: None } => "Rate limited; try again later.".into(),
            Self::Api { message, .. } if message.trim().is_empty() => String::new(),
            other => other.to_string(),
        };
        if message.is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Extracts the `Retry-After` header as whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Pulls the human message out of a Google-style error body and bounds its size.
///
/// Bodies look like `{"error":{"code":400,"message":"...","status":"..."}}`;
/// anything else is kept as raw text.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if extracted.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = extracted.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        extracted
    }
}

/// Result type alias for image editing operations.
pub type Result<T> = std::result::Result<T, MirageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_validation() {
        assert!(MirageError::MissingImage("need subject".into()).is_validation());
        assert!(MirageError::UnsupportedMediaType("text/plain".into()).is_validation());
        assert!(MirageError::Busy.is_validation());

        assert!(!MirageError::Auth("bad key".into()).is_validation());
        assert!(!MirageError::RateLimited { retry_after: None }.is_validation());
        assert!(!MirageError::Decode("bad base64".into()).is_validation());
    }

    #[test]
    fn test_user_message_uses_error_text() {
        let err = MirageError::Api {
            status: 400,
            message: "Image too large".into(),
        };
        assert_eq!(err.user_message(), "API error: 400 - Image too large");

        let err = MirageError::MissingImage("Please upload the subject photo.".into());
        assert_eq!(err.user_message(), "Please upload the subject photo.");
    }

    #[test]
    fn test_user_message_rate_limited() {
        let err = MirageError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.user_message(), "Rate limited; try again in 30s.");

        let err = MirageError::RateLimited { retry_after: None };
        assert_eq!(err.user_message(), "Rate limited; try again later.");
        assert!(!err.user_message().contains("None"));
    }

    #[test]
    fn test_user_message_fallback() {
        let err = MirageError::Api {
            status: 500,
            message: "   ".into(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);

        let err = MirageError::MissingImage(String::new());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_sanitize_extracts_google_message() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(sanitize_error_message(body), "Quota exceeded");
        assert_eq!(sanitize_error_message("  plain failure \n"), "plain failure");
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let msg = sanitize_error_message(&body);
        assert_eq!(msg.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_error_display() {
        let err = MirageError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");

        let err = MirageError::UnsupportedMediaType("text/plain".into());
        assert_eq!(err.to_string(), "Please upload an image file (got text/plain)");
    }
}
