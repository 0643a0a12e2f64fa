use serde::Deserialize;

use crate::{EditError, RawResponse, Result, GENERIC_FAILURE};

/// JSON error payload. The service reports `errors`; some hosts use a single
/// `error` string instead.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// First non-blank message, if any.
    pub fn first_message(&self) -> Option<String> {
        self.errors
            .iter()
            .chain(self.error.iter())
            .map(|msg| msg.trim())
            .find(|msg| !msg.is_empty())
            .map(str::to_string)
    }
}

/// Image bytes returned by a successful edit.
#[derive(Debug, Clone)]
pub struct ServiceImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Classify a completed exchange as a result image or a user-facing failure.
pub fn interpret(response: RawResponse) -> Result<ServiceImage> {
    let media_type = response.media_type();

    if !response.is_success() {
        let message = ErrorBody::parse(&response.body)
            .and_then(|body| body.first_message())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        tracing::warn!(status = response.status, %message, "edit request rejected");
        return Err(EditError::Network {
            status: Some(response.status),
            message,
        });
    }

    if media_type.as_deref() == Some("application/json") {
        let message = ErrorBody::parse(&response.body)
            .and_then(|body| body.first_message())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        tracing::warn!(status = response.status, %message, "service answered without an image");
        return Err(EditError::Service(message));
    }

    if response.body.is_empty() {
        tracing::warn!(status = response.status, "service returned an empty body");
        return Err(EditError::Service(GENERIC_FAILURE.to_string()));
    }

    let mime = media_type
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or_else(|| "image/png".to_string());

    Ok(ServiceImage {
        bytes: response.body,
        mime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_vec(),
        }
    }

    #[test]
    fn failure_status_surfaces_first_error() {
        let err = interpret(response(
            400,
            Some("application/json"),
            br#"{"errors":["bad mask","second"]}"#,
        ))
        .unwrap_err();

        assert_eq!(err.user_message(), "bad mask");
        assert_eq!(err.status(), Some(400));
        assert!(matches!(err, EditError::Network { .. }));
    }

    #[test]
    fn failure_without_readable_body_is_generic() {
        let bodies: [&[u8]; 4] = [
            b"",
            b"<html>502</html>",
            br#"{"errors":[]}"#,
            br#"{"errors":["  "]}"#,
        ];
        for body in bodies {
            let err = interpret(response(502, Some("text/html"), body)).unwrap_err();
            assert_eq!(err.user_message(), GENERIC_FAILURE);
        }
    }

    #[test]
    fn single_error_field_is_understood() {
        let err = interpret(response(
            503,
            Some("application/json"),
            br#"{"error":"Model is loading"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.user_message(), "Model is loading");
    }

    #[test]
    fn json_on_success_status_is_a_service_error() {
        let err = interpret(response(
            200,
            Some("application/json; charset=utf-8"),
            br#"{"errors":["content moderation"]}"#,
        ))
        .unwrap_err();

        assert!(matches!(err, EditError::Service(_)));
        assert_eq!(err.user_message(), "content moderation");
    }

    #[test]
    fn empty_success_body_is_a_service_error() {
        let err = interpret(response(200, Some("image/png"), b"")).unwrap_err();
        assert!(matches!(err, EditError::Service(_)));
    }

    #[test]
    fn success_returns_image_bytes_and_type() {
        let image = interpret(response(200, Some("image/webp"), b"RIFFxxxxWEBP")).unwrap();
        assert_eq!(image.mime, "image/webp");
        assert_eq!(image.bytes, b"RIFFxxxxWEBP");

        let image = interpret(response(200, None, b"\x89PNG")).unwrap();
        assert_eq!(image.mime, "image/png");
    }
}
