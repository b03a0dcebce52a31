//! Classification of OpenAI-compatible API failures.

use studia_core::Error;

/// Failure categories reported by OpenAI-compatible endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Malformed or unsupported request.
    InvalidRequest,
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Credentials valid but not allowed to use the model.
    PermissionDenied,
    /// Model not found or not available.
    ModelNotFound,
    /// Prompt exceeds the model's context window.
    ContextLengthExceeded,
    /// Prompt rejected by the provider's content policy.
    ContentFiltered,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status, error `type` and error `code`.
    pub fn from_response(status: u16, error_type: &str, code: Option<&str>) -> Self {
        let code = code.unwrap_or("");
        let mentions = |needle: &str| error_type.contains(needle) || code.contains(needle);

        match status {
            401 => Self::AuthenticationError,
            403 => Self::PermissionDenied,
            404 => Self::ModelNotFound,
            413 => Self::ContextLengthExceeded,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError,
            _ if mentions("context_length") => Self::ContextLengthExceeded,
            _ if mentions("content_filter") || mentions("content_policy") => Self::ContentFiltered,
            _ if code == "model_not_found" => Self::ModelNotFound,
            400 | 422 => Self::InvalidRequest,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert an OpenAI failure into the pipeline error taxonomy.
pub fn to_studia_error(code: OpenAIErrorCode, message: &str) -> Error {
    match code {
        OpenAIErrorCode::InvalidRequest => Error::InvalidRequest(message.to_string()),
        OpenAIErrorCode::AuthenticationError => {
            Error::Unauthorized(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::PermissionDenied => Error::Forbidden(message.to_string()),
        OpenAIErrorCode::ModelNotFound => Error::Config(format!("Model not found: {}", message)),
        OpenAIErrorCode::ContextLengthExceeded => Error::ContextTooLong(message.to_string()),
        OpenAIErrorCode::ContentFiltered => Error::SafetyBlocked(message.to_string()),
        OpenAIErrorCode::RateLimitExceeded => Error::RateLimitExceeded(message.to_string()),
        OpenAIErrorCode::ServerError => Error::ServerError(message.to_string()),
        OpenAIErrorCode::Unknown => Error::InvalidRequest(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        let code = OpenAIErrorCode::from_response(401, "invalid_request_error", Some("invalid_api_key"));
        assert_eq!(code, OpenAIErrorCode::AuthenticationError);
    }

    #[test]
    fn test_error_code_from_403() {
        let code = OpenAIErrorCode::from_response(403, "permission_error", None);
        assert_eq!(code, OpenAIErrorCode::PermissionDenied);
    }

    #[test]
    fn test_error_code_from_429() {
        let code = OpenAIErrorCode::from_response(429, "rate_limit_exceeded", None);
        assert_eq!(code, OpenAIErrorCode::RateLimitExceeded);
    }

    #[test]
    fn test_error_code_context_length_in_code() {
        let code = OpenAIErrorCode::from_response(
            400,
            "invalid_request_error",
            Some("context_length_exceeded"),
        );
        assert_eq!(code, OpenAIErrorCode::ContextLengthExceeded);
    }

    #[test]
    fn test_error_code_from_413() {
        let code = OpenAIErrorCode::from_response(413, "", None);
        assert_eq!(code, OpenAIErrorCode::ContextLengthExceeded);
    }

    #[test]
    fn test_error_code_content_policy() {
        let code = OpenAIErrorCode::from_response(
            400,
            "invalid_request_error",
            Some("content_policy_violation"),
        );
        assert_eq!(code, OpenAIErrorCode::ContentFiltered);
    }

    #[test]
    fn test_error_code_plain_400() {
        let code = OpenAIErrorCode::from_response(400, "invalid_request_error", None);
        assert_eq!(code, OpenAIErrorCode::InvalidRequest);
    }

    #[test]
    fn test_error_code_from_5xx() {
        for status in [500, 502, 503, 504] {
            let code = OpenAIErrorCode::from_response(status, "server_error", None);
            assert_eq!(code, OpenAIErrorCode::ServerError, "status {status}");
        }
    }

    #[test]
    fn test_error_code_from_unknown() {
        let code = OpenAIErrorCode::from_response(418, "im_a_teapot", None);
        assert_eq!(code, OpenAIErrorCode::Unknown);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(OpenAIErrorCode::RateLimitExceeded.is_retryable());
        assert!(OpenAIErrorCode::ServerError.is_retryable());
        assert!(!OpenAIErrorCode::AuthenticationError.is_retryable());
        assert!(!OpenAIErrorCode::ContextLengthExceeded.is_retryable());
        assert!(!OpenAIErrorCode::ContentFiltered.is_retryable());
    }

    #[test]
    fn test_conversion_agrees_on_retryability() {
        let codes = [
            OpenAIErrorCode::InvalidRequest,
            OpenAIErrorCode::AuthenticationError,
            OpenAIErrorCode::PermissionDenied,
            OpenAIErrorCode::ModelNotFound,
            OpenAIErrorCode::ContextLengthExceeded,
            OpenAIErrorCode::ContentFiltered,
            OpenAIErrorCode::RateLimitExceeded,
            OpenAIErrorCode::ServerError,
            OpenAIErrorCode::Unknown,
        ];
        for code in codes {
            assert_eq!(
                to_studia_error(code, "x").is_retryable(),
                code.is_retryable(),
                "{code:?}"
            );
        }
    }

    #[test]
    fn test_auth_failure_halts_pipeline() {
        let err = to_studia_error(OpenAIErrorCode::AuthenticationError, "Invalid key");
        assert!(err.halts_pipeline());
        assert!(err.to_string().contains("Authentication failed"));
    }
}
