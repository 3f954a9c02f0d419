//! Error taxonomy for client operations.
//!
//! The transport is the only place raw HTTP and network failures are
//! translated into these kinds; everything above it propagates unchanged.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured detail attached to a service-reported failure.
#[derive(Debug, Clone, Default)]
pub struct ServiceFault {
    /// Human-readable message from the error envelope (or raw body).
    pub message: String,
    /// Machine code, e.g. `EMAIL_EXISTS` or `PERMISSION_DENIED`.
    pub code: Option<String>,
    /// HTTP status that produced the failure.
    pub http_status: Option<u16>,
    /// Any structured `errors` detail the envelope carried.
    pub details: Option<serde_json::Value>,
}

impl ServiceFault {
    fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Errors surfaced by client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input; raised synchronously, never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Expired/invalid credential or bad user credentials.
    #[error("authentication failed: {}", .0.message)]
    Auth(ServiceFault),

    /// Authorization denied.
    #[error("permission denied: {}", .0.message)]
    Permission(ServiceFault),

    /// Resource absent. Read operations soften this to an empty result.
    #[error("not found: {}", .0.message)]
    NotFound(ServiceFault),

    /// Too many requests; carries the server's retry hint when present.
    #[error("rate limited: {}", .fault.message)]
    RateLimited {
        fault: ServiceFault,
        retry_after_secs: Option<u64>,
    },

    /// Transport-level failure after exhausting the retry budget.
    #[error("network error after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Catch-all for unrecognized service error codes.
    #[error("service error: {}", .0.message)]
    Service(ServiceFault),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity provider codes that indicate a credential/user problem.
const AUTH_CODES: &[&str] = &[
    "ACCESS_TOKEN_EXPIRED",
    "UNAUTHENTICATED",
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "INVALID_REFRESH_TOKEN",
    "INVALID_EMAIL",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "EMAIL_EXISTS",
    "EMAIL_NOT_FOUND",
    "USER_DISABLED",
    "USER_NOT_FOUND",
    "WEAK_PASSWORD",
    "TOO_MANY_ATTEMPTS_TRY_LATER",
];

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(ServiceFault::bare(msg))
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(ServiceFault::bare(path))
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(ServiceFault::bare(msg))
    }

    /// Translate a non-2xx response into the taxonomy.
    ///
    /// Parses the service's JSON error envelope
    /// (`{"error": {"code", "message", "status", "errors"}}`) when present,
    /// falling back to the raw body text.
    pub fn from_response(http_status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        let mut fault = ServiceFault {
            message: body.trim().to_string(),
            code: None,
            http_status: Some(http_status),
            details: None,
        };

        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
            let envelope = &parsed["error"];
            if envelope.is_object() {
                if let Some(msg) = envelope["message"].as_str() {
                    fault.message = msg.to_string();
                }
                fault.code = envelope["status"]
                    .as_str()
                    .map(str::to_string)
                    .or_else(|| machine_code(&fault.message));
                if !envelope["errors"].is_null() {
                    fault.details = Some(envelope["errors"].clone());
                }
            }
        }
        // Identity endpoints prefix their machine code to the message.
        if let Some(code) = machine_code(&fault.message) {
            if AUTH_CODES.contains(&code.as_str()) {
                fault.code = Some(code);
            }
        }

        let code: String = fault.code.clone().unwrap_or_default();
        let is_auth_code = AUTH_CODES.contains(&code.as_str());

        match http_status {
            401 => Self::Auth(fault),
            _ if is_auth_code => Self::Auth(fault),
            403 => Self::Permission(fault),
            _ if code == "PERMISSION_DENIED" => Self::Permission(fault),
            404 => Self::NotFound(fault),
            429 => Self::RateLimited {
                fault,
                retry_after_secs,
            },
            _ if code == "RESOURCE_EXHAUSTED" => Self::RateLimited {
                fault,
                retry_after_secs,
            },
            _ => Self::Service(fault),
        }
    }

    /// HTTP status the failure maps to, when known.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Auth(f) | Self::Permission(f) | Self::NotFound(f) | Self::Service(f) => {
                f.http_status
            }
            Self::RateLimited { fault, .. } => fault.http_status.or(Some(429)),
            Self::Validation(_) | Self::Network { .. } | Self::Json(_) => None,
        }
    }

    /// Server-provided retry hint in seconds, if any.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Whether the failure is worth another attempt.
    ///
    /// Only rate limits and the transient server statuses qualify; everything
    /// else is terminal on first occurrence.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Service(f) => matches!(f.http_status, Some(500 | 502 | 503 | 504)),
            _ => false,
        }
    }
}

/// Extract a leading `ALL_CAPS_CODE` token from an envelope message.
fn machine_code(message: &str) -> Option<String> {
    let token = message.split_whitespace().next()?;
    let token = token.trim_end_matches(':');
    if !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        Some(token.to_string())
    } else {
        None
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(code: u16, message: &str) -> String {
        format!(
            r#"{{"error": {{"code": {}, "message": "{}", "errors": [{{"reason": "invalid"}}]}}}}"#,
            code, message
        )
    }

    #[test]
    fn test_401_maps_to_auth() {
        let err = Error::from_response(401, &envelope(401, "Request had invalid credentials"), None);
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(err.http_status(), Some(401));
    }

    #[test]
    fn test_expired_token_code_maps_to_auth() {
        let err = Error::from_response(400, &envelope(400, "ACCESS_TOKEN_EXPIRED"), None);
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_user_management_codes_map_to_auth() {
        for code in [
            "INVALID_EMAIL",
            "INVALID_PASSWORD",
            "EMAIL_EXISTS",
            "USER_DISABLED",
            "WEAK_PASSWORD : Password should be at least 6 characters",
            "TOO_MANY_ATTEMPTS_TRY_LATER",
        ] {
            let err = Error::from_response(400, &envelope(400, code), None);
            assert!(matches!(err, Error::Auth(_)), "{} should map to Auth", code);
        }
    }

    #[test]
    fn test_403_maps_to_permission() {
        let err = Error::from_response(403, &envelope(403, "The caller does not have permission"), None);
        assert!(matches!(err, Error::Permission(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_404_maps_to_not_found() {
        let err = Error::from_response(404, &envelope(404, "Document not found"), None);
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_429_carries_retry_after() {
        let err = Error::from_response(429, &envelope(429, "Quota exceeded"), Some(7));
        assert!(matches!(err, Error::RateLimited { .. }));
        assert_eq!(err.retry_after_secs(), Some(7));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_5xx_is_retryable_service_error() {
        for status in [500u16, 502, 503, 504] {
            let err = Error::from_response(status, "backend unavailable", None);
            assert!(matches!(err, Error::Service(_)));
            assert!(err.is_retryable(), "{} should be retryable", status);
        }
    }

    #[test]
    fn test_400_is_terminal_service_error() {
        let err = Error::from_response(400, &envelope(400, "Invalid field path"), None);
        assert!(matches!(err, Error::Service(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_non_json_body_falls_back_to_raw_text() {
        let err = Error::from_response(500, "<html>boom</html>", None);
        match err {
            Error::Service(fault) => {
                assert_eq!(fault.message, "<html>boom</html>");
                assert_eq!(fault.http_status, Some(500));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fault_carries_structured_details() {
        let err = Error::from_response(400, &envelope(400, "Invalid field path"), None);
        match err {
            Error::Service(fault) => assert!(fault.details.is_some()),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
