//! Structured errors for everything that crosses the HTTP pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Categories of API errors, used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Malformed input (HTTP 400 or local validation). Shown inline per field.
    Validation,
    /// HTTP 401: invalid credentials or an expired/invalid token.
    Unauthorized,
    /// HTTP 403: authenticated but not allowed.
    Forbidden,
    /// HTTP 404: shown inline, never as a global notice.
    NotFound,
    /// Any other non-success HTTP status.
    Status,
    /// Connection failure, timeout, or other transport-level error.
    Transport,
    /// Response body could not be decoded.
    Decode,
    /// The action needs a logged-in user and there is none.
    AuthRequired,
    /// Local credential storage failed.
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Forbidden => "forbidden",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Status => "http_status",
            ApiErrorKind::Transport => "transport",
            ApiErrorKind::Decode => "decode",
            ApiErrorKind::AuthRequired => "auth_required",
            ApiErrorKind::Storage => "storage",
        };
        write!(f, "{name}")
    }
}

pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error returned by the API layer.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, when the error came from a response.
    pub status: Option<u16>,
    /// Transport-level summary (e.g. "Request failed with status code 500").
    pub message: String,
    /// Parsed JSON error payload, if the backend sent one.
    pub body: Option<Value>,
    fields: FieldErrors,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            body: None,
            fields: FieldErrors::new(),
        }
    }

    /// Builds an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let kind = match status {
            400 => ApiErrorKind::Validation,
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            _ => ApiErrorKind::Status,
        };
        let body = serde_json::from_slice::<Value>(body).ok();
        let fields = if kind == ApiErrorKind::Validation {
            body.as_ref().map(parse_field_errors).unwrap_or_default()
        } else {
            FieldErrors::new()
        };
        Self {
            kind,
            status: Some(status),
            message: format!("Request failed with status code {status}"),
            body,
            fields,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::AuthRequired, message)
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        Self::new(ApiErrorKind::Storage, format!("{err:#}"))
    }

    /// A locally produced validation error. The first message of the first
    /// field becomes the summary.
    pub fn validation(fields: FieldErrors) -> Self {
        let message = fields
            .iter()
            .find_map(|(field, msgs)| msgs.first().map(|m| format!("{field}: {m}")))
            .unwrap_or_else(|| "Invalid input".to_string());
        Self {
            kind: ApiErrorKind::Validation,
            status: None,
            message,
            body: None,
            fields,
        }
    }

    /// Validation error for a single field-less message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    /// Replaces the summary with a user-facing message, keeping the rest.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Per-field validation messages (empty for other kinds).
    pub fn field_errors(&self) -> &FieldErrors {
        &self.fields
    }

    /// The payload's `detail` string, as sent by the token endpoints.
    pub fn detail(&self) -> Option<&str> {
        self.body_str("detail")
    }

    /// Message for a global notice: the payload's `message`, then its
    /// `error`, then the transport-level string.
    pub fn notice_message(&self) -> String {
        self.body_str("message")
            .or_else(|| self.body_str("error"))
            .map_or_else(|| self.message.clone(), str::to_string)
    }

    /// Whether the pipeline should announce this error globally.
    /// Validation and not-found errors are handled inline by callers.
    pub fn is_announced(&self) -> bool {
        !matches!(
            self.kind,
            ApiErrorKind::Validation | ApiErrorKind::NotFound | ApiErrorKind::AuthRequired
        )
    }

    fn body_str(&self, key: &str) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Reads a DRF-style `{"field": ["msg", ...]}` payload.
fn parse_field_errors(body: &Value) -> FieldErrors {
    let Some(object) = body.as_object() else {
        return FieldErrors::new();
    };

    object
        .iter()
        .filter_map(|(field, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect()
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
