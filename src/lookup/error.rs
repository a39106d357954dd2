use std::fmt;

use serde::{Deserialize, Serialize};

/// Which backend read path produced an error. Lets callers log read-model
/// lag quietly while still being loud about the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPath {
    ReadModel,
    CaseStore,
    Profile,
}

impl fmt::Display for ReadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ReadModel => "read-model",
            Self::CaseStore => "case-store",
            Self::Profile => "profile",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupErrorKind {
    /// 404. Expected under eventual consistency; absorbed as "no data yet".
    NotFound,
    /// 503. The read path is down, not the record missing; callers skip to
    /// the next fallback instead of retrying immediately.
    ServiceUnavailable,
    /// 401. Never retried; the external session layer owns the redirect.
    Authentication,
    /// Other 4xx: the request itself is malformed.
    InvalidRequest,
    /// 5xx other than 503; retried inside the transport with linear backoff.
    UpstreamTransient,
    /// DNS/connect/timeout failures, tagged apart from HTTP statuses.
    Network,
    /// Body arrived but did not decode as the expected shape.
    Decode,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupError {
    pub kind: LookupErrorKind,
    pub message: String,
    pub retryable: bool,
    pub path: Option<ReadPath>,
    pub http_status: Option<u16>,
}

impl LookupError {
    pub fn new(kind: LookupErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                LookupErrorKind::UpstreamTransient | LookupErrorKind::Network
            ),
            path: None,
            http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_path(mut self, path: ReadPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Expected, recoverable conditions of an eventually-consistent read
    /// path. The resolution chain treats these as "no record yet".
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self.kind,
            LookupErrorKind::NotFound | LookupErrorKind::ServiceUnavailable
        )
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == LookupErrorKind::Authentication
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.path, self.http_status) {
            (Some(path), Some(status)) => {
                write!(f, "{} (path={}, status={})", self.message, path, status)
            }
            (Some(path), None) => write!(f, "{} (path={})", self.message, path),
            (None, Some(status)) => write!(f, "{} (status={})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for LookupError {}

pub fn not_found(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::NotFound, message)
}

pub fn service_unavailable(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::ServiceUnavailable, message)
}

pub fn authentication_failure(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::Authentication, message)
}

pub fn network_failure(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::Network, message)
}

pub fn decode_failure(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::Decode, message)
}

pub fn internal_error(message: impl Into<String>) -> LookupError {
    LookupError::new(LookupErrorKind::Internal, message)
}

/// Maps an HTTP response status onto the lookup taxonomy. The first 240
/// characters of the body ride along for log context.
pub fn map_http_error(status: u16, path: ReadPath, body: &str) -> LookupError {
    let mut err = match status {
        401 => LookupError::new(LookupErrorKind::Authentication, "session rejected by backend"),
        404 => LookupError::new(LookupErrorKind::NotFound, "record not visible"),
        503 => LookupError::new(
            LookupErrorKind::ServiceUnavailable,
            format!("{} read path unavailable", path),
        ),
        other if (400..500).contains(&other) => LookupError::new(
            LookupErrorKind::InvalidRequest,
            format!("backend rejected request with status {}", other),
        ),
        other => LookupError::new(
            LookupErrorKind::UpstreamTransient,
            format!("backend returned status {}", other),
        ),
    };

    err = err.with_path(path).with_http_status(status);

    let excerpt: String = body.chars().take(240).collect();
    if !excerpt.is_empty() {
        err.message = format!("{}: {}", err.message, excerpt);
    }

    err
}
