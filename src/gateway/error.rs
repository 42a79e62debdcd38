use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayErrorCode {
    InvalidArgument,
    PermissionDenied,
    NotFound,
    Conflict,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    Internal,
}

impl GatewayErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayErrorCode::InvalidArgument => "gateway/invalid-argument",
            GatewayErrorCode::PermissionDenied => "gateway/permission-denied",
            GatewayErrorCode::NotFound => "gateway/not-found",
            GatewayErrorCode::Conflict => "gateway/conflict",
            GatewayErrorCode::Unauthenticated => "gateway/unauthenticated",
            GatewayErrorCode::Unavailable => "gateway/unavailable",
            GatewayErrorCode::DeadlineExceeded => "gateway/deadline-exceeded",
            GatewayErrorCode::Internal => "gateway/internal",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    message: String,
    /// Backend specific code, e.g. a Postgres SQLSTATE.
    pub details: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transient failures worth offering a retry for.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code,
            GatewayErrorCode::Unavailable
                | GatewayErrorCode::DeadlineExceeded
                | GatewayErrorCode::Internal
        )
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({}, {})", self.message, self.code_str(), details),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for GatewayError {}

pub type GatewayResult<T> = Result<T, GatewayError>;

pub fn invalid_argument(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::InvalidArgument, message)
}

pub fn permission_denied(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::PermissionDenied, message)
}

pub fn not_found(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::NotFound, message)
}

pub fn conflict(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::Conflict, message)
}

pub fn unauthenticated(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::DeadlineExceeded, message)
}

pub fn internal_error(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorCode::Internal, message)
}
