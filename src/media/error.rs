use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::gateway::{GatewayError, GatewayErrorCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaErrorCode {
    InvalidArgument,
    Unauthorized,
    ObjectNotFound,
    Unavailable,
    Internal,
}

impl MediaErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaErrorCode::InvalidArgument => "media/invalid-argument",
            MediaErrorCode::Unauthorized => "media/unauthorized",
            MediaErrorCode::ObjectNotFound => "media/object-not-found",
            MediaErrorCode::Unavailable => "media/unavailable",
            MediaErrorCode::Internal => "media/internal-error",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaError {
    pub code: MediaErrorCode,
    message: String,
}

impl MediaError {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for MediaError {}

impl From<GatewayError> for MediaError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::InvalidArgument | GatewayErrorCode::Conflict => {
                MediaErrorCode::InvalidArgument
            }
            GatewayErrorCode::PermissionDenied | GatewayErrorCode::Unauthenticated => {
                MediaErrorCode::Unauthorized
            }
            GatewayErrorCode::NotFound => MediaErrorCode::ObjectNotFound,
            GatewayErrorCode::Unavailable | GatewayErrorCode::DeadlineExceeded => {
                MediaErrorCode::Unavailable
            }
            GatewayErrorCode::Internal => MediaErrorCode::Internal,
        };
        MediaError::new(code, err.message())
    }
}

pub type MediaResult<T> = Result<T, MediaError>;

pub fn invalid_argument(message: impl Into<String>) -> MediaError {
    MediaError::new(MediaErrorCode::InvalidArgument, message)
}

pub fn object_not_found(handle: &str) -> MediaError {
    MediaError::new(
        MediaErrorCode::ObjectNotFound,
        format!("No media object for handle '{handle}'"),
    )
}

pub fn unavailable(message: impl Into<String>) -> MediaError {
    MediaError::new(MediaErrorCode::Unavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> MediaError {
    MediaError::new(MediaErrorCode::Internal, message)
}
