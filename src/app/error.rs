use std::fmt;

use crate::gateway::GatewayError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    MissingOption { name: &'static str },
    InvalidOption { name: &'static str, message: String },
    InvalidSettings { field: &'static str, message: String },
    Connection(GatewayError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingOption { name } => write!(f, "Missing required option '{name}'"),
            AppError::InvalidOption { name, message } => {
                write!(f, "Invalid option '{name}': {message}")
            }
            AppError::InvalidSettings { field, message } => {
                write!(f, "Invalid setting '{field}': {message}")
            }
            AppError::Connection(err) => write!(f, "Could not set up the backend connection: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Connection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Connection(err)
    }
}
