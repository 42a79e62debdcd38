use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::gateway::error::internal_error;
use crate::gateway::{GatewayError, GatewayErrorCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncErrorCode {
    /// Rejected locally before any network call.
    Validation,
    /// The action needs a signed-in viewer.
    AuthRequired,
    /// The remote gateway returned a failure.
    Gateway,
    /// The referenced entity is not in the store's local state.
    NotLoaded,
}

impl SyncErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorCode::Validation => "sync/validation",
            SyncErrorCode::AuthRequired => "sync/auth-required",
            SyncErrorCode::Gateway => "sync/gateway",
            SyncErrorCode::NotLoaded => "sync/not-loaded",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncError {
    pub code: SyncErrorCode,
    message: String,
    /// Underlying gateway failure for [`SyncErrorCode::Gateway`].
    pub gateway: Option<GatewayError>,
}

impl SyncError {
    pub fn new(code: SyncErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            gateway: None,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether presenting a retry button makes sense. Validation and auth
    /// failures need the user to change something first.
    pub fn is_retryable(&self) -> bool {
        match (&self.code, &self.gateway) {
            (SyncErrorCode::Gateway, Some(err)) => !matches!(
                err.code,
                GatewayErrorCode::InvalidArgument
                    | GatewayErrorCode::PermissionDenied
                    | GatewayErrorCode::Unauthenticated
            ),
            (SyncErrorCode::Gateway, None) => true,
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.gateway
            .as_ref()
            .is_some_and(|err| err.code == GatewayErrorCode::PermissionDenied)
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.gateway {
            Some(source) => write!(f, "{} ({}): {}", self.message, self.code_str(), source),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.gateway
            .as_ref()
            .map(|err| err as &(dyn Error + 'static))
    }
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        gateway_failure(err)
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

pub fn validation(message: impl Into<String>) -> SyncError {
    SyncError::new(SyncErrorCode::Validation, message)
}

pub fn auth_required() -> SyncError {
    SyncError::new(
        SyncErrorCode::AuthRequired,
        "Você precisa estar conectado para fazer isso",
    )
}

pub fn not_loaded(what: impl Display) -> SyncError {
    SyncError::new(SyncErrorCode::NotLoaded, format!("{what} não está carregado"))
}

/// Wraps a gateway failure with a user-facing message chosen from its code.
pub fn gateway_failure(err: GatewayError) -> SyncError {
    let message = match err.code {
        GatewayErrorCode::PermissionDenied => "Você não tem permissão para fazer isso",
        GatewayErrorCode::Unauthenticated => "Sua sessão expirou, entre novamente",
        GatewayErrorCode::Unavailable | GatewayErrorCode::DeadlineExceeded => {
            "Sem conexão com o servidor, tente novamente"
        }
        GatewayErrorCode::NotFound => "O conteúdo não existe mais",
        _ => "Algo deu errado, tente novamente",
    };
    SyncError {
        code: SyncErrorCode::Gateway,
        message: message.to_owned(),
        gateway: Some(err),
    }
}

/// A row the gateway returned could not be decoded into `what`.
pub(crate) fn internal_decode(what: &str, err: serde_json::Error) -> SyncError {
    gateway_failure(internal_error(format!("Malformed {what} row: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::error::{permission_denied, unavailable};

    #[test]
    fn retry_affordance_depends_on_gateway_code() {
        assert!(SyncError::from(unavailable("offline")).is_retryable());
        let denied = SyncError::from(permission_denied("rls"));
        assert!(!denied.is_retryable());
        assert!(denied.is_permission_denied());
        assert!(!validation("vazio").is_retryable());
        assert!(!auth_required().is_retryable());
    }

    #[test]
    fn exposes_gateway_source() {
        let err = SyncError::from(unavailable("offline"));
        assert_eq!(err.code_str(), "sync/gateway");
        assert!(err.source().is_some());
    }
}
