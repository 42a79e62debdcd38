use reqwest::StatusCode;
use serde::Deserialize;

use super::error::{
    conflict, deadline_exceeded, internal_error, invalid_argument, not_found, permission_denied,
    unauthenticated, unavailable, GatewayError,
};

/// Error payload returned by PostgREST and the storage/auth services.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "error_description", alias = "msg")]
    description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn map_http_error(status: StatusCode, body: &str) -> GatewayError {
    let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();
    let message = payload
        .message
        .clone()
        .or_else(|| payload.description.clone())
        .or_else(|| payload.error.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    let error = match payload.code.as_deref() {
        Some(code) => map_backend_code(code, status, message),
        None => map_status(status, message),
    };
    match payload.code {
        Some(code) => error.with_details(code),
        None => error,
    }
}

fn map_backend_code(code: &str, status: StatusCode, message: String) -> GatewayError {
    match code {
        "23505" => conflict(message),
        "42501" => permission_denied(message),
        "PGRST116" => not_found(message),
        "PGRST301" | "PGRST302" | "PGRST303" => unauthenticated(message),
        "57014" => deadline_exceeded(message),
        code if code.starts_with("22") || code.starts_with("23") => invalid_argument(message),
        _ => map_status(status, message),
    }
}

fn map_status(status: StatusCode, message: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED => unauthenticated(message),
        StatusCode::FORBIDDEN => permission_denied(message),
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => not_found(message),
        StatusCode::CONFLICT => conflict(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => deadline_exceeded(message),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => unavailable(message),
        status if status.is_client_error() => invalid_argument(message),
        _ => internal_error(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::error::GatewayErrorCode;

    #[test]
    fn maps_postgres_codes_before_status() {
        let body = r#"{"code":"42501","message":"new row violates row-level security policy","details":null,"hint":null}"#;
        let error = map_http_error(StatusCode::UNAUTHORIZED, body);
        assert_eq!(error.code, GatewayErrorCode::PermissionDenied);
        assert_eq!(error.details.as_deref(), Some("42501"));
        assert_eq!(error.message(), "new row violates row-level security policy");

        let duplicate = map_http_error(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(duplicate.code, GatewayErrorCode::Conflict);
    }

    #[test]
    fn falls_back_to_status_for_plain_bodies() {
        let error = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        assert_eq!(error.code, GatewayErrorCode::Unavailable);
        assert_eq!(error.message(), "Service Unavailable");
    }

    #[test]
    fn reads_auth_error_descriptions() {
        let error = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(error.code, GatewayErrorCode::InvalidArgument);
        assert_eq!(error.message(), "Invalid login credentials");
    }
}
