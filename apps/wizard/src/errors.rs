use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::wizard::controller::{FETCH_FAILED, SAVE_FAILED};
use crate::wizard::WizardError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A failed résumé API call; `fallback` is shown when the API gave no message.
    #[error("Resume API error: {source}")]
    Gateway {
        #[source]
        source: GatewayError,
        fallback: &'static str,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn gateway(source: GatewayError, fallback: &'static str) -> Self {
        AppError::Gateway { source, fallback }
    }
}

impl From<GatewayError> for AppError {
    fn from(source: GatewayError) -> Self {
        AppError::gateway(source, "The resume service could not be reached")
    }
}

/// HTTP status a gateway failure is reported with.
pub fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Api { .. } | GatewayError::Http(_) | GatewayError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Load { source, .. } => AppError::gateway(source, FETCH_FAILED),
            WizardError::Submit { source, .. } => AppError::gateway(source, SAVE_FAILED),
            WizardError::Edit(e) => AppError::UnprocessableEntity(e.to_string()),
            conflict @ (WizardError::InFlight | WizardError::SessionFinished) => {
                AppError::Conflict(conflict.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Gateway { source, fallback } => {
                let status = gateway_status(source);
                if status.is_server_error() {
                    tracing::error!("Resume API error: {source}");
                }
                let message = source.remote_message().unwrap_or(*fallback).to_string();
                (status, "GATEWAY_ERROR", message)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
