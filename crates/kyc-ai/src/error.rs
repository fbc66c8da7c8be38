use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::kyc::KycServiceError;
use crate::workflows::loans::LoanServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Kyc(KycServiceError),
    Loan(LoanServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Kyc(err) => write!(f, "kyc workflow error: {}", err),
            AppError::Loan(err) => write!(f, "loan workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Kyc(err) => Some(err),
            AppError::Loan(err) => Some(err),
        }
    }
}

/// JSON failure body shared by every router: `{ "success": false, "error": .. }`.
pub fn failure_response(status: StatusCode, message: impl fmt::Display) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message.to_string(),
    }));
    (status, body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Kyc(err) => err.status_code(),
            AppError::Loan(err) => err.status_code(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        failure_response(status, self)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<KycServiceError> for AppError {
    fn from(value: KycServiceError) -> Self {
        Self::Kyc(value)
    }
}

impl From<LoanServiceError> for AppError {
    fn from(value: LoanServiceError) -> Self {
        Self::Loan(value)
    }
}
