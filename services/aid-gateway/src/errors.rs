use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use aid_ledger::Error as LedgerError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => "VALIDATION_ERROR",
                LedgerError::NotFound(_) => "NOT_FOUND",
                LedgerError::OverFunded { .. } => "OVER_FUNDED",
                LedgerError::ChainIntegrity { .. } => "CHAIN_INTEGRITY",
                LedgerError::LedgerHalted => "LEDGER_HALTED",
                LedgerError::Concurrency(_) => "SERVICE_UNAVAILABLE",
                LedgerError::Storage(_) => "STORAGE_ERROR",
                LedgerError::Config(_) => "CONFIGURATION_ERROR",
                _ => "INTERNAL_ERROR",
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::OverFunded { .. } => StatusCode::CONFLICT,
                LedgerError::ChainIntegrity { .. }
                | LedgerError::LedgerHalted
                | LedgerError::Concurrency(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::Ledger(LedgerError::OverFunded {
            requested,
            remaining,
        }) = self
        {
            body["requested"] = json!(requested);
            body["remaining"] = json!(remaining);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
