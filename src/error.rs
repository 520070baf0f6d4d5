use crate::models::PaymentInstructions;
use crate::services::{PaymentError, PricingError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment required: {} USDC", .0.payment.amount_usd)]
    PaymentRequired(Box<PaymentInstructions>),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::PaymentRequired(_) => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED"),
            GatewayError::Payment(e) if e.is_operator_fault() => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.kind())
            }
            GatewayError::Payment(e) => (StatusCode::PAYMENT_REQUIRED, e.kind()),
            GatewayError::Pricing(e @ PricingError::InvalidAmount(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.kind())
            }
            GatewayError::Pricing(e) => (StatusCode::BAD_REQUEST, e.kind()),
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_instructions: Option<PaymentInstructions>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, error_code, request_id = %request_id, "Request failed");
        } else {
            tracing::warn!(error = %self, error_code, request_id = %request_id, "Request rejected");
        }

        let error = self.to_string();
        let payment_instructions = match self {
            GatewayError::PaymentRequired(instructions) => Some(*instructions),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error,
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
            payment_instructions,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ChainError;

    #[test]
    fn test_payment_failures_are_payment_required() {
        let not_found = GatewayError::from(PaymentError::TransactionNotFound {
            cause: ChainError::Timeout(std::time::Duration::from_secs(10)),
        });
        assert_eq!(
            not_found.status_and_code(),
            (StatusCode::PAYMENT_REQUIRED, "TRANSACTION_NOT_FOUND")
        );
        assert_eq!(not_found.to_string(), "Transaction not found");

        let replay = GatewayError::from(PaymentError::PaymentAlreadyUsed);
        assert_eq!(replay.status_and_code().0, StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_misconfiguration_is_internal() {
        let err = GatewayError::from(PaymentError::ServerMisconfigured("no token".into()));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_MISCONFIGURED")
        );
    }

    #[test]
    fn test_operator_faults_report_their_own_code() {
        let err = GatewayError::from(PricingError::InvalidAmount(f64::NAN));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_MISCONFIGURED")
        );
    }

    #[test]
    fn test_unknown_model_is_bad_request() {
        let err = GatewayError::from(PricingError::UnknownModel("nope".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "UNKNOWN_MODEL"));
        assert_eq!(err.to_string(), "Unknown model: nope");
    }
}
