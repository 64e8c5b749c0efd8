use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Everything that can go wrong while relaying a single webhook. Each error
/// is converted locally into an HTTP status and a short plain-text body; the
/// process never crashes on a request error and nothing is retried.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("environment {0:?} does not exist")]
    UnknownEnvironment(String),

    #[error("failed to parse request: {0}")]
    RequestParsingError(#[from] serde_json::Error),

    #[error("data.customer_id is missing or not a string")]
    MissingCustomerId,

    #[error("payload submitted without a user id")]
    MissingUserId,

    #[error("analytics delivery failed: {0}")]
    DeliveryError(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::UnknownEnvironment(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            // The decode failure body is fixed; the detail only goes to logs.
            RelayError::RequestParsingError(_) => {
                (StatusCode::NOT_ACCEPTABLE, String::from("bad request"))
            }

            RelayError::MissingCustomerId | RelayError::MissingUserId => {
                (StatusCode::NOT_ACCEPTABLE, self.to_string())
            }

            RelayError::DeliveryError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
        .into_response()
    }
}
